use crate::app::App;
use crate::config::Config;
use crate::dates::{self, date_key, parse_date_key};
use crate::model::{Goal, GoalId, Recurrence, RecurrenceKind};
use crate::projector::{project, Projection, ProjectionOptions, View};
use crate::storage::{init_project_store, locate_store, Storage};
use crate::ui;
use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use std::env;
use std::path::{Path, PathBuf};

pub fn open_store(config: &Config) -> Result<Storage> {
    let cwd = env::current_dir()?;
    locate_store(&cwd, config.data_dir.as_deref())
}

pub fn init() -> Result<()> {
    let storage = init_project_store()?;
    println!("Initialized goal store at {}", storage.dir.display());
    Ok(())
}

pub fn list(config: &Config, date: Option<String>, view: Option<View>) -> Result<()> {
    let storage = open_store(config)?;
    let today = dates::today();
    let anchor = resolve_date(date.as_deref(), today)?;
    println!(
        "{} goals ({}, {})",
        storage.load().goal_count(),
        storage.scope.label(),
        storage.goals_path().display()
    );
    print!(
        "{}",
        render_listing(&storage, view, anchor, today, &config.projection())
    );
    Ok(())
}

pub fn add(
    config: &Config,
    title: String,
    date: Option<String>,
    daily: bool,
    weekly: Vec<String>,
) -> Result<()> {
    let storage = open_store(config)?;
    let key = date_key(resolve_date(date.as_deref(), dates::today())?);
    let recurrence = parse_recurrence(daily, &weekly)?;
    let id = add_goal(&storage, &key, &title, recurrence)?;
    println!("Added goal {} to {}", id, key);
    Ok(())
}

pub fn toggle(config: &Config, goal_id: String, date: Option<String>) -> Result<()> {
    let storage = open_store(config)?;
    let key = date_key(resolve_date(date.as_deref(), dates::today())?);
    let (_, outcome) = storage.apply(|s| s.toggle_goal(&key, &goal_id));
    let completed = outcome.with_context(|| format!("toggling goal {} on {}", goal_id, key))?;
    println!(
        "Goal {} is now {}",
        goal_id,
        if completed { "done" } else { "pending" }
    );
    Ok(())
}

pub fn edit(config: &Config, goal_id: String, title: String, date: Option<String>) -> Result<()> {
    let storage = open_store(config)?;
    let key = date_key(resolve_date(date.as_deref(), dates::today())?);
    if title.trim().is_empty() {
        return remove(config, goal_id, Some(key));
    }
    let (_, outcome) = storage.apply(|s| s.update_goal(&key, &goal_id, &title));
    outcome.with_context(|| format!("editing goal {} on {}", goal_id, key))?;
    println!("Updated goal {}", goal_id);
    Ok(())
}

pub fn remove(config: &Config, goal_id: String, date: Option<String>) -> Result<()> {
    let storage = open_store(config)?;
    let key = date_key(resolve_date(date.as_deref(), dates::today())?);
    let (_, outcome) = storage.apply(|s| s.delete_goal(&key, &goal_id));
    let goal = outcome.with_context(|| format!("deleting goal {} on {}", goal_id, key))?;
    println!("Deleted goal {} ({})", goal.id, goal.title);
    Ok(())
}

pub fn move_goal(config: &Config, goal_id: String, from: String, to: String) -> Result<()> {
    let storage = open_store(config)?;
    let today = dates::today();
    let from = date_key(resolve_date(Some(&from), today)?);
    let to = date_key(resolve_date(Some(&to), today)?);
    let (_, outcome) = storage.apply(|s| s.move_goal(&from, &to, &goal_id));
    outcome.with_context(|| format!("moving goal {} from {} to {}", goal_id, from, to))?;
    println!("Moved goal {} to {}", goal_id, to);
    Ok(())
}

pub fn export(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let storage = open_store(config)?;
    let dest = path.unwrap_or_else(|| PathBuf::from("."));
    let written = storage.export_to(&dest, dates::today())?;
    println!("Exported goals to {}", written.display());
    Ok(())
}

pub fn import(config: &Config, file: PathBuf) -> Result<()> {
    let storage = open_store(config)?;
    let added = storage
        .import_from(&file)
        .map_err(|err| anyhow!("Error importing goals: {}", err))?;
    println!("Goals imported successfully! ({} added)", added);
    Ok(())
}

pub fn set_background(config: &Config, path: &Path) -> Result<()> {
    let storage = open_store(config)?;
    let stored = storage.set_background(path)?;
    println!("Background set ({})", stored.display());
    Ok(())
}

pub fn clear_background(config: &Config) -> Result<()> {
    let storage = open_store(config)?;
    storage.clear_background()?;
    println!("Background reset");
    Ok(())
}

pub fn tui(config: &Config) -> Result<()> {
    let storage = open_store(config)?;
    tracing::info!(dir = %storage.dir.display(), scope = storage.scope.label(), "starting tui");
    let app = App::new(storage, config, dates::today());
    ui::run(app)
}

fn add_goal(
    storage: &Storage,
    key: &str,
    title: &str,
    recurrence: Option<Recurrence>,
) -> Result<GoalId> {
    let (_, outcome) = storage.apply(|s| {
        let id = s.next_id();
        s.add_goal(key, Goal::new(id, title, recurrence))
            .map(|goal| goal.id.clone())
    });
    outcome.with_context(|| format!("adding goal to {}", key))
}

fn resolve_date(input: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match input.map(str::trim) {
        None | Some("") => Ok(today),
        Some("today") => Ok(today),
        Some(raw) => parse_date_key(raw)
            .ok_or_else(|| anyhow!("invalid date format (use YYYY-MM-DD): {}", raw)),
    }
}

fn parse_recurrence(daily: bool, weekly: &[String]) -> Result<Option<Recurrence>> {
    if daily {
        return Ok(Some(Recurrence::daily()));
    }
    if weekly.is_empty() {
        return Ok(None);
    }
    let days = weekly
        .iter()
        .map(|raw| {
            raw.trim()
                .parse::<Weekday>()
                .map_err(|_| anyhow!("unknown weekday: {}", raw))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(Recurrence::weekly(days)))
}

fn render_listing(
    storage: &Storage,
    view: Option<View>,
    anchor: NaiveDate,
    today: NaiveDate,
    options: &ProjectionOptions,
) -> String {
    let store = storage.load();
    let mut out = String::new();
    let view = match view {
        Some(view) => view,
        None => {
            push_day(&mut out, anchor, anchor == today, store.goals_on(&date_key(anchor)));
            return out;
        }
    };
    match project(&store, view, anchor, today, options) {
        Projection::Columns(columns) => {
            for column in columns {
                push_day(&mut out, column.date, column.is_today, column.goals);
            }
        }
        Projection::Month(grid) => {
            for cell in grid.days.iter().filter(|cell| !cell.goals.is_empty()) {
                push_day(&mut out, cell.date, cell.is_today, cell.goals);
            }
        }
        Projection::Quarter(summary) => {
            out.push_str(&format!(
                "Q{} {}  {}/{} done ({}%)\n",
                summary.number,
                summary.start.year(),
                summary.completed,
                summary.total,
                summary.progress()
            ));
            for month in &summary.months {
                out.push_str(&format!(
                    "  {}: {}/{} ({}%)\n",
                    dates::format_month_year(month.month),
                    month.completed,
                    month.total,
                    month.progress
                ));
            }
            out.push_str("Recent pending\n");
            if summary.recent.is_empty() {
                out.push_str("  (none)\n");
            }
            for recent in &summary.recent {
                out.push_str(&format!(
                    "  {}  {}: {}\n",
                    recent.key, recent.goal.id, recent.goal.title
                ));
            }
        }
        Projection::Year(grid) => {
            for day in grid
                .months
                .iter()
                .flat_map(|month| month.days.iter())
                .filter(|day| day.has_goals)
            {
                push_day(&mut out, day.date, day.is_today, store.goals_on(&day.key));
            }
        }
        Projection::Overview(overview) => {
            for (label, items) in [("Pending", &overview.pending), ("Done", &overview.done)] {
                out.push_str(&format!("{} ({})\n", label, items.len()));
                for item in items.iter() {
                    out.push_str(&format!("  {}{}", item.key, format_goal(item.goal)));
                }
            }
        }
    }
    if out.is_empty() {
        out.push_str("(no goals)\n");
    }
    out
}

fn push_day(out: &mut String, date: NaiveDate, is_today: bool, goals: &[Goal]) {
    let marker = if is_today { " (today)" } else { "" };
    out.push_str(&format!("{}  {}{}\n", date_key(date), dates::format_day(date), marker));
    if goals.is_empty() {
        out.push_str("  (no goals)\n");
    }
    for goal in goals {
        out.push_str(&format_goal(goal));
    }
}

fn format_goal(goal: &Goal) -> String {
    let mut line = format!(
        "  [{}] {}: {}",
        if goal.completed { "x" } else { " " },
        goal.id,
        goal.title
    );
    if let Some(recurrence) = &goal.recurrence {
        match recurrence.kind {
            RecurrenceKind::Daily => line.push_str("  (daily)"),
            RecurrenceKind::Weekly => line.push_str("  (weekly)"),
        }
    }
    line.push('\n');
    for subtask in &goal.subtasks {
        line.push_str(&format!(
            "      [{}] {}\n",
            if subtask.completed { "x" } else { " " },
            subtask.title
        ));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Subtask;
    use crate::storage::StoreScope;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn storage(tmp: &TempDir) -> Storage {
        Storage::new(tmp.path().join("data"), StoreScope::Configured)
    }

    #[test]
    fn dates_default_to_today() {
        let today = ymd(2024, 6, 5);
        assert_eq!(resolve_date(None, today).unwrap(), today);
        assert_eq!(resolve_date(Some("today"), today).unwrap(), today);
        assert_eq!(resolve_date(Some("2024-01-31"), today).unwrap(), ymd(2024, 1, 31));
        assert!(resolve_date(Some("31/01/2024"), today).is_err());
    }

    #[test]
    fn recurrence_flags() {
        assert_eq!(parse_recurrence(false, &[]).unwrap(), None);
        assert_eq!(
            parse_recurrence(true, &[]).unwrap(),
            Some(Recurrence::daily())
        );
        let weekly = parse_recurrence(false, &["mon".into(), "Friday".into()])
            .unwrap()
            .unwrap();
        assert_eq!(weekly, Recurrence::weekly([Weekday::Mon, Weekday::Fri]));
        assert!(parse_recurrence(false, &["someday".into()]).is_err());
    }

    #[test]
    fn added_goals_show_in_listing() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let today = ymd(2024, 6, 5);
        let id = add_goal(&storage, "2024-06-05", "Read a chapter", None).unwrap();
        storage.apply(|s| {
            let sub = s.next_id();
            s.add_subtask("2024-06-05", &id, Subtask::new(sub, "pages 1-20"))
        });
        add_goal(&storage, "2024-06-20", "Dentist", Some(Recurrence::daily())).unwrap();
        let options = ProjectionOptions::default();

        let day = render_listing(&storage, None, today, today, &options);
        assert!(day.starts_with("2024-06-05  Wed, Jun 5 (today)\n"));
        assert!(day.contains(&format!("[ ] {}: Read a chapter", id)));
        assert!(day.contains("      [ ] pages 1-20"));
        assert!(!day.contains("Dentist"));

        let month = render_listing(&storage, Some(View::Month), today, today, &options);
        assert!(month.contains("Dentist  (daily)"));
        assert!(month.contains("Read a chapter"));

        let week = render_listing(&storage, Some(View::Week), today, today, &options);
        assert_eq!(week.matches("(no goals)").count(), 6);
    }

    #[test]
    fn overview_listing_is_newest_first_and_split() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let today = ymd(2024, 6, 5);
        add_goal(&storage, "2024-01-05", "Older goal", None).unwrap();
        add_goal(&storage, "2024-03-01", "Newer goal", None).unwrap();
        let filed = add_goal(&storage, "2024-02-01", "Filed taxes", None).unwrap();
        storage.apply(|s| s.toggle_goal("2024-02-01", &filed));

        let listing = render_listing(
            &storage,
            Some(View::Overview),
            today,
            today,
            &ProjectionOptions::default(),
        );
        let pos = |needle: &str| listing.find(needle).unwrap();
        assert!(listing.starts_with("Pending (2)\n"));
        assert!(pos("2024-03-01") < pos("2024-01-05"));
        assert!(pos("Newer goal") < pos("Older goal"));
        assert!(pos("Older goal") < pos("Done (1)"));
        assert!(pos("Done (1)") < pos("Filed taxes"));
        assert!(listing.contains(&format!("  2024-02-01  [x] {}: Filed taxes", filed)));
    }

    #[test]
    fn quarter_listing_shows_month_stats_and_recent() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let today = ymd(2024, 6, 5);
        let read = add_goal(&storage, "2024-06-05", "Read a chapter", None).unwrap();
        let taxes = add_goal(&storage, "2024-04-10", "Taxes", None).unwrap();
        storage.apply(|s| s.toggle_goal("2024-04-10", &taxes));

        let listing = render_listing(
            &storage,
            Some(View::Quarter),
            today,
            today,
            &ProjectionOptions::default(),
        );
        assert!(listing.starts_with("Q2 2024  1/2 done (50%)\n"));
        assert!(listing.contains("  April 2024: 1/1 (100%)\n"));
        assert!(listing.contains("  May 2024: 0/0 (0%)\n"));
        assert!(listing.contains("  June 2024: 0/1 (0%)\n"));
        assert!(listing.contains(&format!("Recent pending\n  2024-06-05  {}: Read a chapter\n", read)));
        assert!(!listing.contains(&format!("{}: Taxes", taxes)));
    }

    #[test]
    fn blank_titles_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        assert!(add_goal(&storage, "2024-06-05", "   ", None).is_err());
        assert!(storage.load().is_empty());
    }
}
