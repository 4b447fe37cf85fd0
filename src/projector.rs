use crate::dates::{self, date_key};
use crate::model::{Goal, GoalStore};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Goals previewed inside a month cell before collapsing into "+N more".
pub const MONTH_PREVIEW: usize = 3;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Today,
    Overview,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl View {
    pub const ALL: [View; 7] = [
        View::Today,
        View::Day,
        View::Week,
        View::Month,
        View::Quarter,
        View::Year,
        View::Overview,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            View::Today => "Today",
            View::Overview => "Overview",
            View::Day => "Day",
            View::Week => "Week",
            View::Month => "Month",
            View::Quarter => "Quarter",
            View::Year => "Year",
        }
    }

    /// Moves the anchor one page backwards (`delta < 0`) or forwards.
    pub fn step(&self, anchor: NaiveDate, delta: i32) -> NaiveDate {
        match self {
            View::Today | View::Overview => anchor,
            View::Day => dates::add_days(anchor, 4 * delta as i64),
            View::Week => dates::add_days(anchor, 7 * delta as i64),
            View::Month => dates::add_months(anchor, delta),
            View::Quarter => dates::add_months(anchor, 3 * delta),
            View::Year => dates::add_months(anchor, 12 * delta),
        }
    }

    /// Dates rendered as goal columns, or `None` for grid and summary views.
    pub fn column_dates(&self, anchor: NaiveDate, today: NaiveDate) -> Option<Vec<NaiveDate>> {
        match self {
            View::Today => Some(vec![today]),
            View::Day => Some((-1..=2).map(|d| dates::add_days(anchor, d)).collect()),
            View::Week => {
                let start = dates::week_start(anchor);
                Some((0..7).map(|d| dates::add_days(start, d)).collect())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionOptions {
    pub recent_days: u32,
    pub recent_per_day: usize,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        ProjectionOptions {
            recent_days: 14,
            recent_per_day: 3,
        }
    }
}

#[derive(Debug)]
pub enum Projection<'a> {
    Columns(Vec<DayColumn<'a>>),
    Month(MonthGrid<'a>),
    Quarter(QuarterSummary<'a>),
    Year(YearGrid),
    Overview(Overview<'a>),
}

#[derive(Debug)]
pub struct DayColumn<'a> {
    pub date: NaiveDate,
    pub key: String,
    pub is_today: bool,
    pub goals: &'a [Goal],
}

#[derive(Debug)]
pub struct MonthGrid<'a> {
    pub month: NaiveDate,
    pub leading_blanks: usize,
    pub days: Vec<MonthCell<'a>>,
}

#[derive(Debug)]
pub struct MonthCell<'a> {
    pub date: NaiveDate,
    pub key: String,
    pub is_today: bool,
    pub goals: &'a [Goal],
}

#[derive(Debug)]
pub struct QuarterSummary<'a> {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// 1 through 4.
    pub number: u32,
    pub months: Vec<MonthStat>,
    pub total: usize,
    pub completed: usize,
    pub recent: Vec<RecentGoal<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthStat {
    pub month: NaiveDate,
    pub total: usize,
    pub completed: usize,
    pub progress: u32,
}

#[derive(Debug)]
pub struct RecentGoal<'a> {
    pub date: NaiveDate,
    pub key: String,
    pub goal: &'a Goal,
}

#[derive(Debug)]
pub struct YearGrid {
    pub year: i32,
    pub months: Vec<MiniMonth>,
}

#[derive(Debug)]
pub struct MiniMonth {
    pub month: NaiveDate,
    pub leading_blanks: usize,
    pub days: Vec<MiniDay>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniDay {
    pub date: NaiveDate,
    pub key: String,
    pub is_today: bool,
    pub has_goals: bool,
    pub all_complete: bool,
}

#[derive(Debug, Default)]
pub struct Overview<'a> {
    pub pending: Vec<OverviewItem<'a>>,
    pub done: Vec<OverviewItem<'a>>,
}

#[derive(Debug)]
pub struct OverviewItem<'a> {
    pub key: &'a str,
    pub date: Option<NaiveDate>,
    pub goal: &'a Goal,
}

pub fn project<'a>(
    store: &'a GoalStore,
    view: View,
    anchor: NaiveDate,
    today: NaiveDate,
    options: &ProjectionOptions,
) -> Projection<'a> {
    match view {
        View::Today | View::Day | View::Week => {
            let dates = view.column_dates(anchor, today).unwrap_or_default();
            Projection::Columns(
                dates
                    .into_iter()
                    .map(|date| day_column(store, date, today))
                    .collect(),
            )
        }
        View::Month => Projection::Month(month_grid(store, anchor, today)),
        View::Quarter => Projection::Quarter(quarter_summary(store, anchor, today, options)),
        View::Year => Projection::Year(year_grid(store, anchor.year(), today)),
        View::Overview => Projection::Overview(overview(store)),
    }
}

pub fn day_column<'a>(store: &'a GoalStore, date: NaiveDate, today: NaiveDate) -> DayColumn<'a> {
    let key = date_key(date);
    DayColumn {
        date,
        is_today: date == today,
        goals: store.goals_on(&key),
        key,
    }
}

pub fn month_grid<'a>(store: &'a GoalStore, anchor: NaiveDate, today: NaiveDate) -> MonthGrid<'a> {
    let days = dates::month_days(anchor)
        .into_iter()
        .map(|date| {
            let key = date_key(date);
            MonthCell {
                date,
                is_today: date == today,
                goals: store.goals_on(&key),
                key,
            }
        })
        .collect();
    MonthGrid {
        month: dates::month_start(anchor),
        leading_blanks: dates::leading_blanks(anchor),
        days,
    }
}

impl<'a> MonthCell<'a> {
    pub fn preview(&self) -> &'a [Goal] {
        &self.goals[..self.goals.len().min(MONTH_PREVIEW)]
    }

    pub fn more(&self) -> usize {
        self.goals.len().saturating_sub(MONTH_PREVIEW)
    }
}

pub fn quarter_summary<'a>(
    store: &'a GoalStore,
    anchor: NaiveDate,
    today: NaiveDate,
    options: &ProjectionOptions,
) -> QuarterSummary<'a> {
    let start = dates::quarter_start(anchor);
    let end = dates::quarter_end(anchor);

    let months = (0..3)
        .map(|m| {
            let month = dates::add_months(start, m);
            let (total, completed) = dates::month_days(month)
                .into_iter()
                .map(|date| day_counts(store.goals_on(&date_key(date))))
                .fold((0, 0), |(t, c), (dt, dc)| (t + dt, c + dc));
            MonthStat {
                month,
                total,
                completed,
                progress: percent(completed, total),
            }
        })
        .collect::<Vec<_>>();

    let total = months.iter().map(|m| m.total).sum();
    let completed = months.iter().map(|m| m.completed).sum();

    let mut recent = Vec::new();
    for back in 0..options.recent_days {
        let date = dates::add_days(today, -(back as i64));
        if date < start || date > end {
            continue;
        }
        let key = date_key(date);
        for goal in store
            .goals_on(&key)
            .iter()
            .filter(|g| !g.completed)
            .take(options.recent_per_day)
        {
            recent.push(RecentGoal {
                date,
                key: key.clone(),
                goal,
            });
        }
    }

    QuarterSummary {
        start,
        end,
        number: dates::quarter_index(start) + 1,
        months,
        total,
        completed,
        recent,
    }
}

impl QuarterSummary<'_> {
    pub fn pending(&self) -> usize {
        self.total - self.completed
    }

    pub fn progress(&self) -> u32 {
        percent(self.completed, self.total)
    }
}

pub fn year_grid(store: &GoalStore, year: i32, today: NaiveDate) -> YearGrid {
    let months = (1..=12)
        .filter_map(|m| NaiveDate::from_ymd_opt(year, m, 1))
        .map(|month| MiniMonth {
            month,
            leading_blanks: dates::leading_blanks(month),
            days: dates::month_days(month)
                .into_iter()
                .map(|date| {
                    let key = date_key(date);
                    let goals = store.goals_on(&key);
                    MiniDay {
                        date,
                        is_today: date == today,
                        has_goals: !goals.is_empty(),
                        all_complete: !goals.is_empty() && goals.iter().all(|g| g.completed),
                        key,
                    }
                })
                .collect(),
        })
        .collect();
    YearGrid { year, months }
}

/// Every goal split by completion, most recent day first. Order within a
/// day is the stored order.
pub fn overview(store: &GoalStore) -> Overview<'_> {
    let mut out = Overview::default();
    for (key, goals) in store.days().rev() {
        let date = dates::parse_date_key(key);
        for goal in goals {
            let item = OverviewItem { key, date, goal };
            if goal.completed {
                out.done.push(item);
            } else {
                out.pending.push(item);
            }
        }
    }
    out
}

pub fn day_counts(goals: &[Goal]) -> (usize, usize) {
    (goals.len(), goals.iter().filter(|g| g.completed).count())
}

/// Whole-number percentage, rounded half up; an empty total is 0%.
pub fn percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed * 200 + total) / (total * 2)) as u32
}
