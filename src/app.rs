use crate::config::Config;
use crate::dates::{self, date_key};
use crate::focus::{column_items, Activation, Expanded, FocusModel, NavItem};
use crate::model::{Goal, GoalId, GoalStore, StoreError, Subtask};
use crate::projector::{self, project, Projection, ProjectionOptions, View};
use crate::storage::Storage;
use chrono::{Datelike, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::Path;
use std::time::Instant;

pub struct App {
    pub storage: Storage,
    pub store: GoalStore,
    pub view: View,
    pub anchor: NaiveDate,
    pub today: NaiveDate,
    pub expanded: Expanded,
    pub focus: FocusModel,
    /// Selected day in the month and year grids.
    pub calendar_cursor: NaiveDate,
    /// Selected row in the quarter view: its three months, then the recent goals.
    pub quarter_row: usize,
    pub mode: Mode,
    pub status: String,
    pub options: ProjectionOptions,
    pub last_save: Option<Instant>,
    pub has_background: bool,
}

pub enum Mode {
    Normal,
    Input(InlineInput),
    Settings { selected: usize },
    Notice(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputTarget {
    NewGoal {
        date_key: String,
    },
    NewSubtask {
        date_key: String,
        goal_id: GoalId,
    },
    EditGoal {
        date_key: String,
        goal_id: GoalId,
        original: String,
    },
    EditSubtask {
        date_key: String,
        goal_id: GoalId,
        subtask_id: GoalId,
        original: String,
    },
    ExportPath,
    ImportPath,
    BackgroundPath,
}

/// A pending one-line text entry. It resolves exactly once: whichever of
/// save or discard arrives first wins and later attempts are ignored.
pub struct InlineInput {
    pub target: InputTarget,
    pub field: FieldValue,
    resolved: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    Save(String),
    Discard,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SettingsItem {
    Export,
    Import,
    SetBackground,
    ClearBackground,
}

pub const SETTINGS_ITEMS: [SettingsItem; 4] = [
    SettingsItem::Export,
    SettingsItem::Import,
    SettingsItem::SetBackground,
    SettingsItem::ClearBackground,
];

#[derive(Clone, Debug)]
pub struct FieldValue {
    pub value: String,
    cursor: usize,
}

impl FieldValue {
    pub fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if let Some((idx, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    fn move_right(&mut self) {
        if let Some(ch) = self.value[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    fn backspace(&mut self) {
        let end = self.cursor;
        self.move_left();
        self.value.drain(self.cursor..end);
    }

    fn delete(&mut self) {
        if let Some(ch) = self.value[self.cursor..].chars().next() {
            let end = self.cursor + ch.len_utf8();
            self.value.drain(self.cursor..end);
        }
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert(self.cursor, '▌');
        text
    }
}

impl InlineInput {
    pub fn new(target: InputTarget, initial: &str) -> Self {
        InlineInput {
            target,
            field: FieldValue::new(initial),
            resolved: false,
        }
    }

    pub fn resolve(&mut self, save: bool) -> Option<Resolution> {
        if self.resolved {
            return None;
        }
        self.resolved = true;
        Some(if save {
            Resolution::Save(self.field.value.trim().to_string())
        } else {
            Resolution::Discard
        })
    }

    pub fn prompt(&self) -> &'static str {
        match self.target {
            InputTarget::NewGoal { .. } => "Add a goal...",
            InputTarget::NewSubtask { .. } => "Subtask...",
            InputTarget::EditGoal { .. } => "Edit goal",
            InputTarget::EditSubtask { .. } => "Edit subtask",
            InputTarget::ExportPath => "Export to (file or directory)",
            InputTarget::ImportPath => "Import from file",
            InputTarget::BackgroundPath => "Background image",
        }
    }
}

impl SettingsItem {
    pub fn label(&self) -> &'static str {
        match self {
            SettingsItem::Export => "Export goals",
            SettingsItem::Import => "Import goals",
            SettingsItem::SetBackground => "Set background image",
            SettingsItem::ClearBackground => "Reset background",
        }
    }
}

impl App {
    pub fn new(storage: Storage, config: &Config, today: NaiveDate) -> Self {
        let status = format!("Loaded goals from {}", storage.goals_path().display());
        let has_background = storage.background().is_some();
        let mut app = App {
            storage,
            store: GoalStore::default(),
            view: config.default_view,
            anchor: today,
            today,
            expanded: Expanded::new(),
            focus: FocusModel::default(),
            calendar_cursor: today,
            quarter_row: 0,
            mode: Mode::Normal,
            status,
            options: config.projection(),
            last_save: None,
            has_background,
        };
        app.refresh();
        app
    }

    pub fn projection(&self) -> Projection<'_> {
        project(&self.store, self.view, self.anchor, self.today, &self.options)
    }

    /// Called on every tick; re-renders when the date rolls over.
    pub fn set_today(&mut self, today: NaiveDate) {
        if self.today != today {
            self.today = today;
            self.refresh();
        }
    }

    /// Returns `true` when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        match self.mode {
            Mode::Normal => return self.handle_normal_key(key),
            Mode::Input(_) => self.handle_input_key(key),
            Mode::Settings { .. } => self.handle_settings_key(key),
            Mode::Notice(_) => self.mode = Mode::Normal,
        }
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('Q') => return true,
            KeyCode::Char('n') => self.new_goal_today(),
            KeyCode::Char('t') => self.set_view(View::Today),
            KeyCode::Char('d') => self.set_view(View::Day),
            KeyCode::Char('w') => self.set_view(View::Week),
            KeyCode::Char('m') => self.set_view(View::Month),
            KeyCode::Char('q') => self.set_view(View::Quarter),
            KeyCode::Char('y') => self.set_view(View::Year),
            KeyCode::Char('o') => self.set_view(View::Overview),
            KeyCode::Char('s') => self.mode = Mode::Settings { selected: 0 },
            KeyCode::Esc => self.focus.reset(),
            KeyCode::Char('[') | KeyCode::PageUp => self.page(-1),
            KeyCode::Char(']') | KeyCode::PageDown => self.page(1),
            KeyCode::Down | KeyCode::Char('j') => self.navigate(0, 1),
            KeyCode::Up | KeyCode::Char('k') => self.navigate(0, -1),
            KeyCode::Right | KeyCode::Char('l') => self.navigate(1, 0),
            KeyCode::Left | KeyCode::Char('h') => self.navigate(-1, 0),
            KeyCode::Enter => self.activate(),
            KeyCode::Char('e') => self.edit_current(),
            KeyCode::Char(' ') => self.toggle_current(),
            KeyCode::Char('x') | KeyCode::Delete => self.delete_current(),
            KeyCode::Char('J') => self.reorder_current(1),
            KeyCode::Char('K') => self.reorder_current(-1),
            KeyCode::Char('>') => self.transfer_current(1),
            KeyCode::Char('<') => self.transfer_current(-1),
            KeyCode::Char('a') => self.add_here(),
            _ => {}
        }
        false
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => return self.resolve_input(false),
            // Tab leaves the field, which saves like a blur would.
            KeyCode::Enter | KeyCode::Tab => return self.resolve_input(true),
            _ => {}
        }
        let field = match &mut self.mode {
            Mode::Input(input) => &mut input.field,
            _ => return,
        };
        match key.code {
            KeyCode::Left => field.move_left(),
            KeyCode::Right => field.move_right(),
            KeyCode::Home => field.cursor = 0,
            KeyCode::End => field.cursor = field.value.len(),
            KeyCode::Backspace => field.backspace(),
            KeyCode::Delete => field.delete(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    field.insert_char(c);
                }
            }
            _ => {}
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) {
        let selected = match self.mode {
            Mode::Settings { selected } => selected,
            _ => return,
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('s') => {
                self.mode = Mode::Normal;
                self.focus.reset();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.mode = Mode::Settings {
                    selected: selected.saturating_sub(1),
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.mode = Mode::Settings {
                    selected: (selected + 1).min(SETTINGS_ITEMS.len() - 1),
                }
            }
            KeyCode::Enter => self.run_setting(SETTINGS_ITEMS[selected]),
            _ => {}
        }
    }

    fn run_setting(&mut self, item: SettingsItem) {
        match item {
            SettingsItem::Export => self.open_input(InputTarget::ExportPath, "."),
            SettingsItem::Import => self.open_input(InputTarget::ImportPath, ""),
            SettingsItem::SetBackground => self.open_input(InputTarget::BackgroundPath, ""),
            SettingsItem::ClearBackground => {
                self.mode = Mode::Normal;
                match self.storage.clear_background() {
                    Ok(()) => {
                        self.has_background = false;
                        self.status = "Background reset".into();
                    }
                    Err(err) => {
                        tracing::error!(error = %format!("{:#}", err), "clearing background");
                        self.status = format!("Could not reset background: {}", err);
                    }
                }
            }
        }
    }

    pub fn set_view(&mut self, view: View) {
        if self.view != view {
            self.status = format!("Switched to {} view", view.label());
        }
        self.view = view;
        self.focus.reset();
        self.calendar_cursor = self.anchor;
        self.quarter_row = (self.anchor.month0() % 3) as usize;
        self.refresh();
    }

    pub fn page(&mut self, delta: i32) {
        self.anchor = self.view.step(self.anchor, delta);
        self.calendar_cursor = self.anchor;
        self.refresh();
    }

    fn navigate(&mut self, dx: isize, dy: isize) {
        match self.view {
            View::Month | View::Year => {
                let days = dx as i64 + 7 * dy as i64;
                self.calendar_cursor = dates::add_days(self.calendar_cursor, days);
                self.anchor = self.calendar_cursor;
            }
            View::Quarter => {
                let max = self.quarter_row_count().saturating_sub(1) as isize;
                self.quarter_row = (self.quarter_row as isize + dy).clamp(0, max) as usize;
            }
            _ => {
                if dy != 0 {
                    self.focus.move_vertical(dy);
                } else {
                    self.focus.move_horizontal(dx);
                }
            }
        }
    }

    fn activate(&mut self) {
        match self.view {
            View::Month | View::Year => self.open_day(self.calendar_cursor),
            View::Quarter => self.activate_quarter_row(),
            View::Overview => {
                let date = self
                    .focus
                    .current()
                    .and_then(|item| dates::parse_date_key(item.date_key()));
                if let Some(date) = date {
                    self.open_day(date);
                }
            }
            View::Today | View::Day | View::Week => {
                let activation = match self.focus.current() {
                    Some(item) => item.activation(),
                    None => return,
                };
                match activation {
                    Activation::ToggleExpand { date_key, goal_id } => {
                        let key = (date_key, goal_id);
                        if !self.expanded.remove(&key) {
                            self.expanded.insert(key);
                        }
                        self.refresh_focus();
                    }
                    Activation::OpenGoalInput { date_key } => {
                        self.open_input(InputTarget::NewGoal { date_key }, "")
                    }
                    Activation::OpenSubtaskInput { date_key, goal_id } => {
                        self.open_input(InputTarget::NewSubtask { date_key, goal_id }, "")
                    }
                    Activation::ToggleSubtask {
                        date_key,
                        goal_id,
                        subtask_id,
                    } => {
                        self.mutate("Toggled subtask", |s| {
                            s.toggle_subtask(&date_key, &goal_id, &subtask_id)
                        });
                    }
                }
            }
        }
    }

    fn activate_quarter_row(&mut self) {
        let start = dates::quarter_start(self.anchor);
        if self.quarter_row < 3 {
            self.anchor = dates::add_months(start, self.quarter_row as i32);
            self.set_view(View::Month);
            return;
        }
        let date = match self.projection() {
            Projection::Quarter(summary) => summary
                .recent
                .get(self.quarter_row - 3)
                .map(|recent| recent.date),
            _ => None,
        };
        if let Some(date) = date {
            self.open_day(date);
        }
    }

    fn quarter_row_count(&self) -> usize {
        let recent = projector::quarter_summary(&self.store, self.anchor, self.today, &self.options)
            .recent
            .len();
        3 + recent
    }

    pub fn open_day(&mut self, date: NaiveDate) {
        self.anchor = date;
        self.set_view(View::Day);
    }

    fn new_goal_today(&mut self) {
        self.anchor = self.today;
        self.set_view(View::Day);
        self.open_goal_input(date_key(self.today));
    }

    /// `a`: add a goal on the focused column's day, or on the month cursor.
    fn add_here(&mut self) {
        match self.view {
            View::Month | View::Year => {
                let date = self.calendar_cursor;
                self.open_day(date);
                self.open_goal_input(date_key(date));
            }
            View::Today | View::Day | View::Week => {
                let key = match self.focus.current() {
                    Some(item) => item.date_key().to_string(),
                    None if self.view == View::Today => date_key(self.today),
                    None => date_key(self.anchor),
                };
                self.open_goal_input(key);
            }
            _ => {}
        }
    }

    fn open_goal_input(&mut self, date_key: String) {
        self.focus.focus_item(&NavItem::AddGoal {
            date_key: date_key.clone(),
        });
        self.open_input(InputTarget::NewGoal { date_key }, "");
    }

    fn open_input(&mut self, target: InputTarget, initial: &str) {
        self.mode = Mode::Input(InlineInput::new(target, initial));
    }

    fn toggle_current(&mut self) {
        let item = match self.focus.current() {
            Some(item) => item.clone(),
            None => return,
        };
        match item {
            NavItem::Goal { date_key, goal_id } => {
                self.mutate("Toggled goal", |s| s.toggle_goal(&date_key, &goal_id));
            }
            NavItem::Subtask {
                date_key,
                goal_id,
                subtask_id,
            } => {
                self.mutate("Toggled subtask", |s| {
                    s.toggle_subtask(&date_key, &goal_id, &subtask_id)
                });
            }
            _ => {}
        }
    }

    fn edit_current(&mut self) {
        if self.view.column_dates(self.anchor, self.today).is_none() {
            return;
        }
        let item = match self.focus.current() {
            Some(item) => item.clone(),
            None => return,
        };
        match item {
            NavItem::Goal { date_key, goal_id } => {
                let goal = match self.store.find_goal(&date_key, &goal_id) {
                    Some(goal) => goal,
                    None => return,
                };
                if goal.completed {
                    self.status = "Completed goals can't be edited".into();
                    return;
                }
                let original = goal.title.clone();
                self.open_input(
                    InputTarget::EditGoal {
                        date_key,
                        goal_id,
                        original: original.clone(),
                    },
                    &original,
                );
            }
            NavItem::Subtask {
                date_key,
                goal_id,
                subtask_id,
            } => {
                let subtask = match self
                    .store
                    .find_goal(&date_key, &goal_id)
                    .and_then(|g| g.find_subtask(&subtask_id))
                {
                    Some(subtask) => subtask,
                    None => return,
                };
                if subtask.completed {
                    self.status = "Completed subtasks can't be edited".into();
                    return;
                }
                let original = subtask.title.clone();
                self.open_input(
                    InputTarget::EditSubtask {
                        date_key,
                        goal_id,
                        subtask_id,
                        original: original.clone(),
                    },
                    &original,
                );
            }
            _ => {}
        }
    }

    fn delete_current(&mut self) {
        let item = match self.focus.current() {
            Some(item) => item.clone(),
            None => return,
        };
        match item {
            NavItem::Goal { date_key, goal_id } => self.delete_goal(&date_key, &goal_id),
            NavItem::Subtask {
                date_key,
                goal_id,
                subtask_id,
            } => {
                self.mutate("Deleted subtask", |s| {
                    s.delete_subtask(&date_key, &goal_id, &subtask_id)
                });
            }
            _ => {}
        }
    }

    pub fn delete_goal(&mut self, date_key: &str, goal_id: &str) {
        self.expanded
            .remove(&(date_key.to_string(), goal_id.to_string()));
        self.mutate("Deleted goal", |s| s.delete_goal(date_key, goal_id));
    }

    /// Keyboard counterpart of dragging a goal up or down its column.
    fn reorder_current(&mut self, delta: isize) {
        if self.view.column_dates(self.anchor, self.today).is_none() {
            return;
        }
        let (date_key, goal_id) = match self.focus.current() {
            Some(NavItem::Goal { date_key, goal_id }) => (date_key.clone(), goal_id.clone()),
            _ => return,
        };
        let goals = self.store.goals_on(&date_key);
        let current = match goals.iter().position(|g| g.id == goal_id) {
            Some(idx) => idx as isize,
            None => return,
        };
        let target = current + delta;
        if target < 0 || target >= goals.len() as isize {
            return;
        }
        let moved = self.mutate("Reordered goal", |s| {
            s.reorder_goals(&date_key, &goal_id, target as usize)
        });
        if moved.is_some() {
            self.focus.focus_item(&NavItem::Goal { date_key, goal_id });
        }
    }

    /// Keyboard counterpart of dropping a goal onto a neighbouring column.
    fn transfer_current(&mut self, delta: isize) {
        let dates = match self.view.column_dates(self.anchor, self.today) {
            Some(dates) => dates,
            None => return,
        };
        let column = match self.focus.current_column() {
            Some(column) => column as isize + delta,
            None => return,
        };
        if column < 0 || column >= dates.len() as isize {
            return;
        }
        let (from_key, goal_id) = match self.focus.current() {
            Some(NavItem::Goal { date_key, goal_id }) => (date_key.clone(), goal_id.clone()),
            _ => return,
        };
        let to_key = date_key(dates[column as usize]);
        let moved = self.mutate(format!("Moved goal to {}", to_key), |s| {
            s.move_goal(&from_key, &to_key, &goal_id)
        });
        if moved.is_some() {
            if self.expanded.remove(&(from_key, goal_id.clone())) {
                self.expanded.insert((to_key.clone(), goal_id.clone()));
                self.refresh_focus();
            }
            self.focus.focus_item(&NavItem::Goal {
                date_key: to_key,
                goal_id,
            });
        }
    }

    fn resolve_input(&mut self, save: bool) {
        let mut input = match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Input(input) => input,
            other => {
                self.mode = other;
                return;
            }
        };
        match input.resolve(save) {
            Some(Resolution::Save(text)) => self.apply_input(input.target, text),
            Some(Resolution::Discard) => self.status = "Canceled".into(),
            None => {}
        }
    }

    fn apply_input(&mut self, target: InputTarget, text: String) {
        match target {
            InputTarget::NewGoal { date_key } => {
                if text.is_empty() {
                    return;
                }
                let created = self.mutate("Added goal", |s| {
                    let id = s.next_id();
                    s.add_goal(&date_key, Goal::new(id, text, None))
                        .map(|goal| goal.id.clone())
                });
                if let Some(goal_id) = created {
                    self.expanded.insert((date_key.clone(), goal_id.clone()));
                    self.refresh_focus();
                    self.focus.focus_item(&NavItem::AddSubtask {
                        date_key: date_key.clone(),
                        goal_id: goal_id.clone(),
                    });
                    self.open_input(InputTarget::NewSubtask { date_key, goal_id }, "");
                }
            }
            InputTarget::NewSubtask { date_key, goal_id } => {
                if text.is_empty() {
                    return;
                }
                self.mutate("Added subtask", |s| {
                    let id = s.next_id();
                    s.add_subtask(&date_key, &goal_id, Subtask::new(id, text))
                });
            }
            InputTarget::EditGoal {
                date_key,
                goal_id,
                original,
            } => {
                if text.is_empty() {
                    self.delete_goal(&date_key, &goal_id);
                } else if text != original {
                    self.mutate("Updated goal", |s| s.update_goal(&date_key, &goal_id, &text));
                }
            }
            InputTarget::EditSubtask {
                date_key,
                goal_id,
                subtask_id,
                original,
            } => {
                if text.is_empty() {
                    self.mutate("Deleted subtask", |s| {
                        s.delete_subtask(&date_key, &goal_id, &subtask_id)
                    });
                } else if text != original {
                    self.mutate("Updated subtask", |s| {
                        s.update_subtask(&date_key, &goal_id, &subtask_id, &text)
                    });
                }
            }
            InputTarget::ExportPath => {
                let dest = if text.is_empty() { "." } else { text.as_str() };
                match self.storage.export_to(Path::new(dest), self.today) {
                    Ok(path) => self.status = format!("Exported to {}", path.display()),
                    Err(err) => {
                        tracing::error!(error = %format!("{:#}", err), "export failed");
                        self.mode = Mode::Notice(format!("Export failed: {:#}", err));
                    }
                }
            }
            InputTarget::ImportPath => {
                if text.is_empty() {
                    return;
                }
                match self.storage.import_from(Path::new(&text)) {
                    Ok(added) => {
                        self.refresh();
                        self.mode = Mode::Notice(format!(
                            "Goals imported successfully! ({} added)",
                            added
                        ));
                    }
                    Err(err) => {
                        tracing::warn!(%err, path = %text, "import rejected");
                        self.mode = Mode::Notice(format!("Error importing goals: {}", err));
                    }
                }
            }
            InputTarget::BackgroundPath => {
                if text.is_empty() {
                    return;
                }
                match self.storage.set_background(Path::new(&text)) {
                    Ok(_) => {
                        self.has_background = true;
                        self.status = "Background updated".into();
                    }
                    Err(err) => self.mode = Mode::Notice(format!("{:#}", err)),
                }
            }
        }
    }

    /// Runs a store operation through load-mutate-persist and re-syncs
    /// focus. A missing target is a silent no-op and yields `None`.
    fn mutate<T, F>(&mut self, label: impl Into<String>, op: F) -> Option<T>
    where
        F: FnOnce(&mut GoalStore) -> Result<T, StoreError>,
    {
        let (store, outcome) = self.storage.apply(op);
        self.store = store;
        let result = match outcome {
            Ok(value) => {
                self.last_save = Some(Instant::now());
                self.status = label.into();
                Some(value)
            }
            Err(_) => None,
        };
        self.refresh_focus();
        result
    }

    pub fn refresh(&mut self) {
        self.store = self.storage.load();
        self.refresh_focus();
    }

    /// Rebuilds the navigable rows for the current view and re-resolves the
    /// cursor against them.
    fn refresh_focus(&mut self) {
        let columns = match self.projection() {
            Projection::Columns(columns) => columns
                .iter()
                .map(|column| column_items(column, &self.expanded))
                .collect(),
            Projection::Overview(overview) => [&overview.pending, &overview.done]
                .iter()
                .map(|items| {
                    items
                        .iter()
                        .map(|item| NavItem::Goal {
                            date_key: item.key.to_string(),
                            goal_id: item.goal.id.clone(),
                        })
                        .collect()
                })
                .collect(),
            _ => Vec::new(),
        };
        self.focus.sync(columns);
    }
}
