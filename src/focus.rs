use crate::model::GoalId;
use crate::projector::DayColumn;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavItem {
    Goal {
        date_key: String,
        goal_id: GoalId,
    },
    Subtask {
        date_key: String,
        goal_id: GoalId,
        subtask_id: GoalId,
    },
    AddSubtask {
        date_key: String,
        goal_id: GoalId,
    },
    AddGoal {
        date_key: String,
    },
}

/// What pressing Enter on an item does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    ToggleExpand { date_key: String, goal_id: GoalId },
    OpenGoalInput { date_key: String },
    OpenSubtaskInput { date_key: String, goal_id: GoalId },
    ToggleSubtask {
        date_key: String,
        goal_id: GoalId,
        subtask_id: GoalId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Unfocused,
    Focused {
        column: usize,
        item: usize,
    },
}

#[derive(Debug, Default)]
pub struct FocusModel {
    focus: Focus,
    columns: Vec<Vec<NavItem>>,
}

impl NavItem {
    pub fn date_key(&self) -> &str {
        match self {
            NavItem::Goal { date_key, .. }
            | NavItem::Subtask { date_key, .. }
            | NavItem::AddSubtask { date_key, .. }
            | NavItem::AddGoal { date_key } => date_key,
        }
    }

    pub fn activation(&self) -> Activation {
        match self.clone() {
            NavItem::Goal { date_key, goal_id } => Activation::ToggleExpand { date_key, goal_id },
            NavItem::Subtask {
                date_key,
                goal_id,
                subtask_id,
            } => Activation::ToggleSubtask {
                date_key,
                goal_id,
                subtask_id,
            },
            NavItem::AddSubtask { date_key, goal_id } => {
                Activation::OpenSubtaskInput { date_key, goal_id }
            }
            NavItem::AddGoal { date_key } => Activation::OpenGoalInput { date_key },
        }
    }
}

/// Expanded goals, keyed by day since an import can file one id under two days.
pub type Expanded = HashSet<(String, GoalId)>;

/// Rows of one column in display order: each goal, then (when expanded)
/// its subtasks and its add-subtask row, and finally the add-goal row.
pub fn column_items(column: &DayColumn<'_>, expanded: &Expanded) -> Vec<NavItem> {
    let mut items = Vec::new();
    for goal in column.goals {
        items.push(NavItem::Goal {
            date_key: column.key.clone(),
            goal_id: goal.id.clone(),
        });
        if !expanded.contains(&(column.key.clone(), goal.id.clone())) {
            continue;
        }
        for subtask in &goal.subtasks {
            items.push(NavItem::Subtask {
                date_key: column.key.clone(),
                goal_id: goal.id.clone(),
                subtask_id: subtask.id.clone(),
            });
        }
        items.push(NavItem::AddSubtask {
            date_key: column.key.clone(),
            goal_id: goal.id.clone(),
        });
    }
    items.push(NavItem::AddGoal {
        date_key: column.key.clone(),
    });
    items
}

impl FocusModel {
    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn columns(&self) -> &[Vec<NavItem>] {
        &self.columns
    }

    pub fn is_focused(&self, column: usize, item: usize) -> bool {
        self.focus == Focus::Focused { column, item }
    }

    pub fn current(&self) -> Option<&NavItem> {
        match self.focus {
            Focus::Unfocused => None,
            Focus::Focused { column, item } => self.columns.get(column)?.get(item),
        }
    }

    pub fn current_column(&self) -> Option<usize> {
        match self.focus {
            Focus::Unfocused => None,
            Focus::Focused { column, .. } => Some(column),
        }
    }

    pub fn reset(&mut self) {
        self.focus = Focus::Unfocused;
    }

    /// Installs freshly rendered rows and pulls the cursor back in range.
    pub fn sync(&mut self, columns: Vec<Vec<NavItem>>) {
        self.columns = columns;
        if let Focus::Focused { column, item } = self.focus {
            if self.columns.is_empty() {
                self.focus = Focus::Unfocused;
                return;
            }
            let column = column.min(self.columns.len() - 1);
            let item = item.min(self.columns[column].len().saturating_sub(1));
            self.focus = Focus::Focused { column, item };
        }
    }

    /// Up/down within the current column, clamped at both ends.
    pub fn move_vertical(&mut self, delta: isize) {
        if self.columns.is_empty() {
            return;
        }
        match self.focus {
            Focus::Unfocused => self.focus_first(),
            Focus::Focused { column, item } => {
                let max = self.columns[column].len().saturating_sub(1) as isize;
                let item = (item as isize + delta).clamp(0, max) as usize;
                self.focus = Focus::Focused { column, item };
            }
        }
    }

    /// Left/right between columns; the row index is kept when it still
    /// exists in the new column and clamped to its last row otherwise.
    pub fn move_horizontal(&mut self, delta: isize) {
        if self.columns.is_empty() {
            return;
        }
        match self.focus {
            Focus::Unfocused => self.focus_first(),
            Focus::Focused { column, item } => {
                let target = column as isize + delta;
                if target < 0 || target >= self.columns.len() as isize {
                    return;
                }
                let column = target as usize;
                let item = item.min(self.columns[column].len().saturating_sub(1));
                self.focus = Focus::Focused { column, item };
            }
        }
    }

    pub fn focus_item(&mut self, target: &NavItem) -> bool {
        for (column, items) in self.columns.iter().enumerate() {
            if let Some(item) = items.iter().position(|i| i == target) {
                self.focus = Focus::Focused { column, item };
                return true;
            }
        }
        false
    }

    fn focus_first(&mut self) {
        self.focus = Focus::Focused { column: 0, item: 0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Goal, GoalStore, Subtask};
    use crate::projector::day_column;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const DAY: &str = "2024-06-01";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn sample_store() -> GoalStore {
        let mut store = GoalStore::default();
        store.add_goal(DAY, Goal::new("g1".into(), "one", None)).unwrap();
        store.add_goal(DAY, Goal::new("g2".into(), "two", None)).unwrap();
        store
            .add_subtask(DAY, "g1", Subtask::new("s1".into(), "sub"))
            .unwrap();
        store
    }

    fn goal(id: &str) -> NavItem {
        NavItem::Goal {
            date_key: DAY.into(),
            goal_id: id.into(),
        }
    }

    fn model(lengths: &[usize]) -> FocusModel {
        let mut model = FocusModel::default();
        model.sync(
            lengths
                .iter()
                .map(|len| (0..*len).map(|i| goal(&i.to_string())).collect())
                .collect(),
        );
        model
    }

    #[test]
    fn collapsed_goals_hide_subtasks() {
        let store = sample_store();
        let column = day_column(&store, date(), date());
        let items = column_items(&column, &HashSet::new());
        assert_eq!(
            items,
            vec![
                goal("g1"),
                goal("g2"),
                NavItem::AddGoal {
                    date_key: DAY.into()
                },
            ]
        );
    }

    #[test]
    fn expansion_on_another_day_is_ignored() {
        let store = sample_store();
        let column = day_column(&store, date(), date());
        let expanded = HashSet::from([("2024-06-02".to_string(), "g1".to_string())]);
        let items = column_items(&column, &expanded);
        assert_eq!(items.len(), 3);
        assert!(!items
            .iter()
            .any(|item| matches!(item, NavItem::Subtask { .. })));
    }

    #[test]
    fn expanded_goal_lists_subtasks_then_add_row() {
        let store = sample_store();
        let column = day_column(&store, date(), date());
        let expanded = HashSet::from([
            (DAY.to_string(), "g1".to_string()),
            (DAY.to_string(), "g2".to_string()),
            ("2024-06-02".to_string(), "g1".to_string()),
        ]);
        let items = column_items(&column, &expanded);
        assert_eq!(
            items,
            vec![
                goal("g1"),
                NavItem::Subtask {
                    date_key: DAY.into(),
                    goal_id: "g1".into(),
                    subtask_id: "s1".into(),
                },
                NavItem::AddSubtask {
                    date_key: DAY.into(),
                    goal_id: "g1".into(),
                },
                goal("g2"),
                NavItem::AddSubtask {
                    date_key: DAY.into(),
                    goal_id: "g2".into(),
                },
                NavItem::AddGoal {
                    date_key: DAY.into()
                },
            ]
        );
    }

    #[test]
    fn first_input_focuses_origin() {
        let mut m = model(&[3, 2]);
        assert_eq!(m.focus(), Focus::Unfocused);
        assert_eq!(m.current(), None);
        m.move_horizontal(1);
        assert_eq!(m.focus(), Focus::Focused { column: 0, item: 0 });

        let mut m = model(&[3, 2]);
        m.move_vertical(-1);
        assert_eq!(m.focus(), Focus::Focused { column: 0, item: 0 });
    }

    #[test]
    fn vertical_moves_clamp() {
        let mut m = model(&[3]);
        m.move_vertical(1);
        m.move_vertical(-1);
        assert!(m.is_focused(0, 0));
        for _ in 0..5 {
            m.move_vertical(1);
        }
        assert!(m.is_focused(0, 2));
    }

    #[test]
    fn horizontal_moves_clamp_column_and_item() {
        let mut m = model(&[4, 2, 5]);
        for _ in 0..4 {
            m.move_vertical(1);
        }
        assert!(m.is_focused(0, 3));
        m.move_horizontal(-1);
        assert!(m.is_focused(0, 3));
        m.move_horizontal(1);
        assert!(m.is_focused(1, 1));
        m.move_horizontal(1);
        assert!(m.is_focused(2, 1));
        m.move_horizontal(1);
        assert!(m.is_focused(2, 1));
    }

    #[test]
    fn sync_preserves_or_clamps() {
        let mut m = model(&[4, 4]);
        m.move_vertical(1);
        m.move_horizontal(1);
        for _ in 0..3 {
            m.move_vertical(1);
        }
        assert!(m.is_focused(1, 3));

        m.sync(vec![vec![goal("a"); 4], vec![goal("b"); 5]]);
        assert!(m.is_focused(1, 3));

        m.sync(vec![vec![goal("a"); 2]]);
        assert!(m.is_focused(0, 1));

        m.sync(Vec::new());
        assert_eq!(m.focus(), Focus::Unfocused);
    }

    #[test]
    fn empty_layout_ignores_movement() {
        let mut m = FocusModel::default();
        m.move_vertical(1);
        m.move_horizontal(1);
        assert_eq!(m.focus(), Focus::Unfocused);
    }

    #[test]
    fn activation_depends_on_kind() {
        assert_eq!(
            goal("g1").activation(),
            Activation::ToggleExpand {
                date_key: DAY.into(),
                goal_id: "g1".into()
            }
        );
        assert_eq!(
            NavItem::AddGoal {
                date_key: DAY.into()
            }
            .activation(),
            Activation::OpenGoalInput {
                date_key: DAY.into()
            }
        );
        assert_eq!(
            NavItem::Subtask {
                date_key: DAY.into(),
                goal_id: "g1".into(),
                subtask_id: "s1".into()
            }
            .activation(),
            Activation::ToggleSubtask {
                date_key: DAY.into(),
                goal_id: "g1".into(),
                subtask_id: "s1".into()
            }
        );
    }

    #[test]
    fn focus_item_finds_rendered_rows() {
        let mut m = model(&[2, 3]);
        assert!(m.focus_item(&goal("2")));
        assert!(m.is_focused(1, 2));
        assert!(!m.focus_item(&goal("missing")));
        assert!(m.is_focused(1, 2));
    }
}
