use chrono::{Utc, Weekday};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type GoalId = String;

/// Goals filed per date key, each list in display order.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct GoalStore {
    days: BTreeMap<String, Vec<Goal>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Goal {
    #[serde(deserialize_with = "lenient_id")]
    pub id: GoalId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// Kept for data compatibility; nothing expands it into instances.
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Subtask {
    #[serde(deserialize_with = "lenient_id")]
    pub id: GoalId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Recurrence {
    #[serde(rename = "type")]
    pub kind: RecurrenceKind,
    /// Weekdays numbered from Sunday = 0.
    #[serde(default)]
    pub days: BTreeSet<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("no goals stored for {0}")]
    DateNotFound(String),
    #[error("goal not found: {0}")]
    GoalNotFound(String),
    #[error("subtask not found: {0}")]
    SubtaskNotFound(String),
    #[error("title must not be empty")]
    EmptyTitle,
}

impl Goal {
    pub fn new(id: GoalId, title: impl Into<String>, recurrence: Option<Recurrence>) -> Self {
        Goal {
            id,
            title: title.into(),
            completed: false,
            subtasks: Vec::new(),
            recurrence,
        }
    }

    pub fn find_subtask(&self, subtask_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }

    fn subtask_mut(&mut self, subtask_id: &str) -> Result<&mut Subtask, StoreError> {
        self.subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .ok_or_else(|| StoreError::SubtaskNotFound(subtask_id.to_string()))
    }
}

impl Recurrence {
    pub fn daily() -> Self {
        Recurrence {
            kind: RecurrenceKind::Daily,
            days: BTreeSet::new(),
        }
    }

    pub fn weekly(days: impl IntoIterator<Item = Weekday>) -> Self {
        Recurrence {
            kind: RecurrenceKind::Weekly,
            days: days
                .into_iter()
                .map(|d| d.num_days_from_sunday() as u8)
                .collect(),
        }
    }
}

impl GoalStore {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Goals for a date key; absent keys read as an empty day.
    pub fn goals_on(&self, date_key: &str) -> &[Goal] {
        self.days.get(date_key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn days(&self) -> impl DoubleEndedIterator<Item = (&str, &[Goal])> {
        self.days.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn find_goal(&self, date_key: &str, goal_id: &str) -> Option<&Goal> {
        self.goals_on(date_key).iter().find(|g| g.id == goal_id)
    }

    pub fn goal_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    /// Appends a goal, creating the day's list on first use. The new goal is
    /// always the last element of its list.
    pub fn add_goal(&mut self, date_key: &str, mut goal: Goal) -> Result<&Goal, StoreError> {
        goal.title = non_empty(&goal.title)?;
        let list = self.days.entry(date_key.to_string()).or_default();
        list.push(goal);
        Ok(&list[list.len() - 1])
    }

    pub fn update_goal(
        &mut self,
        date_key: &str,
        goal_id: &str,
        title: &str,
    ) -> Result<(), StoreError> {
        let title = non_empty(title)?;
        self.goal_mut(date_key, goal_id)?.title = title;
        Ok(())
    }

    /// Flips completion and returns the new state. Subtasks are untouched.
    pub fn toggle_goal(&mut self, date_key: &str, goal_id: &str) -> Result<bool, StoreError> {
        let goal = self.goal_mut(date_key, goal_id)?;
        goal.completed = !goal.completed;
        Ok(goal.completed)
    }

    pub fn delete_goal(&mut self, date_key: &str, goal_id: &str) -> Result<Goal, StoreError> {
        let list = self.list_mut(date_key)?;
        let idx = position(list, goal_id)?;
        Ok(list.remove(idx))
    }

    pub fn add_subtask(
        &mut self,
        date_key: &str,
        goal_id: &str,
        subtask: Subtask,
    ) -> Result<(), StoreError> {
        let title = non_empty(&subtask.title)?;
        let goal = self.goal_mut(date_key, goal_id)?;
        goal.subtasks.push(Subtask { title, ..subtask });
        Ok(())
    }

    pub fn toggle_subtask(
        &mut self,
        date_key: &str,
        goal_id: &str,
        subtask_id: &str,
    ) -> Result<bool, StoreError> {
        let subtask = self.goal_mut(date_key, goal_id)?.subtask_mut(subtask_id)?;
        subtask.completed = !subtask.completed;
        Ok(subtask.completed)
    }

    pub fn update_subtask(
        &mut self,
        date_key: &str,
        goal_id: &str,
        subtask_id: &str,
        title: &str,
    ) -> Result<(), StoreError> {
        let title = non_empty(title)?;
        self.goal_mut(date_key, goal_id)?
            .subtask_mut(subtask_id)?
            .title = title;
        Ok(())
    }

    pub fn delete_subtask(
        &mut self,
        date_key: &str,
        goal_id: &str,
        subtask_id: &str,
    ) -> Result<Subtask, StoreError> {
        let goal = self.goal_mut(date_key, goal_id)?;
        let idx = goal
            .subtasks
            .iter()
            .position(|s| s.id == subtask_id)
            .ok_or_else(|| StoreError::SubtaskNotFound(subtask_id.to_string()))?;
        Ok(goal.subtasks.remove(idx))
    }

    /// Splices the goal out and reinserts it at `new_index`, an index into
    /// the list as it stands after removal. Indexes past the end append.
    pub fn reorder_goals(
        &mut self,
        date_key: &str,
        goal_id: &str,
        new_index: usize,
    ) -> Result<(), StoreError> {
        let list = self.list_mut(date_key)?;
        let current = position(list, goal_id)?;
        if current == new_index {
            return Ok(());
        }
        let goal = list.remove(current);
        let target = new_index.min(list.len());
        list.insert(target, goal);
        Ok(())
    }

    /// Transfers ownership of a goal to another day, appending it there.
    pub fn move_goal(
        &mut self,
        from_key: &str,
        to_key: &str,
        goal_id: &str,
    ) -> Result<(), StoreError> {
        let source = self.list_mut(from_key)?;
        let idx = position(source, goal_id)?;
        let goal = source.remove(idx);
        self.days.entry(to_key.to_string()).or_default().push(goal);
        Ok(())
    }

    /// Appends incoming goals whose id is not already present on the same
    /// day. Existing goals are never overwritten. Returns how many were added.
    pub fn merge(&mut self, incoming: GoalStore) -> usize {
        let mut added = 0;
        for (date_key, goals) in incoming.days {
            let list = self.days.entry(date_key).or_default();
            for goal in goals {
                if list.iter().any(|g| g.id == goal.id) {
                    continue;
                }
                list.push(goal);
                added += 1;
            }
        }
        added
    }

    /// A fresh id derived from the clock, unique among every goal and
    /// subtask currently stored.
    pub fn next_id(&self) -> GoalId {
        loop {
            let candidate = generate_id();
            if !self.contains_id(&candidate) {
                return candidate;
            }
        }
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.days.values().flatten().any(|g| {
            g.id == id || g.subtasks.iter().any(|s| s.id == id)
        })
    }

    fn list_mut(&mut self, date_key: &str) -> Result<&mut Vec<Goal>, StoreError> {
        self.days
            .get_mut(date_key)
            .ok_or_else(|| StoreError::DateNotFound(date_key.to_string()))
    }

    fn goal_mut(&mut self, date_key: &str, goal_id: &str) -> Result<&mut Goal, StoreError> {
        self.list_mut(date_key)?
            .iter_mut()
            .find(|g| g.id == goal_id)
            .ok_or_else(|| StoreError::GoalNotFound(goal_id.to_string()))
    }
}

impl Subtask {
    pub fn new(id: GoalId, title: impl Into<String>) -> Self {
        Subtask {
            id,
            title: title.into(),
            completed: false,
        }
    }
}

fn position(list: &[Goal], goal_id: &str) -> Result<usize, StoreError> {
    list.iter()
        .position(|g| g.id == goal_id)
        .ok_or_else(|| StoreError::GoalNotFound(goal_id.to_string()))
}

fn non_empty(title: &str) -> Result<String, StoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(StoreError::EmptyTitle)
    } else {
        Ok(trimmed.to_string())
    }
}

fn generate_id() -> GoalId {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(char::from)
        .collect();
    format!("{}{}", Utc::now().timestamp_millis(), suffix.to_lowercase())
}

/// Ids written by older exports may be bare numbers.
fn lenient_id<'de, D>(deserializer: D) -> Result<GoalId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
    }
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    const DAY: &str = "2024-06-01";
    const OTHER: &str = "2024-06-02";

    fn store_with(titles: &[&str]) -> GoalStore {
        let mut store = GoalStore::default();
        for title in titles {
            store
                .add_goal(DAY, Goal::new(title.to_lowercase(), *title, None))
                .unwrap();
        }
        store
    }

    fn has_day(store: &GoalStore, key: &str) -> bool {
        store.days().any(|(k, _)| k == key)
    }

    fn titles(store: &GoalStore, key: &str) -> Vec<String> {
        store.goals_on(key).iter().map(|g| g.title.clone()).collect()
    }

    #[test]
    fn add_toggle_delete_scenario() {
        let mut store = GoalStore::default();
        let id = store.next_id();
        let added = store
            .add_goal(DAY, Goal::new(id.clone(), "Buy milk", None))
            .unwrap();
        assert_eq!(added.title, "Buy milk");
        assert_eq!(store.goals_on(DAY).len(), 1);
        assert!(!store.goals_on(DAY)[0].completed);

        assert_eq!(store.toggle_goal(DAY, &id), Ok(true));
        assert!(store.goals_on(DAY)[0].completed);

        store.delete_goal(DAY, &id).unwrap();
        assert!(has_day(&store, DAY));
        assert!(store.goals_on(DAY).is_empty());
    }

    #[test]
    fn subtask_toggle_leaves_goal_incomplete() {
        let mut store = store_with(&["Plan"]);
        store
            .add_subtask(DAY, "plan", Subtask::new("s1".into(), "step 1"))
            .unwrap();
        assert_eq!(store.toggle_subtask(DAY, "plan", "s1"), Ok(true));
        let goal = store.find_goal(DAY, "plan").unwrap();
        assert_eq!(goal.subtasks.len(), 1);
        assert!(goal.subtasks[0].completed);
        assert!(!goal.completed);
    }

    #[test]
    fn goal_toggle_leaves_subtasks_alone() {
        let mut store = store_with(&["Plan"]);
        store
            .add_subtask(DAY, "plan", Subtask::new("s1".into(), "step 1"))
            .unwrap();
        store
            .add_subtask(DAY, "plan", Subtask::new("s2".into(), "step 2"))
            .unwrap();
        store.toggle_subtask(DAY, "plan", "s2").unwrap();

        assert_eq!(store.toggle_goal(DAY, "plan"), Ok(true));
        let flags = |store: &GoalStore| {
            store
                .find_goal(DAY, "plan")
                .unwrap()
                .subtasks
                .iter()
                .map(|s| s.completed)
                .collect::<Vec<_>>()
        };
        assert_eq!(flags(&store), vec![false, true]);
        assert_eq!(store.toggle_goal(DAY, "plan"), Ok(false));
        assert_eq!(flags(&store), vec![false, true]);
    }

    #[test]
    fn subtask_rename_keeps_position_and_state() {
        let mut store = store_with(&["Plan"]);
        store
            .add_subtask(DAY, "plan", Subtask::new("s1".into(), "step 1"))
            .unwrap();
        store
            .add_subtask(DAY, "plan", Subtask::new("s2".into(), "step 2"))
            .unwrap();
        store.toggle_subtask(DAY, "plan", "s1").unwrap();

        store.update_subtask(DAY, "plan", "s1", "  first step ").unwrap();
        let goal = store.find_goal(DAY, "plan").unwrap();
        assert_eq!(goal.subtasks[0].id, "s1");
        assert_eq!(goal.subtasks[0].title, "first step");
        assert!(goal.subtasks[0].completed);
        assert_eq!(goal.subtasks[1].title, "step 2");
        assert!(store.update_subtask(DAY, "plan", "s2", "   ").is_err());
        assert_eq!(store.find_goal(DAY, "plan").unwrap().subtasks[1].title, "step 2");
    }

    #[test]
    fn empty_titles_are_rejected_and_trimmed() {
        let mut store = GoalStore::default();
        assert_eq!(
            store.add_goal(DAY, Goal::new("a".into(), "   ", None)).err(),
            Some(StoreError::EmptyTitle)
        );
        assert!(!has_day(&store, DAY));
        store
            .add_goal(DAY, Goal::new("a".into(), "  padded  ", None))
            .unwrap();
        assert_eq!(titles(&store, DAY), vec!["padded"]);
        assert_eq!(store.update_goal(DAY, "a", ""), Err(StoreError::EmptyTitle));
    }

    #[test]
    fn missing_targets_leave_store_unchanged() {
        let mut store = store_with(&["A"]);
        let before = store.clone();
        assert!(store.toggle_goal(OTHER, "a").is_err());
        assert!(store.update_goal(DAY, "zz", "x").is_err());
        assert!(store.toggle_subtask(DAY, "a", "zz").is_err());
        assert!(store.update_subtask(DAY, "a", "zz", "x").is_err());
        assert!(store.delete_subtask(DAY, "zz", "s").is_err());
        assert!(store.move_goal(OTHER, DAY, "a").is_err());
        assert!(store.reorder_goals(DAY, "zz", 0).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn delete_twice_is_idempotent() {
        let mut store = store_with(&["A", "B"]);
        store.delete_goal(DAY, "a").unwrap();
        let after_first = store.clone();
        assert_eq!(
            store.delete_goal(DAY, "a"),
            Err(StoreError::GoalNotFound("a".into()))
        );
        assert_eq!(store, after_first);
    }

    #[test]
    fn reorder_uses_splice_semantics() {
        let mut store = store_with(&["A", "B", "C"]);
        store.reorder_goals(DAY, "a", 2).unwrap();
        assert_eq!(titles(&store, DAY), vec!["B", "C", "A"]);

        store.reorder_goals(DAY, "a", 0).unwrap();
        assert_eq!(titles(&store, DAY), vec!["A", "B", "C"]);

        store.reorder_goals(DAY, "b", 1).unwrap();
        assert_eq!(titles(&store, DAY), vec!["A", "B", "C"]);

        store.reorder_goals(DAY, "c", 0).unwrap();
        assert_eq!(titles(&store, DAY), vec!["C", "A", "B"]);

        store.reorder_goals(DAY, "c", 99).unwrap();
        assert_eq!(titles(&store, DAY), vec!["A", "B", "C"]);
    }

    #[test]
    fn move_round_trip_lands_on_tail() {
        let mut store = store_with(&["A", "B", "C"]);
        store.move_goal(DAY, OTHER, "a").unwrap();
        assert_eq!(titles(&store, DAY), vec!["B", "C"]);
        assert_eq!(titles(&store, OTHER), vec!["A"]);

        store.move_goal(OTHER, DAY, "a").unwrap();
        assert_eq!(titles(&store, DAY), vec!["B", "C", "A"]);
        assert!(store.goals_on(OTHER).is_empty());
        assert!(has_day(&store, OTHER));
    }

    #[test]
    fn merge_skips_duplicate_ids_per_day() {
        let mut store = store_with(&["A"]);
        let incoming: GoalStore = serde_json::from_str(
            r#"{
                "2024-06-01": [
                    {"id":"a","title":"changed","completed":true,"subtasks":[]},
                    {"id":"n","title":"New","completed":false,"subtasks":[]}
                ],
                "2024-06-02": [{"id":"a","title":"Same id, other day"}]
            }"#,
        )
        .unwrap();
        assert_eq!(store.merge(incoming), 2);
        assert_eq!(titles(&store, DAY), vec!["A", "New"]);
        assert!(!store.find_goal(DAY, "a").unwrap().completed);
        assert_eq!(titles(&store, OTHER), vec!["Same id, other day"]);
    }

    #[test]
    fn ids_are_unique_across_a_session() {
        let mut store = GoalStore::default();
        let mut seen = HashSet::new();
        for n in 0..200 {
            let id = store.next_id();
            assert!(seen.insert(id.clone()), "duplicate id {}", id);
            store
                .add_goal(DAY, Goal::new(id, format!("goal {}", n), None))
                .unwrap();
        }
    }

    #[test]
    fn serialized_shape_matches_exports() {
        let mut store = GoalStore::default();
        store
            .add_goal(
                DAY,
                Goal::new("1".into(), "Run", Some(Recurrence::weekly([Weekday::Mon, Weekday::Sun]))),
            )
            .unwrap();
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "2024-06-01": [{
                    "id": "1",
                    "title": "Run",
                    "completed": false,
                    "subtasks": [],
                    "recurrence": {"type": "weekly", "days": [0, 1]}
                }]
            })
        );
    }

    #[test]
    fn numeric_ids_and_missing_fields_are_accepted() {
        let store: GoalStore =
            serde_json::from_str(r#"{"2024-06-01":[{"id":1717200000000,"title":"Old"}]}"#)
                .unwrap();
        let goal = &store.goals_on(DAY)[0];
        assert_eq!(goal.id, "1717200000000");
        assert!(goal.subtasks.is_empty());
        assert_eq!(goal.recurrence, None);
    }
}
