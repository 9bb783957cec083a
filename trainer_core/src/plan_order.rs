//! Per-day exercise ordering chosen by the user.
//!
//! Orders are stored per plan as `day id -> [exercise id]` and re-applied
//! every time the plan is loaded. Reordering a day changes its step
//! sequence, so a runner must be rebuilt afterwards.

use crate::storage::{load_json_or_default, save_json_atomic};
use crate::{ExerciseItem, Plan, Result};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;

/// Saved orders for one plan: day id -> exercise ids
pub type DayOrders = BTreeMap<String, Vec<String>>;

type OrderDocument = BTreeMap<String, DayOrders>;

/// Where a dragged item lands relative to its target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DropPosition {
    #[default]
    Before,
    After,
}

/// File-backed store of plan orders
pub struct PlanOrderStore {
    path: PathBuf,
}

impl PlanOrderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Saved orders for a plan (empty when none were saved)
    pub fn load(&self, plan_id: &str) -> Result<DayOrders> {
        let mut doc: OrderDocument = load_json_or_default(&self.path)?;
        Ok(doc.remove(plan_id).unwrap_or_default())
    }

    /// Persist the order of one day
    pub fn save(&self, plan_id: &str, day_id: &str, order: Vec<String>) -> Result<()> {
        let mut doc: OrderDocument = load_json_or_default(&self.path)?;
        doc.entry(plan_id.to_string())
            .or_default()
            .insert(day_id.to_string(), order);
        save_json_atomic(&self.path, &doc)?;
        tracing::debug!("Saved order for {}/{}", plan_id, day_id);
        Ok(())
    }
}

/// Reorder every day of `plan` that has a non-empty saved order
pub fn apply_plan_order(plan: &mut Plan, orders: &DayOrders) {
    for day in &mut plan.days {
        if let Some(order) = orders.get(&day.id).filter(|o| !o.is_empty()) {
            day.items = reorder_items(std::mem::take(&mut day.items), order);
        }
    }
}

/// Arrange items by exercise id.
///
/// Each id in `order` takes the next unused item with that id; items not
/// claimed by the order follow in their original sequence.
pub fn reorder_items(items: Vec<ExerciseItem>, order: &[String]) -> Vec<ExerciseItem> {
    let mut buckets: HashMap<&str, VecDeque<usize>> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        buckets
            .entry(item.exercise_id.as_str())
            .or_default()
            .push_back(index);
    }

    let mut sequence = Vec::with_capacity(items.len());
    let mut claimed = vec![false; items.len()];
    for exercise_id in order {
        if let Some(index) = buckets
            .get_mut(exercise_id.as_str())
            .and_then(|b| b.pop_front())
        {
            claimed[index] = true;
            sequence.push(index);
        }
    }
    sequence.extend((0..items.len()).filter(|i| !claimed[*i]));

    let mut slots: Vec<Option<ExerciseItem>> = items.into_iter().map(Some).collect();
    sequence
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

/// Index an item moved from `from` should take once removed from the list
pub fn insert_index(from: usize, to: usize, position: DropPosition) -> usize {
    let mut index = match position {
        DropPosition::Before => to,
        DropPosition::After => to + 1,
    };
    if from < index {
        index -= 1;
    }
    index
}

/// Move one item before or after another.
///
/// Returns false (leaving `items` untouched) when either index is out of
/// range or the move would not change the order.
pub fn move_item(
    items: &mut Vec<ExerciseItem>,
    from: usize,
    to: usize,
    position: DropPosition,
) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    let target = insert_index(from, to, position).min(items.len() - 1);
    if target == from {
        return false;
    }

    let moved = items.remove(from);
    items.insert(target, moved);
    true
}

/// Exercise ids of a day in their current order
pub fn exercise_order(items: &[ExerciseItem]) -> Vec<String> {
    items.iter().map(|i| i.exercise_id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Day, ItemType, PlanMeta};

    fn items(ids: &[&str]) -> Vec<ExerciseItem> {
        ids.iter()
            .map(|id| ExerciseItem::new(*id, ItemType::Routine, 1))
            .collect()
    }

    fn ids(items: &[ExerciseItem]) -> Vec<&str> {
        items.iter().map(|i| i.exercise_id.as_str()).collect()
    }

    fn order(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reorder_follows_order_then_leftovers() {
        let result = reorder_items(items(&["a", "b", "c", "d"]), &order(&["c", "a", "zzz"]));
        assert_eq!(ids(&result), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_reorder_handles_duplicate_ids() {
        let mut source = items(&["a", "b", "a"]);
        source[0].sets = 1;
        source[2].sets = 2;

        let result = reorder_items(source, &order(&["b", "a"]));

        assert_eq!(ids(&result), vec!["b", "a", "a"]);
        assert_eq!(result[1].sets, 1);
        assert_eq!(result[2].sets, 2);
    }

    #[test]
    fn test_insert_index() {
        assert_eq!(insert_index(0, 2, DropPosition::Before), 1);
        assert_eq!(insert_index(0, 2, DropPosition::After), 2);
        assert_eq!(insert_index(3, 1, DropPosition::Before), 1);
        assert_eq!(insert_index(3, 1, DropPosition::After), 2);
    }

    #[test]
    fn test_move_item() {
        let mut list = items(&["a", "b", "c", "d"]);

        assert!(move_item(&mut list, 0, 3, DropPosition::After));
        assert_eq!(ids(&list), vec!["b", "c", "d", "a"]);

        assert!(move_item(&mut list, 3, 0, DropPosition::Before));
        assert_eq!(ids(&list), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_move_item_noops() {
        let mut list = items(&["a", "b", "c"]);

        assert!(!move_item(&mut list, 0, 5, DropPosition::Before));
        assert!(!move_item(&mut list, 1, 1, DropPosition::Before));
        assert!(!move_item(&mut list, 0, 1, DropPosition::Before));
        assert_eq!(ids(&list), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_store_roundtrip_and_apply() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = PlanOrderStore::new(temp_dir.path().join("plan_order.json"));

        store.save("week1", "day-a", order(&["c", "b", "a"])).unwrap();
        store.save("other", "day-a", order(&["b"])).unwrap();

        let orders = store.load("week1").unwrap();
        let mut plan = Plan {
            id: "week1".into(),
            name: "Week 1".into(),
            meta: PlanMeta::default(),
            days: vec![
                Day {
                    id: "day-a".into(),
                    name: "A".into(),
                    items: items(&["a", "b", "c"]),
                },
                Day {
                    id: "day-b".into(),
                    name: "B".into(),
                    items: items(&["x", "y"]),
                },
            ],
        };
        apply_plan_order(&mut plan, &orders);

        assert_eq!(ids(&plan.days[0].items), vec!["c", "b", "a"]);
        assert_eq!(ids(&plan.days[1].items), vec!["x", "y"]);
        assert!(store.load("missing").unwrap().is_empty());
    }
}
