//! Step expansion: flattens a day's items into the linear sequence of
//! steps the runner advances through.
//!
//! Reps items produce one step per repetition per set, hold and routine
//! items produce one step per set. Expansion is pure, so the step counts
//! used for progress display always agree with what the runner executes.

use crate::{Day, ExerciseItem, ItemType, Step};

/// Expand items into steps.
///
/// `rest_between_reps_sec` replaces the rest of every reps-type step when
/// supplied; other item types always keep their own `rest_sec`.
pub fn build_steps(items: &[ExerciseItem], rest_between_reps_sec: Option<u32>) -> Vec<Step> {
    let mut steps = Vec::new();

    for (item_index, item) in items.iter().enumerate() {
        let rest_sec = match (item.item_type, rest_between_reps_sec) {
            (ItemType::Reps, Some(override_sec)) => override_sec,
            _ => item.rest_sec,
        };
        let target_sec = item.target_sec.unwrap_or(0);
        let duration_sec = item
            .duration_sec
            .filter(|d| *d > 0)
            .unwrap_or(target_sec);

        for set_index in 0..item.set_count() as usize {
            for rep_index in 0..item.reps_in_set(set_index) as usize {
                steps.push(Step {
                    exercise_id: item.exercise_id.clone(),
                    step_type: item.item_type,
                    item_index,
                    set_index,
                    rep_index,
                    rest_sec,
                    target_sec,
                    duration_sec,
                });
            }
        }
    }

    steps
}

/// Total number of steps in a day
pub fn count_steps(day: &Day) -> usize {
    build_steps(&day.items, None).len()
}

/// Number of steps contributed by each item, indexed like `day.items`
pub fn step_counts_by_item(day: &Day) -> Vec<usize> {
    let mut counts = vec![0; day.items.len()];
    for step in build_steps(&day.items, None) {
        counts[step.item_index] += 1;
    }
    counts
}
