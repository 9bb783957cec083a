//! Plan loading and normalization.
//!
//! Two document shapes are accepted:
//! - an already normalized plan with a `days` array
//! - an authoring format with `workouts[].blocks[].items[]`, which is
//!   flattened into days and has each item's type inferred from its fields

use crate::{Day, Error, ExerciseItem, ItemType, Plan, PlanMeta, Reps, RepValue, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_PLAN_JSON: &str = include_str!("../data/week1.json");

/// Cached built-in plan, parsed once
static DEFAULT_PLAN: Lazy<Plan> = Lazy::new(|| {
    parse_plan(DEFAULT_PLAN_JSON).expect("embedded plan data/week1.json is valid")
});

/// Get a reference to the built-in plan
pub fn get_default_plan() -> &'static Plan {
    &DEFAULT_PLAN
}

/// Load the plan at `path`, or the built-in plan when no path is configured
pub fn resolve_plan(path: Option<&Path>) -> Result<Plan> {
    match path {
        Some(path) => load_plan(path),
        None => Ok(get_default_plan().clone()),
    }
}

/// Read and normalize a plan file
pub fn load_plan(path: &Path) -> Result<Plan> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Plan(format!("Failed to read plan {:?}: {}", path, e)))?;
    let plan = parse_plan(&contents)?;
    tracing::info!(
        "Loaded plan '{}' with {} days from {:?}",
        plan.id,
        plan.days.len(),
        path
    );
    Ok(plan)
}

/// Parse and normalize a plan document
pub fn parse_plan(contents: &str) -> Result<Plan> {
    let value: serde_json::Value = serde_json::from_str(contents)
        .map_err(|e| Error::Plan(format!("Plan is not valid JSON: {}", e)))?;

    if value.get("days").is_some() {
        return serde_json::from_value::<Plan>(value)
            .map_err(|e| Error::Plan(format!("Invalid plan: {}", e)));
    }

    let raw: RawPlan = serde_json::from_value(value)
        .map_err(|e| Error::Plan(format!("Invalid plan: {}", e)))?;
    Ok(raw.normalize())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlan {
    plan_id: Option<String>,
    id: Option<String>,
    title: Option<String>,
    name: Option<String>,
    global_rules: Option<RawGlobalRules>,
    #[serde(default)]
    workouts: Vec<RawWorkout>,
}

#[derive(Debug, Deserialize)]
struct RawGlobalRules {
    intensity: Option<RawIntensity>,
}

#[derive(Debug, Deserialize)]
struct RawIntensity {
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWorkout {
    workout_id: Option<String>,
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    blocks: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    exercise_id: String,
    name: Option<String>,
    sets: Option<u32>,
    rest_sec: Option<u32>,
    notes: Option<String>,
    #[serde(rename = "targetRIR")]
    target_rir: Option<serde_json::Value>,
    duration_min: Option<f64>,
    duration_sec_range: Option<[f64; 2]>,
    reps_range: Option<[u32; 2]>,
    reps: Option<Reps>,
}

impl RawPlan {
    fn normalize(self) -> Plan {
        let days = self
            .workouts
            .into_iter()
            .enumerate()
            .map(|(index, workout)| workout.normalize(index))
            .collect();

        Plan {
            id: self.plan_id.or(self.id).unwrap_or_else(|| "plan".into()),
            name: self
                .title
                .or(self.name)
                .unwrap_or_else(|| "Training Plan".into()),
            meta: PlanMeta {
                intensity: self
                    .global_rules
                    .and_then(|r| r.intensity)
                    .and_then(|i| i.notes)
                    .unwrap_or_default(),
            },
            days,
        }
    }
}

impl RawWorkout {
    fn normalize(self, index: usize) -> Day {
        let id = self
            .workout_id
            .or(self.id)
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| format!("day-{}", index + 1));

        Day {
            id,
            name: self.name.unwrap_or_else(|| "Workout".into()),
            items: self
                .blocks
                .into_iter()
                .flat_map(|b| b.items)
                .map(RawItem::normalize)
                .collect(),
        }
    }
}

impl RawItem {
    fn normalize(self) -> ExerciseItem {
        let mut item = ExerciseItem::new(self.exercise_id, ItemType::Reps, self.sets.unwrap_or(1));
        item.rest_sec = self.rest_sec.unwrap_or(0);
        item.name = self.name;
        item.notes = self.notes;
        item.target_rir = self.target_rir;

        if let Some(minutes) = self.duration_min {
            item.item_type = ItemType::Hold;
            item.duration_sec = Some(round_secs(minutes * 60.0));
        } else if let Some([min, max]) = self.duration_sec_range {
            item.item_type = ItemType::Hold;
            item.duration_sec = Some(round_secs((min + max) / 2.0));
            item.duration_sec_range = Some([round_secs(min), round_secs(max)]);
        } else if let Some(range) = self.reps_range {
            item.reps = Some(Reps::Single(RepValue::Count(range[1])));
            item.reps_range = Some(range);
        } else {
            item.reps = Some(self.reps.unwrap_or(Reps::Single(RepValue::Count(1))));
        }

        item
    }
}

fn round_secs(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::count_steps;

    #[test]
    fn test_default_plan_parses() {
        let plan = get_default_plan();

        assert_eq!(plan.id, "week1");
        assert_eq!(plan.name, "Week 1: Foundations");
        assert!(plan.meta.intensity.contains("reserve"));
        assert_eq!(plan.days.len(), 2);
        assert!(plan.days.iter().all(|d| count_steps(d) > 0));
    }

    #[test]
    fn test_normalizes_item_types() {
        let plan = get_default_plan();
        let day = plan.day("day-a").unwrap();

        let warmup = &day.items[0];
        assert_eq!(warmup.item_type, ItemType::Hold);
        assert_eq!(warmup.duration_sec, Some(120));

        let push_up = &day.items[1];
        assert_eq!(push_up.item_type, ItemType::Reps);
        assert_eq!(push_up.reps_in_set(0), 12);
        assert_eq!(push_up.reps_range, Some([8, 12]));
        assert_eq!(push_up.rest_sec, 90);

        let plank = &day.items[3];
        assert_eq!(plank.item_type, ItemType::Hold);
        assert_eq!(plank.duration_sec, Some(38));
    }

    #[test]
    fn test_workout_fallbacks() {
        let json = r#"{
            "workouts": [
                { "name": "Mobility", "blocks": [ { "items": [ { "exerciseId": "cat-cow" } ] } ] },
                { "blocks": [] }
            ]
        }"#;

        let plan = parse_plan(json).unwrap();

        assert_eq!(plan.id, "plan");
        assert_eq!(plan.name, "Training Plan");
        assert_eq!(plan.meta.intensity, "");
        assert_eq!(plan.days[0].id, "Mobility");
        assert_eq!(plan.days[1].id, "day-2");
        assert_eq!(plan.days[1].name, "Workout");

        let item = &plan.days[0].items[0];
        assert_eq!(item.sets, 1);
        assert_eq!(item.reps_in_set(0), 1);
    }

    #[test]
    fn test_normalized_plan_passes_through() {
        let json = r#"{
            "id": "custom",
            "name": "Custom",
            "days": [
                {
                    "id": "d1",
                    "name": "Day 1",
                    "items": [
                        { "exerciseId": "stretch", "type": "routine", "sets": 1 },
                        { "exerciseId": "dip", "type": "reps", "sets": 2, "reps": [5, 4], "targetSec": 3 }
                    ]
                }
            ]
        }"#;

        let plan = parse_plan(json).unwrap();
        let day = plan.day("d1").unwrap();

        assert_eq!(day.items[0].item_type, ItemType::Routine);
        assert_eq!(day.items[1].target_sec, Some(3));
        assert_eq!(count_steps(day), 10);
    }

    #[test]
    fn test_malformed_plan_is_plan_error() {
        let result = parse_plan("{ not json");
        assert!(matches!(result, Err(Error::Plan(_))));

        let result = parse_plan(r#"{ "days": "nope" }"#);
        assert!(matches!(result, Err(Error::Plan(_))));
    }

    #[test]
    fn test_load_missing_file_is_plan_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = load_plan(&temp_dir.path().join("missing.json"));

        assert!(matches!(result, Err(Error::Plan(_))));
    }

    #[test]
    fn test_resolve_plan_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("plan.json");
        std::fs::write(&path, r#"{ "planId": "p2", "workouts": [] }"#).unwrap();

        let plan = resolve_plan(Some(&path)).unwrap();
        assert_eq!(plan.id, "p2");

        let default = resolve_plan(None).unwrap();
        assert_eq!(default.id, "week1");
    }
}
