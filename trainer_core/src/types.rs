//! Core domain types for the Trainer system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Plans, days and exercise items (the plan model)
//! - Steps derived from items (the runner's unit of work)
//! - Log entries emitted by the runner
//! - Sessions and the persisted progress document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Plan Model
// ============================================================================

/// How an exercise item is performed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Counted repetitions, one step per rep
    Reps,
    /// Timed hold, one step per set
    Hold,
    /// Untimed routine, one step per set
    Routine,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Reps => "reps",
            ItemType::Hold => "hold",
            ItemType::Routine => "routine",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reps value: a number or a sentinel such as `"max"`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RepValue {
    Count(u32),
    Text(String),
}

impl RepValue {
    pub fn count(&self) -> Option<u32> {
        match self {
            RepValue::Count(n) => Some(*n),
            RepValue::Text(_) => None,
        }
    }
}

/// Reps prescription, either shared by every set or given per set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Reps {
    PerSet(Vec<RepValue>),
    Single(RepValue),
}

impl Reps {
    /// Value prescribed for a given set, if any
    pub fn for_set(&self, set_index: usize) -> Option<&RepValue> {
        match self {
            Reps::PerSet(values) => values.get(set_index),
            Reps::Single(value) => Some(value),
        }
    }

    /// Number of repetitions for a set. Non-numeric or missing values count as one.
    pub fn count_for_set(&self, set_index: usize) -> u32 {
        self.for_set(set_index)
            .and_then(RepValue::count)
            .unwrap_or(1)
    }
}

/// One exercise entry in a day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseItem {
    pub exercise_id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default = "default_sets", deserialize_with = "sets_or_default")]
    pub sets: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<Reps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_sec: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rest_sec: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, rename = "targetRIR", skip_serializing_if = "Option::is_none")]
    pub target_rir: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec_range: Option<[u32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps_range: Option<[u32; 2]>,
}

fn default_sets() -> u32 {
    1
}

/// `"sets": null` reads as a single set
fn sets_or_default<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_else(default_sets))
}

/// Explicit `null` reads like a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ExerciseItem {
    /// Build a bare item of the given type (all optional fields empty)
    pub fn new(exercise_id: impl Into<String>, item_type: ItemType, sets: u32) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            item_type,
            sets,
            reps: None,
            duration_sec: None,
            target_sec: None,
            rest_sec: 0,
            name: None,
            notes: None,
            target_rir: None,
            duration_sec_range: None,
            reps_range: None,
        }
    }

    /// Effective set count; zero is treated as a single set
    pub fn set_count(&self) -> u32 {
        self.sets.max(1)
    }

    /// Number of repetitions performed in a set
    pub fn reps_in_set(&self, set_index: usize) -> u32 {
        match self.item_type {
            ItemType::Reps => self
                .reps
                .as_ref()
                .map(|r| r.count_for_set(set_index))
                .unwrap_or(1),
            ItemType::Hold | ItemType::Routine => 1,
        }
    }
}

/// One training session's definition
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Day {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<ExerciseItem>,
}

/// Free-form plan metadata shown on the home screen
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct PlanMeta {
    #[serde(default)]
    pub intensity: String,
}

/// A normalized training plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub meta: PlanMeta,
    #[serde(default)]
    pub days: Vec<Day>,
}

impl Plan {
    /// Find a day by id
    pub fn day(&self, day_id: &str) -> Option<&Day> {
        self.days.iter().find(|d| d.id == day_id)
    }

    pub fn day_mut(&mut self, day_id: &str) -> Option<&mut Day> {
        self.days.iter_mut().find(|d| d.id == day_id)
    }
}

// ============================================================================
// Runner Types
// ============================================================================

/// One atomic unit of work derived from an item
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub exercise_id: String,
    #[serde(rename = "type")]
    pub step_type: ItemType,
    pub item_index: usize,
    pub set_index: usize,
    pub rep_index: usize,
    pub rest_sec: u32,
    pub target_sec: u32,
    pub duration_sec: u32,
}

/// A completed step, emitted by the runner
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub exercise_id: String,
    #[serde(rename = "type")]
    pub entry_type: ItemType,
    pub item_index: usize,
    pub set_index: usize,
    pub rep_index: usize,
    pub step_index: usize,
    pub target_sec: u32,
    pub actual_sec: u32,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Session and Progress Types
// ============================================================================

/// Lifecycle status of a session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    InProgress,
    Paused,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    /// Whether the session can still receive work
    pub fn is_open(&self) -> bool {
        matches!(self, SessionStatus::InProgress | SessionStatus::Paused)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user attempt at a day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub plan_id: String,
    pub day_id: String,
    #[serde(default)]
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resumed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub abandoned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

/// Record of the session that completed a day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedDay {
    pub completed_at: DateTime<Utc>,
    pub session_id: Uuid,
}

/// The persisted progress document
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default)]
    pub completed_days: BTreeMap<String, CompletedDay>,
    #[serde(default)]
    pub sessions: BTreeMap<Uuid, Session>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reps_count_for_set() {
        let per_set = Reps::PerSet(vec![RepValue::Count(3), RepValue::Text("max".into())]);
        assert_eq!(per_set.count_for_set(0), 3);
        assert_eq!(per_set.count_for_set(1), 1);
        assert_eq!(per_set.count_for_set(2), 1);

        let single = Reps::Single(RepValue::Count(8));
        assert_eq!(single.count_for_set(5), 8);
    }

    #[test]
    fn test_item_parses_mixed_reps() {
        let json = r#"{
            "exerciseId": "push-up",
            "type": "reps",
            "sets": 3,
            "reps": [10, 8, "max"],
            "restSec": 60
        }"#;
        let item: ExerciseItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.item_type, ItemType::Reps);
        assert_eq!(item.reps_in_set(0), 10);
        assert_eq!(item.reps_in_set(2), 1);
        assert_eq!(item.rest_sec, 60);
    }

    #[test]
    fn test_item_defaults() {
        let json = r#"{ "exerciseId": "plank", "type": "hold", "sets": 0 }"#;
        let item: ExerciseItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.set_count(), 1);
        assert_eq!(item.rest_sec, 0);
        assert_eq!(item.reps_in_set(0), 1);
    }

    #[test]
    fn test_item_null_fields_use_defaults() {
        let json = r#"{ "exerciseId": "plank", "type": "hold", "sets": null, "restSec": null }"#;
        let item: ExerciseItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.sets, 1);
        assert_eq!(item.rest_sec, 0);
    }

    #[test]
    fn test_session_status_serializes_snake_case() {
        let json = serde_json::to_string(&SessionStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert!(SessionStatus::Paused.is_open());
        assert!(!SessionStatus::Abandoned.is_open());
    }
}
