#![forbid(unsafe_code)]

//! Core domain model and workout runner for the Trainer system.
//!
//! This crate provides:
//! - Domain types (plans, items, steps, log entries, sessions)
//! - Plan loading, normalization and user ordering
//! - Step expansion and the runner state machine
//! - Persistence (progress store, history export)

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod clock;
pub mod steps;
pub mod runner;
pub mod plan;
pub mod plan_order;
pub mod storage;
pub mod progress;
pub mod history;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use clock::{Clock, ManualClock, SystemClock};
pub use steps::{build_steps, count_steps, step_counts_by_item};
pub use runner::{RunnerEngine, RunnerEvents, RunnerState, Snapshot};
pub use plan::{get_default_plan, load_plan, parse_plan, resolve_plan};
pub use plan_order::{apply_plan_order, DropPosition, PlanOrderStore};
pub use progress::{ProgressStore, SessionRecorder};
pub use history::{export_csv, sessions_newest_first};
