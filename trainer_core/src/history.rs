//! Session history listing and CSV export.

use crate::{Progress, Result, Session};
use std::fs::File;
use std::path::Path;

/// A row in the CSV export, one per logged step
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    session_id: String,
    plan_id: &'a str,
    day_id: &'a str,
    status: &'static str,
    started_at: String,
    completed_at: Option<String>,
    exercise_id: &'a str,
    #[serde(rename = "type")]
    entry_type: &'static str,
    item_index: usize,
    set_index: usize,
    rep_index: usize,
    step_index: usize,
    target_sec: u32,
    actual_sec: u32,
    logged_at: String,
}

/// All sessions, most recently started first
pub fn sessions_newest_first(progress: &Progress) -> Vec<&Session> {
    let mut sessions: Vec<_> = progress.sessions.values().collect();
    sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    sessions
}

/// Write every logged step to a CSV file, replacing it if present.
///
/// Returns the number of rows written.
pub fn export_csv(progress: &Progress, csv_path: &Path) -> Result<usize> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(csv_path)?;
    let mut writer = csv::Writer::from_writer(file);
    let mut rows = 0;

    for session in sessions_newest_first(progress) {
        for entry in &session.log {
            writer.serialize(CsvRow {
                session_id: session.id.to_string(),
                plan_id: &session.plan_id,
                day_id: &session.day_id,
                status: session.status.as_str(),
                started_at: session.started_at.to_rfc3339(),
                completed_at: session.completed_at.map(|t| t.to_rfc3339()),
                exercise_id: &entry.exercise_id,
                entry_type: entry.entry_type.as_str(),
                item_index: entry.item_index,
                set_index: entry.set_index,
                rep_index: entry.rep_index,
                step_index: entry.step_index,
                target_sec: entry.target_sec,
                actual_sec: entry.actual_sec,
                logged_at: entry.timestamp.to_rfc3339(),
            })?;
            rows += 1;
        }
    }

    writer.flush()?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;

    tracing::info!("Exported {} log rows to {:?}", rows, csv_path);
    Ok(rows)
}
