//! Session and progress persistence.
//!
//! The progress document holds every session and the record of which days
//! have been completed. Every mutation is written through to disk
//! immediately. Operations on an unknown session id are silent no-ops.

use crate::runner::RunnerEvents;
use crate::storage::{load_json_or_default, save_json_atomic};
use crate::{CompletedDay, LogEntry, Progress, Result, Session, SessionStatus};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

/// File-backed progress document
pub struct ProgressStore {
    path: PathBuf,
    progress: Progress,
}

impl ProgressStore {
    /// Open the store, loading whatever is on disk
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let progress = load_json_or_default(&path)?;
        Ok(Self { path, progress })
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn session(&self, id: Uuid) -> Option<&Session> {
        self.progress.sessions.get(&id)
    }

    /// Whether a day has a completion record
    pub fn is_day_completed(&self, day_id: &str) -> bool {
        self.progress.completed_days.contains_key(day_id)
    }

    fn save(&self) -> Result<()> {
        save_json_atomic(&self.path, &self.progress)
    }

    /// Clear all sessions and completion records
    pub fn reset(&mut self) -> Result<()> {
        self.progress = Progress::default();
        self.save()?;
        tracing::info!("Progress reset");
        Ok(())
    }

    /// Start a new in-progress session for a day
    pub fn create_session(&mut self, plan_id: &str, day_id: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.progress.sessions.insert(
            id,
            Session {
                id,
                plan_id: plan_id.to_string(),
                day_id: day_id.to_string(),
                status: SessionStatus::InProgress,
                started_at: Utc::now(),
                completed_at: None,
                paused_at: None,
                resumed_at: None,
                abandoned_at: None,
                log: Vec::new(),
            },
        );
        self.save()?;
        tracing::info!("Started session {} for day {}", id, day_id);
        Ok(id)
    }

    pub fn add_log_entry(&mut self, id: Uuid, entry: LogEntry) -> Result<()> {
        let Some(session) = self.progress.sessions.get_mut(&id) else {
            return Ok(());
        };
        session.log.push(entry);
        self.save()
    }

    /// Drop log entries for the given step indexes (used by undo)
    pub fn remove_log_entries(&mut self, id: Uuid, step_indexes: &[usize]) -> Result<()> {
        let Some(session) = self.progress.sessions.get_mut(&id) else {
            return Ok(());
        };
        let before = session.log.len();
        session
            .log
            .retain(|entry| !step_indexes.contains(&entry.step_index));
        tracing::debug!(
            "Removed {} log entries from session {}",
            before - session.log.len(),
            id
        );
        self.save()
    }

    /// Mark a session completed and record its day as done
    pub fn complete_session(&mut self, id: Uuid) -> Result<()> {
        let Some(session) = self.progress.sessions.get_mut(&id) else {
            return Ok(());
        };
        let now = Utc::now();
        session.status = SessionStatus::Completed;
        session.completed_at = Some(now);
        session.paused_at = None;
        self.progress.completed_days.insert(
            session.day_id.clone(),
            CompletedDay {
                completed_at: now,
                session_id: id,
            },
        );
        tracing::info!("Completed session {} for day {}", id, session.day_id);
        self.save()
    }

    /// Put a completed session back in progress
    pub fn reopen_session(&mut self, id: Uuid) -> Result<()> {
        let Some(session) = self.progress.sessions.get_mut(&id) else {
            return Ok(());
        };
        session.status = SessionStatus::InProgress;
        session.completed_at = None;
        let day_id = session.day_id.clone();
        if self
            .progress
            .completed_days
            .get(&day_id)
            .is_some_and(|d| d.session_id == id)
        {
            self.progress.completed_days.remove(&day_id);
        }
        tracing::info!("Reopened session {}", id);
        self.save()
    }

    pub fn pause_session(&mut self, id: Uuid) -> Result<()> {
        self.update_session(id, |session, now| {
            session.status = SessionStatus::Paused;
            session.paused_at = Some(now);
        })
    }

    pub fn resume_session(&mut self, id: Uuid) -> Result<()> {
        self.update_session(id, |session, now| {
            session.status = SessionStatus::InProgress;
            session.resumed_at = Some(now);
            session.paused_at = None;
        })
    }

    pub fn abandon_session(&mut self, id: Uuid) -> Result<()> {
        self.update_session(id, |session, now| {
            session.status = SessionStatus::Abandoned;
            session.abandoned_at = Some(now);
        })
    }

    /// Abandon every unfinished session of a day except `keep`
    pub fn abandon_open_sessions(&mut self, day_id: &str, keep: Option<Uuid>) -> Result<usize> {
        let open: Vec<Uuid> = self
            .progress
            .sessions
            .values()
            .filter(|s| s.day_id == day_id && s.status.is_open() && Some(s.id) != keep)
            .map(|s| s.id)
            .collect();
        for id in &open {
            self.abandon_session(*id)?;
        }
        Ok(open.len())
    }

    /// Most recently started session for a day
    pub fn latest_session_for_day(&self, day_id: &str) -> Option<&Session> {
        self.progress
            .sessions
            .values()
            .filter(|s| s.day_id == day_id)
            .max_by_key(|s| s.started_at)
    }

    fn update_session<F>(&mut self, id: Uuid, f: F) -> Result<()>
    where
        F: FnOnce(&mut Session, DateTime<Utc>),
    {
        let Some(session) = self.progress.sessions.get_mut(&id) else {
            return Ok(());
        };
        f(session, Utc::now());
        tracing::debug!("Session {} is now {}", id, session.status);
        self.save()
    }
}

/// Runner event handler that writes completions into one session
pub struct SessionRecorder {
    store: ProgressStore,
    session_id: Uuid,
}

impl SessionRecorder {
    pub fn new(store: ProgressStore, session_id: Uuid) -> Self {
        Self { store, session_id }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProgressStore {
        &mut self.store
    }

    pub fn session(&self) -> Option<&Session> {
        self.store.session(self.session_id)
    }

    /// Point the recorder at a different session
    pub fn switch_session(&mut self, session_id: Uuid) {
        self.session_id = session_id;
    }

    /// Retract undone steps and reopen the session if it had completed
    pub fn retract(&mut self, step_indexes: &[usize]) -> Result<()> {
        self.store
            .remove_log_entries(self.session_id, step_indexes)?;
        if self
            .session()
            .is_some_and(|s| s.status == SessionStatus::Completed)
        {
            self.store.reopen_session(self.session_id)?;
        }
        Ok(())
    }
}

impl RunnerEvents for SessionRecorder {
    fn on_log(&mut self, entry: LogEntry) {
        if let Err(e) = self.store.add_log_entry(self.session_id, entry) {
            tracing::warn!("Failed to record log entry: {}", e);
        }
    }

    fn on_done(&mut self) {
        if let Err(e) = self.store.complete_session(self.session_id) {
            tracing::warn!("Failed to mark session complete: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::runner::RunnerEngine;
    use crate::{ExerciseItem, ItemType};

    fn entry(step_index: usize) -> LogEntry {
        LogEntry {
            exercise_id: "plank".into(),
            entry_type: ItemType::Hold,
            item_index: 0,
            set_index: step_index,
            rep_index: 0,
            step_index,
            target_sec: 30,
            actual_sec: 31,
            timestamp: Utc::now(),
        }
    }

    fn open_store(dir: &tempfile::TempDir) -> ProgressStore {
        ProgressStore::open(dir.path().join("progress.json")).unwrap()
    }

    #[test]
    fn test_session_lifecycle_persists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&temp_dir);

        let id = store.create_session("week1", "day-a").unwrap();
        store.add_log_entry(id, entry(0)).unwrap();
        store.add_log_entry(id, entry(1)).unwrap();
        store.pause_session(id).unwrap();
        assert_eq!(store.session(id).unwrap().status, SessionStatus::Paused);
        store.resume_session(id).unwrap();
        store.complete_session(id).unwrap();

        let reloaded = open_store(&temp_dir);
        let session = reloaded.session(id).unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.log.len(), 2);
        assert!(session.resumed_at.is_some());
        assert!(session.paused_at.is_none());
        assert!(reloaded.is_day_completed("day-a"));
        assert_eq!(reloaded.progress().completed_days["day-a"].session_id, id);
    }

    #[test]
    fn test_remove_log_entries_and_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&temp_dir);

        let id = store.create_session("week1", "day-a").unwrap();
        for i in 0..4 {
            store.add_log_entry(id, entry(i)).unwrap();
        }
        store.complete_session(id).unwrap();

        store.remove_log_entries(id, &[2, 3]).unwrap();
        store.reopen_session(id).unwrap();

        let session = store.session(id).unwrap();
        assert_eq!(
            session.log.iter().map(|e| e.step_index).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_eq!(session.status, SessionStatus::InProgress);
        assert!(session.completed_at.is_none());
        assert!(!store.is_day_completed("day-a"));
    }

    #[test]
    fn test_reopen_keeps_other_sessions_completion() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&temp_dir);

        let first = store.create_session("week1", "day-a").unwrap();
        store.complete_session(first).unwrap();
        let second = store.create_session("week1", "day-a").unwrap();
        store.reopen_session(second).unwrap();

        assert_eq!(store.progress().completed_days["day-a"].session_id, first);
    }

    #[test]
    fn test_unknown_session_is_noop() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&temp_dir);
        let missing = Uuid::new_v4();

        store.add_log_entry(missing, entry(0)).unwrap();
        store.complete_session(missing).unwrap();
        store.pause_session(missing).unwrap();

        assert!(store.progress().sessions.is_empty());
        assert!(store.progress().completed_days.is_empty());
    }

    #[test]
    fn test_abandon_open_sessions_and_latest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&temp_dir);

        let old = store.create_session("week1", "day-a").unwrap();
        let other_day = store.create_session("week1", "day-b").unwrap();
        let current = store.create_session("week1", "day-a").unwrap();

        let abandoned = store.abandon_open_sessions("day-a", Some(current)).unwrap();

        assert_eq!(abandoned, 1);
        assert_eq!(store.session(old).unwrap().status, SessionStatus::Abandoned);
        assert!(store.session(old).unwrap().abandoned_at.is_some());
        assert_eq!(store.session(other_day).unwrap().status, SessionStatus::InProgress);
        assert_eq!(store.latest_session_for_day("day-b").unwrap().id, other_day);
        assert!(store.latest_session_for_day("day-z").is_none());
    }

    #[test]
    fn test_reset_clears_everything() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&temp_dir);

        let id = store.create_session("week1", "day-a").unwrap();
        store.complete_session(id).unwrap();
        store.reset().unwrap();

        let reloaded = open_store(&temp_dir);
        assert!(reloaded.progress().sessions.is_empty());
        assert!(reloaded.progress().completed_days.is_empty());
    }

    #[test]
    fn test_corrupted_progress_starts_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("progress.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let store = ProgressStore::open(&path).unwrap();
        assert!(store.progress().sessions.is_empty());
    }

    #[test]
    fn test_recorder_follows_runner() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&temp_dir);
        let id = store.create_session("week1", "day-a").unwrap();

        let mut plank = ExerciseItem::new("plank", ItemType::Hold, 2);
        plank.duration_sec = Some(20);
        let clock = ManualClock::default();
        let mut engine = RunnerEngine::with_clock(
            &[plank],
            None,
            SessionRecorder::new(store, id),
            clock.clone(),
        );

        engine.complete_current();
        clock.advance_secs(21);
        engine.complete_current();
        assert_eq!(engine.events().session().unwrap().status, SessionStatus::Completed);
        assert_eq!(engine.events().session().unwrap().log.len(), 2);

        let undone = engine.undo_last().unwrap();
        engine.events_mut().retract(&undone).unwrap();

        let session = engine.events().session().unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(session.log.len(), 1);
        assert!(!engine.events().store().is_day_completed("day-a"));
    }
}
