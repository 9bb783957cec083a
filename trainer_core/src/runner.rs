//! Workout runner: a pause-aware timer state machine over a day's steps.
//!
//! The runner is driven entirely by its caller:
//! - `tick()` is polled on a fixed cadence to detect rest expiry
//! - user actions call the mutators (`complete_current`, `pause`, `undo_last`, ...)
//! - `snapshot()` is the only read surface for rendering
//!
//! Completion and done notifications go to a [`RunnerEvents`] handler owned by
//! the runner. Invalid calls (completing while resting, resuming while running,
//! jumping to an item without steps) are silent no-ops.

use crate::clock::{Clock, SystemClock};
use crate::steps::build_steps;
use crate::{ExerciseItem, ItemType, LogEntry, Step};
use serde::Serialize;
use std::collections::BTreeSet;

/// Runner state
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunnerState {
    /// The user is performing the current step
    Active,
    /// Rest timer is counting toward the step's `rest_sec`
    Rest,
    /// Every step is finished
    DoneDay,
}

impl RunnerState {
    pub fn label(&self) -> &'static str {
        match self {
            RunnerState::Active => "ACTIVE",
            RunnerState::Rest => "REST",
            RunnerState::DoneDay => "DONE",
        }
    }
}

/// Receiver for the runner's completion events
pub trait RunnerEvents {
    /// Called once per completed step, including reps auto-completed with their set
    fn on_log(&mut self, entry: LogEntry);

    /// Called when the last step finishes
    fn on_done(&mut self);
}

impl RunnerEvents for () {
    fn on_log(&mut self, _entry: LogEntry) {}
    fn on_done(&mut self) {}
}

/// Read-only view of the runner at one instant
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub state: RunnerState,
    pub step: Option<Step>,
    pub target_sec: Option<u32>,
    pub elapsed_sec: i64,
    pub remaining_sec: Option<i64>,
    pub is_overtime: bool,
    pub progress: f64,
    pub total_steps: usize,
    pub current_index: usize,
    pub completed_steps: usize,
    pub paused: bool,
}

/// Everything a completion can change, restored verbatim on undo
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Phase {
    state: RunnerState,
    current_index: usize,
    started_ms: i64,
    current_target_sec: Option<u32>,
    last_rep_actual_sec: Option<u32>,
    paused: bool,
    paused_at_ms: Option<i64>,
    paused_duration_ms: i64,
}

#[derive(Clone, Debug)]
struct UndoEntry {
    previous: Phase,
    completed_indexes: Vec<usize>,
}

/// The workout runner for one day
pub struct RunnerEngine<E, C = SystemClock> {
    steps: Vec<Step>,
    phase: Phase,
    completed: BTreeSet<usize>,
    undo_stack: Vec<UndoEntry>,
    events: E,
    clock: C,
}

impl<E: RunnerEvents> RunnerEngine<E, SystemClock> {
    /// Create a runner on wall-clock time
    pub fn new(items: &[ExerciseItem], rest_between_reps_sec: Option<u32>, events: E) -> Self {
        Self::with_clock(items, rest_between_reps_sec, events, SystemClock)
    }
}

impl<E: RunnerEvents, C: Clock> RunnerEngine<E, C> {
    /// Create a runner reading time from `clock`
    pub fn with_clock(
        items: &[ExerciseItem],
        rest_between_reps_sec: Option<u32>,
        events: E,
        clock: C,
    ) -> Self {
        let steps = build_steps(items, rest_between_reps_sec);
        let (state, current_target_sec) = match steps.first() {
            Some(first) => (RunnerState::Active, target_for(first, None)),
            None => (RunnerState::DoneDay, None),
        };

        tracing::debug!("Runner created with {} steps", steps.len());

        let started_ms = clock.now_ms();
        Self {
            steps,
            phase: Phase {
                state,
                current_index: 0,
                started_ms,
                current_target_sec,
                last_rep_actual_sec: None,
                paused: false,
                paused_at_ms: None,
                paused_duration_ms: 0,
            },
            completed: BTreeSet::new(),
            undo_stack: Vec::new(),
            events,
            clock,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.phase.state
    }

    pub fn current_index(&self) -> usize {
        self.phase.current_index
    }

    pub fn is_paused(&self) -> bool {
        self.phase.paused
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    /// Build a consistent view of the current phase
    pub fn snapshot(&self) -> Snapshot {
        let step = self.steps.get(self.phase.current_index).cloned();
        let elapsed_sec = self.elapsed_sec();
        let target_sec = match self.phase.state {
            RunnerState::Active => self.phase.current_target_sec,
            RunnerState::Rest => Some(step.as_ref().map(|s| s.rest_sec).unwrap_or(0)),
            RunnerState::DoneDay => None,
        };
        let remaining_sec = target_sec.map(|t| i64::from(t) - elapsed_sec);
        let completed_steps = self.completed.len();
        let progress = if self.steps.is_empty() {
            100.0
        } else {
            (completed_steps as f64 / self.steps.len() as f64 * 100.0).min(100.0)
        };

        Snapshot {
            state: self.phase.state,
            step,
            target_sec,
            elapsed_sec,
            remaining_sec,
            is_overtime: remaining_sec.is_some_and(|r| r < 0),
            progress,
            total_steps: self.steps.len(),
            current_index: self.phase.current_index,
            completed_steps,
            paused: self.phase.paused,
        }
    }

    /// Advance out of REST once the rest period has elapsed
    pub fn tick(&mut self) {
        if self.phase.state != RunnerState::Rest || self.phase.paused {
            return;
        }
        let Some(step) = self.steps.get(self.phase.current_index) else {
            return;
        };
        if self.elapsed_sec() >= i64::from(step.rest_sec) {
            self.advance();
        }
    }

    /// Complete the current step (and, for reps, the rest of its set)
    pub fn complete_current(&mut self) {
        if self.phase.state != RunnerState::Active || self.phase.paused {
            return;
        }
        let Some(step) = self.steps.get(self.phase.current_index).cloned() else {
            return;
        };

        let previous = self.phase;
        let elapsed = u32::try_from(self.elapsed_sec().max(0)).unwrap_or(u32::MAX);
        let actual_sec = match step.step_type {
            ItemType::Routine => 0,
            ItemType::Reps | ItemType::Hold => elapsed,
        };
        if matches!(step.step_type, ItemType::Reps | ItemType::Hold) {
            self.phase.last_rep_actual_sec = Some(if actual_sec > 0 {
                actual_sec
            } else {
                step.target_sec
            });
        }

        let first = self.phase.current_index;
        let last = match step.step_type {
            ItemType::Reps => self.last_index_in_set(first),
            ItemType::Hold | ItemType::Routine => first,
        };

        let timestamp = self.clock.now();
        let mut completed_indexes = Vec::with_capacity(last - first + 1);
        for index in first..=last {
            let logged = &self.steps[index];
            let entry = LogEntry {
                exercise_id: logged.exercise_id.clone(),
                entry_type: logged.step_type,
                item_index: logged.item_index,
                set_index: logged.set_index,
                rep_index: logged.rep_index,
                step_index: index,
                target_sec: match logged.step_type {
                    ItemType::Hold => logged.duration_sec,
                    ItemType::Reps | ItemType::Routine => logged.target_sec,
                },
                actual_sec,
                timestamp,
            };
            self.completed.insert(index);
            completed_indexes.push(index);
            self.events.on_log(entry);
        }

        tracing::debug!(
            "Completed steps {}..={} ({} {}, actual {}s)",
            first,
            last,
            step.step_type,
            step.exercise_id,
            actual_sec
        );

        self.undo_stack.push(UndoEntry {
            previous,
            completed_indexes,
        });

        self.phase.current_index = last;
        if step.rest_sec > 0 {
            self.phase.state = RunnerState::Rest;
            self.start_phase();
        } else {
            self.advance();
        }
    }

    /// End REST early
    pub fn skip_rest(&mut self) {
        if self.phase.state != RunnerState::Rest || self.phase.paused {
            return;
        }
        self.advance();
    }

    /// Restart the phase clock without changing state (clears pause)
    pub fn reset_phase(&mut self) {
        self.start_phase();
    }

    pub fn pause(&mut self) {
        if self.phase.paused {
            return;
        }
        self.phase.paused = true;
        self.phase.paused_at_ms = Some(self.clock.now_ms());
    }

    pub fn resume(&mut self) {
        if !self.phase.paused {
            return;
        }
        self.phase.paused = false;
        if let Some(paused_at) = self.phase.paused_at_ms.take() {
            self.phase.paused_duration_ms += self.clock.now_ms() - paused_at;
        }
    }

    /// Back to the first step with all tracking cleared
    pub fn restart(&mut self) {
        self.phase.current_index = 0;
        self.phase.last_rep_actual_sec = None;
        match self.steps.first() {
            Some(first) => {
                self.phase.state = RunnerState::Active;
                self.phase.current_target_sec = target_for(first, None);
            }
            None => {
                self.phase.state = RunnerState::DoneDay;
                self.phase.current_target_sec = None;
            }
        }
        self.completed.clear();
        self.undo_stack.clear();
        self.start_phase();
        tracing::debug!("Runner restarted");
    }

    /// Jump to the first step of an item. Returns false if the item has no steps.
    pub fn jump_to_item(&mut self, item_index: usize) -> bool {
        let Some(target) = self.steps.iter().position(|s| s.item_index == item_index) else {
            return false;
        };

        self.phase.current_index = target;
        self.phase.last_rep_actual_sec = None;
        self.phase.state = RunnerState::Active;
        self.phase.current_target_sec = target_for(&self.steps[target], None);
        self.undo_stack.clear();
        self.start_phase();

        tracing::debug!("Jumped to item {} (step {})", item_index, target);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Roll back the most recent completion.
    ///
    /// Returns the step indexes whose log entries the caller should retract,
    /// or `None` when there is nothing to undo.
    pub fn undo_last(&mut self) -> Option<Vec<usize>> {
        let entry = self.undo_stack.pop()?;
        for index in &entry.completed_indexes {
            self.completed.remove(index);
        }
        self.phase = entry.previous;

        tracing::debug!("Undid steps {:?}", entry.completed_indexes);
        Some(entry.completed_indexes)
    }

    fn advance(&mut self) {
        self.phase.current_index += 1;
        let Some(step) = self.steps.get(self.phase.current_index) else {
            self.phase.state = RunnerState::DoneDay;
            self.phase.current_target_sec = None;
            tracing::debug!("Day finished");
            self.events.on_done();
            return;
        };

        if step.rep_index == 0 {
            self.phase.last_rep_actual_sec = None;
        }
        self.phase.current_target_sec = target_for(step, self.phase.last_rep_actual_sec);
        self.phase.state = RunnerState::Active;
        self.start_phase();
    }

    fn start_phase(&mut self) {
        self.phase.started_ms = self.clock.now_ms();
        self.phase.paused = false;
        self.phase.paused_at_ms = None;
        self.phase.paused_duration_ms = 0;
    }

    fn elapsed_sec(&self) -> i64 {
        let now = match (self.phase.paused, self.phase.paused_at_ms) {
            (true, Some(at)) => at,
            _ => self.clock.now_ms(),
        };
        (now - self.phase.started_ms - self.phase.paused_duration_ms).div_euclid(1000)
    }

    fn last_index_in_set(&self, start: usize) -> usize {
        let anchor = &self.steps[start];
        let mut index = start;
        while let Some(next) = self.steps.get(index + 1) {
            if next.item_index != anchor.item_index || next.set_index != anchor.set_index {
                break;
            }
            index += 1;
        }
        index
    }
}

/// Target seconds for an ACTIVE step.
///
/// Later reps of a set default to the time actually taken on the previous rep.
fn target_for(step: &Step, last_rep_actual_sec: Option<u32>) -> Option<u32> {
    match step.step_type {
        ItemType::Routine => None,
        ItemType::Hold => Some(step.duration_sec),
        ItemType::Reps => match last_rep_actual_sec {
            Some(actual) if step.rep_index > 0 => Some(actual),
            _ => Some(step.target_sec),
        },
    }
}
