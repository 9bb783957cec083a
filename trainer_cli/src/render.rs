//! Text rendering for the CLI screens and the live runner display.

use chrono::{DateTime, Local, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use trainer_core::{Day, ExerciseItem, ItemType, RepValue, Reps, RunnerState, Snapshot, Step};

/// Title-case an exercise id: `pike-push-up` -> `Pike Push Up`
pub fn format_exercise(id: &str) -> String {
    id.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_reps(reps: Option<&Reps>) -> String {
    match reps {
        None => String::new(),
        Some(Reps::Single(value)) => format_rep_value(value),
        Some(Reps::PerSet(values)) => values
            .iter()
            .map(format_rep_value)
            .collect::<Vec<_>>()
            .join(" • "),
    }
}

fn format_rep_value(value: &RepValue) -> String {
    match value {
        RepValue::Count(n) => format!("{} reps", n),
        RepValue::Text(text) => text.clone(),
    }
}

/// One-line summary of an item for the training detail screen
pub fn item_detail(item: &ExerciseItem) -> String {
    match item.item_type {
        ItemType::Hold => format!(
            "{} sets • {}s hold",
            item.sets,
            item.duration_sec.unwrap_or(0)
        ),
        ItemType::Routine => format!("{} set routine", item.sets),
        ItemType::Reps => format!("{} sets • {}", item.sets, format_reps(item.reps.as_ref())),
    }
}

/// Position of a step within its item, e.g. `Set 2 / 3 • Rep 4 / 10`
pub fn build_meta(step: &Step, day: &Day) -> String {
    let Some(item) = day.items.get(step.item_index) else {
        return String::new();
    };
    let set_total = item.set_count();
    match step.step_type {
        ItemType::Reps => format!(
            "Set {} / {} • Rep {} / {}",
            step.set_index + 1,
            set_total,
            step.rep_index + 1,
            item.reps_in_set(step.set_index)
        ),
        ItemType::Hold => format!("Set {} / {} • Hold", step.set_index + 1, set_total),
        ItemType::Routine => format!("Set {} / {} • Routine", step.set_index + 1, set_total),
    }
}

/// `MM:SS`, negative values shown as zero
pub fn format_timer(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub fn format_date(value: DateTime<Utc>) -> String {
    value.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn badge(completed: bool) -> &'static str {
    if completed {
        "Completed"
    } else {
        "Pending"
    }
}

/// Timer text and whether it shows overtime
pub fn timer_text(snapshot: &Snapshot) -> (String, bool) {
    match (snapshot.state, snapshot.step.as_ref()) {
        (RunnerState::DoneDay, _) | (_, None) => ("00:00".into(), false),
        (RunnerState::Rest, Some(_)) => (format_timer(snapshot.remaining_sec.unwrap_or(0)), false),
        (RunnerState::Active, Some(step)) if step.step_type == ItemType::Routine => {
            ("--:--".into(), false)
        }
        (RunnerState::Active, Some(_)) => {
            let remaining = snapshot.remaining_sec.unwrap_or(0);
            if remaining < 0 {
                (format!("+{}", format_timer(remaining.abs())), true)
            } else {
                (format_timer(remaining), false)
            }
        }
    }
}

/// Text progress bar. Counts the current step as underway, like the runner screen.
pub fn progress_bar(snapshot: &Snapshot, width: usize) -> String {
    let percent = if snapshot.state == RunnerState::DoneDay || snapshot.total_steps == 0 {
        100.0
    } else {
        (snapshot.progress + 100.0 / snapshot.total_steps as f64).min(100.0)
    };
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        ".".repeat(width.saturating_sub(filled)),
        percent
    )
}

/// What to show for an exercise pose
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pose {
    Images(PathBuf, PathBuf),
    Text(&'static str, &'static str),
}

/// Resolves pose images, warning once per exercise when they are missing
pub struct PoseAssets {
    dir: Option<PathBuf>,
    warned: HashSet<String>,
}

impl PoseAssets {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            warned: HashSet::new(),
        }
    }

    pub fn exercise(&mut self, exercise_id: &str) -> Pose {
        self.resolve(exercise_id, Pose::Text("POSE 1", "POSE 2"))
    }

    pub fn rest(&mut self) -> Pose {
        self.resolve("rest", Pose::Text("REST", "REST"))
    }

    fn resolve(&mut self, image_id: &str, fallback: Pose) -> Pose {
        let Some(dir) = &self.dir else {
            return fallback;
        };
        let pose1 = dir.join(format!("{}-p1.png", image_id));
        let pose2 = dir.join(format!("{}-p2.png", image_id));
        if pose1.is_file() && pose2.is_file() {
            return Pose::Images(pose1, pose2);
        }
        if self.warned.insert(image_id.to_string()) {
            tracing::warn!("Missing pose images for {}, using text fallback.", image_id);
        }
        fallback
    }

    pub fn warned_count(&self) -> usize {
        self.warned.len()
    }
}

fn pose_line(pose: &Pose) -> String {
    match pose {
        Pose::Images(a, b) => format!("Pose: {} | {}", a.display(), b.display()),
        Pose::Text(a, b) => format!("Pose: {} | {}", a, b),
    }
}

/// Runner screen. Produces a full block whenever the phase changes; on a
/// terminal the caller redraws `status_line` in place on every refresh.
pub struct RunnerView {
    assets: PoseAssets,
    interactive: bool,
    last_phase: Option<(RunnerState, usize, bool)>,
    announced_done: bool,
}

impl RunnerView {
    pub fn new(assets: PoseAssets, interactive: bool) -> Self {
        Self {
            assets,
            interactive,
            last_phase: None,
            announced_done: false,
        }
    }

    /// Forget the last phase so the next update prints a full block
    pub fn invalidate(&mut self) {
        self.last_phase = None;
        self.announced_done = false;
    }

    pub fn update(&mut self, snapshot: &Snapshot, day: &Day) -> Vec<String> {
        let mut lines = Vec::new();

        if snapshot.state == RunnerState::DoneDay {
            if !self.announced_done {
                self.announced_done = true;
                self.last_phase = None;
                lines.push(String::new());
                lines.push("Training completed".into());
                lines.push("Great work!".into());
                lines.push(format!("00:00  DONE  {}", progress_bar(snapshot, 20)));
            }
            return lines;
        }
        self.announced_done = false;

        let Some(step) = snapshot.step.as_ref() else {
            return lines;
        };
        let phase = (snapshot.state, snapshot.current_index, snapshot.paused);
        if self.last_phase != Some(phase) {
            self.last_phase = Some(phase);
            let pose = match snapshot.state {
                RunnerState::Rest => self.assets.rest(),
                _ => self.assets.exercise(&step.exercise_id),
            };
            lines.push(String::new());
            lines.push(format!(
                "{}  ({})",
                format_exercise(&step.exercise_id),
                build_meta(step, day)
            ));
            lines.push(pose_line(&pose));
            if step.step_type == ItemType::Routine && snapshot.state == RunnerState::Active {
                lines.push("Complete routine, then tap Complete.".into());
            }
            if !self.interactive {
                lines.push(self.status_line(snapshot));
            }
        }

        lines
    }

    /// Timer, state and progress on one line
    pub fn status_line(&self, snapshot: &Snapshot) -> String {
        let (timer, overtime) = timer_text(snapshot);
        let mut label = snapshot.state.label().to_string();
        if overtime {
            label.push_str(" (overtime)");
        }
        if snapshot.paused {
            label.push_str(" [paused]");
        }
        format!("{}  {}  {}", timer, label, progress_bar(snapshot, 20))
    }
}
