//! Drives a runner from the terminal.
//!
//! A reader thread forwards stdin lines over a channel; the main thread owns
//! the runner, waits up to one tick interval for a command, polls `tick()`
//! and redraws.

use crate::render::{PoseAssets, RunnerView};
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use trainer_core::{
    Day, Plan, ProgressStore, Result, RunnerEngine, RunnerState, SessionRecorder, SessionStatus,
};
use uuid::Uuid;

/// Options for one run of a day
pub struct RunOptions {
    /// 1-based item to start from
    pub start_item: Option<usize>,
    pub auto_complete: bool,
    pub rest_between_reps_sec: Option<u32>,
    pub tick_interval: Duration,
    pub assets: PoseAssets,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Complete,
    SkipRest,
    Pause,
    Resume,
    Undo,
    Jump(usize),
    Restart,
    Quit,
    Help,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let command = match parts.next().map(str::to_lowercase).as_deref() {
        None | Some("c") => Command::Complete,
        Some("s") => Command::SkipRest,
        Some("p") => Command::Pause,
        Some("r") => Command::Resume,
        Some("u") => Command::Undo,
        Some("j") => {
            let item = parts.next()?.parse::<usize>().ok()?;
            Command::Jump(item)
        }
        Some("x") => Command::Restart,
        Some("q") => Command::Quit,
        Some("?") | Some("h") => Command::Help,
        Some(_) => return None,
    };
    Some(command)
}

const HELP: &str = "Enter/c complete • s skip rest • p pause • r resume • u undo • j N jump to exercise N • x restart • q quit";

type Engine = RunnerEngine<SessionRecorder>;

/// Start a fresh session for `day` and run it until done or quit
pub fn run_day(plan: &Plan, day: &Day, mut store: ProgressStore, opts: RunOptions) -> Result<()> {
    let abandoned = store.abandon_open_sessions(&day.id, None)?;
    if abandoned > 0 {
        tracing::info!("Abandoned {} unfinished session(s) for {}", abandoned, day.id);
    }
    let session_id = store.create_session(&plan.id, &day.id)?;

    let mut engine = RunnerEngine::new(
        &day.items,
        opts.rest_between_reps_sec,
        SessionRecorder::new(store, session_id),
    );

    if let Some(item) = opts.start_item {
        jump(&mut engine, item)?;
    }

    let interactive = !opts.auto_complete && io::stdout().is_terminal();
    let mut view = RunnerView::new(opts.assets, interactive);

    println!("{} • {}", plan.name, day.name);

    if opts.auto_complete {
        auto_complete(&mut engine, &mut view, day)?;
    } else {
        println!("{}", HELP);
        let commands = spawn_stdin_reader();
        interactive_loop(&mut engine, &mut view, day, &commands, opts.tick_interval, interactive)?;
    }

    finish(&mut engine)
}

fn auto_complete(engine: &mut Engine, view: &mut RunnerView, day: &Day) -> Result<()> {
    draw(engine, view, day, false)?;
    loop {
        match engine.state() {
            RunnerState::Active => engine.complete_current(),
            RunnerState::Rest => engine.skip_rest(),
            RunnerState::DoneDay => break,
        }
        draw(engine, view, day, false)?;
    }
    Ok(())
}

fn interactive_loop(
    engine: &mut Engine,
    view: &mut RunnerView,
    day: &Day,
    commands: &Receiver<String>,
    tick_interval: Duration,
    interactive: bool,
) -> Result<()> {
    draw(engine, view, day, interactive)?;
    loop {
        match commands.recv_timeout(tick_interval) {
            Ok(line) => match parse_command(&line) {
                Some(Command::Quit) => break,
                Some(command) => apply(engine, view, command)?,
                None => println!("\nUnknown command '{}'. {}", line.trim(), HELP),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        engine.tick();
        draw(engine, view, day, interactive)?;
    }
    if interactive {
        println!();
    }
    Ok(())
}

fn apply(engine: &mut Engine, view: &mut RunnerView, command: Command) -> Result<()> {
    let session_id = engine.events().session_id();
    match command {
        Command::Complete => engine.complete_current(),
        Command::SkipRest => engine.skip_rest(),
        Command::Pause => {
            if !engine.is_paused() && engine.state() != RunnerState::DoneDay {
                engine.pause();
                engine.events_mut().store_mut().pause_session(session_id)?;
            }
        }
        Command::Resume => {
            if engine.is_paused() {
                engine.resume();
                engine.events_mut().store_mut().resume_session(session_id)?;
            }
        }
        Command::Undo => match engine.undo_last() {
            Some(step_indexes) => {
                let recorder = engine.events_mut();
                recorder.retract(&step_indexes)?;
                if recorder
                    .session()
                    .is_some_and(|s| s.status == SessionStatus::Paused)
                {
                    recorder.store_mut().resume_session(session_id)?;
                }
                view.invalidate();
            }
            None => println!("\nNothing to undo."),
        },
        Command::Jump(item) => {
            jump(engine, item)?;
            view.invalidate();
        }
        Command::Restart => {
            let new_id = replace_session(engine.events_mut(), session_id)?;
            engine.restart();
            view.invalidate();
            println!("\nRestarted.");
            tracing::info!("Session {} abandoned, continuing as {}", session_id, new_id);
        }
        Command::Help => println!("\n{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

/// Abandon `session_id` and point the recorder at a fresh session for the same day
fn replace_session(recorder: &mut SessionRecorder, session_id: Uuid) -> Result<Uuid> {
    recorder.store_mut().abandon_session(session_id)?;
    start_new_session(recorder)
}

/// Point the recorder at a fresh session for the current session's day
fn start_new_session(recorder: &mut SessionRecorder) -> Result<Uuid> {
    let (plan_id, day_id) = recorder
        .session()
        .map(|s| (s.plan_id.clone(), s.day_id.clone()))
        .unwrap_or_default();
    let new_id = recorder.store_mut().create_session(&plan_id, &day_id)?;
    recorder.switch_session(new_id);
    Ok(new_id)
}

/// Jump to a 1-based item and make sure the session is running
fn jump(engine: &mut Engine, item: usize) -> Result<()> {
    let jumped = item
        .checked_sub(1)
        .is_some_and(|index| engine.jump_to_item(index));
    if !jumped {
        println!("Exercise {} has no steps.", item);
        return Ok(());
    }

    engine.resume();
    let recorder = engine.events_mut();
    match recorder.session().map(|s| s.status) {
        // A finished session stays completed; further work goes to a new one
        Some(SessionStatus::Completed) => {
            let new_id = start_new_session(recorder)?;
            tracing::info!("Day already completed, recording into session {}", new_id);
        }
        Some(SessionStatus::Paused) => {
            let session_id = recorder.session_id();
            recorder.store_mut().resume_session(session_id)?;
        }
        _ => {}
    }
    Ok(())
}

fn draw(engine: &Engine, view: &mut RunnerView, day: &Day, interactive: bool) -> Result<()> {
    let snapshot = engine.snapshot();
    let mut stdout = io::stdout().lock();
    for line in view.update(&snapshot, day) {
        if interactive {
            write!(stdout, "\r\x1b[K")?;
        }
        writeln!(stdout, "{}", line)?;
    }
    if interactive && snapshot.state != RunnerState::DoneDay {
        write!(stdout, "\r\x1b[K{}", view.status_line(&snapshot))?;
    }
    stdout.flush()?;
    Ok(())
}

/// Leave an unfinished session paused so it shows up in history
fn finish(engine: &mut Engine) -> Result<()> {
    let session_id = engine.events().session_id();
    let Some(session) = engine.events().session() else {
        return Ok(());
    };
    let status = session.status;
    let logged = session.log.len();

    if status == SessionStatus::InProgress {
        engine.events_mut().store_mut().pause_session(session_id)?;
    }
    println!(
        "Session {} ({} steps logged, {})",
        session_id,
        logged,
        engine
            .events()
            .session()
            .map(|s| s.status.as_str())
            .unwrap_or("unknown")
    );
    Ok(())
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(""), Some(Command::Complete));
        assert_eq!(parse_command("  C "), Some(Command::Complete));
        assert_eq!(parse_command("s"), Some(Command::SkipRest));
        assert_eq!(parse_command("j 3"), Some(Command::Jump(3)));
        assert_eq!(parse_command("j"), None);
        assert_eq!(parse_command("j x"), None);
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("dance"), None);
    }
}
