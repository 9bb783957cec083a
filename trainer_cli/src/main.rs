mod render;
mod run;

use clap::{Parser, Subcommand};
use render::{badge, format_date, format_exercise, item_detail, PoseAssets};
use run::{run_day, RunOptions};
use std::path::PathBuf;
use std::time::Duration;
use trainer_core::plan_order::{exercise_order, move_item};
use trainer_core::*;

#[derive(Parser)]
#[command(name = "trainer")]
#[command(about = "Personal workout plan runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Load this plan file instead of the configured one
    #[arg(long, global = true)]
    plan: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List the plan's days (default)
    Plan,

    /// Show one day's exercises
    Show {
        /// Day id
        day: String,
    },

    /// Run a day step by step
    Run {
        /// Day id
        day: String,

        /// Start at this exercise (1-based)
        #[arg(long)]
        item: Option<usize>,

        /// Complete every step and skip every rest (for testing)
        #[arg(long)]
        auto_complete: bool,

        /// Rest after every rep of rep-based exercises
        #[arg(long)]
        rest_between_reps: Option<u32>,
    },

    /// List past sessions
    History,

    /// Export every logged step to CSV
    Export {
        /// Output file
        path: PathBuf,
    },

    /// Move an exercise within a day (1-based positions)
    Reorder {
        /// Day id
        day: String,
        /// Exercise to move
        from: usize,
        /// Exercise to drop it next to
        to: usize,
        /// Drop after the target instead of before it
        #[arg(long)]
        after: bool,
    },

    /// Clear all sessions and completion records
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    trainer_core::logging::init_with_level(trainer_core::logging::level_for_verbosity(cli.verbose));

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let data = config::DataConfig { data_dir };
    let plan_path = cli.plan.clone().or_else(|| config.plan.path.clone());

    match cli.command.unwrap_or(Commands::Plan) {
        Commands::Plan => cmd_plan(&data, plan_path),
        Commands::Show { day } => cmd_show(&data, plan_path, &day),
        Commands::Run {
            day,
            item,
            auto_complete,
            rest_between_reps,
        } => {
            let opts = RunOptions {
                start_item: item,
                auto_complete,
                rest_between_reps_sec: rest_between_reps.or(config.runner.rest_between_reps_sec),
                tick_interval: Duration::from_millis(config.runner.tick_interval_ms),
                assets: PoseAssets::new(config.assets.dir.clone()),
            };
            cmd_run(&data, plan_path, &day, opts)
        }
        Commands::History => cmd_history(&data),
        Commands::Export { path } => cmd_export(&data, &path),
        Commands::Reorder {
            day,
            from,
            to,
            after,
        } => cmd_reorder(&data, plan_path, &day, from, to, after),
        Commands::Reset => cmd_reset(&data),
    }
}

/// Load the plan and apply the user's saved exercise order
fn load_plan_with_order(data: &config::DataConfig, plan_path: Option<PathBuf>) -> Result<Plan> {
    let mut plan = match resolve_plan(plan_path.as_deref()) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Plan load error");
            eprintln!("Unable to load workout plan. Please verify the plan file.");
            return Err(e);
        }
    };
    let orders = PlanOrderStore::new(data.plan_order_path()).load(&plan.id)?;
    apply_plan_order(&mut plan, &orders);
    Ok(plan)
}

fn find_day<'a>(plan: &'a Plan, day_id: &str) -> Result<&'a Day> {
    plan.day(day_id).ok_or_else(|| Error::UnknownDay {
        day: day_id.to_string(),
        available: plan
            .days
            .iter()
            .map(|d| d.id.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn cmd_plan(data: &config::DataConfig, plan_path: Option<PathBuf>) -> Result<()> {
    let plan = load_plan_with_order(data, plan_path)?;
    let store = ProgressStore::open(data.progress_path())?;

    println!("\n{}", plan.name);
    if !plan.meta.intensity.is_empty() {
        println!("{}", plan.meta.intensity);
    }
    println!();

    for day in &plan.days {
        println!(
            "  {:<28} {:>2} exercises  [{}]",
            day.name,
            day.items.len(),
            badge(store.is_day_completed(&day.id))
        );
        println!("    id: {}", day.id);
    }
    println!();
    Ok(())
}

fn cmd_show(data: &config::DataConfig, plan_path: Option<PathBuf>, day_id: &str) -> Result<()> {
    let plan = load_plan_with_order(data, plan_path)?;
    let day = find_day(&plan, day_id)?;
    let store = ProgressStore::open(data.progress_path())?;
    let counts = step_counts_by_item(day);

    println!("\n{}", day.name);
    println!(
        "{} exercises • {} steps  [{}]",
        day.items.len(),
        count_steps(day),
        if store.is_day_completed(&day.id) {
            "Completed"
        } else {
            "Not completed"
        }
    );
    if let Some(latest) = store.latest_session_for_day(&day.id) {
        println!(
            "Latest session: {} ({}, {} steps logged)",
            format_date(latest.started_at),
            latest.status,
            latest.log.len()
        );
    }
    println!("\nExercises");

    for (index, (item, steps)) in day.items.iter().zip(&counts).enumerate() {
        println!(
            "  {}. {:<24} {}  ({} steps)",
            index + 1,
            format_exercise(&item.exercise_id),
            item_detail(item),
            steps
        );
        if let Some(notes) = &item.notes {
            println!("     {}", notes);
        }
    }
    println!();
    Ok(())
}

fn cmd_run(
    data: &config::DataConfig,
    plan_path: Option<PathBuf>,
    day_id: &str,
    opts: RunOptions,
) -> Result<()> {
    let plan = load_plan_with_order(data, plan_path)?;
    let day = find_day(&plan, day_id)?;
    let store = ProgressStore::open(data.progress_path())?;
    run_day(&plan, day, store, opts)
}

fn cmd_history(data: &config::DataConfig) -> Result<()> {
    let store = ProgressStore::open(data.progress_path())?;
    let sessions = sessions_newest_first(store.progress());

    println!("\nHistory\n");
    if sessions.is_empty() {
        println!("No sessions yet.");
        return Ok(());
    }

    for session in sessions {
        println!("  {}", session.day_id);
        println!("    Started: {}", format_date(session.started_at));
        match session.completed_at {
            Some(completed) => println!("    Completed: {}", format_date(completed)),
            None => println!("    Completed: {}", session.status),
        }
        println!("    Logs: {}", session.log.len());
    }
    println!();
    Ok(())
}

fn cmd_export(data: &config::DataConfig, path: &std::path::Path) -> Result<()> {
    let store = ProgressStore::open(data.progress_path())?;
    let rows = export_csv(store.progress(), path)?;
    println!("✓ Exported {} logged steps", rows);
    println!("  CSV: {}", path.display());
    Ok(())
}

fn cmd_reorder(
    data: &config::DataConfig,
    plan_path: Option<PathBuf>,
    day_id: &str,
    from: usize,
    to: usize,
    after: bool,
) -> Result<()> {
    let mut plan = load_plan_with_order(data, plan_path)?;
    find_day(&plan, day_id)?;
    let plan_id = plan.id.clone();
    let Some(day) = plan.day_mut(day_id) else {
        return Ok(());
    };

    let position = if after {
        DropPosition::After
    } else {
        DropPosition::Before
    };
    let moved = match (from.checked_sub(1), to.checked_sub(1)) {
        (Some(from), Some(to)) => move_item(&mut day.items, from, to, position),
        _ => false,
    };
    if !moved {
        println!("Order unchanged.");
        return Ok(());
    }

    PlanOrderStore::new(data.plan_order_path()).save(
        &plan_id,
        &day.id,
        exercise_order(&day.items),
    )?;

    println!("✓ New order for {}:", day.name);
    for (index, item) in day.items.iter().enumerate() {
        println!("  {}. {}", index + 1, format_exercise(&item.exercise_id));
    }
    Ok(())
}

fn cmd_reset(data: &config::DataConfig) -> Result<()> {
    let mut store = ProgressStore::open(data.progress_path())?;
    store.reset()?;
    println!("✓ Progress reset");
    Ok(())
}
