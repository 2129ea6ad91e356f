use std::path::PathBuf;

use clap::Parser;

use cutline_core::engine::validate::validate_round_history;
use cutline_core::model::format::TourFormat;
use cutline_core::model::state::TourState;
use cutline_sim::logging::init_logging;
use cutline_sim::runner::SimulationRunner;
use cutline_sim::settings::SimSettings;

/// Monte Carlo probability estimator for elimination tournaments.
#[derive(Debug, Parser)]
#[command(
    name = "cutline",
    author,
    version,
    about = "Replay a live tournament to estimate finish and cut probabilities"
)]
struct Cli {
    /// Path to the tournament format JSON file.
    #[arg(short, long, value_name = "FILE")]
    format: PathBuf,

    /// Path to the current tournament state JSON file.
    #[arg(short, long, value_name = "FILE")]
    state: PathBuf,

    /// Path to the simulation settings JSON file.
    #[arg(long, value_name = "FILE")]
    settings: PathBuf,

    /// Where to write the JSON report.
    #[arg(short, long, value_name = "FILE", default_value = "report.json")]
    output: PathBuf,

    /// Override the iteration budget.
    #[arg(long, value_name = "COUNT")]
    iterations: Option<u64>,

    /// Override the time budget in seconds.
    #[arg(long, value_name = "SECONDS")]
    time_limit: Option<f64>,

    /// Override the RNG seed for reproducible runs.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Exit after validating the inputs (no simulation is run).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = TourFormat::from_path(&cli.format)?;
    let state = TourState::from_path(&cli.state)?;
    let mut settings = SimSettings::from_path(&cli.settings)?;

    if let Some(iterations) = cli.iterations {
        settings.max_iterations = Some(iterations);
    }

    if let Some(time_limit) = cli.time_limit {
        settings.max_time_seconds = Some(time_limit);
    }

    if let Some(seed) = cli.seed {
        settings.seed = Some(seed);
    }

    settings.validate()?;
    validate_round_history(&state)?;

    println!(
        "Loaded '{}' at round {} with {} players and {} probability targets",
        format.tournament_name,
        state.current_round.overall_round,
        state.player_count(),
        settings.probability_targets.len()
    );

    if cli.validate_only {
        println!("Validation-only mode: simulation skipped.");
        return Ok(());
    }

    let _logging_guard = init_logging(&settings.logging, &cli.output)?;
    let runner = SimulationRunner::new(format, state, settings)?;
    let summary = runner.run(&cli.output)?;

    println!(
        "Simulation complete: {} trials in {:.2}s (seed {}) → {}",
        summary.total_simulations,
        summary.elapsed.as_secs_f64(),
        summary.seed,
        summary.report_path.display()
    );

    Ok(())
}
