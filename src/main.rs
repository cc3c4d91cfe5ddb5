use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use motile::manager::Manager;
use std::path::PathBuf;

/// Simulate and analyze swimming bacteria.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Simulation directory containing `config.toml`.
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a new run and write its first trajectory file.
    Create,

    /// Append one trajectory file to an existing run.
    Resume {
        #[arg(long)]
        run_idx: usize,
    },

    /// Compute displacement and correlation statistics.
    Analyze {
        /// Only analyze this run instead of all of them.
        #[arg(long)]
        run_idx: Option<usize>,
    },

    /// Delete analysis results.
    Clean,
}

impl Command {
    fn execute(self, mgr: &Manager) -> Result<()> {
        match self {
            Command::Create => mgr.create_run().context("failed to create run"),
            Command::Resume { run_idx } => mgr
                .resume_run(run_idx)
                .with_context(|| format!("failed to resume run {run_idx}")),
            Command::Analyze { run_idx } => mgr.analyze_sim(run_idx).context("failed to analyze"),
            Command::Clean => mgr.clean_sim().context("failed to clean"),
        }
    }
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    log::debug!("{cli:#?}");

    let mgr = Manager::new(&cli.sim_dir)
        .with_context(|| format!("failed to open simulation in {:?}", cli.sim_dir))?;
    cli.command.execute(&mgr)?;

    log::info!("done");
    Ok(())
}
