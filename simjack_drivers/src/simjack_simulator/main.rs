mod simulation;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use simjack_drivers::csv_log::CsvHandLog;
use simjack_drivers::logging::init_tracing;
use simjack_drivers::{build_table, Config};
use tracing::info;

use crate::simulation::SummaryCollector;

const DEFAULT_CONFIG_PATH: &str = "~/.simjack.yml";

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file
    #[arg(short, long, default_value_t = String::from(DEFAULT_CONFIG_PATH))]
    config: String,

    /// The whole config as inline JSON, used instead of the config file
    #[arg(long)]
    config_json: Option<String>,

    /// Where the per-hand CSV log is written
    #[arg(short, long, default_value = "output.csv")]
    log: PathBuf,

    /// Gzip the hand log, appending `.gz` to its name
    #[arg(long)]
    gzip: bool,

    /// Directory holding `<strategy>.json` files
    #[arg(short, long, default_value = "strategies")]
    strategies: PathBuf,

    /// Overrides the configured round count
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Overrides the configured shuffle seed
    #[arg(long)]
    seed: Option<u64>,

    /// Load and check the config and strategies, then exit
    #[arg(long)]
    validate_only: bool,
}

fn resolve_config_path(config: &str) -> Result<PathBuf> {
    if config != DEFAULT_CONFIG_PATH {
        return Ok(PathBuf::from(config));
    }
    let home_dir = home::home_dir().context("cannot find home directory")?;
    let config_file_path = home_dir.join(".simjack.yml");
    if !config_file_path.exists() {
        bail!("config file {:?} does not exist", config_file_path);
    }
    if config_file_path.is_dir() {
        bail!("{:?} should be a file rather than a directory", config_file_path);
    }
    Ok(config_file_path)
}

fn main() -> Result<()> {
    let args = CommandLineArgs::parse();
    let (config, source) = match &args.config_json {
        Some(text) => (Config::from_json(text)?, String::from("inline config")),
        None => {
            let config_path = resolve_config_path(&args.config)?;
            (Config::from_path(&config_path)?, format!("{:?}", config_path))
        }
    };
    init_tracing(config.logging.level.as_deref());

    let round_count = args.rounds.unwrap_or(config.simulation.round_count);
    if round_count == 0 {
        bail!("round count must be greater than zero");
    }
    let mut table = build_table(&config, &args.strategies, args.seed)
        .with_context(|| format!("failed to set up table from {}", source))?;
    if args.validate_only {
        println!("{} is valid", source);
        return Ok(());
    }

    info!(
        rounds = round_count,
        players = table.players().len(),
        boxes = table.boxes().len(),
        decks = table.rule().number_of_decks,
        "simulation started"
    );
    let log = CsvHandLog::create(&args.log, args.gzip || config.logging.gzip)
        .with_context(|| format!("failed to create hand log {:?}", args.log))?;
    let mut collector = SummaryCollector::new(log, round_count);
    let report = table
        .run(round_count, &mut collector)
        .context("simulation aborted")?;
    let (log, summary) = collector.into_inner();
    let rows = log.rows();
    let log_path = log
        .finish()
        .with_context(|| format!("failed to finish hand log {:?}", args.log))?;
    info!(
        rounds = report.rounds_played,
        shoes = report.shoes_used,
        stopped_early = report.stopped_early,
        "simulation finished"
    );

    println!(
        "Played {} rounds over {} shoes{}",
        report.rounds_played,
        report.shoes_used,
        if report.stopped_early {
            " (stopped early: no active player left)"
        } else {
            ""
        }
    );
    for player in summary.players(table.players()) {
        println!("{}", player);
    }
    println!("{} hands written to {:?}", rows, log_path);
    Ok(())
}
