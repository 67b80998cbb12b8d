//! Wind Fleet Health - command line entry point

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use windfleet_risk::constants::{APP_NAME, APP_VERSION};
use windfleet_risk::logic::catalog::{describe_catalog, Catalog};
use windfleet_risk::logic::scoring::export_fleet_risk;
use windfleet_risk::{RiskEngine, ScoreRequest, ScoringConfig};

#[derive(Debug, Parser)]
#[command(name = "windfleet-risk", version, about = "Anomaly risk scoring for a wind fleet")]
struct Cli {
    /// Telemetry directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Source index CSV
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// Threshold registry JSON
    #[arg(long, global = true)]
    thresholds: Option<PathBuf>,

    /// Model pack directory
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Fleet risk export CSV
    #[arg(long, global = true)]
    fleet_risk: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score every catalogued source and export the ranking
    Fleet {
        /// Export path (defaults to the configured fleet risk CSV)
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        lookback_hours: Option<i64>,

        /// Rows printed from the top of the ranking
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Score one unit and print the result as JSON
    Score {
        #[arg(long)]
        unit: String,

        /// Source file under the telemetry directory
        #[arg(long)]
        source: Option<String>,

        /// Asset id, resolved through the last fleet export
        #[arg(long)]
        asset: Option<String>,

        #[arg(long, default_value_t = windfleet_risk::constants::DEFAULT_LOOKBACK_HOURS)]
        lookback_hours: i64,
    },
    /// Summarise the source catalog
    Catalog,
}

impl Cli {
    fn config(&self) -> ScoringConfig {
        let mut config = ScoringConfig::from_env();
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(path) = &self.index {
            config.index_csv = path.clone();
        }
        if let Some(path) = &self.thresholds {
            config.thresholds_path = path.clone();
        }
        if let Some(dir) = &self.model_dir {
            config.model_dir = dir.clone();
        }
        if let Some(path) = &self.fleet_risk {
            config.fleet_risk_csv = path.clone();
        }
        config
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = cli.config();

    log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    match cli.command {
        Command::Fleet { out, lookback_hours, top } => {
            if let Some(hours) = lookback_hours {
                config.lookback_hours = hours;
            }
            let out = out.unwrap_or_else(|| config.fleet_risk_csv.clone());

            let engine = RiskEngine::from_config(config);
            let report = engine.score_fleet().context("fleet scoring failed")?;
            export_fleet_risk(&report.records, &out)
                .with_context(|| format!("failed to write {}", out.display()))?;

            for record in report.top(top) {
                println!(
                    "{:>6.1}  {:<24} {:<12} {}",
                    record.risk_score, record.unit_id, record.asset_id, record.source_ref
                );
            }
        }
        Command::Score { unit, source, asset, lookback_hours } => {
            let request = ScoreRequest {
                unit_id: unit,
                source_ref: source,
                asset_id: asset,
                lookback_hours,
            };

            let engine = RiskEngine::from_config(config);
            let response = engine
                .score(&request)
                .with_context(|| format!("scoring unit '{}' failed", request.unit_id))?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Catalog => {
            let catalog = Catalog::load(&config.index_csv)?;
            let summaries = describe_catalog(&catalog, &config.data_dir)?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
    }

    Ok(())
}
