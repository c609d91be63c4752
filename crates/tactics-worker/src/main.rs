//! Tactical analysis worker
//!
//! Analyzes a player's games from PGN files with a local Stockfish and prints
//! per-game results, the cross-game report and recommendations as JSON.
//!
//! Usage:
//!   tactics-worker --username NAME --games-dir ./games
//!   tactics-worker --username NAME game1.pgn game2.pgn

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chess_core::pgn::{parse_pgn, split_games};
use chess_core::{GameData, NormalizationError};
use serde::Serialize;
use tracing::{info, warn};

use tactics_worker::aggregate::GameTacticalResult;
use tactics_worker::batch::{analyze_batch, BatchOutcome};
use tactics_worker::cancel::{cancel_pair, CancelHandle};
use tactics_worker::config::WorkerConfig;
use tactics_worker::patterns::AggregateReport;
use tactics_worker::recommendations::{self, Recommendation};

struct CliArgs {
    username: String,
    files: Vec<PathBuf>,
}

/// Parse `--username NAME [--games-dir DIR] [FILE.pgn ...]` from CLI args
fn parse_args() -> anyhow::Result<CliArgs> {
    let mut username = None;
    let mut files = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--username" => username = args.next(),
            "--games-dir" => {
                let dir = args.next().context("--games-dir needs a directory")?;
                let pattern = format!("{}/*.pgn", dir.trim_end_matches('/'));
                for entry in glob::glob(&pattern).context("invalid games directory")? {
                    match entry {
                        Ok(path) => files.push(path),
                        Err(e) => warn!(error = %e, "Unreadable entry in games directory"),
                    }
                }
            }
            other if other.starts_with("--") => bail!("unknown flag {other}"),
            _ => files.push(PathBuf::from(arg)),
        }
    }

    let Some(username) = username else {
        bail!("usage: tactics-worker --username NAME [--games-dir DIR | FILE.pgn ...]");
    };
    if files.is_empty() {
        bail!("no PGN files given");
    }
    files.sort();
    Ok(CliArgs { username, files })
}

/// Every game in every file, parsed. Parse failures are kept so the batch counts them.
fn load_games(files: &[PathBuf]) -> anyhow::Result<Vec<Result<GameData, NormalizationError>>> {
    let mut games = Vec::new();
    for path in files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let parsed: Vec<_> = split_games(&text).iter().map(|pgn| parse_pgn(pgn)).collect();
        info!(file = %path.display(), games = parsed.len(), "Loaded PGN file");
        games.extend(parsed);
    }
    Ok(games)
}

#[derive(Serialize)]
struct GameReport<'a> {
    #[serde(flatten)]
    result: &'a GameTacticalResult,
    recommendations: Vec<Recommendation>,
}

#[derive(Serialize)]
struct Output<'a> {
    username: &'a str,
    games: Vec<GameReport<'a>>,
    report: &'a AggregateReport,
    recommendations: Vec<Recommendation>,
    skipped_normalization: u32,
    skipped_engine: u32,
    cancelled: u32,
}

impl<'a> Output<'a> {
    fn new(username: &'a str, outcome: &'a BatchOutcome) -> Self {
        Self {
            username,
            games: outcome
                .results
                .iter()
                .map(|result| GameReport {
                    result,
                    recommendations: recommendations::for_game(result),
                })
                .collect(),
            report: &outcome.report,
            recommendations: recommendations::for_report(&outcome.report),
            skipped_normalization: outcome.skipped_normalization,
            skipped_engine: outcome.skipped_engine,
            cancelled: outcome.cancelled,
        }
    }
}

/// Trip the cancel handle on Ctrl-C or SIGTERM.
async fn watch_shutdown(handle: CancelHandle) {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "Failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                    handle.cancel();
                    return;
                }
            };
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, cancelling analysis"),
            _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, cancelling analysis"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl-C, cancelling analysis");
    }
    handle.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let args = parse_args()?;
    let config = WorkerConfig::from_env()?;
    info!(
        stockfish_path = %config.stockfish_path,
        depth = config.analysis_depth,
        concurrency = config.max_concurrent_games,
        "Worker config loaded"
    );

    let games = load_games(&args.files)?;

    let (handle, cancel) = cancel_pair();
    tokio::spawn(watch_shutdown(handle));

    let launcher = config.launcher();
    let outcome = analyze_batch(
        &launcher,
        games,
        &args.username,
        &config.batch_settings(),
        &cancel,
    )
    .await;

    let output = Output::new(&args.username, &outcome);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
