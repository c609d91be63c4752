//! Batch runner: many games, one engine session each.
//!
//! Games run concurrently up to `max_concurrent_games`, all driven from the
//! calling task. Each finished game is folded into the report by that same
//! task, so nothing is shared between walks.

use chess_core::{GameData, NormalizationError, NormalizedGame};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::GameTacticalResult;
use crate::cancel::CancelToken;
use crate::error::AnalysisError;
use crate::heuristic;
use crate::patterns::{AggregateReport, PhaseBoundaries};
use crate::stockfish::{EngineLauncher, PositionEvaluator};
use crate::walker::{self, WalkSettings};

/// Sessions tried per game before it counts as engine-unavailable.
pub const DEFAULT_ENGINE_OPEN_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub walk: WalkSettings,
    pub boundaries: PhaseBoundaries,
    pub max_concurrent_games: usize,
    /// Fresh sessions tried per game when the engine fails to start
    pub engine_open_attempts: u32,
    /// Estimate games whose engine session cannot be opened
    pub allow_heuristic_fallback: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            walk: WalkSettings::default(),
            boundaries: PhaseBoundaries::default(),
            max_concurrent_games: num_cpus::get(),
            engine_open_attempts: DEFAULT_ENGINE_OPEN_ATTEMPTS,
            allow_heuristic_fallback: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    /// In input order
    pub results: Vec<GameTacticalResult>,
    pub report: AggregateReport,
    pub skipped_normalization: u32,
    pub skipped_engine: u32,
    pub cancelled: u32,
}

enum GameRun {
    Analyzed(GameTacticalResult),
    EngineUnavailable,
    Cancelled,
}

/// Normalize and analyze every game for `username`.
///
/// Never fails as a whole. Games that do not normalize, cannot get a working
/// engine, or are cut short by cancellation are counted and left out of
/// `results`.
pub async fn analyze_batch<L, I>(
    launcher: &L,
    games: I,
    username: &str,
    settings: &BatchSettings,
    cancel: &CancelToken,
) -> BatchOutcome
where
    L: EngineLauncher,
    I: IntoIterator<Item = Result<GameData, NormalizationError>>,
{
    let mut skipped_normalization = 0;
    let mut normalized = Vec::new();
    for (idx, game) in games.into_iter().enumerate() {
        match game.and_then(|g| g.normalize(username)) {
            Ok(game) => normalized.push(game),
            Err(e) => {
                warn!(game = idx + 1, error = %e, "Skipping game that failed to normalize");
                skipped_normalization += 1;
            }
        }
    }

    info!(
        games = normalized.len(),
        skipped = skipped_normalization,
        concurrency = settings.max_concurrent_games,
        "Starting batch analysis"
    );

    let mut runs = stream::iter(normalized.into_iter().enumerate())
        .map(|(idx, game)| async move { (idx, run_game(launcher, &game, settings, cancel).await) })
        .buffer_unordered(settings.max_concurrent_games.max(1));

    let mut report = AggregateReport::new(settings.boundaries);
    let mut analyzed = Vec::new();
    let mut skipped_engine = 0;
    let mut cancelled = 0;

    while let Some((idx, run)) = runs.next().await {
        match run {
            GameRun::Analyzed(result) => {
                report.record(&result);
                analyzed.push((idx, result));
            }
            GameRun::EngineUnavailable => skipped_engine += 1,
            GameRun::Cancelled => cancelled += 1,
        }
    }

    analyzed.sort_by_key(|(idx, _)| *idx);
    let results: Vec<GameTacticalResult> = analyzed.into_iter().map(|(_, r)| r).collect();

    info!(
        analyzed = results.len(),
        skipped_normalization,
        skipped_engine,
        cancelled,
        "Batch analysis complete"
    );

    BatchOutcome {
        results,
        report,
        skipped_normalization,
        skipped_engine,
        cancelled,
    }
}

/// Open a session, walk the game, close the session whatever happened.
async fn run_game<L: EngineLauncher>(
    launcher: &L,
    game: &NormalizedGame,
    settings: &BatchSettings,
    cancel: &CancelToken,
) -> GameRun {
    if cancel.is_cancelled() {
        return GameRun::Cancelled;
    }

    let mut session = match open_session(launcher, game, settings.engine_open_attempts, cancel).await {
        Ok(session) => session,
        Err(AnalysisError::Cancelled) => return GameRun::Cancelled,
        Err(e) if settings.allow_heuristic_fallback => {
            warn!(game_id = %game.game_id, error = %e, "Engine unavailable, estimating game");
            return GameRun::Analyzed(heuristic::estimate(game));
        }
        Err(e) => {
            warn!(game_id = %game.game_id, error = %e, "Engine unavailable, skipping game");
            return GameRun::EngineUnavailable;
        }
    };

    let outcome = walker::analyze_game(&mut session, game, &settings.walk, cancel).await;
    session.close().await;

    match outcome {
        Ok(result) if result.nothing_evaluated() => {
            warn!(
                game_id = %result.game_id,
                unknown = result.unknown_moves,
                "No ply could be evaluated, skipping game"
            );
            GameRun::EngineUnavailable
        }
        Ok(result) => {
            info!(
                game_id = %result.game_id,
                blunders = result.blunders,
                mistakes = result.mistakes,
                accuracy = result.accuracy,
                "Game analyzed"
            );
            GameRun::Analyzed(result)
        }
        Err(AnalysisError::Cancelled) => {
            info!(game_id = %game.game_id, "Game analysis cancelled");
            GameRun::Cancelled
        }
        Err(e) => {
            warn!(game_id = %game.game_id, error = %e, "Game analysis aborted");
            GameRun::EngineUnavailable
        }
    }
}

/// Try up to `attempts` fresh sessions, giving up early on cancellation.
async fn open_session<L: EngineLauncher>(
    launcher: &L,
    game: &NormalizedGame,
    attempts: u32,
    cancel: &CancelToken,
) -> Result<L::Session, AnalysisError> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match launcher.open().await {
            Ok(session) => return Ok(session),
            Err(e) => {
                warn!(game_id = %game.game_id, attempt, attempts, error = %e, "Engine failed to start");
                if attempt >= attempts {
                    return Err(e);
                }
            }
        }
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        attempt += 1;
    }
}
