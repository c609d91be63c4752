//! Worker configuration from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::batch::{BatchSettings, DEFAULT_ENGINE_OPEN_ATTEMPTS};
use crate::classifier::Thresholds;
use crate::error::AnalysisError;
use crate::patterns::PhaseBoundaries;
use crate::stockfish::{EngineOptions, StockfishLauncher};
use crate::walker::{WalkSettings, DEFAULT_ANALYSIS_DEPTH};

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Path to Stockfish binary
    pub stockfish_path: String,

    /// Search depth per position
    pub analysis_depth: u32,

    /// Bound on each engine search
    pub eval_timeout_secs: u64,

    pub engine_threads: u32,
    pub engine_hash_mb: u32,

    pub thresholds: Thresholds,
    pub boundaries: PhaseBoundaries,

    /// Games analyzed at once, one engine each
    pub max_concurrent_games: usize,

    /// Sessions tried per game before giving up on the engine
    pub engine_open_attempts: u32,

    /// Estimate games when the engine cannot be started
    pub allow_heuristic_fallback: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            stockfish_path: "/usr/local/bin/stockfish".to_string(),
            analysis_depth: DEFAULT_ANALYSIS_DEPTH,
            eval_timeout_secs: 30,
            engine_threads: 1,
            engine_hash_mb: 128,
            thresholds: Thresholds::default(),
            boundaries: PhaseBoundaries::default(),
            max_concurrent_games: num_cpus::get(),
            engine_open_attempts: DEFAULT_ENGINE_OPEN_ATTEMPTS,
            allow_heuristic_fallback: false,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from any key lookup. Unset or unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            stockfish_path: lookup("STOCKFISH_PATH").unwrap_or(defaults.stockfish_path),
            analysis_depth: parse_or(&lookup, "ANALYSIS_DEPTH", defaults.analysis_depth),
            eval_timeout_secs: parse_or(&lookup, "EVAL_TIMEOUT_SECS", defaults.eval_timeout_secs),
            engine_threads: parse_or(&lookup, "ENGINE_THREADS", defaults.engine_threads),
            engine_hash_mb: parse_or(&lookup, "ENGINE_HASH_MB", defaults.engine_hash_mb),
            thresholds: Thresholds {
                blunder: parse_or(&lookup, "BLUNDER_THRESHOLD", defaults.thresholds.blunder),
                mistake: parse_or(&lookup, "MISTAKE_THRESHOLD", defaults.thresholds.mistake),
                inaccuracy: parse_or(&lookup, "INACCURACY_THRESHOLD", defaults.thresholds.inaccuracy),
                good_move: parse_or(&lookup, "GOOD_MOVE_THRESHOLD", defaults.thresholds.good_move),
                missed_tactic: parse_or(
                    &lookup,
                    "MISSED_TACTIC_THRESHOLD",
                    defaults.thresholds.missed_tactic,
                ),
            },
            boundaries: PhaseBoundaries {
                opening_max_ply: parse_or(&lookup, "OPENING_MAX_PLY", defaults.boundaries.opening_max_ply),
                endgame_min_ply: parse_or(&lookup, "ENDGAME_MIN_PLY", defaults.boundaries.endgame_min_ply),
            },
            max_concurrent_games: parse_or(
                &lookup,
                "MAX_CONCURRENT_GAMES",
                defaults.max_concurrent_games,
            ),
            engine_open_attempts: parse_or(
                &lookup,
                "ENGINE_OPEN_ATTEMPTS",
                defaults.engine_open_attempts,
            ),
            allow_heuristic_fallback: lookup("ALLOW_HEURISTIC_FALLBACK")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.allow_heuristic_fallback),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.analysis_depth == 0 {
            return Err(AnalysisError::Config("ANALYSIS_DEPTH must be positive"));
        }
        if self.eval_timeout_secs == 0 {
            return Err(AnalysisError::Config("EVAL_TIMEOUT_SECS must be positive"));
        }
        if self.max_concurrent_games == 0 {
            return Err(AnalysisError::Config("MAX_CONCURRENT_GAMES must be positive"));
        }
        if self.engine_open_attempts == 0 {
            return Err(AnalysisError::Config("ENGINE_OPEN_ATTEMPTS must be positive"));
        }
        self.thresholds.validate()?;
        self.boundaries.validate()
    }

    pub fn walk_settings(&self) -> WalkSettings {
        WalkSettings {
            depth: self.analysis_depth,
            thresholds: self.thresholds,
        }
    }

    pub fn launcher(&self) -> StockfishLauncher {
        StockfishLauncher::new(
            self.stockfish_path.clone(),
            EngineOptions {
                threads: self.engine_threads,
                hash_mb: self.engine_hash_mb,
                timeout: Duration::from_secs(self.eval_timeout_secs),
            },
        )
    }

    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            walk: self.walk_settings(),
            boundaries: self.boundaries,
            max_concurrent_games: self.max_concurrent_games,
            engine_open_attempts: self.engine_open_attempts,
            allow_heuristic_fallback: self.allow_heuristic_fallback,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Ignoring unparseable setting");
            default
        }),
        None => default,
    }
}
