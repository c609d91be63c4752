//! Shared helpers: a scripted evaluator standing in for Stockfish.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chess_core::{NormalizedGame, PlayerColor};
use tactics_worker::board_utils;
use tactics_worker::error::AnalysisError;
use tactics_worker::shakmaty::{Chess, Position};
use tactics_worker::stockfish::{EngineLauncher, Evaluation, PositionEvaluator};

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

pub fn game(player: PlayerColor, san: &[&str]) -> NormalizedGame {
    NormalizedGame::from_san("test-game", player, san).expect("test game must be legal")
}

/// Position before each ply, plus the final position. `positions(g)[k]` is the
/// board after `k` plies.
pub fn positions(game: &NormalizedGame) -> Vec<Chess> {
    let mut out = vec![Chess::default()];
    for mv in &game.moves {
        let next = board_utils::apply(out.last().expect("non-empty"), mv);
        out.push(next);
    }
    out
}

pub fn fens(game: &NormalizedGame) -> Vec<String> {
    positions(game).iter().map(board_utils::fen).collect()
}

/// FEN reached by playing `uci` from `fen`'s position.
pub fn fen_after(position: &Chess, uci: &str) -> String {
    let mv = board_utils::parse_uci(position, uci).expect("legal alternative");
    board_utils::fen(&board_utils::apply(position, &mv))
}

pub fn pgn(white: &str, black: &str, result: &str, moves: &str) -> String {
    format!(
        "[Event \"Test\"]\n[White \"{white}\"]\n[Black \"{black}\"]\n[Result \"{result}\"]\n\
         [TimeControl \"180+2\"]\n[Link \"https://example.org/{white}-{black}\"]\n\n{moves} {result}\n"
    )
}

// ---------------------------------------------------------------------------
// Scripted evaluator
// ---------------------------------------------------------------------------

/// Answers from a FEN-keyed script. Unscripted positions score 0 with no line.
#[derive(Clone, Default)]
pub struct ScriptedEvaluator {
    scripted: HashMap<String, Evaluation>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    hang_everything: bool,
    fail_everything: bool,
    unavailable_after: Option<usize>,
    pub calls: Vec<String>,
    pub closed: bool,
    close_count: Arc<AtomicUsize>,
}

impl ScriptedEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(mut self, fen: &str, score: i32) -> Self {
        self.scripted.entry(fen.to_string()).or_insert_with(|| Evaluation {
            score: 0,
            best_line: Vec::new(),
        }).score = score;
        self
    }

    pub fn best(mut self, fen: &str, score: i32, line: &[&str]) -> Self {
        self.scripted.insert(
            fen.to_string(),
            Evaluation {
                score,
                best_line: line.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn fail(mut self, fen: &str) -> Self {
        self.failing.insert(fen.to_string());
        self
    }

    /// Every search fails, but the session stays up.
    pub fn fail_everything(mut self) -> Self {
        self.fail_everything = true;
        self
    }

    pub fn hang(mut self, fen: &str) -> Self {
        self.hanging.insert(fen.to_string());
        self
    }

    pub fn hang_everything(mut self) -> Self {
        self.hang_everything = true;
        self
    }

    /// Report the engine gone once `calls` evaluations have been answered.
    pub fn unavailable_after(mut self, calls: usize) -> Self {
        self.unavailable_after = Some(calls);
        self
    }

    pub fn close_count(&self) -> Arc<AtomicUsize> {
        self.close_count.clone()
    }
}

impl PositionEvaluator for ScriptedEvaluator {
    async fn evaluate(&mut self, position: &Chess, _depth: u32) -> Result<Evaluation, AnalysisError> {
        if self.closed {
            return Err(AnalysisError::EngineUnavailable("session closed".into()));
        }
        let fen = board_utils::fen(position);
        if self.unavailable_after.is_some_and(|n| self.calls.len() >= n) {
            return Err(AnalysisError::EngineUnavailable("engine died".into()));
        }
        self.calls.push(fen.clone());

        if self.hang_everything || self.hanging.contains(&fen) {
            std::future::pending::<()>().await;
        }
        if self.fail_everything || self.failing.contains(&fen) {
            return Err(AnalysisError::EvaluationFailed(format!("scripted failure at {fen}")));
        }
        // Mimic a real engine: a finished game has no best move.
        if position.is_game_over() {
            return Ok(Evaluation {
                score: self.scripted.get(&fen).map_or(0, |e| e.score),
                best_line: Vec::new(),
            });
        }
        Ok(self.scripted.get(&fen).cloned().unwrap_or(Evaluation {
            score: 0,
            best_line: Vec::new(),
        }))
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.close_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// ---------------------------------------------------------------------------
// Scripted launcher
// ---------------------------------------------------------------------------

/// Hands out clones of one scripted evaluator and counts sessions.
pub struct ScriptedLauncher {
    template: ScriptedEvaluator,
    unavailable: bool,
    failing_opens: AtomicUsize,
    pub attempts: AtomicUsize,
    pub opens: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
}

impl ScriptedLauncher {
    pub fn new(template: ScriptedEvaluator) -> Self {
        let closes = template.close_count();
        Self {
            template,
            unavailable: false,
            failing_opens: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
            closes,
        }
    }

    /// Every `open` fails as if the binary were missing.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(ScriptedEvaluator::new())
        }
    }

    /// The first `n` opens fail as if the engine crashed during startup.
    pub fn failing_first(self, n: usize) -> Self {
        self.failing_opens.store(n, Ordering::SeqCst);
        self
    }

    /// Every `open` call, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl EngineLauncher for ScriptedLauncher {
    type Session = ScriptedEvaluator;

    async fn open(&self) -> Result<ScriptedEvaluator, AnalysisError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(AnalysisError::EngineUnavailable("no such file".into()));
        }
        let failed = self
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AnalysisError::EngineUnavailable("UCI handshake failed".into()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(self.template.clone())
    }
}
