//! Per-game totals and the accuracy heuristic.

use chess_core::{GameOutcome, NormalizedGame, PlayerColor, TimeClass};
use serde::{Deserialize, Serialize};

use crate::classifier::Classification;
use crate::walker::MoveRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameTacticalResult {
    pub game_id: String,
    pub player_color: PlayerColor,
    pub time_class: Option<TimeClass>,
    pub outcome: Option<GameOutcome>,
    pub total_plies: usize,
    pub moves: Vec<MoveRecord>,
    pub blunders: u32,
    pub mistakes: u32,
    pub inaccuracies: u32,
    pub good_moves: u32,
    pub missed_tactics: u32,
    /// Analyzed plies whose evaluation failed
    pub unknown_moves: u32,
    pub accuracy: f64,
    /// Produced by the engine-less estimator, no per-move data
    pub estimated: bool,
}

impl GameTacticalResult {
    /// Fold walked plies into counts. Opponent plies are carried but not counted.
    pub fn from_moves(game: &NormalizedGame, moves: Vec<MoveRecord>) -> Self {
        let mut result = Self {
            game_id: game.game_id.clone(),
            player_color: game.player_color,
            time_class: game.time_class,
            outcome: game.outcome,
            total_plies: game.total_plies(),
            moves: Vec::new(),
            blunders: 0,
            mistakes: 0,
            inaccuracies: 0,
            good_moves: 0,
            missed_tactics: 0,
            unknown_moves: 0,
            accuracy: 0.0,
            estimated: false,
        };

        for record in moves.iter().filter(|m| m.is_analyzed_player) {
            match record.classification {
                Classification::Blunder => result.blunders += 1,
                Classification::Mistake => result.mistakes += 1,
                Classification::Inaccuracy => result.inaccuracies += 1,
                Classification::Good => result.good_moves += 1,
                Classification::Unknown => result.unknown_moves += 1,
                Classification::Neutral => {}
            }
            if record.missed_tactic {
                result.missed_tactics += 1;
            }
        }

        result.accuracy = calculate_accuracy(&moves);
        result.moves = moves;
        result
    }

    pub fn total_errors(&self) -> u32 {
        self.blunders + self.mistakes + self.inaccuracies
    }

    /// True when the player had plies to analyze and not one got a score.
    pub fn nothing_evaluated(&self) -> bool {
        !self.estimated && self.unknown_moves > 0 && average_loss(&self.moves).is_none()
    }
}

/// Average centipawn loss over the player's evaluated plies.
///
/// Gains count as zero loss but still count in the denominator. `None` when
/// no ply has a known change.
pub fn average_loss(moves: &[MoveRecord]) -> Option<f64> {
    let changes: Vec<i32> = moves
        .iter()
        .filter(|m| m.is_analyzed_player)
        .filter_map(|m| m.eval_change)
        .collect();
    if changes.is_empty() {
        return None;
    }
    let total_loss: i64 = changes
        .iter()
        .filter(|&&c| c < 0)
        .map(|&c| i64::from(c).abs())
        .sum();
    Some(total_loss as f64 / changes.len() as f64)
}

/// `clamp(100 - avg_loss / 10, 0, 100)`; 0 when nothing was evaluated.
pub fn calculate_accuracy(moves: &[MoveRecord]) -> f64 {
    match average_loss(moves) {
        Some(avg_loss) => (100.0 - avg_loss / 10.0).clamp(0.0, 100.0),
        None => 0.0,
    }
}
