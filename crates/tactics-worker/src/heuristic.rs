//! Engine-less estimate of a game's accuracy and error counts.
//!
//! Used only when no engine session can be opened and the fallback is
//! enabled. The numbers depend on game length alone, so results are flagged
//! `estimated` and carry no per-move records.

use chess_core::NormalizedGame;

use crate::aggregate::GameTacticalResult;

pub fn estimate(game: &NormalizedGame) -> GameTacticalResult {
    let plies = game.total_plies() as i64;
    let accuracy = (75 + (plies - 30)).clamp(50, 95);
    let shortfall = (100 - accuracy) as u32;

    GameTacticalResult {
        game_id: game.game_id.clone(),
        player_color: game.player_color,
        time_class: game.time_class,
        outcome: game.outcome,
        total_plies: game.total_plies(),
        moves: Vec::new(),
        blunders: shortfall / 20,
        mistakes: shortfall / 15,
        inaccuracies: shortfall / 10,
        good_moves: 0,
        missed_tactics: 0,
        unknown_moves: 0,
        accuracy: accuracy as f64,
        estimated: true,
    }
}
