//! Move walker: replays one game and evaluates the analyzed player's plies.
//!
//! Each analyzed ply runs the same fixed sequence against the evaluator:
//! score the position before the move, apply the move, score the position
//! after it, and optionally score the engine's preferred alternative.
//! Opponent plies are only replayed so the board stays correct.

use chess_core::NormalizedGame;
use serde::{Deserialize, Serialize};
use shakmaty::{Chess, Color, Move, Position};
use tracing::{debug, warn};

use crate::aggregate::GameTacticalResult;
use crate::board_utils;
use crate::cancel::CancelToken;
use crate::classifier::{self, Classification, Thresholds};
use crate::error::AnalysisError;
use crate::stockfish::{Evaluation, PositionEvaluator};

/// Default engine search depth.
pub const DEFAULT_ANALYSIS_DEPTH: u32 = 15;

/// One ply of the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// 1-based ply number within the game
    pub ply_index: usize,
    pub move_number: usize,
    pub move_notation: String,
    pub move_uci: String,
    pub is_analyzed_player: bool,
    /// Mover's perspective
    pub eval_before: Option<i32>,
    /// Mover's perspective
    pub eval_after: Option<i32>,
    pub eval_change: Option<i32>,
    pub best_move_notation: Option<String>,
    pub best_move_uci: Option<String>,
    pub missed_opportunity: Option<i32>,
    pub classification: Classification,
    pub missed_tactic: bool,
}

impl MoveRecord {
    /// A ply with no evaluation: an opponent move, or a failed evaluation.
    fn unevaluated(ply_index: usize, san: String, uci: String, is_analyzed_player: bool) -> Self {
        Self {
            ply_index,
            move_number: (ply_index + 1) / 2,
            move_notation: san,
            move_uci: uci,
            is_analyzed_player,
            eval_before: None,
            eval_after: None,
            eval_change: None,
            best_move_notation: None,
            best_move_uci: None,
            missed_opportunity: None,
            classification: Classification::Unknown,
            missed_tactic: false,
        }
    }
}

/// Flip an engine score for the position *after* a move into the mover's
/// perspective. The engine scores for the side to move, which is now the
/// opponent. Scores taken before the move are already the mover's and are
/// never passed through here.
pub fn mover_perspective(score_after_move: i32) -> i32 {
    -score_after_move
}

#[derive(Debug, Clone, Copy)]
pub struct WalkSettings {
    pub depth: u32,
    pub thresholds: Thresholds,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self {
            depth: DEFAULT_ANALYSIS_DEPTH,
            thresholds: Thresholds::default(),
        }
    }
}

/// Engine findings for one analyzed ply.
struct PlyEvaluation {
    score_before: i32,
    score_after: i32,
    best_move: Option<Move>,
    missed_opportunity: Option<i32>,
}

pub struct MoveWalker<'a> {
    settings: &'a WalkSettings,
    cancel: &'a CancelToken,
}

impl<'a> MoveWalker<'a> {
    pub fn new(settings: &'a WalkSettings, cancel: &'a CancelToken) -> Self {
        Self { settings, cancel }
    }

    /// Replay every ply and return one record per ply.
    ///
    /// Evaluation failures are absorbed per ply. An unavailable engine or a
    /// cancellation aborts the walk and discards what was built so far.
    pub async fn walk<E: PositionEvaluator>(
        &self,
        evaluator: &mut E,
        game: &NormalizedGame,
    ) -> Result<Vec<MoveRecord>, AnalysisError> {
        let player: Color = game.player_color.into();
        let mut position = Chess::default();
        let mut records = Vec::with_capacity(game.moves.len());

        for (idx, mv) in game.moves.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }

            let ply_index = idx + 1;
            let is_analyzed_player = position.turn() == player;
            let san = board_utils::san(&position, mv);
            let uci = board_utils::uci(mv);

            if !is_analyzed_player {
                records.push(MoveRecord::unevaluated(ply_index, san, uci, false));
                position = board_utils::apply(&position, mv);
                continue;
            }

            let (record, next) = match self.evaluate_ply(evaluator, &position, mv).await {
                Ok((ply, next)) => (self.record(ply_index, san, uci, &position, ply), next),
                Err(AnalysisError::EvaluationFailed(reason)) => {
                    warn!(game_id = %game.game_id, ply = ply_index, %reason, "Evaluation failed, ply left unclassified");
                    (
                        MoveRecord::unevaluated(ply_index, san, uci, true),
                        board_utils::apply(&position, mv),
                    )
                }
                Err(e) => return Err(e),
            };

            debug!(
                game_id = %game.game_id,
                ply = ply_index,
                classification = record.classification.as_str(),
                eval_change = ?record.eval_change,
                "Ply analyzed"
            );
            records.push(record);
            position = next;
        }

        Ok(records)
    }

    /// Evaluate before, apply, evaluate after, then the alternative if any.
    /// Returns the findings together with the position after the played move.
    async fn evaluate_ply<E: PositionEvaluator>(
        &self,
        evaluator: &mut E,
        before: &Chess,
        played: &Move,
    ) -> Result<(PlyEvaluation, Chess), AnalysisError> {
        let eval_before = self.evaluate(evaluator, before).await?;
        let score_before = eval_before.score;

        let after = board_utils::apply(before, played);
        let eval_after = self.evaluate(evaluator, &after).await?;
        let score_after = mover_perspective(eval_after.score);

        let best_move = eval_before
            .best_move()
            .and_then(|uci| board_utils::parse_uci(before, uci));

        let missed_opportunity = match &best_move {
            Some(alternative) if alternative != played => {
                self.alternative_gap(evaluator, before, alternative, score_after)
                    .await?
            }
            _ => None,
        };

        Ok((
            PlyEvaluation {
                score_before,
                score_after,
                best_move,
                missed_opportunity,
            },
            after,
        ))
    }

    /// Score the engine's preferred move and compare it with the played one.
    /// A failed evaluation here only drops the counterfactual.
    async fn alternative_gap<E: PositionEvaluator>(
        &self,
        evaluator: &mut E,
        before: &Chess,
        alternative: &Move,
        score_after: i32,
    ) -> Result<Option<i32>, AnalysisError> {
        let branch = board_utils::apply(before, alternative);
        match self.evaluate(evaluator, &branch).await {
            Ok(eval) => Ok(classifier::missed_opportunity(
                mover_perspective(eval.score),
                score_after,
                &self.settings.thresholds,
            )),
            Err(AnalysisError::EvaluationFailed(reason)) => {
                warn!(%reason, "Alternative move evaluation failed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn evaluate<E: PositionEvaluator>(
        &self,
        evaluator: &mut E,
        position: &Chess,
    ) -> Result<Evaluation, AnalysisError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AnalysisError::Cancelled),
            result = evaluator.evaluate(position, self.settings.depth) => result,
        }
    }

    fn record(
        &self,
        ply_index: usize,
        san: String,
        uci: String,
        before: &Chess,
        ply: PlyEvaluation,
    ) -> MoveRecord {
        let eval_change = ply.score_after - ply.score_before;
        MoveRecord {
            ply_index,
            move_number: (ply_index + 1) / 2,
            move_notation: san,
            move_uci: uci,
            is_analyzed_player: true,
            eval_before: Some(ply.score_before),
            eval_after: Some(ply.score_after),
            eval_change: Some(eval_change),
            best_move_notation: ply.best_move.as_ref().map(|m| board_utils::san(before, m)),
            best_move_uci: ply.best_move.as_ref().map(board_utils::uci),
            missed_opportunity: ply.missed_opportunity,
            classification: classifier::classify(eval_change, &self.settings.thresholds),
            missed_tactic: ply.missed_opportunity.is_some(),
        }
    }
}

/// Walk one game and fold it into a result.
///
/// The caller owns the evaluator session and must close it afterwards,
/// whatever this returns.
pub async fn analyze_game<E: PositionEvaluator>(
    evaluator: &mut E,
    game: &NormalizedGame,
    settings: &WalkSettings,
    cancel: &CancelToken,
) -> Result<GameTacticalResult, AnalysisError> {
    let records = MoveWalker::new(settings, cancel).walk(evaluator, game).await?;
    Ok(GameTacticalResult::from_moves(game, records))
}
