//! Move classification: pure functions only
//! (No Board/Engine dependencies)

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Centipawn thresholds, all positive. Errors are compared against the
/// negated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub blunder: i32,
    pub mistake: i32,
    pub inaccuracy: i32,
    pub good_move: i32,
    pub missed_tactic: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            blunder: 200,
            mistake: 100,
            inaccuracy: 50,
            good_move: 50,
            missed_tactic: 100,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.inaccuracy <= 0 || self.good_move <= 0 || self.missed_tactic <= 0 {
            return Err(AnalysisError::Config("thresholds must be positive"));
        }
        if !(self.inaccuracy < self.mistake && self.mistake < self.blunder) {
            return Err(AnalysisError::Config(
                "thresholds must satisfy inaccuracy < mistake < blunder",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Good,
    Neutral,
    Inaccuracy,
    Mistake,
    Blunder,
    /// Not evaluated: an opponent ply, or the evaluation failed
    Unknown,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Good => "good",
            Classification::Neutral => "neutral",
            Classification::Inaccuracy => "inaccuracy",
            Classification::Mistake => "mistake",
            Classification::Blunder => "blunder",
            Classification::Unknown => "unknown",
        }
    }
}

/// Label an evaluation change (mover's perspective, after minus before).
pub fn classify(eval_change: i32, thresholds: &Thresholds) -> Classification {
    if eval_change <= -thresholds.blunder {
        Classification::Blunder
    } else if eval_change <= -thresholds.mistake {
        Classification::Mistake
    } else if eval_change <= -thresholds.inaccuracy {
        Classification::Inaccuracy
    } else if eval_change >= thresholds.good_move {
        Classification::Good
    } else {
        Classification::Neutral
    }
}

/// Gap between the best alternative and the played move, kept only when it
/// reaches the missed-tactic threshold.
pub fn missed_opportunity(
    alternative_score: i32,
    played_score: i32,
    thresholds: &Thresholds,
) -> Option<i32> {
    let gap = alternative_score - played_score;
    (gap >= thresholds.missed_tactic).then_some(gap)
}
