//! Cross-game pattern report: error counts bucketed by phase, time class and outcome.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::GameTacticalResult;
use crate::classifier::Classification;
use crate::error::AnalysisError;

pub const DEFAULT_OPENING_MAX_PLY: usize = 15;
pub const DEFAULT_ENDGAME_MIN_PLY: usize = 40;

const UNKNOWN_BUCKET: &str = "unknown";

/// Ply boundaries between opening, middlegame and endgame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseBoundaries {
    /// Last ply that still counts as opening
    pub opening_max_ply: usize,
    /// First ply that counts as endgame
    pub endgame_min_ply: usize,
}

impl Default for PhaseBoundaries {
    fn default() -> Self {
        Self {
            opening_max_ply: DEFAULT_OPENING_MAX_PLY,
            endgame_min_ply: DEFAULT_ENDGAME_MIN_PLY,
        }
    }
}

impl PhaseBoundaries {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.opening_max_ply >= self.endgame_min_ply {
            return Err(AnalysisError::Config(
                "opening boundary must be below endgame boundary",
            ));
        }
        Ok(())
    }

    pub fn phase(&self, ply_index: usize) -> GamePhase {
        if ply_index <= self.opening_max_ply {
            GamePhase::Opening
        } else if ply_index >= self.endgame_min_ply {
            GamePhase::Endgame
        } else {
            GamePhase::Middlegame
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCounts {
    pub blunders: u32,
    pub mistakes: u32,
    pub inaccuracies: u32,
}

impl ErrorCounts {
    fn add(&mut self, classification: Classification) {
        match classification {
            Classification::Blunder => self.blunders += 1,
            Classification::Mistake => self.mistakes += 1,
            Classification::Inaccuracy => self.inaccuracies += 1,
            _ => {}
        }
    }

    fn merge(&mut self, other: &ErrorCounts) {
        self.blunders += other.blunders;
        self.mistakes += other.mistakes;
        self.inaccuracies += other.inaccuracies;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub opening: ErrorCounts,
    pub middlegame: ErrorCounts,
    pub endgame: ErrorCounts,
}

impl PhaseStats {
    pub fn get(&self, phase: GamePhase) -> &ErrorCounts {
        match phase {
            GamePhase::Opening => &self.opening,
            GamePhase::Middlegame => &self.middlegame,
            GamePhase::Endgame => &self.endgame,
        }
    }

    fn get_mut(&mut self, phase: GamePhase) -> &mut ErrorCounts {
        match phase {
            GamePhase::Opening => &mut self.opening,
            GamePhase::Middlegame => &mut self.middlegame,
            GamePhase::Endgame => &mut self.endgame,
        }
    }
}

/// Totals for one time class or outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub games: u32,
    pub blunders: u32,
    pub mistakes: u32,
    pub inaccuracies: u32,
    pub accuracy_sum: f64,
}

impl BucketStats {
    fn add(&mut self, result: &GameTacticalResult) {
        self.games += 1;
        self.blunders += result.blunders;
        self.mistakes += result.mistakes;
        self.inaccuracies += result.inaccuracies;
        self.accuracy_sum += result.accuracy;
    }

    fn merge(&mut self, other: &BucketStats) {
        self.games += other.games;
        self.blunders += other.blunders;
        self.mistakes += other.mistakes;
        self.inaccuracies += other.inaccuracies;
        self.accuracy_sum += other.accuracy_sum;
    }

    pub fn average_accuracy(&self) -> f64 {
        ratio(self.accuracy_sum, self.games)
    }

    /// Blunders plus mistakes per game.
    pub fn serious_error_rate(&self) -> f64 {
        ratio(f64::from(self.blunders + self.mistakes), self.games)
    }
}

fn ratio(total: f64, games: u32) -> f64 {
    if games == 0 {
        0.0
    } else {
        total / f64::from(games)
    }
}

/// Accumulates many game results. Reports built in parallel are combined
/// with [`AggregateReport::merge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub boundaries: PhaseBoundaries,
    pub games: u32,
    /// Games that came from the estimator and have no per-move data
    pub estimated_games: u32,
    pub blunders: u32,
    pub mistakes: u32,
    pub inaccuracies: u32,
    pub good_moves: u32,
    pub missed_tactics: u32,
    pub accuracy_sum: f64,
    pub phases: PhaseStats,
    pub by_time_class: BTreeMap<String, BucketStats>,
    pub by_outcome: BTreeMap<String, BucketStats>,
}

impl AggregateReport {
    pub fn new(boundaries: PhaseBoundaries) -> Self {
        Self {
            boundaries,
            games: 0,
            estimated_games: 0,
            blunders: 0,
            mistakes: 0,
            inaccuracies: 0,
            good_moves: 0,
            missed_tactics: 0,
            accuracy_sum: 0.0,
            phases: PhaseStats::default(),
            by_time_class: BTreeMap::new(),
            by_outcome: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, result: &GameTacticalResult) {
        self.games += 1;
        if result.estimated {
            self.estimated_games += 1;
        }
        self.blunders += result.blunders;
        self.mistakes += result.mistakes;
        self.inaccuracies += result.inaccuracies;
        self.good_moves += result.good_moves;
        self.missed_tactics += result.missed_tactics;
        self.accuracy_sum += result.accuracy;

        for record in result.moves.iter().filter(|m| m.is_analyzed_player) {
            let phase = self.boundaries.phase(record.ply_index);
            self.phases.get_mut(phase).add(record.classification);
        }

        let time_class = result.time_class.map_or(UNKNOWN_BUCKET, |tc| tc.as_str());
        self.by_time_class
            .entry(time_class.to_string())
            .or_default()
            .add(result);

        let outcome = result.outcome.map_or(UNKNOWN_BUCKET, |o| o.as_str());
        self.by_outcome
            .entry(outcome.to_string())
            .or_default()
            .add(result);
    }

    /// Fold another report in. Both must use the same phase boundaries.
    pub fn merge(&mut self, other: &AggregateReport) {
        debug_assert_eq!(self.boundaries, other.boundaries);
        self.games += other.games;
        self.estimated_games += other.estimated_games;
        self.blunders += other.blunders;
        self.mistakes += other.mistakes;
        self.inaccuracies += other.inaccuracies;
        self.good_moves += other.good_moves;
        self.missed_tactics += other.missed_tactics;
        self.accuracy_sum += other.accuracy_sum;

        self.phases.opening.merge(&other.phases.opening);
        self.phases.middlegame.merge(&other.phases.middlegame);
        self.phases.endgame.merge(&other.phases.endgame);

        for (key, stats) in &other.by_time_class {
            self.by_time_class.entry(key.clone()).or_default().merge(stats);
        }
        for (key, stats) in &other.by_outcome {
            self.by_outcome.entry(key.clone()).or_default().merge(stats);
        }
    }

    pub fn average_accuracy(&self) -> f64 {
        ratio(self.accuracy_sum, self.games)
    }

    pub fn average_blunders(&self) -> f64 {
        ratio(f64::from(self.blunders), self.games)
    }

    pub fn average_mistakes(&self) -> f64 {
        ratio(f64::from(self.mistakes), self.games)
    }

    /// The time class with the highest blunder+mistake rate among those with
    /// at least `min_games` games.
    pub fn worst_time_class(&self, min_games: u32) -> Option<(&str, &BucketStats)> {
        self.by_time_class
            .iter()
            .filter(|(_, stats)| stats.games >= min_games)
            .max_by(|a, b| a.1.serious_error_rate().total_cmp(&b.1.serious_error_rate()))
            .map(|(key, stats)| (key.as_str(), stats))
    }
}

impl Default for AggregateReport {
    fn default() -> Self {
        Self::new(PhaseBoundaries::default())
    }
}
