//! Advice derived from game results and the cross-game report.

use serde::{Deserialize, Serialize};

use crate::aggregate::GameTacticalResult;
use crate::patterns::AggregateReport;

/// Time classes with fewer games are too noisy to single out.
const MIN_TIME_CLASS_GAMES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub area: String,
    pub issue: String,
    pub advice: String,
}

impl Recommendation {
    fn new(priority: Priority, area: impl Into<String>, issue: String, advice: &str) -> Self {
        Self {
            priority,
            area: area.into(),
            issue,
            advice: advice.to_string(),
        }
    }
}

/// Recommendations for a single analyzed game.
pub fn for_game(result: &GameTacticalResult) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if result.blunders > 2 {
        recs.push(Recommendation::new(
            Priority::High,
            "Reduce Blunders",
            format!(
                "You made {} blunders in this game. Focus on double-checking moves that involve material.",
                result.blunders
            ),
            "Before each move, ask: \"What is my opponent threatening?\" and \"Is my piece safe?\"",
        ));
    }

    if result.accuracy < 70.0 {
        recs.push(Recommendation::new(
            Priority::High,
            "Improve Calculation Accuracy",
            format!("Your accuracy of {:.1}% needs improvement.", result.accuracy),
            "Practice tactical puzzles daily and calculate 2-3 moves deeper.",
        ));
    }

    if result.missed_tactics > 3 {
        recs.push(Recommendation::new(
            Priority::Medium,
            "Improve Tactical Vision",
            format!("You missed {} tactical opportunities.", result.missed_tactics),
            "Look for forcing moves (checks, captures, threats) in every position.",
        ));
    }

    recs
}

/// Recommendations across every game in the report. Empty for an empty report.
pub fn for_report(report: &AggregateReport) -> Vec<Recommendation> {
    let mut recs = Vec::new();
    if report.games == 0 {
        return recs;
    }

    let accuracy = report.average_accuracy();
    if accuracy < 70.0 {
        recs.push(Recommendation::new(
            Priority::High,
            "Overall Accuracy",
            format!("Your average accuracy is {accuracy:.1}%, which is below the target of 70%+"),
            "Focus on basic tactical training. Solve 10-15 tactical puzzles daily.",
        ));
    } else if accuracy < 80.0 {
        recs.push(Recommendation::new(
            Priority::Medium,
            "Accuracy Improvement",
            format!("Your accuracy of {accuracy:.1}% is decent but can be improved"),
            "Work on calculation depth. Practice visualizing 3-4 moves ahead.",
        ));
    }

    let blunders = report.average_blunders();
    if blunders > 2.0 {
        recs.push(Recommendation::new(
            Priority::High,
            "Blunder Reduction",
            format!("You average {blunders:.1} blunders per game, which is quite high"),
            "Before each move, ask: \"What is my opponent threatening?\" and \"Is my piece safe?\"",
        ));
    } else if blunders > 1.0 {
        recs.push(Recommendation::new(
            Priority::Medium,
            "Blunder Control",
            format!("You average {blunders:.1} blunders per game"),
            "Slow down in critical positions. Take extra time when material is at stake.",
        ));
    }

    let mistakes = report.average_mistakes();
    if mistakes > 3.0 {
        recs.push(Recommendation::new(
            Priority::Medium,
            "Mistake Reduction",
            format!("You average {mistakes:.1} mistakes per game"),
            "Improve your positional understanding. Study typical pawn structures and piece placement.",
        ));
    }

    if let Some((time_class, stats)) = report.worst_time_class(MIN_TIME_CLASS_GAMES) {
        let rate = stats.serious_error_rate();
        if rate > 2.0 {
            recs.push(Recommendation {
                priority: Priority::Low,
                area: format!("{} Time Control", capitalize(time_class)),
                issue: format!("You make {rate:.1} errors per game in {time_class} games"),
                advice: format!(
                    "Consider playing longer time controls to improve your {time_class} performance."
                ),
            });
        }
    }

    let phases = &report.phases;
    if phases.endgame.blunders > phases.opening.blunders
        && phases.endgame.blunders > phases.middlegame.blunders
    {
        recs.push(Recommendation::new(
            Priority::Medium,
            "Endgame Technique",
            format!(
                "You blunder more in endgames ({} blunders) than in the opening ({}) or middlegame ({})",
                phases.endgame.blunders, phases.opening.blunders, phases.middlegame.blunders
            ),
            "Study basic endgames and keep calculating when the board simplifies.",
        ));
    }

    recs
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use chess_core::{PlayerColor, TimeClass};

    use super::*;

    fn game(blunders: u32, mistakes: u32, missed_tactics: u32, accuracy: f64) -> GameTacticalResult {
        GameTacticalResult {
            game_id: "g".into(),
            player_color: PlayerColor::Black,
            time_class: Some(TimeClass::Blitz),
            outcome: None,
            total_plies: 60,
            moves: Vec::new(),
            blunders,
            mistakes,
            inaccuracies: 0,
            good_moves: 0,
            missed_tactics,
            unknown_moves: 0,
            accuracy,
            estimated: false,
        }
    }

    fn areas(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.area.as_str()).collect()
    }

    #[test]
    fn test_for_game_thresholds() {
        assert!(for_game(&game(2, 0, 3, 70.0)).is_empty());

        let recs = for_game(&game(3, 0, 4, 69.9));
        assert_eq!(
            areas(&recs),
            ["Reduce Blunders", "Improve Calculation Accuracy", "Improve Tactical Vision"]
        );
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(recs[2].priority, Priority::Medium);
    }

    #[test]
    fn test_for_report_accuracy_and_blunders() {
        let mut report = AggregateReport::default();
        report.record(&game(2, 0, 0, 75.0));
        report.record(&game(1, 0, 0, 75.0));
        let recs = for_report(&report);
        assert_eq!(areas(&recs), ["Accuracy Improvement", "Blunder Control"]);
        assert!(recs.iter().all(|r| r.priority == Priority::Medium));

        let mut bad = AggregateReport::default();
        bad.record(&game(5, 4, 0, 40.0));
        let recs = for_report(&bad);
        assert_eq!(
            areas(&recs),
            ["Overall Accuracy", "Blunder Reduction", "Mistake Reduction"]
        );
    }

    #[test]
    fn test_for_report_worst_time_class() {
        let mut report = AggregateReport::default();
        for _ in 0..3 {
            report.record(&game(1, 2, 0, 90.0));
        }
        let recs = for_report(&report);
        let tc = recs.iter().find(|r| r.priority == Priority::Low).unwrap();
        assert_eq!(tc.area, "Blitz Time Control");
        assert!(tc.issue.contains("3.0 errors per game in blitz"));
    }

    #[test]
    fn test_for_report_endgame_technique() {
        use crate::classifier::Classification;
        use crate::walker::MoveRecord;

        let blunder_at = |ply_index: usize| MoveRecord {
            ply_index,
            move_number: (ply_index + 1) / 2,
            move_notation: "Kd2".into(),
            move_uci: "e1d2".into(),
            is_analyzed_player: true,
            eval_before: Some(0),
            eval_after: Some(-400),
            eval_change: Some(-400),
            best_move_notation: None,
            best_move_uci: None,
            missed_opportunity: None,
            classification: Classification::Blunder,
            missed_tactic: false,
        };
        let mut result = game(2, 0, 0, 90.0);
        result.moves = vec![blunder_at(45), blunder_at(61)];

        let mut report = AggregateReport::default();
        report.record(&result);
        let recs = for_report(&report);
        assert!(areas(&recs).contains(&"Endgame Technique"));

        result.moves.push(blunder_at(7));
        result.moves.push(blunder_at(9));
        let mut even = AggregateReport::default();
        even.record(&result);
        assert!(!areas(&for_report(&even)).contains(&"Endgame Technique"));
    }

    #[test]
    fn test_for_report_empty() {
        assert!(for_report(&AggregateReport::default()).is_empty());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("bullet"), "Bullet");
        assert_eq!(capitalize(""), "");
    }
}
