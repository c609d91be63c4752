use serde::{Deserialize, Serialize};
use shakmaty::{Color, Move};

use crate::error::NormalizationError;
use crate::moves::resolve_san_moves;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub white: String,
    pub black: String,
    pub result: String, // "1-0", "0-1", "1/2-1/2"
    pub date: Option<String>,
    pub time_control: Option<String>,
    pub eco: Option<String>,
    pub event: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameData {
    pub metadata: GameMetadata,
    pub moves: Vec<String>, // SAN notation
    pub pgn: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl From<PlayerColor> for Color {
    fn from(color: PlayerColor) -> Self {
        match color {
            PlayerColor::White => Color::White,
            PlayerColor::Black => Color::Black,
        }
    }
}

/// Game result from the analyzed player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
    Draw,
}

impl GameOutcome {
    /// Read a PGN `Result` tag for the given side. `*` and unknown tags give `None`.
    pub fn from_result(result: &str, player: PlayerColor) -> Option<Self> {
        match (result.trim(), player) {
            ("1-0", PlayerColor::White) | ("0-1", PlayerColor::Black) => Some(GameOutcome::Win),
            ("0-1", PlayerColor::White) | ("1-0", PlayerColor::Black) => Some(GameOutcome::Loss),
            ("1/2-1/2", _) => Some(GameOutcome::Draw),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameOutcome::Win => "win",
            GameOutcome::Loss => "loss",
            GameOutcome::Draw => "draw",
        }
    }
}

/// Time control category, estimated from base time plus 40 increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeClass {
    UltraBullet,
    Bullet,
    Blitz,
    Rapid,
    Classical,
    Correspondence,
}

impl TimeClass {
    pub fn from_seconds(initial: u64, increment: u64) -> Option<Self> {
        if initial == 0 && increment == 0 {
            return None;
        }
        if initial >= 86_400 {
            return Some(TimeClass::Correspondence);
        }
        let estimated = initial.saturating_add(increment.saturating_mul(40));
        Some(match estimated {
            0..=29 => TimeClass::UltraBullet,
            30..=179 => TimeClass::Bullet,
            180..=599 => TimeClass::Blitz,
            600..=1799 => TimeClass::Rapid,
            _ => TimeClass::Classical,
        })
    }

    /// Parse a PGN `TimeControl` tag such as `600`, `180+2`, `1/259200` or `-`.
    pub fn from_time_control(time_control: &str) -> Option<Self> {
        let tc = time_control.trim();
        if tc == "-" || tc.contains('/') {
            return Some(TimeClass::Correspondence);
        }
        let mut parts = tc.split('+');
        let initial: u64 = parts.next()?.trim().parse().ok()?;
        let increment: u64 = match parts.next() {
            Some(inc) => inc.trim().parse().ok()?,
            None => 0,
        };
        Self::from_seconds(initial, increment)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeClass::UltraBullet => "ultrabullet",
            TimeClass::Bullet => "bullet",
            TimeClass::Blitz => "blitz",
            TimeClass::Rapid => "rapid",
            TimeClass::Classical => "classical",
            TimeClass::Correspondence => "correspondence",
        }
    }
}

/// A game reduced to what the move walker needs: legal moves and the player's side.
#[derive(Debug, Clone)]
pub struct NormalizedGame {
    pub game_id: String,
    pub player_color: PlayerColor,
    pub moves: Vec<Move>,
    pub time_class: Option<TimeClass>,
    pub outcome: Option<GameOutcome>,
}

impl NormalizedGame {
    /// Build a game straight from SAN moves played from the standard start.
    pub fn from_san<S: AsRef<str>>(
        game_id: impl Into<String>,
        player_color: PlayerColor,
        san_moves: &[S],
    ) -> Result<Self, NormalizationError> {
        Ok(Self {
            game_id: game_id.into(),
            player_color,
            moves: resolve_san_moves(san_moves)?,
            time_class: None,
            outcome: None,
        })
    }

    pub fn total_plies(&self) -> usize {
        self.moves.len()
    }
}

impl GameData {
    /// Which side `username` played, matched case-insensitively.
    pub fn player_color(&self, username: &str) -> Result<PlayerColor, NormalizationError> {
        let username = username.to_lowercase();
        if self.metadata.white.to_lowercase() == username {
            Ok(PlayerColor::White)
        } else if self.metadata.black.to_lowercase() == username {
            Ok(PlayerColor::Black)
        } else {
            Err(NormalizationError::PlayerNotFound(username))
        }
    }

    /// Stable identifier: the game link when present, otherwise players and date.
    pub fn game_id(&self) -> String {
        if let Some(link) = &self.metadata.link {
            return link.clone();
        }
        format!(
            "{}-vs-{}-{}",
            self.metadata.white,
            self.metadata.black,
            self.metadata.date.as_deref().unwrap_or("undated")
        )
    }

    pub fn normalize(&self, username: &str) -> Result<NormalizedGame, NormalizationError> {
        let player_color = self.player_color(username)?;
        if self.moves.is_empty() {
            return Err(NormalizationError::EmptyGame);
        }
        let moves = resolve_san_moves(&self.moves)?;

        Ok(NormalizedGame {
            game_id: self.game_id(),
            player_color,
            moves,
            time_class: self
                .metadata
                .time_control
                .as_deref()
                .and_then(TimeClass::from_time_control),
            outcome: GameOutcome::from_result(&self.metadata.result, player_color),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(white: &str, black: &str, result: &str, moves: &[&str]) -> GameData {
        GameData {
            metadata: GameMetadata {
                white: white.to_string(),
                black: black.to_string(),
                result: result.to_string(),
                date: Some("2024.01.02".to_string()),
                time_control: Some("180+2".to_string()),
                eco: None,
                event: None,
                link: None,
            },
            moves: moves.iter().map(|m| m.to_string()).collect(),
            pgn: String::new(),
        }
    }

    #[test]
    fn test_time_class_from_time_control() {
        assert_eq!(TimeClass::from_time_control("15"), Some(TimeClass::UltraBullet));
        assert_eq!(TimeClass::from_time_control("60"), Some(TimeClass::Bullet));
        assert_eq!(TimeClass::from_time_control("180+2"), Some(TimeClass::Blitz));
        assert_eq!(TimeClass::from_time_control("600"), Some(TimeClass::Rapid));
        assert_eq!(TimeClass::from_time_control("1800+30"), Some(TimeClass::Classical));
        assert_eq!(TimeClass::from_time_control("1/259200"), Some(TimeClass::Correspondence));
        assert_eq!(TimeClass::from_time_control("-"), Some(TimeClass::Correspondence));
        assert_eq!(TimeClass::from_time_control("0"), None);
        assert_eq!(TimeClass::from_time_control("abc"), None);
    }

    #[test]
    fn test_huge_increment_saturates() {
        assert_eq!(
            TimeClass::from_time_control("60+500000000000000000"),
            Some(TimeClass::Classical)
        );
        assert_eq!(TimeClass::from_seconds(u64::MAX - 1, u64::MAX), Some(TimeClass::Correspondence));
        assert_eq!(TimeClass::from_seconds(0, u64::MAX), Some(TimeClass::Classical));
    }

    #[test]
    fn test_game_data_json_round_trip() {
        let g = game("Alice", "Bob", "1-0", &["e4", "e5"]);
        let json = serde_json::to_string(&g).unwrap();
        let back: GameData = serde_json::from_str(&json).unwrap();
        assert_eq!(back.metadata.white, "Alice");
        assert_eq!(back.metadata.time_control.as_deref(), Some("180+2"));
        assert_eq!(back.metadata.eco, None);
        assert_eq!(back.moves, vec!["e4", "e5"]);

        assert_eq!(serde_json::to_value(TimeClass::UltraBullet).unwrap(), "ultrabullet");
        assert_eq!(serde_json::to_value(PlayerColor::Black).unwrap(), "black");
        let outcome: GameOutcome = serde_json::from_str("\"draw\"").unwrap();
        assert_eq!(outcome, GameOutcome::Draw);
    }

    #[test]
    fn test_outcome_is_relative_to_player() {
        assert_eq!(GameOutcome::from_result("1-0", PlayerColor::White), Some(GameOutcome::Win));
        assert_eq!(GameOutcome::from_result("1-0", PlayerColor::Black), Some(GameOutcome::Loss));
        assert_eq!(GameOutcome::from_result("1/2-1/2", PlayerColor::Black), Some(GameOutcome::Draw));
        assert_eq!(GameOutcome::from_result("*", PlayerColor::White), None);
    }

    #[test]
    fn test_normalize_resolves_player_and_moves() {
        let g = game("Alice", "Bob", "0-1", &["e4", "e5", "Nf3"]);
        let normalized = g.normalize("bob").unwrap();
        assert_eq!(normalized.player_color, PlayerColor::Black);
        assert_eq!(normalized.moves.len(), 3);
        assert_eq!(normalized.outcome, Some(GameOutcome::Win));
        assert_eq!(normalized.time_class, Some(TimeClass::Blitz));
        assert_eq!(normalized.game_id, "Alice-vs-Bob-2024.01.02");
    }

    #[test]
    fn test_normalize_rejects_unknown_player() {
        let g = game("Alice", "Bob", "1-0", &["e4"]);
        assert_eq!(
            g.normalize("carol").unwrap_err(),
            NormalizationError::PlayerNotFound("carol".to_string())
        );
    }

    #[test]
    fn test_normalize_rejects_empty_game() {
        let g = game("Alice", "Bob", "*", &[]);
        assert_eq!(g.normalize("alice").unwrap_err(), NormalizationError::EmptyGame);
    }
}
