//! PGN parsing utilities: a lightweight regex-based parser.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::NormalizationError;
use crate::game_data::{GameData, GameMetadata};

const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

static HEADER_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).expect("header tag regex"));
static HEADER_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("header line regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("comment regex"));
static SAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?|O-O-O|O-O").expect("SAN regex")
});

/// Parse a single-game PGN string into a GameData struct.
pub fn parse_pgn(pgn: &str) -> Result<GameData, NormalizationError> {
    let mut white = "Unknown".to_string();
    let mut black = "Unknown".to_string();
    let mut result = "*".to_string();
    let mut date = None;
    let mut time_control = None;
    let mut eco = None;
    let mut event = None;
    let mut link = None;
    let mut site = None;
    let mut setup = None;
    let mut fen = None;

    for cap in HEADER_TAG_RE.captures_iter(pgn) {
        let key = &cap[1];
        let value = cap[2].to_string();
        match key {
            "White" => white = value,
            "Black" => black = value,
            "Result" => result = value,
            "Date" => date = Some(value),
            "TimeControl" => time_control = Some(value),
            "ECO" => eco = Some(value),
            "Event" => event = Some(value),
            "Link" => link = Some(value),
            "Site" => site = Some(value),
            "SetUp" => setup = Some(value),
            "FEN" => fen = Some(value),
            _ => {}
        }
    }

    // Filter non-standard positions
    if setup.as_deref() == Some("1") {
        if let Some(f) = fen {
            if f != STANDARD_START_FEN {
                return Err(NormalizationError::NonStandardStart(f));
            }
        }
    }

    // Lichess puts the game URL in Site
    let link = link.or(site.filter(|s| s.starts_with("http")));

    let moves = extract_moves(pgn);
    if moves.is_empty() {
        return Err(NormalizationError::EmptyGame);
    }

    Ok(GameData {
        metadata: GameMetadata {
            white,
            black,
            result,
            date,
            time_control,
            eco,
            event,
            link,
        },
        moves,
        pgn: pgn.to_string(),
    })
}

/// Split a multi-game PGN file into one string per game.
///
/// A new game starts at a header line that follows move text.
pub fn split_games(text: &str) -> Vec<String> {
    let mut games = Vec::new();
    let mut current = String::new();
    let mut seen_moves = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && seen_moves {
            games.push(std::mem::take(&mut current));
            seen_moves = false;
        }
        if !trimmed.is_empty() && !trimmed.starts_with('[') {
            seen_moves = true;
        }
        current.push_str(line);
        current.push('\n');
    }

    if !current.trim().is_empty() {
        games.push(current);
    }
    games
}

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
fn extract_moves(pgn: &str) -> Vec<String> {
    let no_headers = HEADER_LINE_RE.replace_all(pgn, "");
    let no_comments = COMMENT_RE.replace_all(&no_headers, "");
    let no_variations = strip_variations(&no_comments);

    SAN_RE
        .find_iter(&no_variations)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Drop parenthesized variations, nested ones included. An unbalanced `)` is
/// ignored.
fn strip_variations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[Event "Live Chess"]
[Site "Chess.com"]
[Date "2024.03.01"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]
[TimeControl "300+5"]
[Link "https://www.chess.com/game/live/1"]

1. e4 {[%clk 0:05:00]} 1... e5 2. Nf3 Nc6 (2... d6 3. d4) 3. Bb5 a6 4. Ba4 Nf6 5. O-O Be7 1-0
"#;

    #[test]
    fn test_parse_pgn_headers_and_moves() {
        let game = parse_pgn(SAMPLE).unwrap();
        assert_eq!(game.metadata.white, "Alice");
        assert_eq!(game.metadata.black, "Bob");
        assert_eq!(game.metadata.result, "1-0");
        assert_eq!(game.metadata.time_control.as_deref(), Some("300+5"));
        assert_eq!(game.metadata.link.as_deref(), Some("https://www.chess.com/game/live/1"));
        assert_eq!(
            game.moves,
            vec!["e4", "e5", "Nf3", "Nc6", "Bb5", "a6", "Ba4", "Nf6", "O-O", "Be7"]
        );
    }

    #[test]
    fn test_lichess_site_used_as_link() {
        let pgn = "[Site \"https://lichess.org/abcd\"]\n[White \"a\"]\n[Black \"b\"]\n\n1. d4 d5 *\n";
        let game = parse_pgn(pgn).unwrap();
        assert_eq!(game.metadata.link.as_deref(), Some("https://lichess.org/abcd"));
    }

    #[test]
    fn test_rejects_custom_start_position() {
        let pgn = "[SetUp \"1\"]\n[FEN \"8/8/8/8/8/8/8/K6k w - - 0 1\"]\n\n1. Kb2 *\n";
        assert!(matches!(parse_pgn(pgn), Err(NormalizationError::NonStandardStart(_))));
    }

    #[test]
    fn test_rejects_pgn_without_moves() {
        let pgn = "[White \"a\"]\n[Black \"b\"]\n\n*\n";
        assert_eq!(parse_pgn(pgn).unwrap_err(), NormalizationError::EmptyGame);
    }

    #[test]
    fn test_split_games() {
        let text = format!("{SAMPLE}\n{SAMPLE}");
        let games = split_games(&text);
        assert_eq!(games.len(), 2);
        assert!(games.iter().all(|g| parse_pgn(g).is_ok()));
    }

    #[test]
    fn test_nested_variations_are_dropped() {
        let pgn = "[White \"a\"]\n[Black \"b\"]\n\n\
                   1. e4 (1. d4 d5 (1... Nf6 2. c4) 2. c4) 1... e5 (1... c5 (1... e6) 2. Nf3) 2. Nf3 *\n";
        let game = parse_pgn(pgn).unwrap();
        assert_eq!(game.moves, vec!["e4", "e5", "Nf3"]);
    }
}
