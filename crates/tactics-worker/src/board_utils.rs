//! Board helpers over shakmaty: applying moves and naming positions and moves.

use shakmaty::{fen::Fen, san::San, uci::UciMove, CastlingMode, Chess, EnPassantMode, Move, Position};

/// Return the position after `mv`, leaving `pos` untouched.
///
/// `mv` must be legal in `pos`.
pub fn apply(pos: &Chess, mv: &Move) -> Chess {
    let mut next = pos.clone();
    next.play_unchecked(mv.clone());
    next
}

/// FEN identifying the position, as sent to the engine.
pub fn fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Standard algebraic notation of `mv` in `pos`.
pub fn san(pos: &Chess, mv: &Move) -> String {
    San::from_move(pos, mv.clone()).to_string()
}

/// UCI notation (`e2e4`, `e1g1`, `e7e8q`).
pub fn uci(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// Resolve an engine move string against `pos`. Illegal or malformed gives `None`.
pub fn parse_uci(pos: &Chess, uci: &str) -> Option<Move> {
    let parsed: UciMove = uci.parse().ok()?;
    parsed.to_move(pos).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_does_not_mutate_input() {
        let start = Chess::default();
        let e4 = parse_uci(&start, "e2e4").unwrap();
        let after = apply(&start, &e4);
        assert_eq!(fen(&start), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_eq!(fen(&after), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");
    }

    #[test]
    fn test_notation() {
        let start = Chess::default();
        let nf3 = parse_uci(&start, "g1f3").unwrap();
        assert_eq!(san(&start, &nf3), "Nf3");
        assert_eq!(uci(&nf3), "g1f3");
    }

    #[test]
    fn test_parse_uci_rejects_illegal() {
        let start = Chess::default();
        assert!(parse_uci(&start, "e2e5").is_none());
        assert!(parse_uci(&start, "garbage").is_none());
    }
}
