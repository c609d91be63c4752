//! SAN resolution over shakmaty.

use shakmaty::{san::SanPlus, Chess, Move, Position};

use crate::error::NormalizationError;

/// Replay SAN moves from the standard start and return the concrete moves.
///
/// Game-result tokens are skipped. The first unparseable or illegal move fails
/// the whole game.
pub fn resolve_san_moves<S: AsRef<str>>(san_moves: &[S]) -> Result<Vec<Move>, NormalizationError> {
    let mut pos = Chess::default();
    let mut moves = Vec::with_capacity(san_moves.len());

    for san_str in san_moves {
        let san_str = san_str
            .as_ref()
            .trim()
            .trim_end_matches(|c: char| c == '!' || c == '?');
        if san_str.is_empty() || matches!(san_str, "1-0" | "0-1" | "1/2-1/2" | "*") {
            continue;
        }
        let ply = moves.len() + 1;

        let san: SanPlus = san_str.parse().map_err(|e| NormalizationError::InvalidMove {
            ply,
            san: san_str.to_string(),
            reason: format!("{e}"),
        })?;

        let mv = san
            .san
            .to_move(&pos)
            .map_err(|e| NormalizationError::InvalidMove {
                ply,
                san: san_str.to_string(),
                reason: format!("{e}"),
            })?;

        pos.play_unchecked(mv.clone());
        moves.push(mv);
    }

    Ok(moves)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_checks_castling_and_annotations() {
        let moves = resolve_san_moves(&[
            "e4", "e5", "Nf3", "Nc6", "Bc4", "Nf6", "O-O", "Bc5", "d3!?", "d6", "Bxf7+",
        ])
        .unwrap();
        assert_eq!(moves.len(), 11);
        assert!(moves[6].is_castle());
        assert!(moves[10].is_capture());
    }

    #[test]
    fn test_skips_result_tokens() {
        let moves = resolve_san_moves(&["e4", "e5", "1-0"]).unwrap();
        assert_eq!(moves.len(), 2);
    }

    #[test]
    fn test_illegal_move_reports_ply() {
        let err = resolve_san_moves(&["e4", "e5", "Ke3"]).unwrap_err();
        match err {
            NormalizationError::InvalidMove { ply, san, .. } => {
                assert_eq!(ply, 3);
                assert_eq!(san, "Ke3");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
