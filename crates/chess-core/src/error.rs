use thiserror::Error;

/// A game record could not be turned into a replayable move list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("Game has no moves")]
    EmptyGame,

    #[error("Non-standard starting position: {0}")]
    NonStandardStart(String),

    #[error("Player '{0}' did not play in this game")]
    PlayerNotFound(String),

    #[error("Invalid move '{san}' at ply {ply}: {reason}")]
    InvalidMove {
        ply: usize,
        san: String,
        reason: String,
    },
}
