//! Game records shared by the tactical analysis worker.
//!
//! Turns PGN text into [`GameData`] and resolves a game into the concrete
//! move list and player context the worker replays.

pub mod error;
pub mod game_data;
pub mod moves;
pub mod pgn;

pub use error::NormalizationError;
pub use game_data::{GameData, GameMetadata, GameOutcome, NormalizedGame, PlayerColor, TimeClass};
