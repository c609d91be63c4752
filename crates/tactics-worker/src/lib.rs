pub use shakmaty;

pub mod aggregate;
pub mod batch;
pub mod board_utils;
pub mod cancel;
pub mod classifier;
pub mod config;
pub mod error;
pub mod heuristic;
pub mod patterns;
pub mod recommendations;
pub mod stockfish;
pub mod walker;
