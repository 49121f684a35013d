//! Data models for the unify engine

pub mod scan_session;
pub mod unified_game;

pub use scan_session::{ScanIssue, ScanProgress, ScanSession, ScanState};
pub use unified_game::{GameSource, GameState, UnifiedGame, UserState};
