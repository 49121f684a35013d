//! # Ludex Unify
//!
//! The matching and merging engine behind a cross-platform game library:
//! source plugins report what is installed where, identifier plugins say
//! what each game actually is, and this crate folds all of it into one
//! deduplicated set of unified games.
//!
//! - [`services::GameLibrary`]: the stateful core (add, identify, merge,
//!   split)
//! - [`services::GameMatcher`]: strategy-driven duplicate detection
//! - [`services::PluginRegistry`]: typed plugin registration and lookup
//! - [`services::ScanOrchestrator`]: the concurrent scan-then-identify pass
//!
//! Plugin traits, shared types, configuration, and the event bus live in
//! [`ludex_common`].

pub mod models;
pub mod services;

pub use models::{GameSource, GameState, ScanSession, ScanState, UnifiedGame, UserState};
pub use services::{
    AddOutcome, GameLibrary, GameMatcher, LibraryError, PluginRegistry, ScanOrchestrator,
    SplitOutcome,
};
