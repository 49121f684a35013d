//! Service modules for the unify engine

pub mod game_matcher;
pub mod library;
pub mod plugin_registry;
pub mod scan_orchestrator;

pub use game_matcher::{normalize_title, title_similarity, GameMatcher, MatchCandidate};
pub use library::{AddOutcome, GameLibrary, LibraryError, SplitOutcome};
pub use plugin_registry::{PluginHandle, PluginRegistry, RegistryError};
pub use scan_orchestrator::ScanOrchestrator;
