//! Plugin contract for the Ludex engine
//!
//! Defines the capability traits that decouple the merge engine from any
//! specific source/identifier implementation:
//! - **SourcePlugin** discovers games at one origin (storefront, filesystem,
//!   cloud folder) and reports them as [`DetectedGame`] values.
//! - **IdentifierPlugin** looks up canonical metadata for a detection and
//!   reports an [`IdentificationResult`].
//! - **StoragePlugin** persists serialized aggregates in whatever format it
//!   chooses; the engine prescribes none.
//!
//! Plugins never call into the engine. The engine (via the registry) calls
//! out to plugins, which keeps aggregate state single-owner.

use crate::model::{DetectedGame, GameMetadata, IdentificationResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Common Types
// ============================================================================

/// Declared plugin type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    /// Discovers games (Steam scanner, folder scanner, ...)
    Source,
    /// Resolves metadata against a game database
    Identifier,
    /// Persists the unified library
    Storage,
}

impl PluginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginType::Source => "source",
            PluginType::Identifier => "identifier",
            PluginType::Storage => "storage",
        }
    }
}

/// Capabilities a source plugin may advertise
///
/// `Scan` is mandatory; the rest are optional and default to
/// [`PluginError::Unsupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCapability {
    Scan,
    GetGame,
    Launch,
    Install,
    Uninstall,
}

/// Capabilities an identifier plugin may advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierCapability {
    Identify,
    Search,
    /// Refresh the identifier's local database copy
    Update,
}

/// Errors surfaced by plugin calls
///
/// These are failures of the collaborator, not of the merge engine; the scan
/// orchestrator records them and keeps going (skip-and-report).
#[derive(Debug, Error)]
pub enum PluginError {
    /// Plugin was called before successful initialization
    #[error("plugin not ready: {0}")]
    NotReady(String),

    /// Plugin does not implement this optional capability
    #[error("operation not supported by this plugin: {0}")]
    Unsupported(&'static str),

    /// Initialization config was missing or malformed
    #[error("invalid plugin configuration: {0}")]
    InvalidConfig(String),

    /// I/O failure while scanning or loading
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network failure reaching a remote source or database
    #[error("network error: {0}")]
    Network(String),

    /// Remote API returned an error response
    #[error("API error: {0}")]
    Api(String),

    /// Vendor manifest or database content could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Unexpected internal plugin failure
    #[error("internal plugin error: {0}")]
    Internal(String),
}

// ============================================================================
// Plugin Lifecycle Trait
// ============================================================================

/// Base lifecycle every plugin implements
///
/// Implementations are held as `Arc<dyn ...>` handles resolved at startup,
/// so lifecycle methods take `&self`; plugins needing mutable state use
/// interior mutability.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable plugin id ("steam", "launchbox", ...). Registry key; must not
    /// change between versions.
    fn id(&self) -> &str;

    /// Human-readable plugin name
    fn name(&self) -> &str;

    /// Semantic version of the plugin implementation
    fn version(&self) -> &str;

    /// Declared type tag
    fn plugin_type(&self) -> PluginType;

    /// One-time setup with plugin-specific configuration
    async fn initialize(&self, config: &serde_json::Value) -> Result<(), PluginError>;

    /// Whether the plugin initialized successfully and can serve calls
    fn is_ready(&self) -> bool;

    /// Optional teardown before process exit
    async fn cleanup(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

// ============================================================================
// Source Plugin Trait
// ============================================================================

/// A collaborator that discovers games from one origin
///
/// # Example
/// ```rust,ignore
/// use ludex_common::plugin::{Plugin, PluginError, PluginType, SourcePlugin};
/// use ludex_common::model::DetectedGame;
///
/// pub struct SteamSource { /* ... */ }
///
/// #[async_trait::async_trait]
/// impl SourcePlugin for SteamSource {
///     async fn scan(&self) -> Result<Vec<DetectedGame>, PluginError> {
///         // parse appmanifest_*.acf files under steamapps/
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait SourcePlugin: Plugin {
    /// Capabilities this source advertises beyond the mandatory scan
    fn capabilities(&self) -> &[SourceCapability] {
        &[SourceCapability::Scan]
    }

    /// Report every game currently present at this source
    ///
    /// Safe to call repeatedly; reports state, never mutates engine state.
    async fn scan(&self) -> Result<Vec<DetectedGame>, PluginError>;

    /// Look up a single game by its source-local id
    async fn get_game(&self, _id: &str) -> Result<Option<DetectedGame>, PluginError> {
        Err(PluginError::Unsupported("get_game"))
    }

    /// Launch an installed game
    async fn launch(&self, _id: &str) -> Result<(), PluginError> {
        Err(PluginError::Unsupported("launch"))
    }

    /// Begin installation of a game
    async fn install(&self, _id: &str) -> Result<(), PluginError> {
        Err(PluginError::Unsupported("install"))
    }

    /// Begin removal of an installed game
    async fn uninstall(&self, _id: &str) -> Result<(), PluginError> {
        Err(PluginError::Unsupported("uninstall"))
    }
}

// ============================================================================
// Identifier Plugin Trait
// ============================================================================

/// A collaborator that resolves a detection against a metadata database
#[async_trait]
pub trait IdentifierPlugin: Plugin {
    /// Capabilities this identifier advertises
    fn capabilities(&self) -> &[IdentifierCapability] {
        &[IdentifierCapability::Identify]
    }

    /// Attempt to match a detection; `Ok(None)` means "no confident match",
    /// which is a normal outcome, not an error
    async fn identify(
        &self,
        game: &DetectedGame,
    ) -> Result<Option<IdentificationResult>, PluginError>;

    /// Free-text candidate search, optionally narrowed to a platform
    async fn search(
        &self,
        query: &str,
        platform: Option<&str>,
    ) -> Result<Vec<GameMetadata>, PluginError>;

    /// Refresh the identifier's local database copy
    async fn update_database(&self) -> Result<(), PluginError> {
        Err(PluginError::Unsupported("update_database"))
    }
}

// ============================================================================
// Storage Plugin Trait
// ============================================================================

/// A collaborator that persists the unified library
///
/// Aggregates cross this boundary as already-serialized values; the format
/// behind it (files, embedded DB, cloud sync) is entirely the plugin's.
#[async_trait]
pub trait StoragePlugin: Plugin {
    /// Persist the full library snapshot
    async fn save_library(&self, games: &[serde_json::Value]) -> Result<(), PluginError>;

    /// Load the previously persisted snapshot (empty if none exists)
    async fn load_library(&self) -> Result<Vec<serde_json::Value>, PluginError>;
}
