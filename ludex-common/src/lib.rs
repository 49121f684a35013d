//! # Ludex Common Library
//!
//! Shared code for the Ludex game library engine:
//! - Plugin contract (data shapes + capability traits)
//! - Event types (LibraryEvent enum) and EventBus
//! - Error types
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod plugin;

pub use error::{Error, Result};
pub use model::{DetectedGame, ExternalId, GameMetadata, IdentificationResult};
pub use plugin::{IdentifierPlugin, Plugin, PluginError, PluginType, SourcePlugin, StoragePlugin};
