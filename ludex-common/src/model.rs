//! Canonical data shapes exchanged between plugins and the merge engine
//!
//! One DetectedGame shape is used uniformly by every source plugin; there is
//! deliberately no scanner-internal variant. Identifier plugins answer with
//! IdentificationResult values carrying confidence-scored metadata.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A game as reported by exactly one source plugin during a scan
///
/// Created fresh on every scan invocation; never persisted by the merge
/// engine itself. The `id` is opaque and unique only within its source
/// (a Steam appid, a filesystem path, a storefront SKU).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedGame {
    /// Source-local game id (opaque, unique within the reporting source)
    pub id: String,
    /// Display title as the source knows it
    pub title: String,
    /// Whether the source reports the game as installed
    pub installed: bool,
    /// When the source last saw the game played
    pub last_played: Option<DateTime<Utc>>,
    /// Accumulated playtime in minutes, if the source tracks it
    pub playtime_minutes: Option<u64>,
    /// Free-form source-specific metadata (icon paths, manifest fields, ...)
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Platform tag, if the source knows it ("windows", "linux", ...)
    pub platform: Option<String>,
}

impl DetectedGame {
    /// Create a minimal detection; optional fields start empty
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            installed: false,
            last_played: None,
            playtime_minutes: None,
            metadata: HashMap::new(),
            platform: None,
        }
    }
}

/// Provider-qualified external id carried by an identification
///
/// Two identifications refer to the same database entry iff both the
/// provider and the id match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalId {
    /// Metadata provider that minted the id ("launchbox", "igdb", ...)
    pub provider: String,
    /// Provider-local id value
    pub id: String,
}

impl ExternalId {
    pub fn new(provider: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            id: id.into(),
        }
    }
}

/// Resolved metadata for one database match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameMetadata {
    /// Canonical title per the metadata database
    pub title: String,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Box art / cover image URL
    pub cover_url: Option<String>,
    /// Additional media (screenshots, backgrounds, clear logos)
    #[serde(default)]
    pub media_urls: Vec<String>,
    /// Ids this entry carries in external databases
    #[serde(default)]
    pub external_ids: Vec<ExternalId>,
}

impl GameMetadata {
    /// Metadata carrying only a title
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// The output of one identifier plugin matching a DetectedGame
///
/// A detection may receive zero, one, or many of these (one per identifier
/// plugin consulted). Confidence is clamped to 0.0-1.0 at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentificationResult {
    /// Identifier plugin that produced this result
    pub identifier_id: String,
    /// Match confidence (0.0-1.0)
    pub confidence: f32,
    /// Metadata resolved from the identifier's database
    pub metadata: GameMetadata,
}

impl IdentificationResult {
    /// Create a new identification with clamped confidence (0.0-1.0)
    pub fn new(identifier_id: impl Into<String>, confidence: f32, metadata: GameMetadata) -> Self {
        Self {
            identifier_id: identifier_id.into(),
            confidence: confidence.clamp(0.0, 1.0),
            metadata,
        }
    }

    /// External ids carried by this identification
    pub fn external_ids(&self) -> &[ExternalId] {
        &self.metadata.external_ids
    }
}
