//! Unified game aggregate
//!
//! A [`UnifiedGame`] is the library's canonical view of one real-world game,
//! folding together every store that reports it. Each store contributes a
//! [`GameSource`]; identifier plugins contribute
//! [`IdentificationResult`](ludex_common::model::IdentificationResult)s.
//! Display fields (`title`, `is_installed`, playtime, `last_played`) are
//! derived from those two sets and recomputed whenever either set changes.

use chrono::{DateTime, Utc};
use ludex_common::model::{DetectedGame, IdentificationResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle classification of a unified game
///
/// Purely descriptive: computed from the source and identification sets,
/// never stored or transitioned explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameState {
    /// Single source, no identification yet
    Provisional,
    /// Single source with at least one identification attached
    Identified,
    /// Two or more sources folded together
    Merged,
}

/// One store's view of a game, owned by exactly one unified entry
///
/// The `(source_id, source_game_id)` pair is unique across the whole
/// library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSource {
    /// Id of the source plugin that reported the game
    pub source_id: String,
    /// The game's id inside that source (Steam appid, Epic catalog id, ...)
    pub source_game_id: String,
    /// Latest detection for this pair. Volatile fields track re-scans;
    /// `title` and `platform` keep their first-seen values so derived
    /// fields stay stable while a game remains unidentified.
    pub detected: DetectedGame,
    /// When this source was first attached
    pub attached_at: DateTime<Utc>,
}

impl GameSource {
    pub fn from_detection(source_id: &str, detected: DetectedGame) -> Self {
        Self {
            source_id: source_id.to_string(),
            source_game_id: detected.id.clone(),
            detected,
            attached_at: Utc::now(),
        }
    }

    /// Fold a re-scan of the same pair into this source
    ///
    /// Only volatile attributes change: installation state, last-played,
    /// playtime, and the free-form metadata blob. The detected title and
    /// platform stay as first seen.
    pub fn refresh(&mut self, latest: DetectedGame) {
        self.detected.installed = latest.installed;
        self.detected.last_played = latest.last_played;
        self.detected.playtime_minutes = latest.playtime_minutes;
        self.detected.metadata = latest.metadata;
    }
}

/// User-controlled fields
///
/// Never touched by scans, matching, or merges. A merge keeps the surviving
/// game's user state and discards the absorbed game's.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Star rating, 1-5
    pub rating: Option<u8>,
}

/// Canonical library entry for one real-world game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedGame {
    pub id: Uuid,
    /// Derived: best identification's title, else the first source's
    /// detected title
    pub title: String,
    /// Derived: the first source's detected platform
    pub platform: Option<String>,
    /// Store views folded into this entry, in attachment order
    pub sources: Vec<GameSource>,
    /// At most one entry per identifier plugin
    pub identifications: Vec<IdentificationResult>,
    /// Derived: true if any source reports the game installed
    pub is_installed: bool,
    /// Derived: sum of per-source playtime, absent values counting as zero
    pub total_playtime_minutes: u64,
    /// Derived: most recent last-played across sources
    pub last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: UserState,
}

impl UnifiedGame {
    /// Create a fresh entry from a single detection
    pub fn from_detection(source_id: &str, detected: DetectedGame) -> Self {
        Self::from_sources(vec![GameSource::from_detection(source_id, detected)])
    }

    /// Create an entry around an existing set of sources (split path)
    ///
    /// Callers guarantee `sources` is non-empty; every unified game carries
    /// at least one source.
    pub(crate) fn from_sources(sources: Vec<GameSource>) -> Self {
        let mut game = Self {
            id: Uuid::new_v4(),
            title: String::new(),
            platform: None,
            sources,
            identifications: Vec::new(),
            is_installed: false,
            total_playtime_minutes: 0,
            last_played: None,
            user: UserState::default(),
        };
        game.recompute_derived();
        game
    }

    /// Recompute every derived field from the current source and
    /// identification sets
    ///
    /// Must be called after any change to either set. Derivation rules:
    /// - `title`: highest-confidence identification's title; on a confidence
    ///   tie the earliest-attached identification wins; with no
    ///   identifications, the first source's detected title
    /// - `platform`: the first source's detected platform
    /// - `is_installed`: OR across sources
    /// - `total_playtime_minutes`: sum across sources, absent values as zero
    /// - `last_played`: maximum across sources
    pub fn recompute_derived(&mut self) {
        self.is_installed = self.sources.iter().any(|s| s.detected.installed);
        self.total_playtime_minutes = self
            .sources
            .iter()
            .filter_map(|s| s.detected.playtime_minutes)
            .sum();
        self.last_played = self
            .sources
            .iter()
            .filter_map(|s| s.detected.last_played)
            .max();

        let derived_title = self
            .best_identification()
            .map(|ident| ident.metadata.title.clone())
            .or_else(|| self.sources.first().map(|s| s.detected.title.clone()));
        if let Some(title) = derived_title {
            self.title = title;
        }
        self.platform = self
            .sources
            .first()
            .and_then(|s| s.detected.platform.clone());
    }

    /// Highest-confidence identification; earliest attached wins ties
    pub fn best_identification(&self) -> Option<&IdentificationResult> {
        let mut best: Option<&IdentificationResult> = None;
        for ident in &self.identifications {
            match best {
                Some(current) if ident.confidence <= current.confidence => {}
                _ => best = Some(ident),
            }
        }
        best
    }

    pub fn state(&self) -> GameState {
        if self.sources.len() >= 2 {
            GameState::Merged
        } else if !self.identifications.is_empty() {
            GameState::Identified
        } else {
            GameState::Provisional
        }
    }

    pub fn has_source_pair(&self, source_id: &str, source_game_id: &str) -> bool {
        self.sources
            .iter()
            .any(|s| s.source_id == source_id && s.source_game_id == source_game_id)
    }

    pub fn source_mut(
        &mut self,
        source_id: &str,
        source_game_id: &str,
    ) -> Option<&mut GameSource> {
        self.sources
            .iter_mut()
            .find(|s| s.source_id == source_id && s.source_game_id == source_game_id)
    }

    pub fn has_identification_from(&self, identifier_id: &str) -> bool {
        self.identifications
            .iter()
            .any(|i| i.identifier_id == identifier_id)
    }
}
