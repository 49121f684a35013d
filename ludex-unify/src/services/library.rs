//! Unified game library
//!
//! Owns the full set of [`UnifiedGame`]s and every operation that changes
//! it: folding detections in, attaching identifications, merging, and
//! splitting. Three invariants hold across all of them:
//!
//! - every `(source plugin, source game)` pair is owned by exactly one
//!   unified game
//! - every unified game carries at least one source
//! - derived fields are recomputed before an operation returns
//!
//! Operations that would break an invariant are rejected atomically: a
//! failed merge or split leaves the library exactly as it was. The games
//! vector keeps insertion order, which is the iteration order the matcher
//! relies on for deterministic tie-breaking.

use crate::models::{GameSource, UnifiedGame};
use crate::services::game_matcher::{GameMatcher, MatchCandidate};
use ludex_common::config::MatchConfig;
use ludex_common::model::{DetectedGame, IdentificationResult};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LibraryError {
    /// Referenced unified game does not exist
    #[error("unified game not found: {0}")]
    GameNotFound(Uuid),

    /// The named plugin has no sources attached to the referenced game
    #[error("source '{source_id}' not attached to unified game {game_id}")]
    SourceNotFound { game_id: Uuid, source_id: String },

    /// Operation would leave one source pair owned by two games
    #[error("source pair ({source_id}, {source_game_id}) already owned by unified game {owner_id}")]
    DuplicateSourcePair {
        source_id: String,
        source_game_id: String,
        owner_id: Uuid,
    },

    /// Merging a game into itself
    #[error("cannot merge unified game {0} into itself")]
    SelfMerge(Uuid),

    /// Star ratings are 1-5
    #[error("rating must be 1-5 stars, got {0}")]
    InvalidRating(u8),
}

impl From<LibraryError> for ludex_common::Error {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::GameNotFound(_) | LibraryError::SourceNotFound { .. } => {
                ludex_common::Error::NotFound(e.to_string())
            }
            LibraryError::DuplicateSourcePair { .. }
            | LibraryError::SelfMerge(_)
            | LibraryError::InvalidRating(_) => ludex_common::Error::InvalidInput(e.to_string()),
        }
    }
}

/// How `add_detected_game` folded a detection into the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// No existing game matched; a new unified game was created
    Created(Uuid),
    /// The matcher folded the detection into an existing game as a new
    /// source
    Matched(Uuid),
    /// The pair was already attached; volatile fields were refreshed
    Refreshed(Uuid),
}

impl AddOutcome {
    /// Unified game the detection landed in, however it got there
    pub fn game_id(&self) -> Uuid {
        match self {
            AddOutcome::Created(id) | AddOutcome::Matched(id) | AddOutcome::Refreshed(id) => *id,
        }
    }
}

/// Result of `split_source`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitOutcome {
    /// The named plugin's sources moved into a brand-new unified game
    Split { original_id: Uuid, new_id: Uuid },
    /// Every source belonged to the named plugin; extracting them all
    /// would leave the original empty, so nothing moved
    Unsplit(Uuid),
}

/// The unified game library
#[derive(Debug)]
pub struct GameLibrary {
    matcher: GameMatcher,
    /// Insertion-ordered; matcher iteration order
    games: Vec<UnifiedGame>,
    /// `(source_id, source_game_id)` -> owning unified game
    owners: HashMap<(String, String), Uuid>,
}

impl GameLibrary {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            matcher: GameMatcher::new(config),
            games: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Rebuild a library from previously saved games (restore path)
    ///
    /// Fails with [`LibraryError::DuplicateSourcePair`] if two saved games
    /// claim the same source pair.
    pub fn from_games(config: MatchConfig, games: Vec<UnifiedGame>) -> Result<Self, LibraryError> {
        let mut library = Self::new(config);
        for game in games {
            for source in &game.sources {
                let key = (source.source_id.clone(), source.source_game_id.clone());
                if let Some(owner_id) = library.owners.get(&key).copied() {
                    return Err(LibraryError::DuplicateSourcePair {
                        source_id: key.0,
                        source_game_id: key.1,
                        owner_id,
                    });
                }
                library.owners.insert(key, game.id);
            }
            library.games.push(game);
        }
        Ok(library)
    }

    /// Fold one detection from a source plugin into the library
    ///
    /// Idempotent across re-scans: a pair that is already attached has its
    /// volatile fields refreshed in place and never spawns a duplicate.
    /// Otherwise the configured match strategy decides between attaching
    /// to an existing game and creating a new one.
    pub fn add_detected_game(
        &mut self,
        source_id: &str,
        detected: DetectedGame,
    ) -> Result<AddOutcome, LibraryError> {
        let key = (source_id.to_string(), detected.id.clone());

        if let Some(owner_id) = self.owners.get(&key).copied() {
            let game = self.game_mut(owner_id)?;
            if let Some(source) = game.source_mut(source_id, &key.1) {
                source.refresh(detected);
            }
            game.recompute_derived();
            tracing::debug!(
                game_id = %owner_id,
                source_id,
                source_game_id = %key.1,
                "Re-scan refreshed an already-attached source"
            );
            return Ok(AddOutcome::Refreshed(owner_id));
        }

        let candidate = MatchCandidate::from_detected(&detected);
        let matched = self.matcher.match_candidate(&candidate, &self.games);

        if let Some(game_id) = matched {
            let game = self.game_mut(game_id)?;
            game.sources
                .push(GameSource::from_detection(source_id, detected));
            game.recompute_derived();
            tracing::debug!(
                game_id = %game_id,
                source_id,
                source_game_id = %key.1,
                "Detection matched an existing unified game"
            );
            self.owners.insert(key, game_id);
            return Ok(AddOutcome::Matched(game_id));
        }

        let game = UnifiedGame::from_detection(source_id, detected);
        let game_id = game.id;
        tracing::info!(
            game_id = %game_id,
            title = %game.title,
            source_id,
            "New unified game created"
        );
        self.owners.insert(key, game_id);
        self.games.push(game);
        Ok(AddOutcome::Created(game_id))
    }

    /// Attach an identification to a game, replacing any earlier result
    /// from the same identifier plugin
    pub fn add_identification(
        &mut self,
        game_id: Uuid,
        identification: IdentificationResult,
    ) -> Result<&UnifiedGame, LibraryError> {
        let identifier_id = identification.identifier_id.clone();
        let confidence = identification.confidence;

        let game = self.game_mut(game_id)?;
        // One result per identifier plugin; replacing in place keeps the
        // attachment order that confidence ties resolve on
        match game
            .identifications
            .iter_mut()
            .find(|i| i.identifier_id == identification.identifier_id)
        {
            Some(existing) => *existing = identification,
            None => game.identifications.push(identification),
        }
        game.recompute_derived();
        tracing::debug!(
            game_id = %game_id,
            identifier_id,
            confidence,
            title = %game.title,
            "Identification attached"
        );
        Ok(game)
    }

    /// Fold `absorb_id` into `keep_id` and delete the absorbed game
    ///
    /// The keeper's identifications win plugin conflicts and its user
    /// state survives; the absorbed game's user state is dropped. A merge
    /// that would violate an invariant is rejected before anything
    /// changes.
    pub fn merge_games(
        &mut self,
        keep_id: Uuid,
        absorb_id: Uuid,
    ) -> Result<&UnifiedGame, LibraryError> {
        if keep_id == absorb_id {
            return Err(LibraryError::SelfMerge(keep_id));
        }
        let keep_pos = self.position(keep_id)?;
        let absorb_pos = self.position(absorb_id)?;

        if let Some((source_id, source_game_id)) =
            merge_conflict(&self.games[keep_pos], &self.games[absorb_pos])
        {
            return Err(LibraryError::DuplicateSourcePair {
                source_id,
                source_game_id,
                owner_id: keep_id,
            });
        }

        let absorbed = self.games.remove(absorb_pos);
        let keep_pos = if absorb_pos < keep_pos {
            keep_pos - 1
        } else {
            keep_pos
        };

        for source in &absorbed.sources {
            self.owners.insert(
                (source.source_id.clone(), source.source_game_id.clone()),
                keep_id,
            );
        }

        let keep = &mut self.games[keep_pos];
        keep.sources.extend(absorbed.sources);
        for identification in absorbed.identifications {
            if !keep.has_identification_from(&identification.identifier_id) {
                keep.identifications.push(identification);
            }
        }
        keep.recompute_derived();

        tracing::info!(
            kept_id = %keep_id,
            absorbed_id = %absorb_id,
            sources = keep.sources.len(),
            "Merged unified games"
        );
        Ok(&self.games[keep_pos])
    }

    /// Extract every source of the named plugin into a new unified game
    ///
    /// The inverse of a merge, modulo ids: the extracted sources form a
    /// fresh game appended at the end of the library; identifications stay
    /// with the original. When every source belongs to the named plugin
    /// the split degenerates to a no-op.
    pub fn split_source(
        &mut self,
        game_id: Uuid,
        source_id: &str,
    ) -> Result<SplitOutcome, LibraryError> {
        let pos = self.position(game_id)?;

        let matching = self.games[pos]
            .sources
            .iter()
            .filter(|s| s.source_id == source_id)
            .count();
        if matching == 0 {
            return Err(LibraryError::SourceNotFound {
                game_id,
                source_id: source_id.to_string(),
            });
        }
        if matching == self.games[pos].sources.len() {
            tracing::debug!(
                game_id = %game_id,
                source_id,
                "Split is a no-op: every source belongs to this plugin"
            );
            return Ok(SplitOutcome::Unsplit(game_id));
        }

        let game = &mut self.games[pos];
        let (extracted, remaining): (Vec<GameSource>, Vec<GameSource>) = game
            .sources
            .drain(..)
            .partition(|s| s.source_id == source_id);
        game.sources = remaining;
        game.recompute_derived();

        // Identifications stay behind; the new entry derives its title
        // from the extracted snapshot and starts unidentified
        let new_game = UnifiedGame::from_sources(extracted);
        let new_id = new_game.id;
        for source in &new_game.sources {
            self.owners.insert(
                (source.source_id.clone(), source.source_game_id.clone()),
                new_id,
            );
        }
        self.games.push(new_game);

        tracing::info!(
            original_id = %game_id,
            new_id = %new_id,
            source_id,
            "Split source into a new unified game"
        );
        Ok(SplitOutcome::Split {
            original_id: game_id,
            new_id,
        })
    }

    /// All games, in insertion order
    pub fn all_games(&self) -> &[UnifiedGame] {
        &self.games
    }

    pub fn game(&self, game_id: Uuid) -> Option<&UnifiedGame> {
        self.games.iter().find(|g| g.id == game_id)
    }

    /// Which unified game owns a source pair, if any
    pub fn owner_of(&self, source_id: &str, source_game_id: &str) -> Option<Uuid> {
        self.owners
            .get(&(source_id.to_string(), source_game_id.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn match_config(&self) -> &MatchConfig {
        self.matcher.config()
    }

    pub fn set_favorite(&mut self, game_id: Uuid, favorite: bool) -> Result<(), LibraryError> {
        self.game_mut(game_id)?.user.favorite = favorite;
        Ok(())
    }

    pub fn set_hidden(&mut self, game_id: Uuid, hidden: bool) -> Result<(), LibraryError> {
        self.game_mut(game_id)?.user.hidden = hidden;
        Ok(())
    }

    pub fn set_tags(&mut self, game_id: Uuid, tags: Vec<String>) -> Result<(), LibraryError> {
        self.game_mut(game_id)?.user.tags = tags;
        Ok(())
    }

    pub fn set_rating(&mut self, game_id: Uuid, rating: Option<u8>) -> Result<(), LibraryError> {
        if let Some(stars) = rating {
            if !(1..=5).contains(&stars) {
                return Err(LibraryError::InvalidRating(stars));
            }
        }
        self.game_mut(game_id)?.user.rating = rating;
        Ok(())
    }

    fn game_mut(&mut self, game_id: Uuid) -> Result<&mut UnifiedGame, LibraryError> {
        self.games
            .iter_mut()
            .find(|g| g.id == game_id)
            .ok_or(LibraryError::GameNotFound(game_id))
    }

    fn position(&self, game_id: Uuid) -> Result<usize, LibraryError> {
        self.games
            .iter()
            .position(|g| g.id == game_id)
            .ok_or(LibraryError::GameNotFound(game_id))
    }
}

/// First source pair present on both games, if any
fn merge_conflict(keep: &UnifiedGame, absorb: &UnifiedGame) -> Option<(String, String)> {
    absorb
        .sources
        .iter()
        .find(|s| keep.has_source_pair(&s.source_id, &s.source_game_id))
        .map(|s| (s.source_id.clone(), s.source_game_id.clone()))
}
