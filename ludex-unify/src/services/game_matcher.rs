//! Game matching strategies
//!
//! Decides whether a fresh detection refers to the same real-world game as
//! an existing unified entry. Pure lookup over the current library: no
//! mutation, no I/O, fully deterministic.
//!
//! Shared external-database ids (IGDB, Steam appid, ...) are authoritative
//! evidence and take precedence over every title strategy; the configured
//! strategy only decides how titles are compared when no id evidence is
//! available. `Manual` disables automatic matching entirely.

use crate::models::UnifiedGame;
use ludex_common::config::{MatchConfig, MatchStrategy};
use ludex_common::model::{DetectedGame, ExternalId, IdentificationResult};
use uuid::Uuid;

/// Candidate view handed to the matcher
///
/// Carries the detected title plus any identifications already known for
/// the candidate, which is where external-id evidence comes from.
#[derive(Debug, Clone, Copy)]
pub struct MatchCandidate<'a> {
    pub title: &'a str,
    pub identifications: &'a [IdentificationResult],
}

impl<'a> MatchCandidate<'a> {
    pub fn from_detected(detected: &'a DetectedGame) -> Self {
        Self {
            title: &detected.title,
            identifications: &[],
        }
    }

    pub fn with_identifications(
        title: &'a str,
        identifications: &'a [IdentificationResult],
    ) -> Self {
        Self {
            title,
            identifications,
        }
    }
}

/// Strategy-driven candidate lookup
#[derive(Debug, Clone)]
pub struct GameMatcher {
    config: MatchConfig,
}

impl GameMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Find the existing game the candidate should fold into, if any
    ///
    /// Iterates `games` in insertion order, which makes every strategy
    /// deterministic: the first hit wins for id and equality strategies,
    /// and fuzzy ties resolve toward the earlier entry.
    pub fn match_candidate(
        &self,
        candidate: &MatchCandidate<'_>,
        games: &[UnifiedGame],
    ) -> Option<Uuid> {
        if self.config.strategy == MatchStrategy::Manual {
            return None;
        }

        if let Some(id) = match_by_external_id(candidate, games) {
            return Some(id);
        }

        match self.config.strategy {
            MatchStrategy::ExactTitle => match_exact_title(candidate, games),
            MatchStrategy::NormalizedTitle => match_normalized_title(candidate, games),
            MatchStrategy::FuzzyTitle => self.match_fuzzy_title(candidate, games),
            // Id evidence was already consulted above; these never fall
            // back to titles.
            MatchStrategy::ExternalId | MatchStrategy::Manual => None,
        }
    }

    /// Best fuzzy hit at or above the configured threshold
    ///
    /// Ties on similarity resolve toward the game with more sources, then
    /// toward the earlier insertion. The comparison is inclusive: a score
    /// exactly at the threshold matches.
    fn match_fuzzy_title(
        &self,
        candidate: &MatchCandidate<'_>,
        games: &[UnifiedGame],
    ) -> Option<Uuid> {
        let normalized = normalize_title(candidate.title);
        if normalized.is_empty() {
            return None;
        }

        let mut best: Option<(f64, usize, Uuid)> = None;
        for game in games {
            let score = strsim::normalized_levenshtein(&normalized, &normalize_title(&game.title));
            if score < self.config.fuzzy_threshold {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_score, best_sources, _)) => {
                    score > best_score
                        || (score == best_score && game.sources.len() > best_sources)
                }
            };
            if better {
                best = Some((score, game.sources.len(), game.id));
            }
        }
        best.map(|(_, _, id)| id)
    }
}

/// Normalize a title for comparison
///
/// Lowercases, keeps alphanumerics, turns whitespace runs into single
/// spaces, and drops everything else. "The Witcher® 3: Wild Hunt" and
/// "the witcher 3 wild hunt" normalize identically.
pub fn normalize_title(title: &str) -> String {
    let mut kept = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            kept.extend(c.to_lowercase());
        } else if c.is_whitespace() {
            kept.push(' ');
        }
    }
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized Levenshtein similarity between two titles (0.0-1.0),
/// computed over their normalized forms
pub fn title_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize_title(a), &normalize_title(b))
}

fn match_by_external_id(candidate: &MatchCandidate<'_>, games: &[UnifiedGame]) -> Option<Uuid> {
    let candidate_ids: Vec<&ExternalId> = candidate
        .identifications
        .iter()
        .flat_map(|ident| ident.external_ids().iter())
        .collect();
    if candidate_ids.is_empty() {
        return None;
    }

    games
        .iter()
        .find(|game| {
            game.identifications
                .iter()
                .flat_map(|ident| ident.external_ids().iter())
                .any(|known| candidate_ids.iter().any(|c| *c == known))
        })
        .map(|game| game.id)
}

fn match_exact_title(candidate: &MatchCandidate<'_>, games: &[UnifiedGame]) -> Option<Uuid> {
    games
        .iter()
        .find(|game| game.title == candidate.title)
        .map(|game| game.id)
}

fn match_normalized_title(candidate: &MatchCandidate<'_>, games: &[UnifiedGame]) -> Option<Uuid> {
    let normalized = normalize_title(candidate.title);
    // Two punctuation-only titles normalizing to "" are not the same game
    if normalized.is_empty() {
        return None;
    }
    games
        .iter()
        .find(|game| normalize_title(&game.title) == normalized)
        .map(|game| game.id)
}
