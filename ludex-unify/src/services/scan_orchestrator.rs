//! Scan pass orchestration
//!
//! Drives every registered source plugin through a scan, folds the
//! detections into the shared [`GameLibrary`], then sweeps identifier
//! plugins over games that still lack their result:
//!
//! ```text
//! SCANNING → IDENTIFYING → COMPLETED (or CANCELLED)
//! ```
//!
//! Plugin failures never abort a pass: a failing source or identifier is
//! recorded on the session, broadcast on the event bus, and skipped while
//! the remaining plugins keep going. Sources scan concurrently up to the
//! configured limit; every library mutation is serialized through the
//! shared write lock.

use crate::models::{ScanSession, ScanState};
use crate::services::library::{AddOutcome, GameLibrary};
use crate::services::plugin_registry::PluginRegistry;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use ludex_common::config::ScanConfig;
use ludex_common::events::{EventBus, LibraryEvent};
use ludex_common::model::{DetectedGame, IdentificationResult};
use ludex_common::plugin::{IdentifierPlugin, SourcePlugin};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub struct ScanOrchestrator {
    registry: Arc<PluginRegistry>,
    library: Arc<RwLock<GameLibrary>>,
    event_bus: EventBus,
    config: ScanConfig,
}

impl ScanOrchestrator {
    pub fn new(
        registry: Arc<PluginRegistry>,
        library: Arc<RwLock<GameLibrary>>,
        event_bus: EventBus,
        config: ScanConfig,
    ) -> Self {
        Self {
            registry,
            library,
            event_bus,
            config,
        }
    }

    /// Shared library handle this orchestrator folds detections into
    pub fn library(&self) -> Arc<RwLock<GameLibrary>> {
        Arc::clone(&self.library)
    }

    /// Run one full scan pass and return the finished session
    ///
    /// Cancellation is honored between plugin completions; a cancelled
    /// session keeps everything folded in up to that point.
    pub async fn run_scan(&self, cancel_token: &CancellationToken) -> ScanSession {
        let sources = self.registry.all_sources();
        let source_ids: Vec<String> = sources.iter().map(|s| s.id().to_string()).collect();
        let mut session = ScanSession::new(source_ids.clone());

        tracing::info!(
            session_id = %session.session_id,
            sources = sources.len(),
            "Starting scan pass"
        );
        self.event_bus.emit_lossy(LibraryEvent::ScanStarted {
            session_id: session.session_id,
            sources: source_ids,
            timestamp: Utc::now(),
        });

        self.phase_scanning(&mut session, &sources, cancel_token)
            .await;
        if session.is_terminal() {
            return session;
        }
        if cancel_token.is_cancelled() {
            self.cancel(&mut session);
            return session;
        }

        if self.config.identify_after_scan {
            self.phase_identifying(&mut session, cancel_token).await;
            if session.is_terminal() {
                return session;
            }
        }

        session.transition_to(ScanState::Completed);
        session.progress.current_operation = "Scan complete".to_string();
        let duration_seconds =
            u64::try_from(session.duration_seconds().unwrap_or(0)).unwrap_or(0);
        tracing::info!(
            session_id = %session.session_id,
            duration_seconds,
            games_detected = session.progress.games_detected,
            games_new = session.progress.games_new,
            games_matched = session.progress.games_matched,
            games_refreshed = session.progress.games_refreshed,
            games_identified = session.progress.games_identified,
            issues = session.issues.len(),
            "Scan pass completed"
        );
        self.event_bus.emit_lossy(LibraryEvent::ScanCompleted {
            session_id: session.session_id,
            games_detected: session.progress.games_detected,
            games_new: session.progress.games_new,
            games_matched: session.progress.games_matched,
            games_refreshed: session.progress.games_refreshed,
            games_identified: session.progress.games_identified,
            duration_seconds,
            timestamp: Utc::now(),
        });
        session
    }

    /// Phase 1: scan sources concurrently, up to the configured limit
    async fn phase_scanning(
        &self,
        session: &mut ScanSession,
        sources: &[Arc<dyn SourcePlugin>],
        cancel_token: &CancellationToken,
    ) {
        session.transition_to(ScanState::Scanning);
        let total = sources.len();
        session.update_progress(0, total, "Scanning sources...");
        tracing::info!(session_id = %session.session_id, "Phase 1: SCANNING");

        let mut completed = 0usize;
        let mut queue: VecDeque<Arc<dyn SourcePlugin>> = VecDeque::new();
        for source in sources {
            if source.is_ready() {
                queue.push_back(Arc::clone(source));
            } else {
                tracing::warn!(
                    session_id = %session.session_id,
                    source_id = source.id(),
                    "Source plugin not ready, skipping"
                );
                session.record_issue(source.id(), ScanState::Scanning, "plugin not ready");
                self.event_bus.emit_lossy(LibraryEvent::SourceScanFailed {
                    session_id: session.session_id,
                    source_id: source.id().to_string(),
                    error: "plugin not ready".to_string(),
                    timestamp: Utc::now(),
                });
                completed += 1;
            }
        }

        let mut in_flight = FuturesUnordered::new();
        loop {
            while in_flight.len() < self.config.max_concurrent_scans {
                match queue.pop_front() {
                    Some(source) => {
                        let source_id = source.id().to_string();
                        in_flight.push(async move { (source_id, source.scan().await) });
                    }
                    None => break,
                }
            }

            let next = tokio::select! {
                _ = cancel_token.cancelled() => {
                    self.cancel(session);
                    return;
                }
                next = in_flight.next() => next,
            };
            let Some((source_id, result)) = next else {
                break;
            };
            completed += 1;

            match result {
                Ok(detections) => {
                    self.apply_detections(session, &source_id, detections).await;
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %session.session_id,
                        source_id = %source_id,
                        error = %e,
                        "Source scan failed, continuing with remaining sources"
                    );
                    session.record_issue(&source_id, ScanState::Scanning, e.to_string());
                    self.event_bus.emit_lossy(LibraryEvent::SourceScanFailed {
                        session_id: session.session_id,
                        source_id,
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
            session.update_progress(
                completed,
                total,
                format!("Scanned {} of {} sources", completed, total),
            );
            self.broadcast_progress(session, "scanning");
        }
    }

    /// Fold one source's detections into the shared library
    ///
    /// Scans run concurrently, but every mutation funnels through the
    /// write lock held here, one batch at a time.
    async fn apply_detections(
        &self,
        session: &mut ScanSession,
        source_id: &str,
        detections: Vec<DetectedGame>,
    ) {
        let found = detections.len();
        {
            let mut library = self.library.write().await;
            for detected in detections {
                session.progress.games_detected += 1;
                match library.add_detected_game(source_id, detected) {
                    Ok(AddOutcome::Created(game_id)) => {
                        session.progress.games_new += 1;
                        let title = library
                            .game(game_id)
                            .map(|g| g.title.clone())
                            .unwrap_or_default();
                        self.event_bus.emit_lossy(LibraryEvent::GameAdded {
                            game_id,
                            source_id: source_id.to_string(),
                            title,
                            timestamp: Utc::now(),
                        });
                    }
                    Ok(AddOutcome::Matched(game_id)) => {
                        session.progress.games_matched += 1;
                        self.event_bus.emit_lossy(LibraryEvent::SourceAttached {
                            game_id,
                            source_id: source_id.to_string(),
                            timestamp: Utc::now(),
                        });
                    }
                    Ok(AddOutcome::Refreshed(game_id)) => {
                        session.progress.games_refreshed += 1;
                        self.event_bus.emit_lossy(LibraryEvent::SourceRefreshed {
                            game_id,
                            source_id: source_id.to_string(),
                            timestamp: Utc::now(),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            source_id,
                            error = %e,
                            "Failed to fold detection into the library"
                        );
                        session.record_issue(source_id, ScanState::Scanning, e.to_string());
                    }
                }
            }
        }
        tracing::info!(
            session_id = %session.session_id,
            source_id,
            games_found = found,
            "Source scan completed"
        );
        self.event_bus.emit_lossy(LibraryEvent::SourceScanCompleted {
            session_id: session.session_id,
            source_id: source_id.to_string(),
            games_found: found,
            timestamp: Utc::now(),
        });
    }

    /// Phase 2: run identifiers over games missing their result
    async fn phase_identifying(
        &self,
        session: &mut ScanSession,
        cancel_token: &CancellationToken,
    ) {
        session.transition_to(ScanState::Identifying);
        let mut identifiers: Vec<Arc<dyn IdentifierPlugin>> = Vec::new();
        for identifier in self.registry.all_identifiers() {
            if identifier.is_ready() {
                identifiers.push(identifier);
            } else {
                tracing::warn!(
                    session_id = %session.session_id,
                    identifier_id = identifier.id(),
                    "Identifier plugin not ready, skipping"
                );
                session.record_issue(identifier.id(), ScanState::Identifying, "plugin not ready");
            }
        }
        if identifiers.is_empty() {
            tracing::debug!(
                session_id = %session.session_id,
                "No ready identifier plugins, skipping identify phase"
            );
            return;
        }
        tracing::info!(
            session_id = %session.session_id,
            identifiers = identifiers.len(),
            "Phase 2: IDENTIFYING"
        );

        // Snapshot the work under a short read lock: each game lacking a
        // result from some ready identifier, keyed by its first source's
        // detection
        let work: Vec<(Uuid, DetectedGame, Vec<usize>)> = {
            let library = self.library.read().await;
            library
                .all_games()
                .iter()
                .filter_map(|game| {
                    let anchor = game.sources.first()?.detected.clone();
                    let missing: Vec<usize> = identifiers
                        .iter()
                        .enumerate()
                        .filter(|(_, identifier)| !game.has_identification_from(identifier.id()))
                        .map(|(pos, _)| pos)
                        .collect();
                    if missing.is_empty() {
                        None
                    } else {
                        Some((game.id, anchor, missing))
                    }
                })
                .collect()
        };

        let total = work.len();
        session.update_progress(0, total, "Identifying games...");
        for (current, (game_id, detected, missing)) in work.into_iter().enumerate() {
            if cancel_token.is_cancelled() {
                self.cancel(session);
                return;
            }
            for pos in missing {
                let identifier = &identifiers[pos];
                match identifier.identify(&detected).await {
                    Ok(Some(identification)) => {
                        self.apply_identification(session, game_id, identification)
                            .await;
                    }
                    Ok(None) => {
                        tracing::debug!(
                            game_id = %game_id,
                            identifier_id = identifier.id(),
                            "Identifier found no confident match"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            session_id = %session.session_id,
                            identifier_id = identifier.id(),
                            game_id = %game_id,
                            error = %e,
                            "Identifier lookup failed, continuing"
                        );
                        session.record_issue(
                            identifier.id(),
                            ScanState::Identifying,
                            e.to_string(),
                        );
                        self.event_bus.emit_lossy(LibraryEvent::IdentificationFailed {
                            session_id: session.session_id,
                            game_id,
                            identifier_id: identifier.id().to_string(),
                            error: e.to_string(),
                            timestamp: Utc::now(),
                        });
                    }
                }
            }
            session.update_progress(
                current + 1,
                total,
                format!("Identified {} of {} games", current + 1, total),
            );
            self.broadcast_progress(session, "identifying");
        }
    }

    async fn apply_identification(
        &self,
        session: &mut ScanSession,
        game_id: Uuid,
        identification: IdentificationResult,
    ) {
        let identifier_id = identification.identifier_id.clone();
        let confidence = identification.confidence;
        let applied = {
            let mut library = self.library.write().await;
            library
                .add_identification(game_id, identification)
                .map(|game| game.title.clone())
        };
        match applied {
            Ok(title) => {
                session.progress.games_identified += 1;
                tracing::info!(
                    game_id = %game_id,
                    identifier_id = %identifier_id,
                    confidence,
                    title = %title,
                    "Game identified"
                );
                self.event_bus.emit_lossy(LibraryEvent::GameIdentified {
                    game_id,
                    identifier_id,
                    confidence,
                    title,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                // The game can vanish between snapshot and apply (merged
                // or split away); not a pass failure
                tracing::debug!(
                    game_id = %game_id,
                    error = %e,
                    "Identification target no longer present"
                );
            }
        }
    }

    fn cancel(&self, session: &mut ScanSession) {
        tracing::info!(session_id = %session.session_id, "Scan pass cancelled");
        session.transition_to(ScanState::Cancelled);
        self.event_bus.emit_lossy(LibraryEvent::ScanCancelled {
            session_id: session.session_id,
            timestamp: Utc::now(),
        });
    }

    fn broadcast_progress(&self, session: &ScanSession, phase: &str) {
        self.event_bus.emit_lossy(LibraryEvent::ScanProgress {
            session_id: session.session_id,
            phase: phase.to_string(),
            current: session.progress.current,
            total: session.progress.total,
            timestamp: Utc::now(),
        });
    }
}
