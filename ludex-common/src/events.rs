//! Event types for the Ludex event system
//!
//! Provides the shared `LibraryEvent` vocabulary and the `EventBus` used to
//! broadcast library and scan-pass changes to whatever UI layer is embedding
//! the engine. Events serialize with a `type` tag so they can go straight
//! onto any transport the application chooses.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Ludex event types
///
/// Emitted by the scan orchestrator during scan/identify passes and by the
/// application layer around manual overrides. Exhaustively matchable; all
/// variants carry a UTC timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LibraryEvent {
    /// A scan-then-identify pass started
    ///
    /// Triggers:
    /// - UI: show pass progress indicator
    ScanStarted {
        /// Scan session identifier
        session_id: Uuid,
        /// Ids of the source plugins that will be scanned
        sources: Vec<String>,
        /// When the pass started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One source plugin finished scanning
    SourceScanCompleted {
        session_id: Uuid,
        /// Source plugin that completed
        source_id: String,
        /// Number of games the source reported
        games_found: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One source plugin failed; the pass continues without it
    ///
    /// Triggers:
    /// - UI: surface per-source warning, keep progress running
    SourceScanFailed {
        session_id: Uuid,
        source_id: String,
        /// Plugin failure rendered for display
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An identifier plugin failed for one game; the pass continues
    IdentificationFailed {
        session_id: Uuid,
        /// Unified game the lookup was for
        game_id: Uuid,
        identifier_id: String,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic pass progress update
    ///
    /// Triggers:
    /// - UI: update progress bar
    ScanProgress {
        session_id: Uuid,
        /// Pass phase ("scanning" or "identifying")
        phase: String,
        current: usize,
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A scan-then-identify pass finished
    ScanCompleted {
        session_id: Uuid,
        /// Detections reported across all sources
        games_detected: usize,
        /// Brand-new unified games created
        games_new: usize,
        /// Detections folded into existing unified games
        games_matched: usize,
        /// Detections that refreshed an already-known source pair
        games_refreshed: usize,
        /// Identifications attached during the identify phase
        games_identified: usize,
        /// Wall-clock pass duration
        duration_seconds: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A pass was cancelled by the user
    ScanCancelled {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new unified game entered the library
    ///
    /// Triggers:
    /// - UI: insert into library view
    GameAdded {
        /// Unified game id
        game_id: Uuid,
        /// Source plugin that detected it
        source_id: String,
        /// Derived title at creation time
        title: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A detection was folded into an existing unified game
    SourceAttached {
        game_id: Uuid,
        source_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A re-scan refreshed an already-attached source
    SourceRefreshed {
        game_id: Uuid,
        source_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An identification was attached (or replaced) on a unified game
    ///
    /// Triggers:
    /// - UI: refresh title/artwork for the entry
    GameIdentified {
        game_id: Uuid,
        identifier_id: String,
        /// Confidence of the new identification (0.0-1.0)
        confidence: f32,
        /// Derived title after recomputation
        title: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Manual merge: one unified game absorbed another
    GamesMerged {
        /// Surviving unified game
        kept_id: Uuid,
        /// Aggregate that was absorbed and deleted
        absorbed_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Manual split: one source's contribution extracted into a new game
    GameSplit {
        /// Game the source was extracted from
        original_id: Uuid,
        /// Newly created game holding the extracted source
        new_id: Uuid,
        /// Source plugin whose contribution moved
        source_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Central event distribution bus for application-wide events
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use ludex_common::events::{EventBus, LibraryEvent};
/// use std::sync::Arc;
///
/// let event_bus = Arc::new(EventBus::new(100));
///
/// // Subscribe to events
/// let mut rx = event_bus.subscribe();
///
/// // Emit an event
/// event_bus.emit(LibraryEvent::GameAdded {
///     game_id: uuid::Uuid::new_v4(),
///     source_id: "steam".to_string(),
///     title: "Team Fortress 2".to_string(),
///     timestamp: chrono::Utc::now(),
/// }).ok();
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LibraryEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    ///
    /// Desktop deployments typically use 1000; tests get by with 10-100.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: LibraryEvent,
    ) -> Result<usize, broadcast::error::SendError<LibraryEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Used for progress-style events where a missing listener is fine.
    pub fn emit_lossy(&self, event: LibraryEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
