//! Scan pass state tracking
//!
//! A [`ScanSession`] records one orchestrated pass over the registered
//! source plugins: which sources took part, how far the pass has
//! progressed, and which plugin calls failed along the way. Failures are
//! accumulated as [`ScanIssue`]s; a failing plugin never aborts the pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scan pass state machine
///
/// ```text
/// SCANNING → IDENTIFYING → COMPLETED
///     │            │
///     └────────────┴─────→ CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanState {
    /// Collecting detections from source plugins
    Scanning,
    /// Looking up metadata through identifier plugins
    Identifying,
    /// Pass finished; per-plugin failures, if any, are on the session
    Completed,
    /// Pass stopped early by cancellation
    Cancelled,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Completed | ScanState::Cancelled)
    }
}

/// Progress counters for an in-flight scan pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Units completed in the current phase (sources scanned, games
    /// identified)
    pub current: usize,
    /// Units total in the current phase
    pub total: usize,
    pub percentage: f64,
    pub current_operation: String,
    pub games_detected: usize,
    pub games_new: usize,
    pub games_matched: usize,
    pub games_refreshed: usize,
    pub games_identified: usize,
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self {
            current: 0,
            total: 0,
            percentage: 0.0,
            current_operation: "Starting scan...".to_string(),
            games_detected: 0,
            games_new: 0,
            games_matched: 0,
            games_refreshed: 0,
            games_identified: 0,
        }
    }
}

/// Skip-and-report record for a failed plugin call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanIssue {
    pub plugin_id: String,
    /// Phase the failure occurred in
    pub phase: ScanState,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// One orchestrated pass over the registered sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSession {
    pub session_id: Uuid,
    pub state: ScanState,
    /// Ids of the source plugins included in this pass
    pub sources: Vec<String>,
    pub progress: ScanProgress,
    pub issues: Vec<ScanIssue>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ScanSession {
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: ScanState::Scanning,
            sources,
            progress: ScanProgress::default(),
            issues: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Move to a new state, stamping `ended_at` on terminal states
    pub fn transition_to(&mut self, new_state: ScanState) {
        self.state = new_state;
        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn update_progress(&mut self, current: usize, total: usize, operation: impl Into<String>) {
        self.progress.current = current;
        self.progress.total = total;
        self.progress.percentage = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        self.progress.current_operation = operation.into();
    }

    pub fn record_issue(&mut self, plugin_id: &str, phase: ScanState, message: impl Into<String>) {
        self.issues.push(ScanIssue {
            plugin_id: plugin_id.to_string(),
            phase,
            message: message.into(),
            occurred_at: Utc::now(),
        });
    }

    /// Wall-clock seconds from start to end; `None` while the pass runs
    pub fn duration_seconds(&self) -> Option<i64> {
        self.ended_at
            .map(|ended| (ended - self.started_at).num_seconds())
    }
}
