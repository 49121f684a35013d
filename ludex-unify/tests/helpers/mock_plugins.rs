//! Mock plugins with canned behavior
//!
//! Sources serve fixed detection lists (or fail, or hang on a delay),
//! identifiers answer from a title-keyed response table, and storage
//! keeps saved values in memory. All are safe to share behind `Arc`.

use async_trait::async_trait;
use ludex_common::events::LibraryEvent;
use ludex_common::model::{DetectedGame, GameMetadata, IdentificationResult};
use ludex_common::plugin::{
    IdentifierPlugin, Plugin, PluginError, PluginType, SourcePlugin, StoragePlugin,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Build a minimal detection
pub fn detection(id: &str, title: &str) -> DetectedGame {
    DetectedGame::new(id, title)
}

/// Drain everything buffered on an event receiver
pub fn drain_events(rx: &mut broadcast::Receiver<LibraryEvent>) -> Vec<LibraryEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Shared gauge for observing how many scans run at once
#[derive(Clone, Default)]
pub struct ConcurrencyProbe {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Highest number of scans observed in flight at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Source plugin serving a canned detection list
pub struct MockSourcePlugin {
    id: String,
    games: Mutex<Vec<DetectedGame>>,
    fail_with: Option<String>,
    delay: Option<Duration>,
    ready: AtomicBool,
    scan_count: AtomicUsize,
    probe: Option<ConcurrencyProbe>,
}

impl MockSourcePlugin {
    pub fn new(id: &str, games: Vec<DetectedGame>) -> Self {
        Self {
            id: id.to_string(),
            games: Mutex::new(games),
            fail_with: None,
            delay: None,
            ready: AtomicBool::new(true),
            scan_count: AtomicUsize::new(0),
            probe: None,
        }
    }

    /// A source whose scan always fails with the given message
    pub fn failing(id: &str, message: &str) -> Self {
        let mut mock = Self::new(id, Vec::new());
        mock.fail_with = Some(message.to_string());
        mock
    }

    /// A source that reports itself unready
    pub fn not_ready(id: &str) -> Self {
        let mock = Self::new(id, Vec::new());
        mock.ready.store(false, Ordering::SeqCst);
        mock
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_probe(mut self, probe: ConcurrencyProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Replace the canned detections (for second-pass scans)
    pub fn set_games(&self, games: Vec<DetectedGame>) {
        *self.games.lock().unwrap() = games;
    }

    pub fn scan_count(&self) -> usize {
        self.scan_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for MockSourcePlugin {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        "Mock Source"
    }
    fn version(&self) -> &str {
        "0.0.1"
    }
    fn plugin_type(&self) -> PluginType {
        PluginType::Source
    }
    async fn initialize(&self, _config: &serde_json::Value) -> Result<(), PluginError> {
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourcePlugin for MockSourcePlugin {
    async fn scan(&self) -> Result<Vec<DetectedGame>, PluginError> {
        self.scan_count.fetch_add(1, Ordering::SeqCst);
        if let Some(probe) = &self.probe {
            probe.enter();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(probe) = &self.probe {
            probe.exit();
        }
        match &self.fail_with {
            Some(message) => Err(PluginError::Api(message.clone())),
            None => Ok(self.games.lock().unwrap().clone()),
        }
    }
}

/// Identifier plugin answering from a detected-title response table
pub struct MockIdentifierPlugin {
    id: String,
    responses: HashMap<String, IdentificationResult>,
    fail_with: Option<String>,
    ready: AtomicBool,
    identify_count: AtomicUsize,
}

impl MockIdentifierPlugin {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            responses: HashMap::new(),
            fail_with: None,
            ready: AtomicBool::new(true),
            identify_count: AtomicUsize::new(0),
        }
    }

    /// An identifier whose lookups always fail with the given message
    pub fn failing(id: &str, message: &str) -> Self {
        let mut mock = Self::new(id);
        mock.fail_with = Some(message.to_string());
        mock
    }

    /// Canned answer for a detected title
    pub fn with_response(
        mut self,
        detected_title: &str,
        confidence: f32,
        canonical_title: &str,
    ) -> Self {
        let result = IdentificationResult::new(
            self.id.as_str(),
            confidence,
            GameMetadata::with_title(canonical_title),
        );
        self.responses.insert(detected_title.to_string(), result);
        self
    }

    /// Canned answer with full control over the result
    pub fn with_result(mut self, detected_title: &str, result: IdentificationResult) -> Self {
        self.responses.insert(detected_title.to_string(), result);
        self
    }

    pub fn identify_count(&self) -> usize {
        self.identify_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for MockIdentifierPlugin {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        "Mock Identifier"
    }
    fn version(&self) -> &str {
        "0.0.1"
    }
    fn plugin_type(&self) -> PluginType {
        PluginType::Identifier
    }
    async fn initialize(&self, _config: &serde_json::Value) -> Result<(), PluginError> {
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentifierPlugin for MockIdentifierPlugin {
    async fn identify(
        &self,
        game: &DetectedGame,
    ) -> Result<Option<IdentificationResult>, PluginError> {
        self.identify_count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(PluginError::Api(message.clone()));
        }
        Ok(self.responses.get(&game.title).cloned())
    }

    async fn search(
        &self,
        query: &str,
        _platform: Option<&str>,
    ) -> Result<Vec<GameMetadata>, PluginError> {
        if let Some(message) = &self.fail_with {
            return Err(PluginError::Api(message.clone()));
        }
        Ok(self
            .responses
            .values()
            .filter(|r| r.metadata.title.contains(query))
            .map(|r| r.metadata.clone())
            .collect())
    }
}

/// Storage plugin keeping saved values in memory
pub struct MockStoragePlugin {
    id: String,
    saved: Mutex<Vec<serde_json::Value>>,
    ready: AtomicBool,
}

impl MockStoragePlugin {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            saved: Mutex::new(Vec::new()),
            ready: AtomicBool::new(true),
        }
    }

    pub fn saved(&self) -> Vec<serde_json::Value> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl Plugin for MockStoragePlugin {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        "Mock Storage"
    }
    fn version(&self) -> &str {
        "0.0.1"
    }
    fn plugin_type(&self) -> PluginType {
        PluginType::Storage
    }
    async fn initialize(&self, _config: &serde_json::Value) -> Result<(), PluginError> {
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoragePlugin for MockStoragePlugin {
    async fn save_library(&self, games: &[serde_json::Value]) -> Result<(), PluginError> {
        *self.saved.lock().unwrap() = games.to_vec();
        Ok(())
    }

    async fn load_library(&self) -> Result<Vec<serde_json::Value>, PluginError> {
        Ok(self.saved.lock().unwrap().clone())
    }
}
