//! Plugin registry
//!
//! Holds every registered plugin behind its typed trait object and
//! enforces id uniqueness across all plugin types. Registration happens
//! at startup; afterwards the registry is a read-only lookup shared via
//! `Arc`.

use ludex_common::plugin::{IdentifierPlugin, PluginType, SourcePlugin, StoragePlugin};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// A plugin with this id is already registered (any type)
    #[error("plugin id already registered: {0}")]
    DuplicatePlugin(String),
}

impl From<RegistryError> for ludex_common::Error {
    fn from(e: RegistryError) -> Self {
        ludex_common::Error::InvalidInput(e.to_string())
    }
}

/// A registered plugin behind its concrete trait object
#[derive(Clone)]
pub enum PluginHandle {
    Source(Arc<dyn SourcePlugin>),
    Identifier(Arc<dyn IdentifierPlugin>),
    Storage(Arc<dyn StoragePlugin>),
}

impl PluginHandle {
    pub fn id(&self) -> &str {
        match self {
            PluginHandle::Source(p) => p.id(),
            PluginHandle::Identifier(p) => p.id(),
            PluginHandle::Storage(p) => p.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PluginHandle::Source(p) => p.name(),
            PluginHandle::Identifier(p) => p.name(),
            PluginHandle::Storage(p) => p.name(),
        }
    }

    pub fn plugin_type(&self) -> PluginType {
        match self {
            PluginHandle::Source(_) => PluginType::Source,
            PluginHandle::Identifier(_) => PluginType::Identifier,
            PluginHandle::Storage(_) => PluginType::Storage,
        }
    }

    pub fn is_ready(&self) -> bool {
        match self {
            PluginHandle::Source(p) => p.is_ready(),
            PluginHandle::Identifier(p) => p.is_ready(),
            PluginHandle::Storage(p) => p.is_ready(),
        }
    }
}

/// Registry of source, identifier, and storage plugins
///
/// Iteration orders follow registration order, which keeps scan passes
/// and identify sweeps deterministic.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<PluginHandle>,
    index: HashMap<String, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin, rejecting duplicate ids across every type
    pub fn register(&mut self, handle: PluginHandle) -> Result<(), RegistryError> {
        let id = handle.id().to_string();
        if self.index.contains_key(&id) {
            return Err(RegistryError::DuplicatePlugin(id));
        }
        tracing::debug!(
            plugin_id = %id,
            plugin_type = handle.plugin_type().as_str(),
            name = handle.name(),
            "Plugin registered"
        );
        self.index.insert(id, self.plugins.len());
        self.plugins.push(handle);
        Ok(())
    }

    pub fn register_source(&mut self, plugin: Arc<dyn SourcePlugin>) -> Result<(), RegistryError> {
        self.register(PluginHandle::Source(plugin))
    }

    pub fn register_identifier(
        &mut self,
        plugin: Arc<dyn IdentifierPlugin>,
    ) -> Result<(), RegistryError> {
        self.register(PluginHandle::Identifier(plugin))
    }

    pub fn register_storage(
        &mut self,
        plugin: Arc<dyn StoragePlugin>,
    ) -> Result<(), RegistryError> {
        self.register(PluginHandle::Storage(plugin))
    }

    /// All source plugins, in registration order
    pub fn all_sources(&self) -> Vec<Arc<dyn SourcePlugin>> {
        self.plugins
            .iter()
            .filter_map(|h| match h {
                PluginHandle::Source(p) => Some(Arc::clone(p)),
                _ => None,
            })
            .collect()
    }

    /// All identifier plugins, in registration order
    pub fn all_identifiers(&self) -> Vec<Arc<dyn IdentifierPlugin>> {
        self.plugins
            .iter()
            .filter_map(|h| match h {
                PluginHandle::Identifier(p) => Some(Arc::clone(p)),
                _ => None,
            })
            .collect()
    }

    /// All storage plugins, in registration order
    pub fn all_storages(&self) -> Vec<Arc<dyn StoragePlugin>> {
        self.plugins
            .iter()
            .filter_map(|h| match h {
                PluginHandle::Storage(p) => Some(Arc::clone(p)),
                _ => None,
            })
            .collect()
    }

    /// Look up a source plugin by id; a matching id of another type is
    /// treated as absent
    pub fn source(&self, id: &str) -> Option<Arc<dyn SourcePlugin>> {
        match self.handle(id) {
            Some(PluginHandle::Source(p)) => Some(Arc::clone(p)),
            _ => None,
        }
    }

    pub fn identifier(&self, id: &str) -> Option<Arc<dyn IdentifierPlugin>> {
        match self.handle(id) {
            Some(PluginHandle::Identifier(p)) => Some(Arc::clone(p)),
            _ => None,
        }
    }

    pub fn storage(&self, id: &str) -> Option<Arc<dyn StoragePlugin>> {
        match self.handle(id) {
            Some(PluginHandle::Storage(p)) => Some(Arc::clone(p)),
            _ => None,
        }
    }

    pub fn handle(&self, id: &str) -> Option<&PluginHandle> {
        self.index.get(id).map(|&pos| &self.plugins[pos])
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
