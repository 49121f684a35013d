//! Test helper utilities
//!
//! Shared mock plugins and event collection for ludex-unify integration
//! tests. Each test binary compiles this module separately and not every
//! binary exercises every helper.
#![allow(dead_code)]

pub mod mock_plugins;

// Re-export commonly used items
pub use mock_plugins::{
    detection, drain_events, ConcurrencyProbe, MockIdentifierPlugin, MockSourcePlugin,
    MockStoragePlugin,
};
