//! Configuration loading and resolution
//!
//! The engine's external configuration surface is small: the matching
//! strategy, the fuzzy threshold, and scan-pass behavior. Values resolve in
//! priority order:
//! 1. Explicit config file path (highest priority)
//! 2. `LUDEX_CONFIG` environment variable
//! 3. OS config directory (`<config_dir>/ludex/config.toml`)
//! 4. Compiled defaults (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "LUDEX_CONFIG";

/// Default similarity threshold for fuzzy title matching
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

/// Game matching strategy
///
/// Selected at configuration time; similarity-based strategies additionally
/// use the configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Byte-for-byte title equality
    ExactTitle,
    /// Equality of lowercased, alphanumeric-only, whitespace-collapsed titles
    NormalizedTitle,
    /// Normalized edit distance over normalized titles, gated by threshold
    FuzzyTitle,
    /// External database ids only; titles are never consulted
    ExternalId,
    /// Never match automatically; merges are user-invoked only
    Manual,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::ExactTitle => "exact_title",
            MatchStrategy::NormalizedTitle => "normalized_title",
            MatchStrategy::FuzzyTitle => "fuzzy_title",
            MatchStrategy::ExternalId => "external_id",
            MatchStrategy::Manual => "manual",
        }
    }
}

/// Matching configuration (`[matching]` table)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Strategy used by `add_detected_game`
    #[serde(default = "default_strategy")]
    pub strategy: MatchStrategy,

    /// Minimum similarity for a fuzzy match (0.0-1.0, inclusive comparison)
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
}

fn default_strategy() -> MatchStrategy {
    MatchStrategy::FuzzyTitle
}

fn default_fuzzy_threshold() -> f64 {
    DEFAULT_FUZZY_THRESHOLD
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            fuzzy_threshold: default_fuzzy_threshold(),
        }
    }
}

impl MatchConfig {
    /// Validate field ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(Error::Config(format!(
                "fuzzy_threshold must be within 0.0-1.0, got {}",
                self.fuzzy_threshold
            )));
        }
        Ok(())
    }
}

/// Scan-pass configuration (`[scan]` table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// How many source plugins scan in parallel
    #[serde(default = "default_max_concurrent_scans")]
    pub max_concurrent_scans: usize,

    /// Whether a pass runs the identify phase after scanning
    #[serde(default = "default_identify_after_scan")]
    pub identify_after_scan: bool,
}

fn default_max_concurrent_scans() -> usize {
    4
}

fn default_identify_after_scan() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scans: default_max_concurrent_scans(),
            identify_after_scan: default_identify_after_scan(),
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_scans == 0 {
            return Err(Error::Config(
                "max_concurrent_scans must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level Ludex configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LudexConfig {
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

impl LudexConfig {
    /// Load configuration following the documented priority order
    ///
    /// With no explicit path, no env var, and no file in the OS config
    /// directory, compiled defaults are returned. A path that IS given but
    /// cannot be read or parsed is an error rather than a silent fallback.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // Priority 1: explicit path
        if let Some(path) = explicit_path {
            return Self::load_from(path);
        }

        // Priority 2: environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load_from(Path::new(&path));
        }

        // Priority 3: OS config directory
        if let Some(path) = os_config_file() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        // Priority 4: compiled defaults
        Ok(Self::default())
    }

    /// Parse and validate a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        let config: LudexConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("cannot parse config file {}: {}", path.display(), e))
        })?;
        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            strategy = config.matching.strategy.as_str(),
            fuzzy_threshold = config.matching.fuzzy_threshold,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        self.scan.validate()?;
        Ok(())
    }
}

/// Platform config file location (`<config_dir>/ludex/config.toml`)
fn os_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ludex").join("config.toml"))
}
