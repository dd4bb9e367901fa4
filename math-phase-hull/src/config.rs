//! Analysis configuration and JSON/TOML loading

use crate::entry::PhaseEntry;
use crate::error::{PhaseHullError, Result};
use crate::hull::QuickhullOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Stability analysis settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HullConfig {
    /// An entry is stable if its energy above hull is at most this (eV/atom)
    #[serde(default = "default_stability_tolerance")]
    pub stability_tolerance: f64,
    /// Base geometric tolerance of the hull construction
    #[serde(default = "default_geometry_epsilon")]
    pub geometry_epsilon: f64,
    /// Allow rayon for large point sets and multi-system datasets
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Minimum number of points before hull assignment runs in parallel
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
    /// Iteration budget of the quickhull expansion
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_stability_tolerance() -> f64 {
    crate::STABILITY_TOLERANCE
}

fn default_geometry_epsilon() -> f64 {
    crate::EPSILON
}

fn default_parallel() -> bool {
    true
}

fn default_parallel_threshold() -> usize {
    100
}

fn default_max_iterations() -> usize {
    100_000
}

impl Default for HullConfig {
    fn default() -> Self {
        Self {
            stability_tolerance: default_stability_tolerance(),
            geometry_epsilon: default_geometry_epsilon(),
            parallel: default_parallel(),
            parallel_threshold: default_parallel_threshold(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl HullConfig {
    /// Options handed to the quickhull builder
    pub fn quickhull_options(&self) -> QuickhullOptions {
        QuickhullOptions {
            epsilon: self.geometry_epsilon,
            max_iterations: self.max_iterations,
            parallel: self.parallel,
            parallel_threshold: self.parallel_threshold,
        }
    }

    /// Set the stability tolerance
    pub fn with_stability_tolerance(mut self, tolerance: f64) -> Self {
        self.stability_tolerance = tolerance;
        self
    }

    /// Enable or disable rayon
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format
    Json,
    /// TOML format
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        match ext.to_lowercase().as_str() {
            "json" => Some(ConfigFormat::Json),
            "toml" => Some(ConfigFormat::Toml),
            _ => None,
        }
    }
}

/// Load a configuration from a file
///
/// Format is auto-detected from file extension (.json or .toml)
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HullConfig> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| PhaseHullError::UnsupportedFormat(path.display().to_string()))?;
    let content = fs::read_to_string(path)?;
    parse_config(&content, format)
}

/// Parse a configuration from a string
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<HullConfig> {
    match format {
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| PhaseHullError::ParseError(e.to_string()))
        }
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| PhaseHullError::ParseError(e.to_string()))
        }
    }
}

/// Save a configuration to a file
pub fn save_config<P: AsRef<Path>>(config: &HullConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| PhaseHullError::UnsupportedFormat(path.display().to_string()))?;
    fs::write(path, serialize_config(config, format)?)?;
    Ok(())
}

/// Serialize a configuration to a string
pub fn serialize_config(config: &HullConfig, format: ConfigFormat) -> Result<String> {
    match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map_err(|e| PhaseHullError::SerializeError(e.to_string())),
        ConfigFormat::Toml => toml::to_string_pretty(config)
            .map_err(|e| PhaseHullError::SerializeError(e.to_string())),
    }
}

/// Parse a JSON array of phase entries
pub fn parse_entries(content: &str) -> Result<Vec<PhaseEntry>> {
    serde_json::from_str(content).map_err(|e| PhaseHullError::ParseError(e.to_string()))
}

/// Load a JSON array of phase entries from a file
pub fn load_entries<P: AsRef<Path>>(path: P) -> Result<Vec<PhaseEntry>> {
    let entries = parse_entries(&fs::read_to_string(path.as_ref())?)?;
    log::debug!(
        "loaded {} entries from {}",
        entries.len(),
        path.as_ref().display()
    );
    Ok(entries)
}
