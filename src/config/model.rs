// src/config/model.rs

//! Configuration data model.
//!
//! `RawConfigFile` is what `toml`/`serde` deserialize; `ConfigFile` is the
//! validated form the rest of the crate consumes. Conversion happens via
//! `TryFrom` in [`crate::config::validate`].

use serde::Deserialize;

/// Thread-pool sizing, the `[threads]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadsSection {
    /// Number of general pool worker threads.
    #[serde(default = "default_general_threads")]
    pub general: usize,
}

impl Default for ThreadsSection {
    fn default() -> Self {
        Self {
            general: default_general_threads(),
        }
    }
}

fn default_general_threads() -> usize {
    2
}

/// One `[[lane]]` section: a named dedicated lane with its own thread.
///
/// The lane's index is its position in the file (first `[[lane]]` is lane 2,
/// after main and general).
#[derive(Debug, Clone, Deserialize)]
pub struct LaneSection {
    pub name: String,
}

/// Raw configuration as deserialized from TOML, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub threads: ThreadsSection,
    #[serde(default, rename = "lane")]
    pub lanes: Vec<LaneSection>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub threads: ThreadsSection,
    pub lanes: Vec<LaneSection>,
}

impl ConfigFile {
    /// Construct without validation; only `validate` calls this.
    pub(crate) fn new_unchecked(threads: ThreadsSection, lanes: Vec<LaneSection>) -> Self {
        Self { threads, lanes }
    }

    /// Dedicated lane names in declaration order.
    pub fn lane_names(&self) -> Vec<String> {
        self.lanes.iter().map(|lane| lane.name.clone()).collect()
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            threads: ThreadsSection::default(),
            lanes: Vec::new(),
        }
    }
}
