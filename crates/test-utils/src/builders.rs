#![allow(dead_code)]

use taskwave::config::{ConfigFile, LaneSection, RawConfigFile, ThreadsSection};
use taskwave::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_general_threads(mut self, count: usize) -> Self {
        self.config.threads = ThreadsSection { general: count };
        self
    }

    pub fn with_lane(mut self, name: &str) -> Self {
        self.config.lanes.push(LaneSection {
            name: name.to_string(),
        });
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// Validation-visible variant for tests asserting on config errors.
    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
