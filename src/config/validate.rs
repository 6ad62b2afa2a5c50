// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskwaveError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskwaveError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.threads, raw.lanes))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.threads.general == 0 {
        return Err(TaskwaveError::Config(
            "[threads].general must be >= 1 (got 0)".to_string(),
        ));
    }

    let names: Vec<String> = cfg.lanes.iter().map(|lane| lane.name.clone()).collect();
    validate_lane_names(&names)
}

/// Check dedicated lane names: non-empty, not reserved, unique
/// (case-insensitively, since lookup is case-insensitive too).
pub(crate) fn validate_lane_names(names: &[String]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return Err(TaskwaveError::Config(
                "dedicated lane name must not be empty".to_string(),
            ));
        }
        if key == "main" || key == "general" {
            return Err(TaskwaveError::Config(format!(
                "lane name '{name}' is reserved"
            )));
        }
        if !seen.insert(key) {
            return Err(TaskwaveError::Config(format!(
                "duplicate dedicated lane name '{name}'"
            )));
        }
    }
    Ok(())
}
