use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::adapters::TailSettings;
use crate::domain::{ProbeError, Result};

pub const APP_NAME: &str = "http-probe";

/// Application-level settings, stored with confy next to the user's other configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Connection record edited by the operator
    pub config_path: PathBuf,
    /// Communication log written by every probe and followed by `tail`
    pub log_path: PathBuf,
    pub tail: TailSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config.json"),
            log_path: PathBuf::from("logs").join("Communication.log"),
            tail: TailSettings::default(),
        }
    }
}

impl AppSettings {
    /// Load from `path`, or from the default confy location. A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let loaded: std::result::Result<Self, confy::ConfyError> = match path {
            Some(path) => confy::load_path(path),
            None => confy::load(APP_NAME, None),
        };
        loaded.map_err(|e| ProbeError::InvalidConfig(format!("Cannot load settings: {}", e)))
    }
}
