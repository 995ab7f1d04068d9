use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::{ConnectionConfig, ProbeError, Result};
use crate::ports::ConfigStorePort;

/// JSON file backed config store keeping the last loaded or saved snapshot
pub struct JsonConfigStore {
    path: PathBuf,
    snapshot: ConnectionConfig,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshot: ConnectionConfig::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> &ConnectionConfig {
        &self.snapshot
    }

    fn write_atomically(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ProbeError::Io(format!("Cannot create {}: {}", parent.display(), e)))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)
            .map_err(|e| ProbeError::Io(format!("Cannot write {}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            ProbeError::Io(format!("Cannot replace {}: {}", self.path.display(), e))
        })
    }
}

impl ConfigStorePort for JsonConfigStore {
    fn load(&mut self) -> Result<ConnectionConfig> {
        if !self.path.is_file() {
            return Err(ProbeError::NotFound(self.path.clone()));
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| ProbeError::Io(format!("Cannot read {}: {}", self.path.display(), e)))?;
        let config: ConnectionConfig = serde_json::from_str(&contents)
            .map_err(|e| ProbeError::InvalidConfig(format!("Cannot parse {}: {}", self.path.display(), e)))?;

        info!("Loaded configuration from {}", self.path.display());
        self.snapshot = config.clone();
        Ok(config)
    }

    fn save(&mut self, config: &ConnectionConfig) -> Result<()> {
        let contents = serde_json::to_string_pretty(config)
            .map_err(|e| ProbeError::Io(format!("Cannot serialize configuration: {}", e)))?;
        self.write_atomically(&contents)?;

        debug!("Saved configuration to {} ({} bytes)", self.path.display(), contents.len());
        self.snapshot = config.clone();
        Ok(())
    }

    fn exists_difference(&self, config: &ConnectionConfig) -> bool {
        self.snapshot != *config
    }
}
