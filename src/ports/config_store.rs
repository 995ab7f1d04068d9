use crate::domain::{ConnectionConfig, Result};

/// Port for loading and saving the connection record
pub trait ConfigStorePort: Send + Sync {
    /// Load the persisted record and make it the current snapshot
    fn load(&mut self) -> Result<ConnectionConfig>;

    /// Persist `config` and make it the current snapshot
    fn save(&mut self, config: &ConnectionConfig) -> Result<()>;

    /// Whether `config` differs from the last loaded or saved snapshot
    fn exists_difference(&self, config: &ConnectionConfig) -> bool;
}
