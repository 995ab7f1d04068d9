use crate::domain::{ConnectionConfig, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Port for issuing probe requests against the configured endpoint
///
/// The configuration is passed on every call; implementations must not keep
/// config values around beyond the connection they derive from them.
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// GET `command` relative to the configured base address, returning the body text
    async fn get(&self, config: &ConnectionConfig, command: &str, cancel: Option<&CancellationToken>)
        -> Result<String>;

    /// POST the configured upload file to `command`, returning the body text
    async fn post(&self, config: &ConnectionConfig, command: &str, cancel: Option<&CancellationToken>)
        -> Result<String>;
}
