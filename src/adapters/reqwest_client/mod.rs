use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::{CallInfo, ConnectionConfig, ProbeError, ProbeMethod, Result};
use crate::ports::{LogSinkPort, TransportPort};

/// The client handle together with the derived values it was built for.
struct Epoch {
    key: String,
    timeout_seconds: u32,
    client: reqwest::Client,
}

/// Transport keeping one reusable `reqwest::Client`, rebuilt only when the
/// derived base address or timeout changes between calls.
pub struct ReqwestTransport {
    epoch: Mutex<Option<Epoch>>,
    rebuilds: Arc<AtomicUsize>,
    sink: Arc<dyn LogSinkPort>,
}

impl ReqwestTransport {
    pub fn new(sink: Arc<dyn LogSinkPort>) -> Self {
        Self {
            epoch: Mutex::new(None),
            rebuilds: Arc::new(AtomicUsize::new(0)),
            sink,
        }
    }

    pub fn with_rebuild_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.rebuilds = counter;
        self
    }

    pub fn rebuild_count(&self) -> usize {
        self.rebuilds.load(Ordering::SeqCst)
    }

    fn client_for(&self, config: &ConnectionConfig) -> Result<reqwest::Client> {
        let key = config.epoch_key()?;
        let mut epoch = self.epoch.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(current) = epoch.as_ref() {
            if current.key == key && current.timeout_seconds == config.timeout_seconds {
                return Ok(current.client.clone());
            }
        }

        let mut builder = reqwest::Client::builder().no_proxy();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProbeError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        debug!("Rebuilt HTTP client for {} (timeout {}s)", key, config.timeout_seconds);
        // In-flight calls hold their own clone of the previous handle.
        *epoch = Some(Epoch {
            key,
            timeout_seconds: config.timeout_seconds,
            client: client.clone(),
        });
        self.rebuilds.fetch_add(1, Ordering::SeqCst);

        Ok(client)
    }

    async fn execute(
        &self,
        method: ProbeMethod,
        config: &ConnectionConfig,
        command: &str,
        upload: Option<(tokio::fs::File, u64)>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String> {
        let url = config.request_url(command)?;
        let client = self.client_for(config)?;

        let call = CallInfo::new(method, url.to_string(), config.auth_method);
        self.sink.info(&call.to_string());

        let http_method = match method {
            ProbeMethod::Get => reqwest::Method::GET,
            ProbeMethod::Post => reqwest::Method::POST,
        };
        let mut request = client.request(http_method, url);

        if let Some(credentials) = config.credentials() {
            request = request.header(AUTHORIZATION, credentials.to_basic_auth());
        }
        if let Some((file, len)) = upload {
            request = request
                .header(CONTENT_TYPE, "application/octet-stream")
                .header(CONTENT_LENGTH, len)
                .body(reqwest::Body::from(file));
        }

        let exchange = async {
            let response = request.send().await.map_err(map_reqwest_error)?;
            let status = response.status();
            self.sink.info(&format!(
                "[{}] {} ({} ms)",
                call.id,
                status.as_u16(),
                call.elapsed_ms()
            ));

            if !status.is_success() {
                return Err(ProbeError::HttpStatus(status.as_u16()));
            }
            response.text().await.map_err(map_reqwest_error)
        };

        let result = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ProbeError::Cancelled),
                    result = exchange => result,
                }
            }
            None => exchange.await,
        };

        if let Err(e) = &result {
            self.sink.error(
                &format!("[{}] {} {} failed", call.id, method.as_str(), call.target),
                Some(e as &dyn std::error::Error),
            );
        }
        result
    }
}

#[async_trait]
impl TransportPort for ReqwestTransport {
    async fn get(&self, config: &ConnectionConfig, command: &str, cancel: Option<&CancellationToken>) -> Result<String> {
        self.execute(ProbeMethod::Get, config, command, None, cancel).await
    }

    async fn post(&self, config: &ConnectionConfig, command: &str, cancel: Option<&CancellationToken>) -> Result<String> {
        let path = PathBuf::from(&config.upload_file_path);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return Err(ProbeError::NotFound(path)),
        };
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| ProbeError::Io(format!("Cannot open {}: {}", path.display(), e)))?;

        self.execute(ProbeMethod::Post, config, command, Some((file, metadata.len())), cancel)
            .await
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout
    } else {
        ProbeError::Transport(format!("HTTP request failed: {}", e))
    }
}
