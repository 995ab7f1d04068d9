use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{ConnectionConfig, ProbeError, Result};
use crate::ports::{ConfigStorePort, FileChooserPort, LogSinkPort, TransportPort};

/// Headless orchestrator: owns the draft, tracks whether it is dirty and gates
/// which actions are allowed.
pub struct ProbeSession {
    store: Box<dyn ConfigStorePort>,
    transport: Arc<dyn TransportPort>,
    sink: Arc<dyn LogSinkPort>,
    chooser: Arc<dyn FileChooserPort>,
    draft: ConnectionConfig,
    saved: ConnectionConfig,
    dirty: bool,
    status: String,
}

impl ProbeSession {
    pub fn new(
        store: Box<dyn ConfigStorePort>,
        transport: Arc<dyn TransportPort>,
        sink: Arc<dyn LogSinkPort>,
        chooser: Arc<dyn FileChooserPort>,
    ) -> Self {
        Self {
            store,
            transport,
            sink,
            chooser,
            draft: ConnectionConfig::default(),
            saved: ConnectionConfig::default(),
            dirty: false,
            status: String::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        match self.store.load() {
            Ok(config) => {
                self.draft = config.clone();
                self.saved = config;
                self.recompute_dirty();
                Ok(())
            }
            Err(e) => Err(self.fail("Failed to load the configuration", e)),
        }
    }

    pub fn save(&mut self) -> Result<()> {
        let draft = self.draft.clone();
        match self.store.save(&draft) {
            Ok(()) => {
                self.saved = draft;
                self.status = "Configuration saved".into();
                self.recompute_dirty();
                Ok(())
            }
            Err(e) => Err(self.fail("Failed to save the configuration", e)),
        }
    }

    /// Apply an edit to the draft, then refresh the dirty flag.
    pub fn edit<F>(&mut self, f: F)
    where
        F: FnOnce(&mut ConnectionConfig),
    {
        f(&mut self.draft);
        self.recompute_dirty();
    }

    pub fn recompute_dirty(&mut self) -> bool {
        self.dirty = self.store.exists_difference(&self.draft);
        self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn can_save(&self) -> bool {
        self.dirty
    }

    /// Requests always run against the saved record, so they are only offered
    /// while the draft matches it.
    pub fn can_send(&self) -> bool {
        !self.dirty
    }

    pub async fn send(&mut self, command: &str, cancel: Option<&CancellationToken>) -> Result<String> {
        self.ensure_sendable()?;
        let result = self.transport.get(&self.saved, command, cancel).await;
        match result {
            Ok(body) => {
                self.sink.info(&format!("Received message: {}", body));
                self.status.clear();
                Ok(body)
            }
            Err(e) => Err(self.fail("Send failed", e)),
        }
    }

    pub async fn post(&mut self, command: &str, cancel: Option<&CancellationToken>) -> Result<String> {
        self.ensure_sendable()?;
        let result = self.transport.post(&self.saved, command, cancel).await;
        match result {
            Ok(body) => {
                self.sink.info(&format!("Received message: {}", body));
                self.status.clear();
                Ok(body)
            }
            Err(e) => Err(self.fail("Upload failed", e)),
        }
    }

    /// Returns whether a file was picked.
    pub fn choose_upload_file(&mut self) -> bool {
        match self.chooser.choose() {
            Some(path) => {
                let path = path.to_string_lossy().into_owned();
                self.edit(|draft| draft.upload_file_path = path);
                true
            }
            None => false,
        }
    }

    pub fn draft(&self) -> &ConnectionConfig {
        &self.draft
    }

    pub fn saved(&self) -> &ConnectionConfig {
        &self.saved
    }

    pub fn status_message(&self) -> &str {
        &self.status
    }

    pub fn clear_status(&mut self) {
        self.status.clear();
    }

    fn ensure_sendable(&mut self) -> Result<()> {
        if self.can_send() {
            return Ok(());
        }
        let e = ProbeError::InvalidConfig("there are unsaved changes, save them before sending".into());
        Err(self.fail("Send refused", e))
    }

    fn fail(&mut self, what: &str, e: ProbeError) -> ProbeError {
        self.sink.error(what, Some(&e as &dyn std::error::Error));
        self.status = format!("{}: {}", what, e);
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct MemoryStore {
        persisted: Option<ConnectionConfig>,
        snapshot: ConnectionConfig,
    }

    impl ConfigStorePort for MemoryStore {
        fn load(&mut self) -> Result<ConnectionConfig> {
            let config = self
                .persisted
                .clone()
                .ok_or_else(|| ProbeError::NotFound(PathBuf::from("config.json")))?;
            self.snapshot = config.clone();
            Ok(config)
        }

        fn save(&mut self, config: &ConnectionConfig) -> Result<()> {
            self.persisted = Some(config.clone());
            self.snapshot = config.clone();
            Ok(())
        }

        fn exists_difference(&self, config: &ConnectionConfig) -> bool {
            self.snapshot != *config
        }
    }

    #[derive(Default)]
    struct MockTransport {
        calls: Mutex<Vec<(String, ConnectionConfig, String)>>,
        fail_with: Option<ProbeError>,
    }

    #[async_trait]
    impl TransportPort for MockTransport {
        async fn get(&self, config: &ConnectionConfig, command: &str, _: Option<&CancellationToken>) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(("GET".into(), config.clone(), command.into()));
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok("pong".into()),
            }
        }

        async fn post(&self, config: &ConnectionConfig, command: &str, _: Option<&CancellationToken>) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(("POST".into(), config.clone(), command.into()));
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok("stored".into()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<String>>,
    }

    impl LogSinkPort for RecordingSink {
        fn info(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("INFO {}", message));
        }

        fn error(&self, message: &str, cause: Option<&dyn std::error::Error>) {
            let cause = cause.map(|c| c.to_string()).unwrap_or_default();
            self.lines.lock().unwrap().push(format!("ERROR {} {}", message, cause));
        }
    }

    struct FixedChooser(Option<PathBuf>);

    impl FileChooserPort for FixedChooser {
        fn choose(&self) -> Option<PathBuf> {
            self.0.clone()
        }
    }

    fn saved_config() -> ConnectionConfig {
        ConnectionConfig {
            host: "localhost".into(),
            port: "8080".into(),
            path: "api".into(),
            ..ConnectionConfig::default()
        }
    }

    fn session_with(
        persisted: Option<ConnectionConfig>,
        transport: Arc<MockTransport>,
        chooser: Option<PathBuf>,
    ) -> (ProbeSession, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let store = MemoryStore {
            persisted,
            snapshot: ConnectionConfig::default(),
        };
        let session = ProbeSession::new(Box::new(store), transport, sink.clone(), Arc::new(FixedChooser(chooser)));
        (session, sink)
    }

    #[tokio::test]
    async fn test_load_then_send_uses_saved_record() {
        let transport = Arc::new(MockTransport::default());
        let (mut session, sink) = session_with(Some(saved_config()), transport.clone(), None);

        session.load().unwrap();
        assert!(!session.is_dirty());
        assert!(session.can_send());

        let body = session.send("ping", None).await.unwrap();
        assert_eq!(body, "pong");

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, saved_config());
        assert_eq!(calls[0].2, "ping");
        assert!(sink.lines.lock().unwrap().iter().any(|l| l == "INFO Received message: pong"));
    }

    #[tokio::test]
    async fn test_edit_marks_dirty_and_blocks_send() {
        let transport = Arc::new(MockTransport::default());
        let (mut session, _) = session_with(Some(saved_config()), transport.clone(), None);
        session.load().unwrap();

        session.edit(|draft| draft.host = "example.com".into());
        assert!(session.is_dirty());
        assert!(session.can_save());
        assert!(!session.can_send());

        let err = session.send("ping", None).await.unwrap_err();
        assert!(matches!(err, ProbeError::InvalidConfig(_)));
        assert!(transport.calls.lock().unwrap().is_empty());
        assert!(session.status_message().starts_with("Send refused"));
    }

    #[tokio::test]
    async fn test_reverting_edit_clears_dirty() {
        let transport = Arc::new(MockTransport::default());
        let (mut session, _) = session_with(Some(saved_config()), transport, None);
        session.load().unwrap();

        session.edit(|draft| draft.port = "9090".into());
        assert!(session.is_dirty());
        session.edit(|draft| draft.port = "8080".into());
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_save_makes_draft_sendable() {
        let transport = Arc::new(MockTransport::default());
        let (mut session, _) = session_with(Some(saved_config()), transport.clone(), None);
        session.load().unwrap();

        session.edit(|draft| draft.path = "v2".into());
        session.save().unwrap();
        assert!(!session.is_dirty());
        assert_eq!(session.status_message(), "Configuration saved");

        session.post("upload", None).await.unwrap();
        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls[0].0, "POST");
        assert_eq!(calls[0].1.path, "v2");
    }

    #[tokio::test]
    async fn test_load_failure_sets_status_and_logs() {
        let transport = Arc::new(MockTransport::default());
        let (mut session, sink) = session_with(None, transport, None);

        let err = session.load().unwrap_err();
        assert!(matches!(err, ProbeError::NotFound(_)));
        assert!(session.status_message().starts_with("Failed to load the configuration"));
        assert!(sink.lines.lock().unwrap()[0].starts_with("ERROR Failed to load the configuration"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported_not_fatal() {
        let transport = Arc::new(MockTransport {
            fail_with: Some(ProbeError::HttpStatus(404)),
            ..MockTransport::default()
        });
        let (mut session, sink) = session_with(Some(saved_config()), transport, None);
        session.load().unwrap();

        let err = session.send("missing", None).await.unwrap_err();
        assert_eq!(err, ProbeError::HttpStatus(404));
        assert!(session.status_message().contains("404"));
        assert!(sink.lines.lock().unwrap().iter().any(|l| l.starts_with("ERROR Send failed")));

        session.clear_status();
        assert!(session.status_message().is_empty());
    }

    #[tokio::test]
    async fn test_choose_upload_file_updates_draft() {
        let transport = Arc::new(MockTransport::default());
        let (mut session, _) = session_with(Some(saved_config()), transport, Some(PathBuf::from("/tmp/payload.bin")));
        session.load().unwrap();

        assert!(session.choose_upload_file());
        assert_eq!(session.draft().upload_file_path, "/tmp/payload.bin");
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn test_cancelled_chooser_is_noop() {
        let transport = Arc::new(MockTransport::default());
        let (mut session, _) = session_with(Some(saved_config()), transport, None);
        session.load().unwrap();

        assert!(!session.choose_upload_file());
        assert!(!session.is_dirty());
    }
}
