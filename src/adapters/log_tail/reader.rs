use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tokio::io::AsyncReadExt;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::TailSettings;
use crate::domain::{ProbeError, Result};

type Subscribers = Arc<Mutex<Option<broadcast::Sender<String>>>>;

/// Watches one log file and hands its full content to subscribers after each settled write.
pub struct LogTailReader {
    path: PathBuf,
    settings: TailSettings,
    subscribers: Subscribers,
    cancel: CancellationToken,
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl LogTailReader {
    /// Start watching `path`. Must be called from within a tokio runtime.
    pub fn start(path: impl Into<PathBuf>, settings: TailSettings) -> Result<Self> {
        let path = path.into();
        let (batch_tx, batch_rx) = mpsc::unbounded_channel::<DebounceEventResult>();

        let mut debouncer = new_debouncer(settings.debounce(), move |result: DebounceEventResult| {
            let _ = batch_tx.send(result);
        })
        .map_err(|e| ProbeError::Io(format!("Failed to create debouncer: {}", e)))?;

        // The file may not exist yet, so watch its directory and filter by name.
        let dir = watch_dir(&path);
        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| ProbeError::Io(format!("Failed to watch {}: {}", dir.display(), e)))?;

        let (events_tx, _) = broadcast::channel(16);
        let subscribers: Subscribers = Arc::new(Mutex::new(Some(events_tx)));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(watch_loop(
            path.clone(),
            settings.clone(),
            batch_rx,
            subscribers.clone(),
            cancel.clone(),
        ));

        log::debug!("Tailing {} (debounce {} ms)", path.display(), settings.debounce_ms);
        Ok(Self {
            path,
            settings,
            subscribers,
            cancel,
            debouncer: Some(debouncer),
            task: Some(task),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Immediate read with retry, used to seed a display before the first change.
    pub async fn read_current_content(&self) -> Result<String> {
        read_with_retry(&self.path, &self.settings).await
    }

    /// Stream of full file contents, one item per detected change.
    ///
    /// After `dispose` the returned receiver is already closed.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        let guard = self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Stop watching. No change is delivered once this returns.
    pub fn dispose(&mut self) {
        self.cancel.cancel();
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        self.debouncer.take();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for LogTailReader {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn watch_loop(
    path: PathBuf,
    settings: TailSettings,
    mut batches: mpsc::UnboundedReceiver<DebounceEventResult>,
    subscribers: Subscribers,
    cancel: CancellationToken,
) {
    let mut last_delivered: Option<FileStamp> = None;

    loop {
        let batch = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            batch = batches.recv() => match batch {
                Some(batch) => batch,
                None => break,
            },
        };

        let events = match batch {
            Ok(events) => events,
            Err(error) => {
                log::info!("File watch error: {:?}", error);
                continue;
            }
        };

        // AnyContinuous arrives once per debounce window while a writer keeps going.
        let touched = events.iter().any(|e| {
            matches!(e.kind, DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous)
                && e.path.file_name() == path.file_name()
        });
        if !touched {
            continue;
        }

        let stamp = file_stamp(&path).await;
        if stamp.is_some() && stamp == last_delivered {
            continue;
        }

        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            read = read_with_retry(&path, &settings) => read,
        };

        match read {
            Ok(content) => {
                let guard = subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                match guard.as_ref() {
                    Some(tx) => {
                        let _ = tx.send(content);
                        last_delivered = stamp;
                    }
                    None => break,
                }
            }
            Err(e) => log::debug!("Dropping change notification: {}", e),
        }
    }
}

/// Length plus mtime of the last delivered read. A same-length rewrite within one
/// mtime tick on a coarse-grained filesystem is indistinguishable and gets skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

async fn file_stamp(path: &Path) -> Option<FileStamp> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    Some(FileStamp {
        len: metadata.len(),
        modified: metadata.modified().ok(),
    })
}

/// Read the whole file as UTF-8, retrying on any I/O or decoding error.
pub async fn read_with_retry(path: &Path, settings: &TailSettings) -> Result<String> {
    let attempts = settings.retry_count.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match read_shared(path).await {
            Ok(content) => return Ok(content),
            Err(e) => {
                log::debug!("Read attempt {}/{} of {} failed: {}", attempt, attempts, path.display(), e);
                last_error = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(settings.retry_delay()).await;
                }
            }
        }
    }

    Err(ProbeError::Io(format!(
        "Cannot read {} after {} attempts: {}",
        path.display(),
        attempts,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

// std opens files with FILE_SHARE_READ | FILE_SHARE_WRITE on Windows, so the writer keeps its handle.
async fn read_shared(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).await?;
    String::from_utf8(buf).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
