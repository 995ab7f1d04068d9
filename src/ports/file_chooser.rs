use std::path::PathBuf;

/// Port for asking the operator which file to upload
pub trait FileChooserPort: Send + Sync {
    /// Returns `None` when the operator cancelled
    fn choose(&self) -> Option<PathBuf>;
}
