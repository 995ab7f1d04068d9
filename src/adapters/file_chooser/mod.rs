use std::path::PathBuf;

use crate::ports::FileChooserPort;

/// Non-interactive chooser answering with a path given up front (e.g. on the command line)
pub struct FixedFileChooser {
    selection: Option<PathBuf>,
}

impl FixedFileChooser {
    pub fn new(selection: Option<PathBuf>) -> Self {
        Self { selection }
    }
}

impl FileChooserPort for FixedFileChooser {
    fn choose(&self) -> Option<PathBuf> {
        self.selection.clone()
    }
}
