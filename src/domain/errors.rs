use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Config file or upload file missing
    NotFound(PathBuf),
    Io(String),
    InvalidConfig(String),
    Transport(String),
    Timeout,
    HttpStatus(u16),
    Cancelled,
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::NotFound(path) => write!(f, "File not found: {}", path.display()),
            ProbeError::Io(msg) => write!(f, "I/O error: {}", msg),
            ProbeError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            ProbeError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ProbeError::Timeout => write!(f, "Request timed out"),
            ProbeError::HttpStatus(code) => write!(f, "Peer responded with HTTP status {}", code),
            ProbeError::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

impl std::error::Error for ProbeError {}

pub type Result<T> = std::result::Result<T, ProbeError>;
