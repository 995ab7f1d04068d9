use tracing::{error, info};

use crate::ports::LogSinkPort;

/// Target under which communication events are emitted; `main` routes it to the log file.
pub const COMMUNICATION_TARGET: &str = "communication";

/// Log sink writing communication events through `tracing`
#[derive(Debug, Default, Clone)]
pub struct TracingLogSink;

impl TracingLogSink {
    pub fn new() -> Self {
        Self
    }
}

impl LogSinkPort for TracingLogSink {
    fn info(&self, message: &str) {
        info!(target: COMMUNICATION_TARGET, "{}", message);
    }

    fn error(&self, message: &str, cause: Option<&dyn std::error::Error>) {
        match cause {
            Some(cause) => error!(target: COMMUNICATION_TARGET, "{}: {}", message, cause),
            None => error!(target: COMMUNICATION_TARGET, "{}", message),
        }
    }
}
