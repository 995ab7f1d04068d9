#![cfg(test)]
#![allow(dead_code)]

use std::sync::Mutex;

use http_probe::ports::LogSinkPort;

/// Log sink keeping every line in memory
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl LogSinkPort for RecordingSink {
    fn info(&self, message: &str) {
        self.lines.lock().unwrap().push(format!("INFO {}", message));
    }

    fn error(&self, message: &str, cause: Option<&dyn std::error::Error>) {
        let line = match cause {
            Some(cause) => format!("ERROR {}: {}", message, cause),
            None => format!("ERROR {}", message),
        };
        self.lines.lock().unwrap().push(line);
    }
}
