#![cfg(test)]
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod recording_server;
pub mod recording_sink;

pub use recording_server::{RecordedRequest, RecordingServer};
pub use recording_sink::RecordingSink;
