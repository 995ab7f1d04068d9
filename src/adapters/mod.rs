pub mod file_chooser;
pub mod json_store;
pub mod log_tail;
pub mod reqwest_client;
pub mod tracing_sink;

pub use file_chooser::FixedFileChooser;
pub use json_store::JsonConfigStore;
pub use log_tail::{LogTailReader, TailSettings};
pub use reqwest_client::ReqwestTransport;
pub use tracing_sink::{TracingLogSink, COMMUNICATION_TARGET};
