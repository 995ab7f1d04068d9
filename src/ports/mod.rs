pub mod config_store;
pub mod file_chooser;
pub mod log_sink;
pub mod transport;

pub use config_store::ConfigStorePort;
pub use file_chooser::FileChooserPort;
pub use log_sink::LogSinkPort;
pub use transport::TransportPort;
