/// Port for the communication log writer
///
/// Implementations are fire-and-forget and must never panic or block the caller.
pub trait LogSinkPort: Send + Sync {
    fn info(&self, message: &str);

    fn error(&self, message: &str, cause: Option<&dyn std::error::Error>);
}
