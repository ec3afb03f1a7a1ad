use thiserror::Error;

/// Error surfaced by the platform payment subsystem (a failed transaction,
/// download, restore or request). Forwarded to callers as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{domain} error {code}: {message}")]
pub struct PlatformError {
    pub domain: String,
    pub code: i64,
    pub message: String,
}

impl PlatformError {
    pub fn new(domain: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            code,
            message: message.into(),
        }
    }
}
