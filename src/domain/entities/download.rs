use serde_repr::{Deserialize_repr, Serialize_repr};

use super::platform_error::PlatformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum DownloadState {
    Waiting = 0,
    Active = 1,
    Finished = 2,
    Failed = 3,
    Cancelled = 4,
    Paused = 5,
}

/// Hosted content attached to a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub content_identifier: String,
    pub transaction_identifier: Option<String>,
    pub state: DownloadState,
    /// Between 0.0 and 1.0.
    pub progress: f32,
    pub error: Option<PlatformError>,
}

impl Download {
    pub fn new(content_identifier: impl Into<String>, state: DownloadState) -> Self {
        Self {
            content_identifier: content_identifier.into(),
            transaction_identifier: None,
            state,
            progress: 0.0,
            error: None,
        }
    }

    pub fn with_error(mut self, error: PlatformError) -> Self {
        self.error = Some(error);
        self
    }
}
