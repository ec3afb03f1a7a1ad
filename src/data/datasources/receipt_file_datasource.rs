use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::StoreKitError;

#[async_trait]
pub(crate) trait ReceiptDatasource: Send + Sync {
    /// Raw bytes of the app's current receipt.
    async fn read_receipt(&self) -> Result<Vec<u8>, StoreKitError>;
}

/// Reads the receipt from the location the platform stores it at.
pub(crate) struct ReceiptFileDatasourceImpl {
    path: PathBuf,
}

impl ReceiptFileDatasourceImpl {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReceiptDatasource for ReceiptFileDatasourceImpl {
    async fn read_receipt(&self) -> Result<Vec<u8>, StoreKitError> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            tracing::debug!(path = %self.path.display(), error = %e, "failed to read receipt");
            StoreKitError::underlying(e)
        })
    }
}
