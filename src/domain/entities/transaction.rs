use chrono::{DateTime, Utc};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::platform_error::PlatformError;

/// State of a purchase attempt as reported by the payment queue.
///
/// The discriminants match the platform's raw values so that hosts bridging
/// a native queue can pass them through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum TransactionState {
    /// The transaction is being processed by the App Store.
    Purchasing = 0,
    /// The App Store successfully processed payment. The transaction should be
    /// finished once content is delivered.
    Purchased = 1,
    /// The transaction failed. Check the error for details.
    Failed = 2,
    /// Restored from the user's purchase history.
    Restored = 3,
    /// In the queue, waiting on an external action such as Ask to Buy.
    Deferred = 4,
}

/// Purchase attempt observed on the payment queue. Owned by the platform; the
/// crate only ever holds clones of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Absent while the transaction is still `Purchasing`.
    pub identifier: Option<String>,
    pub original_identifier: Option<String>,
    pub product_identifier: String,
    pub state: TransactionState,
    pub error: Option<PlatformError>,
    pub date: Option<DateTime<Utc>>,
    pub quantity: u32,
}

impl Transaction {
    pub fn new(product_identifier: impl Into<String>, state: TransactionState) -> Self {
        Self {
            identifier: None,
            original_identifier: None,
            product_identifier: product_identifier.into(),
            state,
            error: None,
            date: None,
            quantity: 1,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_error(mut self, error: PlatformError) -> Self {
        self.error = Some(error);
        self
    }

    /// Whether the queue expects `finish_transaction` for this state.
    pub fn is_finishable(&self) -> bool {
        matches!(
            self.state,
            TransactionState::Purchased | TransactionState::Failed | TransactionState::Restored
        )
    }
}
