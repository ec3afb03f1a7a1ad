use chrono::{DateTime, Utc};

use super::{environment::Environment, transaction::Transaction};

/// Successful validation outcome.
#[derive(Debug, Clone)]
pub struct VerifiedReceipt {
    /// The transaction that was validated.
    pub transaction: Transaction,
    /// Environment whose endpoint accepted the receipt. May differ from the
    /// requested one after a sandbox fallback.
    pub environment: Environment,
    pub receipt: ReceiptInfo,
    /// The full response body, for callers that need fields not modelled here.
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiptInfo {
    pub bundle_id: Option<String>,
    pub application_version: Option<String>,
    pub in_app: Vec<InAppPurchase>,
    /// Only present for receipts containing auto-renewable subscriptions.
    pub latest_receipt_info: Vec<InAppPurchase>,
}

impl ReceiptInfo {
    pub fn contains_product(&self, product_id: &str) -> bool {
        self.in_app.iter().any(|p| p.product_id == product_id)
    }
}

/// One line item of a receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct InAppPurchase {
    pub product_id: String,
    pub quantity: Option<u32>,
    pub transaction_id: Option<String>,
    pub original_transaction_id: Option<String>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub expires_date: Option<DateTime<Utc>>,
}
