#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, TimestampMilliSeconds};

/// Body of a `verifyReceipt` response.
///
/// https://developer.apple.com/documentation/appstorereceipts/responsebody
///
/// Only `status` is guaranteed; everything else is absent on most error
/// statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseBodyModel {
    /// Either 0 if the receipt is valid, or a status code if there is an
    /// error.
    pub(crate) status: i64,
    /// The environment for which the receipt was generated.
    pub(crate) environment: Option<String>,
    /// An indicator that an error occurred during the request. A value of 1
    /// indicates a temporary issue; retry validation for this receipt at a
    /// later time.
    #[serde(rename = "is-retryable", default)]
    pub(crate) is_retryable: bool,
    /// The decoded receipt that was sent for verification.
    pub(crate) receipt: Option<ReceiptModel>,
    /// The latest Base64 encoded app receipt. Only returned for receipts that
    /// contain auto-renewable subscriptions.
    pub(crate) latest_receipt: Option<String>,
    /// An array that contains all in-app purchase transactions. Only returned
    /// for receipts that contain auto-renewable subscriptions.
    #[serde(default)]
    pub(crate) latest_receipt_info: Vec<InAppModel>,
}

/// https://developer.apple.com/documentation/appstorereceipts/responsebody/receipt
#[derive(Debug, Deserialize)]
pub(crate) struct ReceiptModel {
    pub(crate) bundle_id: Option<String>,
    pub(crate) application_version: Option<String>,
    /// The in-app purchase receipt fields for all in-app purchase
    /// transactions.
    #[serde(default)]
    pub(crate) in_app: Vec<InAppModel>,
}

/// https://developer.apple.com/documentation/appstorereceipts/responsebody/receipt/in_app
///
/// The endpoint encodes every number as a string.
#[serde_as]
#[derive(Debug, Deserialize)]
pub(crate) struct InAppModel {
    /// The unique identifier of the product purchased.
    pub(crate) product_id: String,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub(crate) quantity: Option<u32>,
    pub(crate) transaction_id: Option<String>,
    pub(crate) original_transaction_id: Option<String>,
    /// The time the App Store charged the user's account, in UNIX epoch
    /// milliseconds.
    #[serde_as(as = "Option<TimestampMilliSeconds<String>>")]
    pub(crate) purchase_date_ms: Option<DateTime<Utc>>,
    /// Subscription expiry, in UNIX epoch milliseconds.
    #[serde_as(as = "Option<TimestampMilliSeconds<String>>")]
    pub(crate) expires_date_ms: Option<DateTime<Utc>>,
}
