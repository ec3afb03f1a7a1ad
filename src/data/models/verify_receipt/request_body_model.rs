use serde::Serialize;

/// Body of a `verifyReceipt` request.
///
/// https://developer.apple.com/documentation/appstorereceipts/requestbody
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RequestBodyModel {
    /// The Base64-encoded receipt data.
    #[serde(rename = "receipt-data")]
    pub(crate) receipt_data: String,
    /// Your app's shared secret. Only needed for receipts containing
    /// auto-renewable subscriptions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) password: Option<String>,
    /// Set to true for the response to include only the latest renewal
    /// transaction for any subscriptions.
    #[serde(rename = "exclude-old-transactions")]
    pub(crate) exclude_old_transactions: bool,
}
