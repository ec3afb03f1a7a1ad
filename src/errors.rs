use thiserror::Error;

use crate::domain::entities::platform_error::PlatformError;

/// Status returned by `verifyReceipt` when a sandbox receipt was sent to the
/// production environment.
pub const STATUS_SANDBOX_RECEIPT_IN_PRODUCTION: i64 = 21007;

#[derive(Debug, Error)]
pub enum StoreKitError {
    /// The validation endpoint answered with a non-zero status.
    #[error("{}", describe_status(*code))]
    Invalid { code: i64 },

    /// The receipt validated, but the purchased product is not among its line
    /// items, or the platform reported a failed/restored transaction without
    /// attaching an error.
    #[error("Receipt does not contain the purchased product.")]
    Illegal,

    #[error("Callout failed to send: {0}")]
    UrlError(#[source] reqwest::Error),

    #[error("Callout timed out.")]
    Timeout,

    #[error("{0}")]
    Underlying(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Callout returned with non-2xx status code {status}: {body}")]
    NonHttpResponse { status: u16, body: String },

    #[error("Empty transaction.")]
    EmptyTransaction,

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Operation was cancelled.")]
    Cancelled,

    #[error("The payment queue already has a transaction observer.")]
    ObserverAlreadyRegistered,
}

impl StoreKitError {
    pub(crate) fn underlying<E>(e: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StoreKitError::Underlying(e.into())
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StoreKitError::Timeout
        } else {
            StoreKitError::UrlError(e)
        }
    }

    /// Status code carried by an `Invalid` error, if any.
    pub fn status_code(&self) -> Option<i64> {
        match self {
            StoreKitError::Invalid { code } => Some(*code),
            _ => None,
        }
    }
}

/// Human readable description of a `verifyReceipt` status code.
///
/// https://developer.apple.com/documentation/appstorereceipts/status
pub fn describe_status(code: i64) -> String {
    match code {
        21000 => "The App Store could not read the JSON object you provided.".to_owned(),
        21002 => "The data in the receipt-data property was malformed or missing.".to_owned(),
        21003 => "The receipt could not be authenticated.".to_owned(),
        21004 => "The shared secret you provided does not match the shared secret on file for your account.".to_owned(),
        21005 => "The receipt server is not currently available.".to_owned(),
        21006 => "This receipt is valid but the subscription has expired.".to_owned(),
        STATUS_SANDBOX_RECEIPT_IN_PRODUCTION => "This receipt is from the test environment, but it was sent to the production environment for verification.".to_owned(),
        21008 => "This receipt is from the production environment, but it was sent to the test environment for verification.".to_owned(),
        21010 => "This receipt could not be authorized.".to_owned(),
        21100..=21199 => format!("Internal data access error ({code})."),
        _ => format!("Unknown receipt status ({code})."),
    }
}
