use std::time::Duration;

pub const PRODUCTION_VERIFY_RECEIPT_URL: &str = "https://buy.itunes.apple.com/verifyReceipt";
pub const SANDBOX_VERIFY_RECEIPT_URL: &str = "https://sandbox.itunes.apple.com/verifyReceipt";

pub const VERIFY_RECEIPT_TIMEOUT: Duration = Duration::from_secs(30);
