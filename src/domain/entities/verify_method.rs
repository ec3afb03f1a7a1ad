/// Whether, and how, purchased transactions are validated against the
/// `verifyReceipt` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VerifyMethod {
    #[default]
    None,
    /// Validate without a shared secret.
    Default,
    /// Validate with the app's shared secret. Required for auto-renewable
    /// subscriptions.
    WithPassword(String),
}

impl VerifyMethod {
    pub fn should_verify(&self) -> bool {
        !matches!(self, VerifyMethod::None)
    }

    pub fn password(&self) -> Option<&str> {
        match self {
            VerifyMethod::None | VerifyMethod::Default => None,
            VerifyMethod::WithPassword(password) => Some(password),
        }
    }
}
