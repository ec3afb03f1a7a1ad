use super::{environment::Environment, verify_method::VerifyMethod};

/// Parameters of one receipt validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReceiptOptions {
    /// Only return the most recent transaction for auto-renewable
    /// subscriptions.
    pub exclude_old_transactions: bool,
    /// The app's shared secret.
    pub password: Option<String>,
    /// Endpoint tried first. A sandbox receipt sent to production is retried
    /// once against sandbox.
    pub environment: Environment,
}

impl Default for VerifyReceiptOptions {
    fn default() -> Self {
        Self {
            exclude_old_transactions: false,
            password: None,
            environment: Environment::from_build(),
        }
    }
}

impl VerifyReceiptOptions {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            ..Default::default()
        }
    }

    pub fn from_method(method: &VerifyMethod, environment: Environment) -> Self {
        Self {
            exclude_old_transactions: false,
            password: method.password().map(str::to_owned),
            environment,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn excluding_old_transactions(mut self, exclude: bool) -> Self {
        self.exclude_old_transactions = exclude;
        self
    }
}
