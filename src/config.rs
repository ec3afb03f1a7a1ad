use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};

use crate::{
    constants::{
        PRODUCTION_VERIFY_RECEIPT_URL, SANDBOX_VERIFY_RECEIPT_URL, VERIFY_RECEIPT_TIMEOUT,
    },
    domain::entities::{
        environment::Environment, verify_method::VerifyMethod,
        verify_receipt_options::VerifyReceiptOptions,
    },
    errors::StoreKitError,
};

pub const ENV_RECEIPT_PATH: &str = "STOREKIT_RECEIPT_PATH";
pub const ENV_SHARED_SECRET: &str = "STOREKIT_SHARED_SECRET";
pub const ENV_ENVIRONMENT: &str = "STOREKIT_ENVIRONMENT";
pub const ENV_PRODUCTION_URL: &str = "STOREKIT_PRODUCTION_URL";
pub const ENV_SANDBOX_URL: &str = "STOREKIT_SANDBOX_URL";

/// Settings for receipt validation.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreKitConfig {
    /// Location of the app's receipt. Validation fails without one.
    pub receipt_path: Option<PathBuf>,
    pub shared_secret: Option<String>,
    /// Overrides [`Environment::from_build`].
    pub environment: Option<Environment>,
    pub production_url: String,
    pub sandbox_url: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
    pub exclude_old_transactions: bool,
}

impl Default for StoreKitConfig {
    fn default() -> Self {
        Self {
            receipt_path: None,
            shared_secret: None,
            environment: None,
            production_url: PRODUCTION_VERIFY_RECEIPT_URL.to_owned(),
            sandbox_url: SANDBOX_VERIFY_RECEIPT_URL.to_owned(),
            timeout: VERIFY_RECEIPT_TIMEOUT,
            exclude_old_transactions: false,
        }
    }
}

impl StoreKitConfig {
    /// Defaults overlaid with the `STOREKIT_*` environment variables.
    pub fn from_env() -> Result<Self, StoreKitError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, StoreKitError> {
        if let Some(path) = var(ENV_RECEIPT_PATH) {
            self.receipt_path = Some(PathBuf::from(path));
        }
        if let Some(secret) = var(ENV_SHARED_SECRET) {
            self.shared_secret = Some(secret);
        }
        if let Some(environment) = var(ENV_ENVIRONMENT) {
            self.environment = Some(environment.parse().map_err(StoreKitError::underlying)?);
        }
        if let Some(url) = var(ENV_PRODUCTION_URL) {
            self.production_url = url;
        }
        if let Some(url) = var(ENV_SANDBOX_URL) {
            self.sandbox_url = url;
        }
        Ok(self)
    }

    pub fn environment(&self) -> Environment {
        self.environment.unwrap_or_else(Environment::from_build)
    }

    /// `WithPassword` when a shared secret is configured, `Default`
    /// otherwise.
    pub fn verify_method(&self) -> VerifyMethod {
        match &self.shared_secret {
            Some(secret) => VerifyMethod::WithPassword(secret.clone()),
            None => VerifyMethod::Default,
        }
    }

    pub(crate) fn verify_options(&self, method: &VerifyMethod) -> VerifyReceiptOptions {
        VerifyReceiptOptions::from_method(method, self.environment())
            .excluding_old_transactions(self.exclude_old_transactions)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn overlay(vars: &[(&str, &str)]) -> Result<StoreKitConfig, StoreKitError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StoreKitConfig::default().overlay(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_point_at_apple() {
        let config = StoreKitConfig::default();
        assert_eq!(config.production_url, PRODUCTION_VERIFY_RECEIPT_URL);
        assert_eq!(config.sandbox_url, SANDBOX_VERIFY_RECEIPT_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.verify_method(), VerifyMethod::Default);
    }

    #[test]
    fn env_overrides_defaults() {
        let config = overlay(&[
            (ENV_RECEIPT_PATH, "/tmp/receipt"),
            (ENV_SHARED_SECRET, "secret"),
            (ENV_ENVIRONMENT, "Production"),
            (ENV_SANDBOX_URL, "http://localhost/verifyReceipt"),
        ])
        .unwrap();

        assert_eq!(config.receipt_path, Some(PathBuf::from("/tmp/receipt")));
        assert_eq!(config.environment(), Environment::Production);
        assert_eq!(config.sandbox_url, "http://localhost/verifyReceipt");
        assert_eq!(config.production_url, PRODUCTION_VERIFY_RECEIPT_URL);
        assert_eq!(
            config.verify_method(),
            VerifyMethod::WithPassword("secret".to_owned())
        );
    }

    #[test]
    fn unknown_environment_is_rejected() {
        assert!(matches!(
            overlay(&[(ENV_ENVIRONMENT, "staging")]),
            Err(StoreKitError::Underlying(_))
        ));
    }

    #[test]
    fn deserializes_partial_config() {
        let config: StoreKitConfig =
            serde_json::from_str(r#"{ "environment": "Sandbox", "timeout": 5 }"#).unwrap();
        assert_eq!(config.environment, Some(Environment::Sandbox));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.receipt_path.is_none());
    }
}
