use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header::CONTENT_TYPE;

use crate::{
    constants::{
        PRODUCTION_VERIFY_RECEIPT_URL, SANDBOX_VERIFY_RECEIPT_URL, VERIFY_RECEIPT_TIMEOUT,
    },
    data::models::verify_receipt::{
        request_body_model::RequestBodyModel, response_body_model::ResponseBodyModel,
    },
    domain::entities::environment::Environment,
    errors::StoreKitError,
};

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

#[async_trait]
pub(crate) trait VerifyReceiptDatasource: Send + Sync {
    /// Verify Receipt:
    /// https://developer.apple.com/documentation/appstorereceipts/verifyreceipt
    ///
    /// Returns the parsed body together with the raw JSON value, whatever the
    /// `status` field says. Only transport and HTTP-level failures are
    /// errors here.
    async fn verify_receipt(
        &self,
        environment: Environment,
        body: &RequestBodyModel,
    ) -> Result<(ResponseBodyModel, serde_json::Value), StoreKitError>;
}

pub(crate) struct VerifyReceiptDatasourceImpl {
    production_url: String,
    sandbox_url: String,
    timeout: Duration,
}

impl Default for VerifyReceiptDatasourceImpl {
    fn default() -> Self {
        Self::new(
            PRODUCTION_VERIFY_RECEIPT_URL,
            SANDBOX_VERIFY_RECEIPT_URL,
            VERIFY_RECEIPT_TIMEOUT,
        )
    }
}

impl VerifyReceiptDatasourceImpl {
    pub(crate) fn new(
        production_url: impl Into<String>,
        sandbox_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            production_url: production_url.into(),
            sandbox_url: sandbox_url.into(),
            timeout,
        }
    }

    fn url(&self, environment: Environment) -> &str {
        match environment {
            Environment::Production => &self.production_url,
            Environment::Sandbox => &self.sandbox_url,
        }
    }
}

#[async_trait]
impl VerifyReceiptDatasource for VerifyReceiptDatasourceImpl {
    async fn verify_receipt(
        &self,
        environment: Environment,
        body: &RequestBodyModel,
    ) -> Result<(ResponseBodyModel, serde_json::Value), StoreKitError> {
        let url = self.url(environment);
        tracing::debug!(%url, ?environment, "posting receipt");

        let response = HTTP_CLIENT
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(StoreKitError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreKitError::NonHttpResponse {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let raw: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                StoreKitError::Timeout
            } else {
                StoreKitError::underlying(e)
            }
        })?;
        let model = serde_json::from_value(raw.clone()).map_err(StoreKitError::underlying)?;
        Ok((model, raw))
    }
}
