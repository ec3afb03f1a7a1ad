use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
    data::{
        datasources::{
            receipt_file_datasource::ReceiptDatasource,
            verify_receipt_datasource::VerifyReceiptDatasource,
        },
        models::verify_receipt::{
            request_body_model::RequestBodyModel,
            response_body_model::{InAppModel, ReceiptModel},
        },
    },
    domain::{
        entities::{
            environment::Environment,
            transaction::Transaction,
            verified_receipt::{InAppPurchase, ReceiptInfo, VerifiedReceipt},
            verify_receipt_options::VerifyReceiptOptions,
        },
        repositories::receipt_repository::ReceiptRepository,
    },
    errors::{StoreKitError, STATUS_SANDBOX_RECEIPT_IN_PRODUCTION},
};

pub(crate) struct ReceiptRepositoryImpl<R: ReceiptDatasource, V: VerifyReceiptDatasource> {
    receipt_datasource: R,
    verify_receipt_datasource: V,
}

impl<R: ReceiptDatasource, V: VerifyReceiptDatasource> ReceiptRepositoryImpl<R, V> {
    pub(crate) fn new(receipt_datasource: R, verify_receipt_datasource: V) -> Self {
        Self {
            receipt_datasource,
            verify_receipt_datasource,
        }
    }
}

#[async_trait]
impl<R: ReceiptDatasource, V: VerifyReceiptDatasource> ReceiptRepository
    for ReceiptRepositoryImpl<R, V>
{
    #[tracing::instrument(
        skip_all,
        fields(product = %transaction.product_identifier, environment = ?options.environment)
    )]
    async fn verify_receipt(
        &self,
        transaction: &Transaction,
        options: &VerifyReceiptOptions,
    ) -> Result<VerifiedReceipt, StoreKitError> {
        let receipt = self.receipt_datasource.read_receipt().await?;
        let body = RequestBodyModel {
            receipt_data: STANDARD.encode(receipt),
            password: options.password.clone(),
            exclude_old_transactions: options.exclude_old_transactions,
        };

        let mut environment = options.environment;
        let (mut response, mut raw) = self
            .verify_receipt_datasource
            .verify_receipt(environment, &body)
            .await?;

        // A sandbox receipt sent to production is retried against sandbox,
        // at most once.
        if response.status == STATUS_SANDBOX_RECEIPT_IN_PRODUCTION
            && environment == Environment::Production
        {
            tracing::warn!("sandbox receipt sent to production, retrying against sandbox");
            environment = Environment::Sandbox;
            (response, raw) = self
                .verify_receipt_datasource
                .verify_receipt(environment, &body)
                .await?;
        }

        if response.status != 0 {
            tracing::debug!(status = response.status, "receipt rejected");
            return Err(StoreKitError::Invalid {
                code: response.status,
            });
        }

        let receipt = response.receipt.map(ReceiptInfo::from).ok_or_else(|| {
            tracing::debug!("status 0 without a receipt");
            StoreKitError::Illegal
        })?;
        if !receipt.contains_product(&transaction.product_identifier) {
            tracing::debug!("receipt does not contain the purchased product");
            return Err(StoreKitError::Illegal);
        }

        Ok(VerifiedReceipt {
            transaction: transaction.clone(),
            environment,
            receipt: ReceiptInfo {
                latest_receipt_info: response
                    .latest_receipt_info
                    .into_iter()
                    .map(InAppPurchase::from)
                    .collect(),
                ..receipt
            },
            raw,
        })
    }
}

impl From<InAppModel> for InAppPurchase {
    fn from(model: InAppModel) -> Self {
        Self {
            product_id: model.product_id,
            quantity: model.quantity,
            transaction_id: model.transaction_id,
            original_transaction_id: model.original_transaction_id,
            purchase_date: model.purchase_date_ms,
            expires_date: model.expires_date_ms,
        }
    }
}

impl From<ReceiptModel> for ReceiptInfo {
    fn from(model: ReceiptModel) -> Self {
        Self {
            bundle_id: model.bundle_id,
            application_version: model.application_version,
            in_app: model.in_app.into_iter().map(InAppPurchase::from).collect(),
            latest_receipt_info: Vec::new(),
        }
    }
}
