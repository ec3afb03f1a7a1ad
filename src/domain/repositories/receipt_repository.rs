use async_trait::async_trait;

use crate::{
    domain::entities::{
        transaction::Transaction, verified_receipt::VerifiedReceipt,
        verify_receipt_options::VerifyReceiptOptions,
    },
    errors::StoreKitError,
};

#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    /// Validates the device's current receipt and checks that it contains
    /// `transaction`'s product.
    async fn verify_receipt(
        &self,
        transaction: &Transaction,
        options: &VerifyReceiptOptions,
    ) -> Result<VerifiedReceipt, StoreKitError>;
}
