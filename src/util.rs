use std::{collections::BTreeSet, sync::Arc};

use futures::{stream, StreamExt};

use crate::{
    adapters::{
        async_adapter::AsyncAdapter,
        bridge::{EventStream, Pending},
        stream_adapter::{RestoreStream, StreamAdapter, TransactionStream},
    },
    config::StoreKitConfig,
    data::{
        datasources::{
            receipt_file_datasource::ReceiptFileDatasourceImpl,
            verify_receipt_datasource::VerifyReceiptDatasourceImpl,
        },
        repositories::receipt_repository_impl::ReceiptRepositoryImpl,
    },
    domain::{
        entities::{
            download::Download,
            payment::Payment,
            product::{Product, ProductsResponse},
            transaction::Transaction,
            verified_receipt::VerifiedReceipt,
            verify_method::VerifyMethod,
            verify_receipt_options::VerifyReceiptOptions,
        },
        platform::{payment_queue::PaymentQueue, platform_request::StoreFront},
        repositories::receipt_repository::ReceiptRepository,
    },
    errors::StoreKitError,
    observer::transaction_observer_proxy::TransactionObserverProxy,
};

/// Validates the device receipt against the `verifyReceipt` endpoint.
#[derive(Clone)]
pub struct ReceiptVerifier {
    repository: Arc<dyn ReceiptRepository>,
    config: StoreKitConfig,
}

impl ReceiptVerifier {
    /// Reads the receipt from `config.receipt_path` and posts it to the
    /// configured endpoints.
    pub fn new(config: StoreKitConfig) -> Result<Self, StoreKitError> {
        let path = config
            .receipt_path
            .clone()
            .ok_or_else(|| StoreKitError::underlying("no receipt path configured"))?;
        let repository = ReceiptRepositoryImpl::new(
            ReceiptFileDatasourceImpl::new(path),
            VerifyReceiptDatasourceImpl::new(
                config.production_url.clone(),
                config.sandbox_url.clone(),
                config.timeout,
            ),
        );
        Ok(Self::with_repository(Arc::new(repository), config))
    }

    pub fn with_repository(repository: Arc<dyn ReceiptRepository>, config: StoreKitConfig) -> Self {
        Self { repository, config }
    }

    /// Validates with the configured environment and the password carried by
    /// `method`.
    pub async fn verify(
        &self,
        transaction: &Transaction,
        method: &VerifyMethod,
    ) -> Result<VerifiedReceipt, StoreKitError> {
        self.verify_with_options(transaction, &self.config.verify_options(method))
            .await
    }

    pub async fn verify_with_options(
        &self,
        transaction: &Transaction,
        options: &VerifyReceiptOptions,
    ) -> Result<VerifiedReceipt, StoreKitError> {
        self.repository.verify_receipt(transaction, options).await
    }

    pub fn config(&self) -> &StoreKitConfig {
        &self.config
    }

    pub(crate) fn repository(&self) -> Arc<dyn ReceiptRepository> {
        self.repository.clone()
    }
}

/// Entry point for the host application: owns the queue's delegate slot for
/// its lifetime and exposes both adapters and receipt validation.
pub struct StoreKitUtil {
    proxy: Arc<TransactionObserverProxy>,
    async_adapter: AsyncAdapter,
    stream_adapter: StreamAdapter,
    verifier: Option<ReceiptVerifier>,
    config: StoreKitConfig,
}

impl StoreKitUtil {
    /// Registers as the queue's transaction observer. Fails if the queue
    /// already has one.
    ///
    /// Receipt validation is only available when `config` names a receipt
    /// path.
    pub fn new(
        queue: Arc<dyn PaymentQueue>,
        store_front: Arc<dyn StoreFront>,
        config: StoreKitConfig,
    ) -> Result<Self, StoreKitError> {
        let verifier = match config.receipt_path {
            Some(_) => Some(ReceiptVerifier::new(config.clone())?),
            None => None,
        };
        Self::with_verifier(queue, store_front, config, verifier)
    }

    pub fn with_verifier(
        queue: Arc<dyn PaymentQueue>,
        store_front: Arc<dyn StoreFront>,
        config: StoreKitConfig,
        verifier: Option<ReceiptVerifier>,
    ) -> Result<Self, StoreKitError> {
        let proxy = Arc::new(TransactionObserverProxy::new(queue));
        proxy.init()?;
        Ok(Self {
            async_adapter: AsyncAdapter::new(proxy.clone(), store_front.clone()),
            stream_adapter: StreamAdapter::new(proxy.clone(), store_front),
            proxy,
            verifier,
            config,
        })
    }

    /// Releases the queue's delegate slot and drops every subscription.
    /// Pending one-shot calls resume with [`StoreKitError::Cancelled`] and
    /// open streams end.
    pub fn shutdown(&self) {
        self.proxy.shutdown();
    }

    pub fn proxy(&self) -> &Arc<TransactionObserverProxy> {
        &self.proxy
    }

    pub fn async_adapter(&self) -> &AsyncAdapter {
        &self.async_adapter
    }

    pub fn stream_adapter(&self) -> &StreamAdapter {
        &self.stream_adapter
    }

    pub fn verifier(&self) -> Option<&ReceiptVerifier> {
        self.verifier.as_ref()
    }

    pub fn config(&self) -> &StoreKitConfig {
        &self.config
    }

    // Async.

    pub fn purchase(&self, payment: impl Into<Payment>) -> Pending<Transaction> {
        self.async_adapter.purchase(payment)
    }

    /// Purchases, then validates the receipt unless `method` is
    /// [`VerifyMethod::None`]. The transaction is left unfinished either way.
    pub async fn purchase_with_verification(
        &self,
        payment: impl Into<Payment>,
        method: VerifyMethod,
    ) -> Result<Transaction, StoreKitError> {
        let transaction = self.async_adapter.purchase(payment).await?;
        if method.should_verify() {
            self.verifier()
                .ok_or_else(no_verifier)?
                .verify(&transaction, &method)
                .await?;
        }
        Ok(transaction)
    }

    pub fn restore_completed_transactions(&self) -> Pending<Vec<Transaction>> {
        self.async_adapter.restore_completed_transactions()
    }

    pub fn products<I, S>(&self, product_ids: I) -> Pending<Vec<Product>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.async_adapter.products(product_ids)
    }

    pub async fn product(
        &self,
        product_id: impl Into<String>,
    ) -> Result<Option<Product>, StoreKitError> {
        self.async_adapter.product(product_id).await
    }

    pub fn refresh_receipt(&self) -> Pending<()> {
        self.async_adapter.refresh_receipt()
    }

    pub async fn verify_receipt(
        &self,
        transaction: &Transaction,
        method: &VerifyMethod,
    ) -> Result<VerifiedReceipt, StoreKitError> {
        self.verifier()
            .ok_or_else(no_verifier)?
            .verify(transaction, method)
            .await
    }

    pub fn finish_transaction(&self, transaction: &Transaction) {
        self.proxy.queue().finish_transaction(transaction);
    }

    // Streams.

    pub fn purchase_stream(&self, payment: impl Into<Payment>) -> EventStream<Transaction> {
        self.stream_adapter.purchase_stream(payment)
    }

    /// Purchase stream whose `Purchased` transaction is validated before it
    /// is finished and emitted. With [`VerifyMethod::None`] this is the plain
    /// purchase stream.
    pub fn purchase_stream_with_verification(
        &self,
        payment: impl Into<Payment>,
        method: VerifyMethod,
    ) -> TransactionStream {
        if !method.should_verify() {
            return self.stream_adapter.purchase_stream(payment).boxed();
        }
        match self.verifier() {
            Some(verifier) => self.stream_adapter.verified_purchase_stream(
                payment,
                verifier.repository(),
                self.config.verify_options(&method),
            ),
            None => stream::once(async { Err::<Transaction, _>(no_verifier()) }).boxed(),
        }
    }

    pub fn restore_stream(&self) -> RestoreStream {
        self.stream_adapter.restore_stream()
    }

    pub fn download_stream(&self, downloads: Vec<Download>) -> EventStream<Download> {
        self.stream_adapter.download_stream(downloads)
    }

    pub fn products_response_stream(
        &self,
        product_ids: BTreeSet<String>,
    ) -> EventStream<ProductsResponse> {
        self.stream_adapter.products_response_stream(product_ids)
    }

    pub fn updated_transactions_stream(&self) -> EventStream<Transaction> {
        self.stream_adapter.updated_transactions_stream()
    }

    pub fn removed_transactions_stream(&self) -> EventStream<Transaction> {
        self.stream_adapter.removed_transactions_stream()
    }

    pub fn updated_downloads_stream(&self) -> EventStream<Download> {
        self.stream_adapter.updated_downloads_stream()
    }
}

fn no_verifier() -> StoreKitError {
    StoreKitError::underlying("receipt validation requires a receipt path")
}
