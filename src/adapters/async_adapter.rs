use std::{collections::BTreeSet, sync::Arc};

use crate::{
    domain::{
        entities::{
            payment::Payment,
            product::Product,
            transaction::{Transaction, TransactionState},
        },
        platform::platform_request::{PlatformRequest, StoreFront},
    },
    errors::StoreKitError,
    observer::transaction_observer_proxy::TransactionObserverProxy,
};

use super::bridge::{Pending, Resolver};

/// One-shot async calls over the payment queue and the store's requests.
///
/// Every call subscribes before it triggers the platform, resolves on the
/// first relevant callback and unsubscribes right away.
#[derive(Clone)]
pub struct AsyncAdapter {
    proxy: Arc<TransactionObserverProxy>,
    store_front: Arc<dyn StoreFront>,
}

impl AsyncAdapter {
    pub fn new(proxy: Arc<TransactionObserverProxy>, store_front: Arc<dyn StoreFront>) -> Self {
        Self { proxy, store_front }
    }

    /// Adds `payment` to the queue and waits for its transaction to settle.
    ///
    /// The transaction is not finished; callers finish it once content has
    /// been delivered (and, if wanted, the receipt validated).
    pub fn purchase(&self, payment: impl Into<Payment>) -> Pending<Transaction> {
        let payment = payment.into();
        let (resolver, pending) = Resolver::pending();
        let product_id = payment.product_identifier.clone();

        let r = resolver.clone();
        let subscription = self.proxy.on_updated(move |transactions| {
            if let Some(outcome) = purchase_outcome(&product_id, transactions) {
                r.resolve(outcome);
            }
        });
        resolver.cancel_on_settle(subscription.detach());

        tracing::debug!(product_id = %payment.product_identifier, "adding payment");
        self.proxy.queue().add_payment(payment);
        pending
    }

    /// Restores previously completed purchases; yields the queue's
    /// transactions once the restore has finished.
    pub fn restore_completed_transactions(&self) -> Pending<Vec<Transaction>> {
        let (resolver, pending) = Resolver::pending();

        let queue = self.proxy.queue().clone();
        let r = resolver.clone();
        let finished = self.proxy.on_restore_finished(move || {
            r.resolve(Ok(queue.transactions()));
        });
        let r = resolver.clone();
        let failed = self.proxy.on_restore_failed(move |error| {
            r.resolve(Err(StoreKitError::Platform(error.clone())));
        });
        resolver.cancel_on_settle(finished.detach());
        resolver.cancel_on_settle(failed.detach());

        self.proxy.queue().restore_completed_transactions();
        pending
    }

    /// Looks up product information for `product_ids`. Identifiers the store
    /// does not know are left out of the result.
    pub fn products<I, S>(&self, product_ids: I) -> Pending<Vec<Product>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: BTreeSet<String> = product_ids.into_iter().map(Into::into).collect();
        let request = self.store_front.products_request(&ids);
        start_request(request, |response| response.products)
    }

    pub async fn product(
        &self,
        product_id: impl Into<String>,
    ) -> Result<Option<Product>, StoreKitError> {
        let products = self.products([product_id.into()]).await?;
        Ok(products.into_iter().next())
    }

    /// Asks the store to refresh the receipt on disk.
    pub fn refresh_receipt(&self) -> Pending<()> {
        start_request(self.store_front.receipt_refresh_request(), |_| ())
    }
}

fn start_request<T, U, F>(request: Arc<dyn PlatformRequest<T>>, map: F) -> Pending<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnOnce(T) -> U + Send + 'static,
{
    let (resolver, pending) = Resolver::pending();
    let in_flight = request.clone();
    resolver.on_cancel(move || in_flight.cancel());

    let on_success = resolver.clone();
    let on_error = resolver;
    request.start(
        Box::new(move |response| {
            on_success.resolve(Ok(map(response)));
        }),
        Box::new(move |error| {
            on_error.resolve(Err(StoreKitError::Platform(error)));
        }),
    );
    pending
}

/// Decides a one-shot purchase from one batch of updated transactions.
/// `None` means keep waiting.
///
/// A `Restored` update for the purchased product is treated as a failure: the
/// purchase itself did not go through.
pub(crate) fn purchase_outcome(
    product_id: &str,
    transactions: &[Transaction],
) -> Option<Result<Transaction, StoreKitError>> {
    if transactions.is_empty() {
        return Some(Err(StoreKitError::EmptyTransaction));
    }
    let Some(transaction) = transactions
        .iter()
        .find(|t| t.product_identifier == product_id)
    else {
        tracing::debug!(product_id, "update without a transaction for this purchase");
        return None;
    };
    match transaction.state {
        TransactionState::Purchased => Some(Ok(transaction.clone())),
        TransactionState::Failed | TransactionState::Restored => Some(Err(transaction
            .error
            .clone()
            .map(StoreKitError::Platform)
            .unwrap_or(StoreKitError::Illegal))),
        TransactionState::Purchasing | TransactionState::Deferred => None,
    }
}
