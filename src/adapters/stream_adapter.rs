use std::{collections::BTreeSet, sync::Arc};

use futures::{stream::BoxStream, StreamExt};

use crate::{
    domain::{
        entities::{
            download::{Download, DownloadState},
            payment::Payment,
            product::ProductsResponse,
            transaction::{Transaction, TransactionState},
            verify_receipt_options::VerifyReceiptOptions,
        },
        platform::{payment_queue::PaymentQueue, platform_request::StoreFront},
        repositories::receipt_repository::ReceiptRepository,
    },
    errors::StoreKitError,
    observer::transaction_observer_proxy::TransactionObserverProxy,
};

use super::{
    amb::Amb,
    bridge::{EventStream, StreamSink},
};

pub type TransactionStream = BoxStream<'static, Result<Transaction, StoreKitError>>;
pub type RestoreStream = BoxStream<'static, Result<Vec<Transaction>, StoreKitError>>;

/// Cancellable streams over the payment queue's callbacks. Dropping a stream
/// unsubscribes it.
#[derive(Clone)]
pub struct StreamAdapter {
    proxy: Arc<TransactionObserverProxy>,
    store_front: Arc<dyn StoreFront>,
}

impl StreamAdapter {
    pub fn new(proxy: Arc<TransactionObserverProxy>, store_front: Arc<dyn StoreFront>) -> Self {
        Self { proxy, store_front }
    }

    /// Every transaction the queue reports as updated. Never terminates on its
    /// own.
    pub fn updated_transactions_stream(&self) -> EventStream<Transaction> {
        let (sink, receiver) = StreamSink::channel();
        let subscription = self.proxy.on_updated(move |transactions| {
            for transaction in transactions {
                sink.send(transaction.clone());
            }
        });
        EventStream::new(receiver, vec![subscription])
    }

    pub fn removed_transactions_stream(&self) -> EventStream<Transaction> {
        let (sink, receiver) = StreamSink::channel();
        let subscription = self.proxy.on_removed(move |transactions| {
            for transaction in transactions {
                sink.send(transaction.clone());
            }
        });
        EventStream::new(receiver, vec![subscription])
    }

    pub fn updated_downloads_stream(&self) -> EventStream<Download> {
        let (sink, receiver) = StreamSink::channel();
        let subscription = self.proxy.on_updated_downloads(move |downloads| {
            for download in downloads {
                sink.send(download.clone());
            }
        });
        EventStream::new(receiver, vec![subscription])
    }

    /// Yields the queue's transactions each time a restore finishes.
    pub fn restore_finished_stream(&self) -> EventStream<Vec<Transaction>> {
        let (sink, receiver) = StreamSink::channel();
        let queue = self.proxy.queue().clone();
        let subscription = self.proxy.on_restore_finished(move || {
            sink.send(queue.transactions());
        });
        EventStream::new(receiver, vec![subscription])
    }

    /// Terminates with the error of the first failed restore.
    pub fn restore_failed_stream(&self) -> EventStream<Vec<Transaction>> {
        let (sink, receiver) = StreamSink::channel();
        let s = sink.clone();
        let subscription = self.proxy.on_restore_failed(move |error| {
            s.fail(StoreKitError::Platform(error.clone()));
        });
        sink.cancel_on_terminate(subscription.token());
        EventStream::new(receiver, vec![subscription])
    }

    /// Triggers a restore and races its success and failure callbacks:
    /// whichever fires first decides the stream, the other is unsubscribed.
    pub fn restore_stream(&self) -> RestoreStream {
        let finished = self.restore_finished_stream();
        let failed = self.restore_failed_stream();
        let restore = Amb::new(finished, failed);
        self.proxy.queue().restore_completed_transactions();
        restore.boxed()
    }

    /// Adds `payment` to the queue and streams the resulting transaction
    /// updates.
    ///
    /// `Purchased` and `Failed` transactions are finished on the queue and end
    /// the stream (with the platform error, if the failure carries one).
    /// `Restored` transactions are finished and emitted without ending it.
    pub fn purchase_stream(&self, payment: impl Into<Payment>) -> EventStream<Transaction> {
        let payment = payment.into();
        let (sink, receiver) = StreamSink::channel();
        let queue = self.proxy.queue().clone();

        let s = sink.clone();
        let subscription = self.proxy.on_updated(move |transactions| {
            for transaction in transactions {
                if s.is_terminated() {
                    break;
                }
                forward_purchase_update(queue.as_ref(), &s, transaction);
            }
        });
        sink.cancel_on_terminate(subscription.token());

        self.proxy.queue().add_payment(payment);
        EventStream::new(receiver, vec![subscription])
    }

    /// Like [`purchase_stream`](Self::purchase_stream), but a `Purchased`
    /// transaction is only finished and emitted after its receipt validated.
    /// A validation failure ends the stream with that error and leaves the
    /// transaction unfinished.
    pub fn verified_purchase_stream(
        &self,
        payment: impl Into<Payment>,
        repository: Arc<dyn ReceiptRepository>,
        options: VerifyReceiptOptions,
    ) -> TransactionStream {
        let updates = self.updated_transactions_stream();
        self.proxy.queue().add_payment(payment.into());

        let state = VerifiedPurchase {
            updates,
            queue: self.proxy.queue().clone(),
            repository,
            options,
            done: false,
        };
        futures::stream::unfold(state, |mut state| async move {
            if state.done {
                return None;
            }
            let transaction = match state.updates.next().await? {
                Ok(transaction) => transaction,
                Err(error) => {
                    state.done = true;
                    return Some((Err(error), state));
                }
            };
            let item = state.step(transaction).await;
            Some((item, state))
        })
        .boxed()
    }

    /// Starts the given downloads and streams the ones that finish.
    ///
    /// Ends cleanly on a cancelled download and with an error on a failed one
    /// that carries an error.
    pub fn download_stream(&self, downloads: Vec<Download>) -> EventStream<Download> {
        let (sink, receiver) = StreamSink::channel();

        let s = sink.clone();
        let subscription = self.proxy.on_updated_downloads(move |downloads| {
            for download in downloads {
                if s.is_terminated() {
                    break;
                }
                forward_download_update(&s, download);
            }
        });
        sink.cancel_on_terminate(subscription.token());

        self.proxy.queue().start_downloads(&downloads);
        EventStream::new(receiver, vec![subscription])
    }

    /// Issues a product-info request; yields its response once and ends.
    /// Dropping the stream before the answer cancels the request.
    pub fn products_response_stream<I, S>(&self, product_ids: I) -> EventStream<ProductsResponse>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: BTreeSet<String> = product_ids.into_iter().map(Into::into).collect();
        let request = self.store_front.products_request(&ids);
        let (sink, receiver) = StreamSink::channel();

        let on_success = sink.clone();
        let on_error = sink.clone();
        request.start(
            Box::new(move |response| {
                on_success.send(response);
                on_success.complete();
            }),
            Box::new(move |error| on_error.fail(StoreKitError::Platform(error))),
        );

        EventStream::new(receiver, Vec::new()).with_on_drop(move || {
            if !sink.is_terminated() {
                request.cancel();
            }
        })
    }
}

fn forward_purchase_update(
    queue: &dyn PaymentQueue,
    sink: &StreamSink<Transaction>,
    transaction: &Transaction,
) {
    if transaction.is_finishable() {
        queue.finish_transaction(transaction);
    }
    match (transaction.state, &transaction.error) {
        (TransactionState::Failed, Some(error)) => {
            sink.fail(StoreKitError::Platform(error.clone()));
        }
        (TransactionState::Purchased | TransactionState::Failed, _) => {
            sink.send(transaction.clone());
            sink.complete();
        }
        _ => {
            sink.send(transaction.clone());
        }
    }
}

fn forward_download_update(sink: &StreamSink<Download>, download: &Download) {
    match download.state {
        DownloadState::Finished => {
            sink.send(download.clone());
        }
        DownloadState::Failed => match &download.error {
            Some(error) => sink.fail(StoreKitError::Platform(error.clone())),
            None => tracing::debug!(
                content = %download.content_identifier,
                "download failed without an error"
            ),
        },
        DownloadState::Cancelled => sink.complete(),
        DownloadState::Waiting | DownloadState::Active | DownloadState::Paused => {
            tracing::trace!(
                content = %download.content_identifier,
                state = ?download.state,
                progress = download.progress,
                "download progress"
            );
        }
    }
}

struct VerifiedPurchase {
    updates: EventStream<Transaction>,
    queue: Arc<dyn PaymentQueue>,
    repository: Arc<dyn ReceiptRepository>,
    options: VerifyReceiptOptions,
    done: bool,
}

impl VerifiedPurchase {
    async fn step(&mut self, transaction: Transaction) -> Result<Transaction, StoreKitError> {
        match transaction.state {
            TransactionState::Purchased => {
                self.done = true;
                self.repository
                    .verify_receipt(&transaction, &self.options)
                    .await?;
            }
            TransactionState::Failed => self.done = true,
            _ => {}
        }
        if transaction.is_finishable() {
            self.queue.finish_transaction(&transaction);
        }
        if transaction.state == TransactionState::Failed {
            if let Some(error) = &transaction.error {
                return Err(StoreKitError::Platform(error.clone()));
            }
        }
        Ok(transaction)
    }
}
