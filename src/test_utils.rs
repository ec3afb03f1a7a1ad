//! In-memory stand-ins for the platform collaborators.

use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use crate::domain::{
    entities::{
        download::Download, observer_event::ObserverEvent, payment::Payment,
        platform_error::PlatformError, product::ProductsResponse, transaction::Transaction,
    },
    platform::{
        payment_queue::{PaymentQueue, PaymentTransactionObserver},
        platform_request::{ErrorCallback, PlatformRequest, StoreFront, SuccessCallback},
    },
};

type Reaction<A> = Arc<dyn Fn(&A) -> Vec<ObserverEvent> + Send + Sync>;

/// Payment queue that records every call and, when scripted, answers
/// synchronously from inside the call the way a native queue may.
#[derive(Default)]
pub(crate) struct MockPaymentQueue {
    observer: Mutex<Option<Arc<dyn PaymentTransactionObserver>>>,
    registrations: AtomicUsize,
    payments: Mutex<Vec<Payment>>,
    finished: Mutex<Vec<Transaction>>,
    restore_requests: AtomicUsize,
    started_downloads: Mutex<Vec<Download>>,
    transactions: Mutex<Vec<Transaction>>,
    on_add_payment: Mutex<Option<Reaction<Payment>>>,
    on_restore: Mutex<Option<Reaction<()>>>,
    on_start_downloads: Mutex<Option<Reaction<Vec<Download>>>>,
}

impl MockPaymentQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn react_to_payment<F>(&self, reaction: F)
    where
        F: Fn(&Payment) -> Vec<ObserverEvent> + Send + Sync + 'static,
    {
        *self.on_add_payment.lock() = Some(Arc::new(reaction));
    }

    pub(crate) fn react_to_restore<F>(&self, reaction: F)
    where
        F: Fn() -> Vec<ObserverEvent> + Send + Sync + 'static,
    {
        *self.on_restore.lock() = Some(Arc::new(move |_: &()| reaction()));
    }

    pub(crate) fn react_to_downloads<F>(&self, reaction: F)
    where
        F: Fn(&Vec<Download>) -> Vec<ObserverEvent> + Send + Sync + 'static,
    {
        *self.on_start_downloads.lock() = Some(Arc::new(reaction));
    }

    pub(crate) fn set_transactions(&self, transactions: Vec<Transaction>) {
        *self.transactions.lock() = transactions;
    }

    pub(crate) fn observer_registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub(crate) fn payments(&self) -> Vec<Payment> {
        self.payments.lock().clone()
    }

    pub(crate) fn finished_transactions(&self) -> Vec<Transaction> {
        self.finished.lock().clone()
    }

    pub(crate) fn restore_requests(&self) -> usize {
        self.restore_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn started_downloads(&self) -> Vec<Download> {
        self.started_downloads.lock().clone()
    }

    pub(crate) fn emit(&self, event: ObserverEvent) {
        let Some(observer) = self.observer.lock().clone() else {
            return;
        };
        match event {
            ObserverEvent::UpdatedTransactions(t) => observer.updated_transactions(&t),
            ObserverEvent::RemovedTransactions(t) => observer.removed_transactions(&t),
            ObserverEvent::RestoreFailed(e) => observer.restore_completed_transactions_failed(&e),
            ObserverEvent::RestoreFinished => observer.restore_completed_transactions_finished(),
            ObserverEvent::UpdatedDownloads(d) => observer.updated_downloads(&d),
        }
    }

    pub(crate) fn emit_updated(&self, transactions: &[Transaction]) {
        self.emit(ObserverEvent::UpdatedTransactions(transactions.to_vec()));
    }

    pub(crate) fn emit_removed(&self, transactions: &[Transaction]) {
        self.emit(ObserverEvent::RemovedTransactions(transactions.to_vec()));
    }

    pub(crate) fn emit_restore_failed(&self, error: &PlatformError) {
        self.emit(ObserverEvent::RestoreFailed(error.clone()));
    }

    pub(crate) fn emit_restore_finished(&self) {
        self.emit(ObserverEvent::RestoreFinished);
    }

    pub(crate) fn emit_downloads(&self, downloads: &[Download]) {
        self.emit(ObserverEvent::UpdatedDownloads(downloads.to_vec()));
    }

    fn run<A>(&self, reaction: Option<Reaction<A>>, arg: &A) {
        if let Some(reaction) = reaction {
            for event in reaction(arg) {
                self.emit(event);
            }
        }
    }
}

impl PaymentQueue for MockPaymentQueue {
    fn set_transaction_observer(&self, observer: Option<Arc<dyn PaymentTransactionObserver>>) {
        if observer.is_some() {
            self.registrations.fetch_add(1, Ordering::SeqCst);
        }
        *self.observer.lock() = observer;
    }

    fn has_transaction_observer(&self) -> bool {
        self.observer.lock().is_some()
    }

    fn add_payment(&self, payment: Payment) {
        self.payments.lock().push(payment.clone());
        let reaction = self.on_add_payment.lock().clone();
        self.run(reaction, &payment);
    }

    fn restore_completed_transactions(&self) {
        self.restore_requests.fetch_add(1, Ordering::SeqCst);
        let reaction = self.on_restore.lock().clone();
        self.run(reaction, &());
    }

    fn start_downloads(&self, downloads: &[Download]) {
        self.started_downloads.lock().extend_from_slice(downloads);
        let reaction = self.on_start_downloads.lock().clone();
        self.run(reaction, &downloads.to_vec());
    }

    fn finish_transaction(&self, transaction: &Transaction) {
        self.finished.lock().push(transaction.clone());
    }

    fn transactions(&self) -> Vec<Transaction> {
        self.transactions.lock().clone()
    }
}

/// Platform request that answers either immediately on `start` (when an
/// answer was preset) or when the test calls [`MockRequest::respond`].
pub(crate) struct MockRequest<T> {
    preset: Mutex<Option<Result<T, PlatformError>>>,
    callbacks: Mutex<Option<(SuccessCallback<T>, ErrorCallback)>>,
    started: AtomicBool,
    cancelled: AtomicBool,
}

impl<T: Send + 'static> MockRequest<T> {
    pub(crate) fn new(preset: Option<Result<T, PlatformError>>) -> Self {
        Self {
            preset: Mutex::new(preset),
            callbacks: Mutex::new(None),
            started: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    pub(crate) fn respond(&self, result: Result<T, PlatformError>) {
        let Some((on_success, on_error)) = self.callbacks.lock().take() else {
            return;
        };
        match result {
            Ok(value) => on_success(value),
            Err(error) => on_error(error),
        }
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl<T: Send + 'static> PlatformRequest<T> for MockRequest<T> {
    fn start(&self, on_success: SuccessCallback<T>, on_error: ErrorCallback) {
        self.started.store(true, Ordering::SeqCst);
        *self.callbacks.lock() = Some((on_success, on_error));
        let preset = self.preset.lock().take();
        if let Some(result) = preset {
            self.respond(result);
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.callbacks.lock().take();
    }
}

#[derive(Default)]
pub(crate) struct MockStoreFront {
    products_answer: Mutex<Option<Result<ProductsResponse, PlatformError>>>,
    refresh_answer: Mutex<Option<Result<(), PlatformError>>>,
    requested_ids: Mutex<Vec<BTreeSet<String>>>,
    last_products_request: Mutex<Option<Arc<MockRequest<ProductsResponse>>>>,
    last_refresh_request: Mutex<Option<Arc<MockRequest<()>>>>,
}

impl MockStoreFront {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer given immediately by the next products request. Without one,
    /// the request stays open until answered through
    /// [`MockStoreFront::last_products_request`].
    pub(crate) fn answer_products(&self, answer: Result<ProductsResponse, PlatformError>) {
        *self.products_answer.lock() = Some(answer);
    }

    pub(crate) fn answer_refresh(&self, answer: Result<(), PlatformError>) {
        *self.refresh_answer.lock() = Some(answer);
    }

    pub(crate) fn requested_ids(&self) -> Vec<BTreeSet<String>> {
        self.requested_ids.lock().clone()
    }

    pub(crate) fn last_products_request(&self) -> Option<Arc<MockRequest<ProductsResponse>>> {
        self.last_products_request.lock().clone()
    }

    pub(crate) fn last_refresh_request(&self) -> Option<Arc<MockRequest<()>>> {
        self.last_refresh_request.lock().clone()
    }
}

impl StoreFront for MockStoreFront {
    fn products_request(
        &self,
        product_identifiers: &BTreeSet<String>,
    ) -> Arc<dyn PlatformRequest<ProductsResponse>> {
        self.requested_ids.lock().push(product_identifiers.clone());
        let request = Arc::new(MockRequest::new(self.products_answer.lock().take()));
        *self.last_products_request.lock() = Some(request.clone());
        request
    }

    fn receipt_refresh_request(&self) -> Arc<dyn PlatformRequest<()>> {
        let request = Arc::new(MockRequest::new(self.refresh_answer.lock().take()));
        *self.last_refresh_request.lock() = Some(request.clone());
        request
    }
}
