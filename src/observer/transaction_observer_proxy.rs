use std::{
    any::Any,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use parking_lot::Mutex;

use crate::{
    domain::{
        entities::{
            download::Download,
            observer_event::{ObserverEvent, ObserverEventKind},
            platform_error::PlatformError,
            transaction::Transaction,
        },
        platform::payment_queue::{PaymentQueue, PaymentTransactionObserver},
    },
    errors::StoreKitError,
};

use super::subscription::{EventCallback, SubscriberEntry, SubscriptionHandle, SubscriptionToken};

/// Subscriber lists, one per event kind, in registration order.
pub(crate) struct SubscriberRegistry {
    lists: [Mutex<Vec<Arc<SubscriberEntry>>>; 5],
}

impl SubscriberRegistry {
    fn new() -> Self {
        Self {
            lists: Default::default(),
        }
    }

    fn push(&self, kind: ObserverEventKind, entry: Arc<SubscriberEntry>) {
        self.lists[kind.index()].lock().push(entry);
    }

    /// Invokes every live entry for the event's kind, then compacts. The list
    /// lock is released while callbacks run, so callbacks may subscribe or
    /// cancel. Entries added during the dispatch do not see this event.
    fn dispatch(&self, event: &ObserverEvent) {
        let kind = event.kind();
        let snapshot: Vec<Arc<SubscriberEntry>> = self.lists[kind.index()].lock().clone();
        tracing::debug!(?kind, subscribers = snapshot.len(), "dispatching observer event");
        for entry in snapshot.iter() {
            // Re-checked per entry so a cancel issued by an earlier callback of
            // this same dispatch is honored.
            if entry.is_live() {
                entry.invoke(event);
            }
        }
        drop(snapshot);
        self.sweep_kind(kind);
    }

    pub(crate) fn sweep_kind(&self, kind: ObserverEventKind) -> usize {
        let mut list = self.lists[kind.index()].lock();
        let before = list.len();
        list.retain(|entry| entry.is_live());
        before - list.len()
    }

    fn sweep(&self) -> usize {
        ObserverEventKind::ALL
            .into_iter()
            .map(|kind| self.sweep_kind(kind))
            .sum()
    }

    fn len(&self, kind: ObserverEventKind) -> usize {
        self.lists[kind.index()].lock().len()
    }

    /// Drops every entry. The callbacks are released outside the list locks;
    /// pending one-shot calls whose only owner was a callback resume with
    /// `Cancelled`.
    fn clear(&self) {
        for list in self.lists.iter() {
            let entries = std::mem::take(&mut *list.lock());
            drop(entries);
        }
    }
}

/// The object actually installed in the queue's delegate slot. Holds the
/// registry weakly so the queue never keeps the proxy alive.
struct ProxyDelegate {
    registry: Weak<SubscriberRegistry>,
}

impl ProxyDelegate {
    fn forward(&self, event: ObserverEvent) {
        if let Some(registry) = self.registry.upgrade() {
            registry.dispatch(&event);
        }
    }
}

impl PaymentTransactionObserver for ProxyDelegate {
    fn updated_transactions(&self, transactions: &[Transaction]) {
        self.forward(ObserverEvent::UpdatedTransactions(transactions.to_vec()));
    }

    fn removed_transactions(&self, transactions: &[Transaction]) {
        self.forward(ObserverEvent::RemovedTransactions(transactions.to_vec()));
    }

    fn restore_completed_transactions_failed(&self, error: &PlatformError) {
        self.forward(ObserverEvent::RestoreFailed(error.clone()));
    }

    fn restore_completed_transactions_finished(&self) {
        self.forward(ObserverEvent::RestoreFinished);
    }

    fn updated_downloads(&self, downloads: &[Download]) {
        self.forward(ObserverEvent::UpdatedDownloads(downloads.to_vec()));
    }
}

/// Multiplexes the payment queue's single delegate slot into any number of
/// subscriber callbacks.
///
/// Construct one per queue at application startup, call [`init`] once, and
/// share it (it is usually held in an `Arc`). [`shutdown`], or dropping the
/// proxy, clears the delegate slot again.
///
/// [`init`]: TransactionObserverProxy::init
/// [`shutdown`]: TransactionObserverProxy::shutdown
pub struct TransactionObserverProxy {
    queue: Arc<dyn PaymentQueue>,
    registry: Arc<SubscriberRegistry>,
    delegate: Arc<ProxyDelegate>,
    registered: AtomicBool,
}

impl TransactionObserverProxy {
    pub fn new(queue: Arc<dyn PaymentQueue>) -> Self {
        let registry = Arc::new(SubscriberRegistry::new());
        let delegate = Arc::new(ProxyDelegate {
            registry: Arc::downgrade(&registry),
        });
        Self {
            queue,
            registry,
            delegate,
            registered: AtomicBool::new(false),
        }
    }

    /// Installs the proxy as the queue's observer. Calling it again on the
    /// same proxy is a no-op; calling it while another observer occupies the
    /// slot fails.
    pub fn init(&self) -> Result<(), StoreKitError> {
        if self.registered.load(Ordering::Acquire) {
            return Ok(());
        }
        if self.queue.has_transaction_observer() {
            tracing::warn!("payment queue delegate slot is already occupied");
            return Err(StoreKitError::ObserverAlreadyRegistered);
        }
        if self
            .registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let observer: Arc<dyn PaymentTransactionObserver> = self.delegate.clone();
            self.queue.set_transaction_observer(Some(observer));
            tracing::debug!("transaction observer proxy registered");
        }
        Ok(())
    }

    /// Clears the delegate slot and drops every subscriber. Idempotent.
    pub fn shutdown(&self) {
        if self
            .registered
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.queue.set_transaction_observer(None);
            self.registry.clear();
            tracing::debug!("transaction observer proxy unregistered");
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    pub fn queue(&self) -> &Arc<dyn PaymentQueue> {
        &self.queue
    }

    /// Delivers an event to the subscribers of its kind, exactly as if the
    /// queue had called the delegate.
    pub fn dispatch(&self, event: ObserverEvent) {
        self.registry.dispatch(&event);
    }

    pub fn subscribe<F>(&self, kind: ObserverEventKind, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ObserverEvent) + Send + Sync + 'static,
    {
        self.register(kind, Box::new(callback), None)
    }

    /// Like [`subscribe`](Self::subscribe), but the subscription also dies as
    /// soon as `owner` is dropped.
    pub fn subscribe_with_owner<O, F>(
        &self,
        kind: ObserverEventKind,
        owner: &Arc<O>,
        callback: F,
    ) -> SubscriptionHandle
    where
        O: Send + Sync + 'static,
        F: Fn(&ObserverEvent) + Send + Sync + 'static,
    {
        let weak: Weak<O> = Arc::downgrade(owner);
        let owner: Weak<dyn Any + Send + Sync> = weak;
        self.register(kind, Box::new(callback), Some(owner))
    }

    fn register(
        &self,
        kind: ObserverEventKind,
        callback: EventCallback,
        owner: Option<Weak<dyn Any + Send + Sync>>,
    ) -> SubscriptionHandle {
        let entry = Arc::new(SubscriberEntry::new(callback, owner));
        let token = SubscriptionToken::new(&entry, &self.registry, kind);
        self.registry.push(kind, entry);
        SubscriptionHandle::new(token)
    }

    pub fn on_updated<F>(&self, action: F) -> SubscriptionHandle
    where
        F: Fn(&[Transaction]) + Send + Sync + 'static,
    {
        self.subscribe(ObserverEventKind::UpdatedTransactions, move |event| {
            if let ObserverEvent::UpdatedTransactions(transactions) = event {
                action(transactions)
            }
        })
    }

    pub fn on_removed<F>(&self, action: F) -> SubscriptionHandle
    where
        F: Fn(&[Transaction]) + Send + Sync + 'static,
    {
        self.subscribe(ObserverEventKind::RemovedTransactions, move |event| {
            if let ObserverEvent::RemovedTransactions(transactions) = event {
                action(transactions)
            }
        })
    }

    pub fn on_restore_failed<F>(&self, action: F) -> SubscriptionHandle
    where
        F: Fn(&PlatformError) + Send + Sync + 'static,
    {
        self.subscribe(ObserverEventKind::RestoreFailed, move |event| {
            if let ObserverEvent::RestoreFailed(error) = event {
                action(error)
            }
        })
    }

    pub fn on_restore_finished<F>(&self, action: F) -> SubscriptionHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(ObserverEventKind::RestoreFinished, move |event| {
            if let ObserverEvent::RestoreFinished = event {
                action()
            }
        })
    }

    pub fn on_updated_downloads<F>(&self, action: F) -> SubscriptionHandle
    where
        F: Fn(&[Download]) + Send + Sync + 'static,
    {
        self.subscribe(ObserverEventKind::UpdatedDownloads, move |event| {
            if let ObserverEvent::UpdatedDownloads(downloads) = event {
                action(downloads)
            }
        })
    }

    /// Prunes dead entries of every kind without waiting for a dispatch.
    /// Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.registry.sweep()
    }

    pub fn sweep_kind(&self, kind: ObserverEventKind) -> usize {
        self.registry.sweep_kind(kind)
    }

    /// Number of stored entries for `kind`, including dead ones not yet
    /// pruned.
    pub fn subscriber_count(&self, kind: ObserverEventKind) -> usize {
        self.registry.len(kind)
    }
}

impl Drop for TransactionObserverProxy {
    fn drop(&mut self) {
        self.shutdown();
    }
}
