use std::sync::Arc;

use crate::domain::entities::{
    download::Download, payment::Payment, platform_error::PlatformError,
    transaction::Transaction,
};

/// Delegate protocol of the payment queue. The queue holds at most one
/// observer; `TransactionObserverProxy` is the only implementer this crate
/// registers.
pub trait PaymentTransactionObserver: Send + Sync {
    fn updated_transactions(&self, transactions: &[Transaction]);

    fn removed_transactions(&self, transactions: &[Transaction]);

    fn restore_completed_transactions_failed(&self, error: &PlatformError);

    fn restore_completed_transactions_finished(&self);

    fn updated_downloads(&self, downloads: &[Download]);
}

/// The host platform's payment queue.
///
/// Implementations bridge the native transaction queue. All methods are
/// expected to return promptly; results arrive later through the observer.
pub trait PaymentQueue: Send + Sync {
    /// Fills (or, with `None`, clears) the queue's single delegate slot.
    fn set_transaction_observer(&self, observer: Option<Arc<dyn PaymentTransactionObserver>>);

    fn has_transaction_observer(&self) -> bool;

    fn add_payment(&self, payment: Payment);

    fn restore_completed_transactions(&self);

    fn start_downloads(&self, downloads: &[Download]);

    fn finish_transaction(&self, transaction: &Transaction);

    /// Transactions currently pending in the queue.
    fn transactions(&self) -> Vec<Transaction>;
}
