use super::{download::Download, platform_error::PlatformError, transaction::Transaction};

/// The five delegate callbacks a payment queue delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverEventKind {
    UpdatedTransactions,
    RemovedTransactions,
    RestoreFailed,
    RestoreFinished,
    UpdatedDownloads,
}

impl ObserverEventKind {
    pub const ALL: [ObserverEventKind; 5] = [
        ObserverEventKind::UpdatedTransactions,
        ObserverEventKind::RemovedTransactions,
        ObserverEventKind::RestoreFailed,
        ObserverEventKind::RestoreFinished,
        ObserverEventKind::UpdatedDownloads,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            ObserverEventKind::UpdatedTransactions => 0,
            ObserverEventKind::RemovedTransactions => 1,
            ObserverEventKind::RestoreFailed => 2,
            ObserverEventKind::RestoreFinished => 3,
            ObserverEventKind::UpdatedDownloads => 4,
        }
    }
}

/// A single delegate callback, with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    UpdatedTransactions(Vec<Transaction>),
    RemovedTransactions(Vec<Transaction>),
    RestoreFailed(PlatformError),
    RestoreFinished,
    UpdatedDownloads(Vec<Download>),
}

impl ObserverEvent {
    pub fn kind(&self) -> ObserverEventKind {
        match self {
            ObserverEvent::UpdatedTransactions(_) => ObserverEventKind::UpdatedTransactions,
            ObserverEvent::RemovedTransactions(_) => ObserverEventKind::RemovedTransactions,
            ObserverEvent::RestoreFailed(_) => ObserverEventKind::RestoreFailed,
            ObserverEvent::RestoreFinished => ObserverEventKind::RestoreFinished,
            ObserverEvent::UpdatedDownloads(_) => ObserverEventKind::UpdatedDownloads,
        }
    }
}
