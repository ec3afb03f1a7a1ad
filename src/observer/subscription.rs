use std::{
    any::Any,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use crate::domain::entities::observer_event::{ObserverEvent, ObserverEventKind};

use super::transaction_observer_proxy::SubscriberRegistry;

pub(crate) type EventCallback = Box<dyn Fn(&ObserverEvent) + Send + Sync>;

/// One registered callback. Live while not cancelled and, when an owner was
/// supplied, while the owner is still alive.
pub(crate) struct SubscriberEntry {
    callback: EventCallback,
    owner: Option<Weak<dyn Any + Send + Sync>>,
    cancelled: AtomicBool,
}

impl SubscriberEntry {
    pub(crate) fn new(
        callback: EventCallback,
        owner: Option<Weak<dyn Any + Send + Sync>>,
    ) -> Self {
        Self {
            callback,
            owner,
            cancelled: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        !self.cancelled.load(Ordering::Acquire)
            && self
                .owner
                .as_ref()
                .map_or(true, |owner| owner.strong_count() > 0)
    }

    pub(crate) fn invoke(&self, event: &ObserverEvent) {
        (self.callback)(event)
    }

    /// Returns true on the first call only.
    fn mark_cancelled(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }
}

/// Cloneable capability to cancel a subscription, e.g. from inside its own
/// callback. Does not keep the subscription alive.
#[derive(Clone)]
pub struct SubscriptionToken {
    entry: Weak<SubscriberEntry>,
    registry: Weak<SubscriberRegistry>,
    kind: ObserverEventKind,
}

impl SubscriptionToken {
    pub(crate) fn new(
        entry: &Arc<SubscriberEntry>,
        registry: &Arc<SubscriberRegistry>,
        kind: ObserverEventKind,
    ) -> Self {
        Self {
            entry: Arc::downgrade(entry),
            registry: Arc::downgrade(registry),
            kind,
        }
    }

    /// Idempotent. No dispatch that starts after this returns will invoke the
    /// callback.
    pub fn cancel(&self) {
        let Some(entry) = self.entry.upgrade() else {
            return;
        };
        if entry.mark_cancelled() {
            // Release our strong ref first so the sweep can free the entry.
            drop(entry);
            if let Some(registry) = self.registry.upgrade() {
                registry.sweep_kind(self.kind);
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.entry.upgrade().map_or(true, |entry| !entry.is_live())
    }

    pub fn kind(&self) -> ObserverEventKind {
        self.kind
    }
}

/// Returned by every subscribe call. Dropping it cancels the subscription;
/// call [`SubscriptionHandle::detach`] to keep the subscription running
/// without holding the handle.
#[must_use = "dropping the handle cancels the subscription"]
pub struct SubscriptionHandle {
    token: SubscriptionToken,
    armed: bool,
}

impl SubscriptionHandle {
    pub(crate) fn new(token: SubscriptionToken) -> Self {
        Self { token, armed: true }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> SubscriptionToken {
        self.token.clone()
    }

    /// Keeps the subscription registered after the handle goes away. It then
    /// lives as long as its owner, or until the proxy shuts down when it has
    /// none.
    pub fn detach(mut self) -> SubscriptionToken {
        self.armed = false;
        self.token.clone()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if self.armed {
            self.token.cancel();
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("kind", &self.token.kind)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
