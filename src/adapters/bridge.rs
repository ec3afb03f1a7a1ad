use std::{
    future::Future,
    mem,
    pin::Pin,
    sync::{Arc, Weak},
    task::{Context, Poll},
};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::{
    errors::StoreKitError,
    observer::subscription::{SubscriptionHandle, SubscriptionToken},
};

type Action = Box<dyn FnOnce() + Send>;

fn run_all(actions: Vec<Action>) {
    for action in actions {
        action();
    }
}

struct ResolverState<T> {
    sender: Option<oneshot::Sender<Result<T, StoreKitError>>>,
    /// Run once the operation settles, whichever way.
    teardown: Vec<Action>,
    /// Run only when the operation is cancelled or abandoned.
    on_cancel: Vec<Action>,
}

/// Settles a one-shot operation at most once. Every callback of the operation
/// holds a clone; whichever calls [`Resolver::resolve`] first wins and the
/// rest become no-ops.
///
/// Only the callbacks own the state. Once all of them are dropped unresolved
/// (the proxy shut down, the request released its callbacks) the sender goes
/// with them and the awaiting task resumes with `Cancelled`.
pub(crate) struct Resolver<T> {
    state: Arc<Mutex<ResolverState<T>>>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Send + 'static> Resolver<T> {
    pub(crate) fn pending() -> (Self, Pending<T>) {
        let (sender, receiver) = oneshot::channel();
        let resolver = Self {
            state: Arc::new(Mutex::new(ResolverState {
                sender: Some(sender),
                teardown: Vec::new(),
                on_cancel: Vec::new(),
            })),
        };
        let pending = Pending {
            receiver,
            resolver: resolver.downgrade(),
        };
        (resolver, pending)
    }

    /// Cancels `token` as soon as the operation settles.
    pub(crate) fn cancel_on_settle(&self, token: SubscriptionToken) {
        self.on_settle(move || token.cancel());
    }

    pub(crate) fn on_settle<F: FnOnce() + Send + 'static>(&self, action: F) {
        let mut state = self.state.lock();
        if state.sender.is_some() {
            state.teardown.push(Box::new(action));
        } else {
            drop(state);
            action();
        }
    }

    pub(crate) fn on_cancel<F: FnOnce() + Send + 'static>(&self, action: F) {
        let mut state = self.state.lock();
        if state.sender.is_some() {
            state.on_cancel.push(Box::new(action));
        }
    }

    /// Returns false if the operation had already settled.
    pub(crate) fn resolve(&self, result: Result<T, StoreKitError>) -> bool {
        let (sender, teardown) = {
            let mut state = self.state.lock();
            let Some(sender) = state.sender.take() else {
                return false;
            };
            state.on_cancel.clear();
            (sender, mem::take(&mut state.teardown))
        };
        // Tear down before waking the awaiting task so no further callback
        // can observe a half-settled operation.
        run_all(teardown);
        let _ = sender.send(result);
        true
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.state.lock().sender.is_none()
    }

    fn downgrade(&self) -> WeakResolver<T> {
        WeakResolver {
            state: Arc::downgrade(&self.state),
        }
    }

    fn cancel(&self) -> bool {
        let on_cancel = mem::take(&mut self.state.lock().on_cancel);
        run_all(on_cancel);
        self.resolve(Err(StoreKitError::Cancelled))
    }

    /// Tears down without waking anyone. Used when the future is dropped.
    fn abandon(&self) {
        let (sender, teardown, on_cancel) = {
            let mut state = self.state.lock();
            let Some(sender) = state.sender.take() else {
                return;
            };
            (
                sender,
                mem::take(&mut state.teardown),
                mem::take(&mut state.on_cancel),
            )
        };
        run_all(on_cancel);
        run_all(teardown);
        drop(sender);
    }
}

/// Non-owning reference to a [`Resolver`], held by the caller's side.
struct WeakResolver<T> {
    state: Weak<Mutex<ResolverState<T>>>,
}

impl<T> Clone for WeakResolver<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> WeakResolver<T> {
    fn upgrade(&self) -> Option<Resolver<T>> {
        self.state.upgrade().map(|state| Resolver { state })
    }
}

/// Future side of a one-shot adapter call.
///
/// Resolves with the first matching platform event. Dropping it before it
/// resolves unsubscribes and cancels any in-flight platform request.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Pending<T: Send + 'static> {
    receiver: oneshot::Receiver<Result<T, StoreKitError>>,
    resolver: WeakResolver<T>,
}

impl<T: Send + 'static> Pending<T> {
    /// Handle that can abort this call from elsewhere; the awaiting task then
    /// resumes with [`StoreKitError::Cancelled`].
    pub fn cancel_handle(&self) -> CancelHandle<T> {
        CancelHandle {
            resolver: self.resolver.clone(),
        }
    }

    /// True once resolved, cancelled, or abandoned by every callback.
    pub fn is_settled(&self) -> bool {
        self.resolver
            .upgrade()
            .map_or(true, |resolver| resolver.is_settled())
    }
}

impl<T: Send + 'static> Future for Pending<T> {
    type Output = Result<T, StoreKitError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(StoreKitError::Cancelled)))
    }
}

impl<T: Send + 'static> Drop for Pending<T> {
    fn drop(&mut self) {
        if let Some(resolver) = self.resolver.upgrade() {
            resolver.abandon();
        }
    }
}

pub struct CancelHandle<T: Send + 'static> {
    resolver: WeakResolver<T>,
}

impl<T: Send + 'static> Clone for CancelHandle<T> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
        }
    }
}

impl<T: Send + 'static> CancelHandle<T> {
    /// Returns false if the call had already settled.
    pub fn cancel(&self) -> bool {
        let Some(resolver) = self.resolver.upgrade() else {
            return false;
        };
        let cancelled = resolver.cancel();
        if cancelled {
            tracing::debug!("pending store operation cancelled");
        }
        cancelled
    }
}

struct SinkState<T> {
    sender: Option<mpsc::UnboundedSender<Result<T, StoreKitError>>>,
    teardown: Vec<Action>,
}

/// Producer side of an [`EventStream`]. Emission never blocks, so it is safe
/// to call from inside a platform callback.
pub(crate) struct StreamSink<T> {
    state: Arc<Mutex<SinkState<T>>>,
}

impl<T> Clone for StreamSink<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Send + 'static> StreamSink<T> {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Result<T, StoreKitError>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let sink = Self {
            state: Arc::new(Mutex::new(SinkState {
                sender: Some(sender),
                teardown: Vec::new(),
            })),
        };
        (sink, receiver)
    }

    pub(crate) fn cancel_on_terminate(&self, token: SubscriptionToken) {
        let mut state = self.state.lock();
        if state.sender.is_some() {
            state.teardown.push(Box::new(move || token.cancel()));
        } else {
            drop(state);
            token.cancel();
        }
    }

    /// Returns false once the stream has terminated or its consumer is gone.
    pub(crate) fn send(&self, value: T) -> bool {
        self.emit(Ok(value))
    }

    pub(crate) fn fail(&self, error: StoreKitError) {
        self.emit(Err(error));
        self.complete();
    }

    pub(crate) fn complete(&self) {
        let teardown = {
            let mut state = self.state.lock();
            if state.sender.take().is_none() {
                return;
            }
            mem::take(&mut state.teardown)
        };
        run_all(teardown);
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.state.lock().sender.is_none()
    }

    fn emit(&self, item: Result<T, StoreKitError>) -> bool {
        let state = self.state.lock();
        match state.sender.as_ref() {
            Some(sender) => sender.send(item).is_ok(),
            None => false,
        }
    }
}

/// Multi-value stream fed by platform callbacks. Dropping it unsubscribes.
#[must_use = "streams do nothing unless polled"]
pub struct EventStream<T> {
    receiver: mpsc::UnboundedReceiver<Result<T, StoreKitError>>,
    subscriptions: Vec<SubscriptionHandle>,
    on_drop: Vec<Action>,
}

impl<T> EventStream<T> {
    pub(crate) fn new(
        receiver: mpsc::UnboundedReceiver<Result<T, StoreKitError>>,
        subscriptions: Vec<SubscriptionHandle>,
    ) -> Self {
        Self {
            receiver,
            subscriptions,
            on_drop: Vec::new(),
        }
    }

    pub(crate) fn with_on_drop<F: FnOnce() + Send + 'static>(mut self, action: F) -> Self {
        self.on_drop.push(Box::new(action));
        self
    }

    /// Unsubscribes now; items already buffered are still yielded.
    pub fn cancel(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.cancel();
        }
        self.receiver.close();
    }
}

impl<T> Stream for EventStream<T> {
    type Item = Result<T, StoreKitError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) {
        run_all(mem::take(&mut self.on_drop));
    }
}
