use std::{collections::BTreeSet, sync::Arc};

use crate::domain::entities::{platform_error::PlatformError, product::ProductsResponse};

pub type SuccessCallback<T> = Box<dyn FnOnce(T) + Send>;
pub type ErrorCallback = Box<dyn FnOnce(PlatformError) + Send>;

/// A one-shot request against the store (product info, receipt refresh).
///
/// After `start`, exactly one of the two callbacks is expected to fire,
/// unless the request is cancelled first.
pub trait PlatformRequest<T>: Send + Sync {
    fn start(&self, on_success: SuccessCallback<T>, on_error: ErrorCallback);

    fn cancel(&self);
}

/// Creates platform requests.
pub trait StoreFront: Send + Sync {
    fn products_request(
        &self,
        product_identifiers: &BTreeSet<String>,
    ) -> Arc<dyn PlatformRequest<ProductsResponse>>;

    /// Asks the store to refresh the app receipt on disk.
    fn receipt_refresh_request(&self) -> Arc<dyn PlatformRequest<()>>;
}
