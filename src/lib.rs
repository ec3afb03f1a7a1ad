pub(crate) mod data {
    pub(crate) mod datasources {
        pub(crate) mod receipt_file_datasource;
        pub(crate) mod verify_receipt_datasource;
    }
    pub(crate) mod models {
        pub(crate) mod verify_receipt {
            pub(crate) mod request_body_model;
            pub(crate) mod response_body_model;
        }
    }
    pub(crate) mod repositories {
        pub(crate) mod receipt_repository_impl;
    }
}

pub mod domain {
    pub mod entities {
        pub mod download;
        pub mod environment;
        pub mod observer_event;
        pub mod payment;
        pub mod platform_error;
        pub mod product;
        pub mod transaction;
        pub mod verified_receipt;
        pub mod verify_method;
        pub mod verify_receipt_options;
    }
    pub mod platform {
        pub mod payment_queue;
        pub mod platform_request;
    }
    pub mod repositories {
        pub mod receipt_repository;
    }
}

pub mod observer {
    pub mod subscription;
    pub mod transaction_observer_proxy;
}

pub mod adapters {
    mod amb;
    pub mod async_adapter;
    pub(crate) mod bridge;
    pub mod stream_adapter;

    pub use bridge::{CancelHandle, EventStream, Pending};
}

pub mod config;
pub mod constants;
pub mod errors;
pub mod util;

#[cfg(test)]
pub(crate) mod test_utils;

pub use adapters::{CancelHandle, EventStream, Pending};
pub use errors::StoreKitError;
pub use util::{ReceiptVerifier, StoreKitUtil};
