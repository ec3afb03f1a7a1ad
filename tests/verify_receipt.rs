use std::{io::Write, time::Duration};

use serde_json::json;
use storekit_bridge::{
    config::StoreKitConfig,
    domain::entities::{
        environment::Environment,
        transaction::{Transaction, TransactionState},
        verify_method::VerifyMethod,
    },
    ReceiptVerifier, StoreKitError,
};
use tempfile::NamedTempFile;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const RECEIPT: &[u8] = b"local receipt";
// base64 of RECEIPT
const RECEIPT_B64: &str = "bG9jYWwgcmVjZWlwdA==";

struct Endpoints {
    production: MockServer,
    sandbox: MockServer,
    // Kept alive for the duration of the test.
    receipt: NamedTempFile,
}

impl Endpoints {
    async fn start() -> Self {
        let mut receipt = NamedTempFile::new().unwrap();
        receipt.write_all(RECEIPT).unwrap();
        Self {
            production: MockServer::start().await,
            sandbox: MockServer::start().await,
            receipt,
        }
    }

    fn verifier(&self, environment: Environment) -> ReceiptVerifier {
        ReceiptVerifier::new(StoreKitConfig {
            receipt_path: Some(self.receipt.path().to_path_buf()),
            environment: Some(environment),
            production_url: format!("{}/verifyReceipt", self.production.uri()),
            sandbox_url: format!("{}/verifyReceipt", self.sandbox.uri()),
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap()
    }
}

fn verify_receipt_call() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/verifyReceipt"))
        .and(header("content-type", "application/json"))
}

fn status(code: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": code }))
}

fn valid_receipt(product: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": 0,
        "environment": "Production",
        "receipt": {
            "bundle_id": "com.example.app",
            "in_app": [{
                "product_id": product,
                "quantity": "1",
                "transaction_id": "1000000000000001",
                "purchase_date_ms": "1704067200000"
            }]
        }
    }))
}

fn purchased(product: &str) -> Transaction {
    Transaction::new(product, TransactionState::Purchased).with_identifier("1000000000000001")
}

#[tokio::test]
async fn matching_product_passes() {
    let endpoints = Endpoints::start().await;
    verify_receipt_call()
        .and(body_partial_json(json!({
            "receipt-data": RECEIPT_B64,
            "exclude-old-transactions": false
        })))
        .respond_with(valid_receipt("gems"))
        .expect(1)
        .mount(&endpoints.production)
        .await;

    let verified = endpoints
        .verifier(Environment::Production)
        .verify(&purchased("gems"), &VerifyMethod::Default)
        .await
        .unwrap();

    assert_eq!(verified.transaction.product_identifier, "gems");
    assert_eq!(verified.environment, Environment::Production);
    assert!(verified.receipt.contains_product("gems"));
    assert_eq!(verified.raw["receipt"]["bundle_id"], "com.example.app");
}

#[tokio::test]
async fn missing_product_is_illegal() {
    let endpoints = Endpoints::start().await;
    verify_receipt_call()
        .respond_with(valid_receipt("other"))
        .expect(1)
        .mount(&endpoints.sandbox)
        .await;

    let result = endpoints
        .verifier(Environment::Sandbox)
        .verify(&purchased("gems"), &VerifyMethod::Default)
        .await;

    assert!(matches!(result, Err(StoreKitError::Illegal)));
}

#[tokio::test]
async fn sandbox_receipt_in_production_is_retried_once() {
    let endpoints = Endpoints::start().await;
    verify_receipt_call()
        .respond_with(status(21007))
        .expect(1)
        .mount(&endpoints.production)
        .await;
    verify_receipt_call()
        .respond_with(valid_receipt("gems"))
        .expect(1)
        .mount(&endpoints.sandbox)
        .await;

    let verified = endpoints
        .verifier(Environment::Production)
        .verify(&purchased("gems"), &VerifyMethod::Default)
        .await
        .unwrap();

    assert_eq!(verified.environment, Environment::Sandbox);
}

#[tokio::test]
async fn sandbox_status_twice_is_invalid() {
    let endpoints = Endpoints::start().await;
    verify_receipt_call()
        .respond_with(status(21007))
        .expect(1)
        .mount(&endpoints.production)
        .await;
    verify_receipt_call()
        .respond_with(status(21007))
        .expect(1)
        .mount(&endpoints.sandbox)
        .await;

    let result = endpoints
        .verifier(Environment::Production)
        .verify(&purchased("gems"), &VerifyMethod::Default)
        .await;

    assert!(matches!(result, Err(StoreKitError::Invalid { code: 21007 })));
}

#[tokio::test]
async fn shared_secret_mismatch_is_not_retried() {
    let endpoints = Endpoints::start().await;
    verify_receipt_call()
        .and(body_partial_json(json!({ "password": "wrong" })))
        .respond_with(status(21004))
        .expect(1)
        .mount(&endpoints.production)
        .await;
    verify_receipt_call()
        .respond_with(valid_receipt("gems"))
        .expect(0)
        .mount(&endpoints.sandbox)
        .await;

    let error = endpoints
        .verifier(Environment::Production)
        .verify(
            &purchased("gems"),
            &VerifyMethod::WithPassword("wrong".to_owned()),
        )
        .await
        .unwrap_err();

    assert_eq!(error.status_code(), Some(21004));
    assert!(error.to_string().contains("shared secret"));
}

#[tokio::test]
async fn non_success_http_status_is_reported() {
    let endpoints = Endpoints::start().await;
    verify_receipt_call()
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(1)
        .mount(&endpoints.sandbox)
        .await;

    let result = endpoints
        .verifier(Environment::Sandbox)
        .verify(&purchased("gems"), &VerifyMethod::Default)
        .await;

    match result {
        Err(StoreKitError::NonHttpResponse { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "unavailable");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_underlying_error() {
    let endpoints = Endpoints::start().await;
    verify_receipt_call()
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&endpoints.sandbox)
        .await;

    let result = endpoints
        .verifier(Environment::Sandbox)
        .verify(&purchased("gems"), &VerifyMethod::Default)
        .await;

    assert!(matches!(result, Err(StoreKitError::Underlying(_))));
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let endpoints = Endpoints::start().await;
    verify_receipt_call()
        .respond_with(status(0).set_delay(Duration::from_secs(2)))
        .mount(&endpoints.sandbox)
        .await;

    let verifier = ReceiptVerifier::new(StoreKitConfig {
        receipt_path: Some(endpoints.receipt.path().to_path_buf()),
        environment: Some(Environment::Sandbox),
        sandbox_url: format!("{}/verifyReceipt", endpoints.sandbox.uri()),
        timeout: Duration::from_millis(200),
        ..Default::default()
    })
    .unwrap();

    let result = verifier
        .verify(&purchased("gems"), &VerifyMethod::Default)
        .await;

    assert!(matches!(result, Err(StoreKitError::Timeout)));
}

#[tokio::test]
async fn unreachable_endpoint_is_url_error() {
    let endpoints = Endpoints::start().await;
    // Bind then release a port so nothing is listening on it.
    let closed_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let verifier = ReceiptVerifier::new(StoreKitConfig {
        receipt_path: Some(endpoints.receipt.path().to_path_buf()),
        environment: Some(Environment::Sandbox),
        sandbox_url: format!("http://127.0.0.1:{closed_port}/verifyReceipt"),
        timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap();

    let result = verifier
        .verify(&purchased("gems"), &VerifyMethod::Default)
        .await;

    match result {
        Err(StoreKitError::UrlError(e)) => assert!(e.is_connect()),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn verifier_requires_receipt_path() {
    assert!(matches!(
        ReceiptVerifier::new(StoreKitConfig::default()),
        Err(StoreKitError::Underlying(_))
    ));
}
