use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use common_crypto::{hmac_sha256_hex, sha256_hex, GatewaySecret};
use settlement_service::app::build_router;
use settlement_service::config::{
    PaytmCredentials, PhonepeCredentials, RazorpayCredentials, SettlementConfig,
};
use settlement_service::model::{Gateway, PaymentStatus};
use settlement_service::settlement::MemorySettlementStore;
use settlement_service::AppState;
use tower::ServiceExt;

fn test_state() -> (Arc<MemorySettlementStore>, AppState) {
    let store = Arc::new(MemorySettlementStore::new());
    let mut config = SettlementConfig::default();
    config.razorpay = Some(RazorpayCredentials {
        key_id: "rzp_test_1".to_string(),
        key_secret: GatewaySecret::new("RZP_SECRET").expect("secret"),
    });
    config.phonepe = Some(PhonepeCredentials {
        merchant_id: "M1".to_string(),
        salt: GatewaySecret::new("PP_SALT").expect("salt"),
        salt_index: "1".to_string(),
    });
    config.paytm = Some(PaytmCredentials {
        merchant_id: "PTM1".to_string(),
        merchant_key: GatewaySecret::new("PTM_KEY").expect("key"),
    });
    let state = AppState { store: store.clone(), config: Arc::new(config) };
    (store, state)
}

fn json_request(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("request")
}

async fn ack_success(resp: axum::response::Response) -> bool {
    assert!(resp.status().is_success());
    let bytes = to_bytes(resp.into_body(), 1024 * 16).await.expect("body");
    let ack: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    ack["success"] == true
}

#[tokio::test]
async fn razorpay_valid_signature_settles() {
    let (store, state) = test_state();
    store.seed_payment("TXN_rzp_1", Gateway::Razorpay, "order-7", "250.00");
    let app = build_router(state);

    let secret = GatewaySecret::new("RZP_SECRET").expect("secret");
    let signature = hmac_sha256_hex(&secret, "order_rzp_9|pay_rzp_9").expect("hmac");
    let body = serde_json::json!({
        "razorpay_payment_id": "pay_rzp_9",
        "razorpay_order_id": "order_rzp_9",
        "razorpay_signature": signature,
        "paymentId": "TXN_rzp_1",
        "orderId": "order-7"
    })
    .to_string();

    let resp = app.oneshot(json_request("/callbacks/razorpay", body)).await.expect("response");
    assert!(ack_success(resp).await);
    assert_eq!(store.payment_status("TXN_rzp_1", Gateway::Razorpay), Some(PaymentStatus::Completed));
    assert_eq!(store.order_payment_status("order-7"), Some(PaymentStatus::Completed));
}

#[tokio::test]
async fn razorpay_bad_signature_is_rejected() {
    let (store, state) = test_state();
    store.seed_payment("TXN_rzp_1", Gateway::Razorpay, "order-7", "250.00");
    let app = build_router(state);

    let body = serde_json::json!({
        "razorpay_payment_id": "pay_rzp_9",
        "razorpay_order_id": "order_rzp_9",
        "razorpay_signature": "0000",
        "paymentId": "TXN_rzp_1",
        "orderId": "order-7"
    })
    .to_string();

    let resp = app.oneshot(json_request("/callbacks/razorpay", body)).await.expect("response");
    assert!(!ack_success(resp).await);
    assert_eq!(store.payment_status("TXN_rzp_1", Gateway::Razorpay), Some(PaymentStatus::Pending));
}

fn phonepe_body(code: &str, amount: i64) -> String {
    serde_json::json!({
        "merchantId": "M1",
        "transactionId": "PP_REF_1",
        "merchantTransactionId": "TXN_pp_1",
        "amount": amount,
        "code": code,
        "orderId": "order-8"
    })
    .to_string()
}

fn phonepe_request(body: String) -> Request<Body> {
    let mut material = body.clone().into_bytes();
    material.extend_from_slice(b"PP_SALT");
    let x_verify = format!("{}###1", sha256_hex(&material));
    Request::builder()
        .method("POST")
        .uri("/callbacks/phonepe")
        .header("content-type", "application/json")
        .header("X-VERIFY", x_verify)
        .body(Body::from(body))
        .expect("request")
}

#[tokio::test]
async fn phonepe_checksum_and_amount_settle() {
    let (store, state) = test_state();
    store.seed_payment("TXN_pp_1", Gateway::Phonepe, "order-8", "100.00");
    let app = build_router(state);

    let resp = app
        .oneshot(phonepe_request(phonepe_body("PAYMENT_SUCCESS", 10000)))
        .await
        .expect("response");
    assert!(ack_success(resp).await);
    assert_eq!(store.payment_status("TXN_pp_1", Gateway::Phonepe), Some(PaymentStatus::Completed));
}

#[tokio::test]
async fn phonepe_amount_mismatch_is_rejected_even_with_valid_checksum() {
    let (store, state) = test_state();
    store.seed_payment("TXN_pp_1", Gateway::Phonepe, "order-8", "100.00");
    let app = build_router(state);

    // Checksum is valid for this body, but the amount disagrees with what
    // was initiated.
    let resp = app
        .oneshot(phonepe_request(phonepe_body("PAYMENT_SUCCESS", 100)))
        .await
        .expect("response");
    assert!(!ack_success(resp).await);
    assert_eq!(store.payment_status("TXN_pp_1", Gateway::Phonepe), Some(PaymentStatus::Pending));
}

#[tokio::test]
async fn phonepe_missing_x_verify_is_rejected() {
    let (store, state) = test_state();
    store.seed_payment("TXN_pp_1", Gateway::Phonepe, "order-8", "100.00");
    let app = build_router(state);

    let resp = app
        .oneshot(json_request("/callbacks/phonepe", phonepe_body("PAYMENT_SUCCESS", 10000)))
        .await
        .expect("response");
    assert!(!ack_success(resp).await);
    assert_eq!(store.payment_status("TXN_pp_1", Gateway::Phonepe), Some(PaymentStatus::Pending));
}

fn paytm_form(status: &str, checksum: &str) -> String {
    format!("ORDERID=TXN_ptm_1&TXNID=PTM_REF_1&STATUS={status}&CHECKSUMHASH={checksum}&orderId=order-9")
}

#[tokio::test]
async fn paytm_return_settles_and_redirects() {
    let (store, state) = test_state();
    store.seed_payment("TXN_ptm_1", Gateway::Paytm, "order-9", "75.00");
    let app = build_router(state);

    let key = GatewaySecret::new("PTM_KEY").expect("key");
    let checksum = hmac_sha256_hex(&key, "TXN_ptm_1|PTM_REF_1|TXN_SUCCESS").expect("hmac");
    let req = Request::builder()
        .method("POST")
        .uri("/callbacks/paytm")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(paytm_form("TXN_SUCCESS", &checksum)))
        .expect("request");

    let resp = app.oneshot(req).await.expect("response");
    assert!(resp.status().is_redirection());
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert!(location.contains("/payment/success"), "location: {location}");
    assert!(location.contains("orderId=order-9"), "location: {location}");
    assert_eq!(store.payment_status("TXN_ptm_1", Gateway::Paytm), Some(PaymentStatus::Completed));
}

#[tokio::test]
async fn paytm_failure_checksum_with_flipped_status_does_not_settle() {
    let (store, state) = test_state();
    store.seed_payment("TXN_ptm_1", Gateway::Paytm, "order-9", "75.00");
    let app = build_router(state);

    // Checksum captured from a legitimate failure return, re-posted with
    // STATUS rewritten to success. Must verify as a forgery.
    let key = GatewaySecret::new("PTM_KEY").expect("key");
    let checksum = hmac_sha256_hex(&key, "TXN_ptm_1|PTM_REF_1|TXN_FAILURE").expect("hmac");
    let req = Request::builder()
        .method("POST")
        .uri("/callbacks/paytm")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(paytm_form("TXN_SUCCESS", &checksum)))
        .expect("request");

    let resp = app.oneshot(req).await.expect("response");
    assert!(resp.status().is_redirection());
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert!(location.contains("/payment/failure"), "location: {location}");
    assert_eq!(store.payment_status("TXN_ptm_1", Gateway::Paytm), Some(PaymentStatus::Pending));
    assert_eq!(store.order_payment_status("order-9"), Some(PaymentStatus::Pending));
}

#[tokio::test]
async fn paytm_bad_checksum_redirects_to_failure() {
    let (store, state) = test_state();
    store.seed_payment("TXN_ptm_1", Gateway::Paytm, "order-9", "75.00");
    let app = build_router(state);

    let req = Request::builder()
        .method("POST")
        .uri("/callbacks/paytm")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(paytm_form("TXN_SUCCESS", "bogus")))
        .expect("request");

    let resp = app.oneshot(req).await.expect("response");
    assert!(resp.status().is_redirection());
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert!(location.contains("/payment/failure"), "location: {location}");
    assert_eq!(store.payment_status("TXN_ptm_1", Gateway::Paytm), Some(PaymentStatus::Pending));
}
