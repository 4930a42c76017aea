use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::callback_handlers::{
    paytm_return, payu_return, payu_webhook, phonepe_callback, razorpay_callback,
};
use crate::AppState;

// --- Error metrics (same shape as the other services) ---
pub static SETTLEMENT_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let v = IntCounterVec::new(
        Opts::new("http_errors_total", "Count of HTTP error responses emitted (status >= 400)"),
        &["service", "code", "status"],
    ).unwrap();
    SETTLEMENT_REGISTRY.register(Box::new(v.clone())).ok();
    v
});

pub static CALLBACKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let v = IntCounterVec::new(
        Opts::new("gateway_callbacks_total", "Gateway callbacks processed, by gateway and outcome"),
        &["gateway", "outcome"],
    ).unwrap();
    SETTLEMENT_REGISTRY.register(Box::new(v.clone())).ok();
    v
});

pub static VERIFICATION_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let v = IntCounterVec::new(
        Opts::new("gateway_verification_failures_total", "Callbacks rejected for failed signature/hash verification"),
        &["gateway"],
    ).unwrap();
    SETTLEMENT_REGISTRY.register(Box::new(v.clone())).ok();
    v
});

pub async fn http_error_metrics(req: axum::http::Request<axum::body::Body>, next: axum::middleware::Next) -> axum::response::Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if status.as_u16() >= 400 {
        let code = resp.headers().get("X-Error-Code").and_then(|v| v.to_str().ok()).unwrap_or("unknown");
        HTTP_ERRORS_TOTAL.with_label_values(&["settlement-service", code, status.as_str()]).inc();
    }
    resp
}

pub async fn health() -> &'static str { "ok" }

pub async fn metrics() -> String {
    let mut buf = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&SETTLEMENT_REGISTRY.gather(), &mut buf).ok();
    String::from_utf8(buf).unwrap_or_default()
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        // Browser-return flows (redirect responses)
        .route("/callbacks/payu", post(payu_return))
        .route("/callbacks/paytm", post(paytm_return))
        // Server-to-server flows (JSON acknowledgments)
        .route("/webhooks/payu", post(payu_webhook))
        .route("/callbacks/razorpay", post(razorpay_callback))
        .route("/callbacks/phonepe", post(phonepe_callback))
        .layer(middleware::from_fn(http_error_metrics))
        .with_state(state)
}
