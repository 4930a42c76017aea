use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Redirect;
use axum::{Form, Json};
use common_http_errors::{ApiError, ApiResult};
use common_money::amounts_match;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::app::{CALLBACKS_TOTAL, VERIFICATION_FAILURES_TOTAL};
use crate::callbacks::{PaytmCallback, PayuCallback, PhonepeCallback, RazorpayCallback};
use crate::model::{Gateway, PaymentStatus};
use crate::resolve::resolve;
use crate::settlement::{ApplyRequest, SettlementOutcome, StoreError};
use crate::verify::{verify_paytm, verify_payu, verify_phonepe, verify_razorpay};
use crate::AppState;

#[derive(Serialize)]
pub struct WebhookAck {
    pub success: bool,
}

/// Outcome of the Parse -> Verify -> Resolve -> Apply pipeline. Transport
/// translation (redirect vs JSON) happens in the per-route handlers;
/// everything else is shared.
enum Settle {
    Accepted { status: PaymentStatus },
    Rejected,
}

fn none_if_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn store_error(gateway: Gateway, err: StoreError) -> ApiError {
    let trace_id = Uuid::new_v4();
    match err {
        StoreError::PaymentNotFound(id) => {
            warn!(gateway = gateway.as_str(), txn_id = %id, %trace_id, "callback for unknown transaction");
            ApiError::not_found("payment_not_found", Some(trace_id))
        }
        StoreError::OrderNotFound(id) => {
            warn!(gateway = gateway.as_str(), order_id = %id, %trace_id, "payment references missing order");
            ApiError::bad_request("order_not_found", Some(trace_id))
        }
        StoreError::Unavailable(reason) => {
            warn!(gateway = gateway.as_str(), %reason, %trace_id, "settlement store unavailable");
            ApiError::unavailable("store_unavailable", Some(trace_id))
        }
    }
}

fn malformed(gateway: Gateway, field: &'static str) -> ApiError {
    warn!(gateway = gateway.as_str(), field, "callback missing required field");
    ApiError::bad_request("malformed_callback", None)
}

fn rejected(gateway: Gateway) -> Settle {
    VERIFICATION_FAILURES_TOTAL.with_label_values(&[gateway.as_str()]).inc();
    CALLBACKS_TOTAL.with_label_values(&[gateway.as_str(), "rejected"]).inc();
    Settle::Rejected
}

async fn apply(
    state: &AppState,
    gateway: Gateway,
    transaction_id: &str,
    status: PaymentStatus,
    gateway_reference: Option<String>,
    raw_response: Option<serde_json::Value>,
) -> Result<Settle, ApiError> {
    let outcome = state
        .store
        .apply(ApplyRequest {
            transaction_id: transaction_id.to_string(),
            gateway,
            status,
            gateway_reference,
            raw_response,
        })
        .await
        .map_err(|e| store_error(gateway, e))?;

    // A replay answers exactly like a first application; the caller cannot
    // tell them apart. Only the metric label differs.
    let (label, status) = match outcome {
        SettlementOutcome::Applied => ("applied", status),
        SettlementOutcome::AlreadySettled { current } => ("replayed", current),
    };
    CALLBACKS_TOTAL.with_label_values(&[gateway.as_str(), label]).inc();
    Ok(Settle::Accepted { status })
}

fn redirect_for(state: &AppState, order_id: &str, txn_id: &str, settle: &Settle) -> Redirect {
    let (base, status) = match settle {
        Settle::Accepted { status: PaymentStatus::Completed } => {
            (&state.config.success_redirect_url, PaymentStatus::Completed)
        }
        Settle::Accepted { status } => (&state.config.failure_redirect_url, *status),
        Settle::Rejected => (&state.config.failure_redirect_url, PaymentStatus::Failed),
    };
    let url = format!("{base}?orderId={order_id}&txnId={txn_id}&status={}", status.as_str());
    Redirect::to(&url)
}

// --- PayU ---

async fn settle_payu(state: &AppState, cb: &PayuCallback) -> Result<Settle, ApiError> {
    if let Some(field) = cb.missing_field() {
        return Err(malformed(Gateway::Payu, field));
    }
    let creds = state.config.payu.as_ref().ok_or_else(|| ApiError::config(None))?;
    if !verify_payu(cb, creds) {
        return Ok(rejected(Gateway::Payu));
    }
    let status = resolve(Gateway::Payu, &cb.status);
    apply(
        state,
        Gateway::Payu,
        &cb.txnid,
        status,
        none_if_empty(&cb.mihpayid),
        serde_json::to_value(cb).ok(),
    )
    .await
}

/// Browser-return POST from PayU; always lands the user on a success or
/// failure page.
pub async fn payu_return(
    State(state): State<AppState>,
    Form(cb): Form<PayuCallback>,
) -> Result<Redirect, ApiError> {
    let settle = settle_payu(&state, &cb).await?;
    Ok(redirect_for(&state, &cb.udf1, &cb.txnid, &settle))
}

/// Server-to-server notification from PayU; same field set, JSON ack.
pub async fn payu_webhook(
    State(state): State<AppState>,
    Form(cb): Form<PayuCallback>,
) -> ApiResult<Json<WebhookAck>> {
    let settle = settle_payu(&state, &cb).await?;
    Ok(Json(WebhookAck { success: matches!(settle, Settle::Accepted { .. }) }))
}

// --- Razorpay ---

pub async fn razorpay_callback(
    State(state): State<AppState>,
    Json(cb): Json<RazorpayCallback>,
) -> ApiResult<Json<WebhookAck>> {
    if let Some(field) = cb.missing_field() {
        return Err(malformed(Gateway::Razorpay, field));
    }
    let creds = state.config.razorpay.as_ref().ok_or_else(|| ApiError::config(None))?;
    if !verify_razorpay(&cb, creds) {
        let settle = rejected(Gateway::Razorpay);
        return Ok(Json(WebhookAck { success: matches!(settle, Settle::Accepted { .. }) }));
    }
    // Razorpay only posts this callback once the payment is captured; the
    // signature covers the order/payment pair, not a status token.
    let status = resolve(Gateway::Razorpay, "captured");
    let settle = apply(
        &state,
        Gateway::Razorpay,
        &cb.payment_id,
        status,
        none_if_empty(&cb.razorpay_payment_id),
        serde_json::to_value(&cb).ok(),
    )
    .await?;
    Ok(Json(WebhookAck { success: matches!(settle, Settle::Accepted { .. }) }))
}

// --- PhonePe ---

pub async fn phonepe_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let cb: PhonepeCallback = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("malformed_callback", None))?;
    if let Some(field) = cb.missing_field() {
        return Err(malformed(Gateway::Phonepe, field));
    }
    let creds = state.config.phonepe.as_ref().ok_or_else(|| ApiError::config(None))?;
    let x_verify = headers.get("X-VERIFY").and_then(|v| v.to_str().ok());
    if !verify_phonepe(&body, x_verify, creds) {
        let settle = rejected(Gateway::Phonepe);
        return Ok(Json(WebhookAck { success: matches!(settle, Settle::Accepted { .. }) }));
    }

    // The checksum proves the payload came from PhonePe; the amount must
    // still match what this application initiated.
    if let Some(callback_amount) = cb.amount_rupees() {
        let stored = state
            .store
            .get_payment(&cb.merchant_transaction_id, Gateway::Phonepe)
            .await
            .map_err(|e| store_error(Gateway::Phonepe, e))?;
        if let Some(payment) = stored {
            if !amounts_match(&payment.amount, &callback_amount) {
                warn!(
                    gateway = "phonepe",
                    txn_id = %cb.merchant_transaction_id,
                    expected = %payment.amount,
                    received = %callback_amount,
                    "callback amount does not match initiated amount"
                );
                let settle = rejected(Gateway::Phonepe);
                return Ok(Json(WebhookAck { success: matches!(settle, Settle::Accepted { .. }) }));
            }
        }
    }

    let status = resolve(Gateway::Phonepe, &cb.code);
    let settle = apply(
        &state,
        Gateway::Phonepe,
        &cb.merchant_transaction_id,
        status,
        none_if_empty(&cb.transaction_id),
        serde_json::to_value(&cb).ok(),
    )
    .await?;
    Ok(Json(WebhookAck { success: matches!(settle, Settle::Accepted { .. }) }))
}

// --- Paytm ---

/// Browser-return POST from Paytm.
pub async fn paytm_return(
    State(state): State<AppState>,
    Form(cb): Form<PaytmCallback>,
) -> Result<Redirect, ApiError> {
    if let Some(field) = cb.missing_field() {
        return Err(malformed(Gateway::Paytm, field));
    }
    let creds = state.config.paytm.as_ref().ok_or_else(|| ApiError::config(None))?;
    if !verify_paytm(&cb, creds) {
        let settle = rejected(Gateway::Paytm);
        return Ok(redirect_for(&state, &cb.order_id, &cb.order_ref, &settle));
    }
    let status = resolve(Gateway::Paytm, &cb.status);
    let settle = apply(
        &state,
        Gateway::Paytm,
        &cb.order_ref,
        status,
        none_if_empty(&cb.txn_ref),
        serde_json::to_value(&cb).ok(),
    )
    .await?;
    Ok(redirect_for(&state, &cb.order_id, &cb.order_ref, &settle))
}
