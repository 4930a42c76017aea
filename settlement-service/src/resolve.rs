use tracing::warn;

use crate::model::{Gateway, PaymentStatus};

/// Map a gateway's native status vocabulary onto the canonical outcome set.
///
/// Unknown tokens resolve to `Pending`, never to `Completed` or `Failed`: a
/// payment is only marked successful on input this service recognizes.
pub fn resolve(gateway: Gateway, token: &str) -> PaymentStatus {
    let normalized = token.trim().to_ascii_lowercase();
    let mapped = match gateway {
        Gateway::Payu => match normalized.as_str() {
            "success" => Some(PaymentStatus::Completed),
            "failure" | "failed" => Some(PaymentStatus::Failed),
            "pending" | "in progress" => Some(PaymentStatus::Pending),
            "cancel" | "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        },
        Gateway::Razorpay => match normalized.as_str() {
            "captured" | "authorized" | "success" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "created" | "pending" => Some(PaymentStatus::Pending),
            _ => None,
        },
        Gateway::Phonepe => match normalized.as_str() {
            "payment_success" => Some(PaymentStatus::Completed),
            "payment_error" | "payment_declined" | "timed_out" => Some(PaymentStatus::Failed),
            "payment_pending" => Some(PaymentStatus::Pending),
            "payment_cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        },
        Gateway::Paytm => match normalized.as_str() {
            "txn_success" => Some(PaymentStatus::Completed),
            "txn_failure" => Some(PaymentStatus::Failed),
            "pending" | "open" => Some(PaymentStatus::Pending),
            _ => None,
        },
    };

    match mapped {
        Some(status) => status,
        None => {
            warn!(gateway = gateway.as_str(), token = %token, "unknown gateway status token, resolving to pending");
            PaymentStatus::Pending
        }
    }
}
