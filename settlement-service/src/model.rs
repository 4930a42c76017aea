use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gateway {
    Payu,
    Razorpay,
    Phonepe,
    Paytm,
}

impl Gateway {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gateway::Payu => "payu",
            Gateway::Razorpay => "razorpay",
            Gateway::Phonepe => "phonepe",
            Gateway::Paytm => "paytm",
        }
    }

    pub fn from_str(s: &str) -> Option<Gateway> {
        match s {
            "payu" => Some(Gateway::Payu),
            "razorpay" => Some(Gateway::Razorpay),
            "phonepe" => Some(Gateway::Phonepe),
            "paytm" => Some(Gateway::Paytm),
            _ => None,
        }
    }
}

/// Canonical payment outcome vocabulary, decoupled from gateway tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<PaymentStatus> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// A transaction transitions exactly once: pending -> terminal.
/// Terminal states never transition further; redeliveries are no-ops.
pub fn is_valid_transition(from_status: &str, to: PaymentStatus) -> bool {
    match PaymentStatus::from_str(from_status) {
        Some(PaymentStatus::Pending) => to.is_terminal(),
        Some(PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Cancelled) => false,
        None => false,
    }
}

/// Minimal view of the order collaborator record; the rest of the order
/// lives with the ordering side of the system.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderRecord {
    pub id: String,
    pub payment_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentTransaction {
    pub transaction_id: String,
    pub order_id: String,
    pub gateway: String,
    /// Decimal string in canonical two-decimal form; never a float.
    pub amount: String,
    pub status: String,
    pub gateway_reference: Option<String>,
    pub raw_response: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
