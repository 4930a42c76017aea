use serde::{Deserialize, Serialize};

use crate::hash::PayuHashFields;

/// Per-gateway callback payloads, parsed once at the boundary so field
/// presence is checked before anything reaches the verifier. All fields
/// default to empty; `missing_field` reports the first required field that
/// was absent so the router can reject without attempting verification.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayuCallback {
    #[serde(default)]
    pub txnid: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub productinfo: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub email: String,
    /// udf1 carries the application order id through the gateway round trip.
    #[serde(default)]
    pub udf1: String,
    #[serde(default)]
    pub udf2: String,
    #[serde(default)]
    pub udf3: String,
    #[serde(default)]
    pub udf4: String,
    #[serde(default)]
    pub udf5: String,
    /// PayU's own payment id, assigned on response.
    #[serde(default)]
    pub mihpayid: String,
    #[serde(default)]
    pub hash: String,
}

impl PayuCallback {
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.txnid.is_empty() {
            return Some("txnid");
        }
        if self.status.is_empty() {
            return Some("status");
        }
        if self.amount.is_empty() {
            return Some("amount");
        }
        if self.udf1.is_empty() {
            return Some("udf1");
        }
        None
    }

    pub fn hash_fields(&self) -> PayuHashFields {
        PayuHashFields {
            txn_id: self.txnid.clone(),
            amount: self.amount.clone(),
            product_info: self.productinfo.clone(),
            first_name: self.firstname.clone(),
            email: self.email.clone(),
            udf: [
                self.udf1.clone(),
                self.udf2.clone(),
                self.udf3.clone(),
                self.udf4.clone(),
                self.udf5.clone(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayCallback {
    #[serde(default)]
    pub razorpay_payment_id: String,
    #[serde(default)]
    pub razorpay_order_id: String,
    #[serde(default)]
    pub razorpay_signature: String,
    /// Application-assigned transaction id for this attempt.
    #[serde(default, rename = "paymentId")]
    pub payment_id: String,
    #[serde(default, rename = "orderId")]
    pub order_id: String,
}

impl RazorpayCallback {
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.razorpay_payment_id.is_empty() {
            return Some("razorpay_payment_id");
        }
        if self.razorpay_order_id.is_empty() {
            return Some("razorpay_order_id");
        }
        if self.payment_id.is_empty() {
            return Some("paymentId");
        }
        if self.order_id.is_empty() {
            return Some("orderId");
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhonepeCallback {
    #[serde(default, rename = "merchantId")]
    pub merchant_id: String,
    /// PhonePe's own transaction id (gateway reference).
    #[serde(default, rename = "transactionId")]
    pub transaction_id: String,
    /// The id this application generated before redirecting to PhonePe.
    #[serde(default, rename = "merchantTransactionId")]
    pub merchant_transaction_id: String,
    /// Amount in minor currency units (paise).
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub code: String,
    #[serde(default, rename = "orderId")]
    pub order_id: String,
}

impl PhonepeCallback {
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.merchant_id.is_empty() {
            return Some("merchantId");
        }
        if self.merchant_transaction_id.is_empty() {
            return Some("merchantTransactionId");
        }
        if self.code.is_empty() {
            return Some("code");
        }
        None
    }

    /// Paise -> canonical rupee string ("10000" -> "100.00").
    pub fn amount_rupees(&self) -> Option<String> {
        let minor = self.amount?;
        if minor < 0 {
            return None;
        }
        Some(format!("{}.{:02}", minor / 100, minor % 100))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaytmCallback {
    /// Paytm echoes the merchant order id, which is this application's
    /// transaction id for the attempt.
    #[serde(default, rename = "ORDERID")]
    pub order_ref: String,
    #[serde(default, rename = "TXNID")]
    pub txn_ref: String,
    #[serde(default, rename = "STATUS")]
    pub status: String,
    #[serde(default, rename = "CHECKSUMHASH")]
    pub checksum: String,
    #[serde(default, rename = "orderId")]
    pub order_id: String,
}

impl PaytmCallback {
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.order_ref.is_empty() {
            return Some("ORDERID");
        }
        if self.txn_ref.is_empty() {
            return Some("TXNID");
        }
        if self.status.is_empty() {
            return Some("STATUS");
        }
        None
    }
}
