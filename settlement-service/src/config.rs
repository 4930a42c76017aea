use anyhow::{Context, Result};
use common_crypto::GatewaySecret;
use std::env;

#[derive(Debug, Clone)]
pub struct PayuCredentials {
    pub merchant_key: String,
    pub salt: GatewaySecret,
}

#[derive(Debug, Clone)]
pub struct RazorpayCredentials {
    pub key_id: String,
    pub key_secret: GatewaySecret,
}

#[derive(Debug, Clone)]
pub struct PhonepeCredentials {
    pub merchant_id: String,
    pub salt: GatewaySecret,
    pub salt_index: String,
}

#[derive(Debug, Clone)]
pub struct PaytmCredentials {
    pub merchant_id: String,
    pub merchant_key: GatewaySecret,
}

#[derive(Debug, Clone)]
pub struct SettlementConfig {
    pub payu: Option<PayuCredentials>,
    pub razorpay: Option<RazorpayCredentials>,
    pub phonepe: Option<PhonepeCredentials>,
    pub paytm: Option<PaytmCredentials>,
    /// Browser-return landing pages; orderId/txnId/status are appended as
    /// query parameters.
    pub success_redirect_url: String,
    pub failure_redirect_url: String,
    pub persist_timeout_ms: u64,
}

impl SettlementConfig {
    /// Credentials are optional per gateway, but a partially configured
    /// gateway (key without secret, or an empty secret) is a hard startup
    /// error: hashing with a blank secret must be impossible.
    pub fn from_env() -> Result<Self> {
        let payu = match env::var("PAYU_MERCHANT_KEY") {
            Ok(merchant_key) => {
                let salt = env::var("PAYU_SALT").context("PAYU_SALT must be set when PAYU_MERCHANT_KEY is")?;
                let salt = GatewaySecret::new(salt).context("PAYU_SALT must not be empty")?;
                Some(PayuCredentials { merchant_key, salt })
            }
            Err(_) => None,
        };

        let razorpay = match env::var("RAZORPAY_KEY_ID") {
            Ok(key_id) => {
                let secret = env::var("RAZORPAY_KEY_SECRET")
                    .context("RAZORPAY_KEY_SECRET must be set when RAZORPAY_KEY_ID is")?;
                let key_secret =
                    GatewaySecret::new(secret).context("RAZORPAY_KEY_SECRET must not be empty")?;
                Some(RazorpayCredentials { key_id, key_secret })
            }
            Err(_) => None,
        };

        let phonepe = match env::var("PHONEPE_MERCHANT_ID") {
            Ok(merchant_id) => {
                let salt = env::var("PHONEPE_SALT")
                    .context("PHONEPE_SALT must be set when PHONEPE_MERCHANT_ID is")?;
                let salt = GatewaySecret::new(salt).context("PHONEPE_SALT must not be empty")?;
                let salt_index = env::var("PHONEPE_SALT_INDEX").unwrap_or_else(|_| "1".to_string());
                Some(PhonepeCredentials { merchant_id, salt, salt_index })
            }
            Err(_) => None,
        };

        let paytm = match env::var("PAYTM_MERCHANT_ID") {
            Ok(merchant_id) => {
                let key = env::var("PAYTM_MERCHANT_KEY")
                    .context("PAYTM_MERCHANT_KEY must be set when PAYTM_MERCHANT_ID is")?;
                let merchant_key =
                    GatewaySecret::new(key).context("PAYTM_MERCHANT_KEY must not be empty")?;
                Some(PaytmCredentials { merchant_id, merchant_key })
            }
            Err(_) => None,
        };

        let success_redirect_url = env::var("PAYMENT_SUCCESS_URL")
            .unwrap_or_else(|_| "http://localhost:3000/payment/success".to_string());
        let failure_redirect_url = env::var("PAYMENT_FAILURE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/payment/failure".to_string());
        let persist_timeout_ms = env::var("PERSIST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5000);

        Ok(Self {
            payu,
            razorpay,
            phonepe,
            paytm,
            success_redirect_url,
            failure_redirect_url,
            persist_timeout_ms: persist_timeout_ms.max(100),
        })
    }
}

impl Default for SettlementConfig {
    /// No gateways wired; callers fill in what they use. Handy for tests and
    /// local smoke runs.
    fn default() -> Self {
        Self {
            payu: None,
            razorpay: None,
            phonepe: None,
            paytm: None,
            success_redirect_url: "http://localhost:3000/payment/success".to_string(),
            failure_redirect_url: "http://localhost:3000/payment/failure".to_string(),
            persist_timeout_ms: 5000,
        }
    }
}
