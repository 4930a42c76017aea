use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Errors produced by the gateway digest helpers.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("gateway secret is empty")]
    EmptySecret,
    #[error("invalid HMAC key length")]
    InvalidMacKey,
}

/// Server-held gateway secret (PayU salt, Razorpay key secret, ...).
///
/// Construction rejects empty input so a digest can never be computed with a
/// blank secret; a missing secret surfaces as a configuration error, never as
/// a silent verification pass or failure.
#[derive(Clone)]
pub struct GatewaySecret(String);

impl GatewaySecret {
    pub fn new(value: impl Into<String>) -> Result<Self, CryptoError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CryptoError::EmptySecret);
        }
        Ok(Self(value))
    }

    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for GatewaySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GatewaySecret").field(&"***redacted***").finish()
    }
}

/// Hex-encoded SHA-512 over a pipe-delimited concatenation of `parts`.
/// Empty slots must be passed as empty strings so positions stay stable.
pub fn sha512_pipe_hex(parts: &[&str]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(parts.join("|").as_bytes());
    hex::encode(hasher.finalize())
}

/// Hex-encoded SHA-256 of `data` (PhonePe-style body checksums).
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hex-encoded HMAC-SHA256 of `message` keyed by `secret`.
pub fn hmac_sha256_hex(secret: &GatewaySecret, message: &str) -> Result<String, CryptoError> {
    let mut mac = HmacSha256::new_from_slice(secret.reveal().as_bytes())
        .map_err(|_| CryptoError::InvalidMacKey)?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time equality over two hex digests.
pub fn digests_match(expected: &str, provided: &str) -> bool {
    ConstantTimeEq::ct_eq(expected.as_bytes(), provided.as_bytes()).unwrap_u8() == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_rejected() {
        assert!(matches!(GatewaySecret::new(""), Err(CryptoError::EmptySecret)));
        assert!(matches!(GatewaySecret::new("   "), Err(CryptoError::EmptySecret)));
        assert!(GatewaySecret::new("S1").is_ok());
    }

    #[test]
    fn sha512_pipe_is_deterministic() {
        let a = sha512_pipe_hex(&["k", "txn", "", "", "salt"]);
        let b = sha512_pipe_hex(&["k", "txn", "", "", "salt"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
        // Moving a value across a slot boundary must change the digest.
        let c = sha512_pipe_hex(&["k", "", "txn", "", "salt"]);
        assert_ne!(a, c);
    }

    #[test]
    fn hmac_round_trip() {
        let secret = GatewaySecret::new("S1").unwrap();
        let sig = hmac_sha256_hex(&secret, "order_1|pay_1").unwrap();
        assert!(digests_match(&sig, &sig));
        let other = hmac_sha256_hex(&secret, "order_1|pay_2").unwrap();
        assert!(!digests_match(&sig, &other));
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = GatewaySecret::new("supersecret").unwrap();
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("supersecret"));
    }
}
