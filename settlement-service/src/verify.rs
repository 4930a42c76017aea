use common_crypto::{digests_match, hmac_sha256_hex, sha256_hex};
use tracing::warn;

use crate::callbacks::{PaytmCallback, PayuCallback, RazorpayCallback};
use crate::config::{PaytmCredentials, PayuCredentials, PhonepeCredentials, RazorpayCredentials};
use crate::hash::response_hash;

/// Authenticity checks per gateway. A mismatch or absent signature is a
/// normal negative outcome and returns `false`; only credential problems
/// surface as errors (handled upstream by the config layer, which cannot
/// hand out empty secrets).

pub fn verify_payu(cb: &PayuCallback, creds: &PayuCredentials) -> bool {
    if cb.hash.is_empty() {
        return false;
    }
    let expected = response_hash(&creds.merchant_key, &cb.status, &cb.hash_fields(), &creds.salt);
    let ok = digests_match(&expected, &cb.hash.to_ascii_lowercase());
    if !ok {
        warn!(gateway = "payu", txn_id = %cb.txnid, "response hash mismatch");
    }
    ok
}

/// HMAC-SHA256 over "{order_id}|{payment_id}" keyed by the merchant secret,
/// hex-encoded, against `razorpay_signature`.
pub fn verify_razorpay(cb: &RazorpayCallback, creds: &RazorpayCredentials) -> bool {
    if cb.razorpay_signature.is_empty() {
        return false;
    }
    let message = format!("{}|{}", cb.razorpay_order_id, cb.razorpay_payment_id);
    let Ok(expected) = hmac_sha256_hex(&creds.key_secret, &message) else {
        return false;
    };
    let ok = digests_match(&expected, &cb.razorpay_signature);
    if !ok {
        warn!(gateway = "razorpay", txn_id = %cb.payment_id, "signature mismatch");
    }
    ok
}

/// PhonePe X-VERIFY convention: sha256(raw_body + salt) hex, suffixed with
/// "###" and the salt index.
pub fn verify_phonepe(raw_body: &[u8], x_verify: Option<&str>, creds: &PhonepeCredentials) -> bool {
    let Some(provided) = x_verify else {
        return false;
    };
    let mut material = raw_body.to_vec();
    material.extend_from_slice(creds.salt.reveal().as_bytes());
    let expected = format!("{}###{}", sha256_hex(&material), creds.salt_index);
    let ok = digests_match(&expected, provided);
    if !ok {
        warn!(gateway = "phonepe", "X-VERIFY checksum mismatch");
    }
    ok
}

/// HMAC-SHA256 over "{ORDERID}|{TXNID}|{STATUS}" keyed by the merchant key,
/// against the CHECKSUMHASH field. STATUS is part of the MAC input: a
/// checksum captured from a failure return must not verify when re-posted
/// with the status flipped to success.
pub fn verify_paytm(cb: &PaytmCallback, creds: &PaytmCredentials) -> bool {
    if cb.checksum.is_empty() {
        return false;
    }
    let message = format!("{}|{}|{}", cb.order_ref, cb.txn_ref, cb.status);
    let Ok(expected) = hmac_sha256_hex(&creds.merchant_key, &message) else {
        return false;
    };
    let ok = digests_match(&expected, &cb.checksum);
    if !ok {
        warn!(gateway = "paytm", txn_id = %cb.order_ref, "checksum mismatch");
    }
    ok
}
