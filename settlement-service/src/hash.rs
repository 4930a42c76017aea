use common_crypto::{sha512_pipe_hex, GatewaySecret};

/// Fields covered by the PayU request/response hashes. Optional fields that
/// were absent from the payload must be carried as empty strings so the
/// pipe-delimited positions stay stable.
#[derive(Debug, Clone, Default)]
pub struct PayuHashFields {
    pub txn_id: String,
    pub amount: String,
    pub product_info: String,
    pub first_name: String,
    pub email: String,
    pub udf: [String; 5],
}

/// Outbound request hash:
/// sha512(key|txnid|amount|productinfo|firstname|email|udf1|udf2|udf3|udf4|udf5||||||SALT)
///
/// The five empty slots before the salt are part of the wire format and must
/// be preserved exactly.
pub fn request_hash(merchant_key: &str, fields: &PayuHashFields, salt: &GatewaySecret) -> String {
    sha512_pipe_hex(&[
        merchant_key,
        &fields.txn_id,
        &fields.amount,
        &fields.product_info,
        &fields.first_name,
        &fields.email,
        &fields.udf[0],
        &fields.udf[1],
        &fields.udf[2],
        &fields.udf[3],
        &fields.udf[4],
        "",
        "",
        "",
        "",
        "",
        salt.reveal(),
    ])
}

/// Inbound response hash:
/// sha512(SALT|status|||||||udf5|udf4|udf3|udf2|udf1|email|firstname|productinfo|amount|txnid|key)
///
/// Field order is intentionally the reverse of the request hash, with six
/// empty slots after the status. Do not "fix" it to match the request order.
pub fn response_hash(
    merchant_key: &str,
    status: &str,
    fields: &PayuHashFields,
    salt: &GatewaySecret,
) -> String {
    sha512_pipe_hex(&[
        salt.reveal(),
        status,
        "",
        "",
        "",
        "",
        "",
        "",
        &fields.udf[4],
        &fields.udf[3],
        &fields.udf[2],
        &fields.udf[1],
        &fields.udf[0],
        &fields.email,
        &fields.first_name,
        &fields.product_info,
        &fields.amount,
        &fields.txn_id,
        merchant_key,
    ])
}
