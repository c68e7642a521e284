//! # Amount Codec
//!
//! `encode` turns every amount into a canonical decimal string; `decode`
//! restores amounts from digit-only strings under allowlisted keys. Both walk
//! lists and records recursively.

use serde_json::{Map, Value};
use shared_types::{WalletError, U256};
use tracing::debug;

use crate::domain::{FieldAllowlist, PayloadRecord, PayloadValue};

/// Convert a payload into a JSON value, writing amounts as decimal strings.
pub fn encode(value: &PayloadValue) -> Value {
    match value {
        PayloadValue::Null => Value::Null,
        PayloadValue::Bool(flag) => Value::Bool(*flag),
        PayloadValue::Number(number) => Value::Number(number.clone()),
        PayloadValue::Text(text) => Value::String(text.clone()),
        // U256 displays as base-10 without sign or leading zeros
        PayloadValue::Amount(amount) => Value::String(amount.to_string()),
        PayloadValue::List(items) => Value::Array(items.iter().map(encode).collect()),
        PayloadValue::Record(fields) => {
            let mut map = Map::new();
            for (key, field) in fields {
                map.insert(key.clone(), encode(field));
            }
            Value::Object(map)
        }
    }
}

/// Convert a JSON value into a payload, restoring allowlisted amounts.
pub fn decode(value: &Value, allowlist: &FieldAllowlist) -> PayloadValue {
    match value {
        Value::Null => PayloadValue::Null,
        Value::Bool(flag) => PayloadValue::Bool(*flag),
        Value::Number(number) => PayloadValue::Number(number.clone()),
        Value::String(text) => PayloadValue::Text(text.clone()),
        Value::Array(items) => {
            PayloadValue::List(items.iter().map(|item| decode(item, allowlist)).collect())
        }
        Value::Object(map) => {
            let mut fields = PayloadRecord::new();
            for (key, field) in map {
                fields.insert(key.clone(), decode_field(key, field, allowlist));
            }
            PayloadValue::Record(fields)
        }
    }
}

fn decode_field(key: &str, value: &Value, allowlist: &FieldAllowlist) -> PayloadValue {
    if let Value::String(text) = value {
        if allowlist.contains(key) && is_decimal_digits(text) {
            match U256::from_dec_str(text) {
                Ok(amount) => return PayloadValue::Amount(amount),
                Err(_) => {
                    debug!(field = key, len = text.len(), "Amount overflows 256 bits, kept as text");
                }
            }
        }
    }
    decode(value, allowlist)
}

/// `^[0-9]+$`
fn is_decimal_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Compact JSON with sorted keys; identical payloads give identical strings.
pub fn to_canonical_string(value: &PayloadValue) -> String {
    encode(value).to_string()
}

/// Parse JSON text and decode it.
///
/// # Errors
///
/// `Validation` if the text is not JSON.
pub fn from_canonical_str(
    text: &str,
    allowlist: &FieldAllowlist,
) -> Result<PayloadValue, WalletError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| WalletError::validation(format!("payload is not valid JSON: {e}")))?;
    Ok(decode(&value, allowlist))
}
