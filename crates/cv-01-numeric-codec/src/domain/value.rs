//! # Payload Value Tree
//!
//! Logical payload of an envelope: nested records of primitives, lists and
//! big-integer amounts. Records are ordered maps so that serialization is
//! canonical.

use serde_json::Number;
use shared_types::U256;
use std::collections::BTreeMap;

/// Ordered record of payload fields.
pub type PayloadRecord = BTreeMap<String, PayloadValue>;

/// A node of an envelope payload.
#[derive(Clone, Debug, PartialEq)]
pub enum PayloadValue {
    /// JSON null.
    Null,
    /// Boolean leaf.
    Bool(bool),
    /// Plain JSON number (counts, indices, timestamps). Never an amount.
    Number(Number),
    /// Text leaf.
    Text(String),
    /// Amount in base units.
    Amount(U256),
    /// Ordered list.
    List(Vec<PayloadValue>),
    /// Keyed record.
    Record(PayloadRecord),
}

impl PayloadValue {
    /// Empty record.
    pub fn record() -> Self {
        PayloadValue::Record(PayloadRecord::new())
    }

    /// Builder-style method to set a record field.
    ///
    /// Non-record values are returned unchanged.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        if let PayloadValue::Record(fields) = &mut self {
            fields.insert(key.into(), value.into());
        }
        self
    }

    /// Borrow as a record.
    pub fn as_record(&self) -> Option<&PayloadRecord> {
        match self {
            PayloadValue::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Mutably borrow as a record.
    pub fn as_record_mut(&mut self) -> Option<&mut PayloadRecord> {
        match self {
            PayloadValue::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Field of a record, `None` for missing keys or non-records.
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.as_record()?.get(key)
    }

    /// Borrow as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Copy out an amount.
    pub fn as_amount(&self) -> Option<U256> {
        match self {
            PayloadValue::Amount(amount) => Some(*amount),
            _ => None,
        }
    }

    /// Borrow as a list.
    pub fn as_list(&self) -> Option<&[PayloadValue]> {
        match self {
            PayloadValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Copy out a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PayloadValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Copy out an unsigned JSON number.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PayloadValue::Number(number) => number.as_u64(),
            _ => None,
        }
    }

    /// Text field of a record that is present and non-empty.
    pub fn non_empty_text(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str().filter(|text| !text.is_empty())
    }
}

impl From<&str> for PayloadValue {
    fn from(text: &str) -> Self {
        PayloadValue::Text(text.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(text: String) -> Self {
        PayloadValue::Text(text)
    }
}

impl From<U256> for PayloadValue {
    fn from(amount: U256) -> Self {
        PayloadValue::Amount(amount)
    }
}

impl From<bool> for PayloadValue {
    fn from(flag: bool) -> Self {
        PayloadValue::Bool(flag)
    }
}

impl From<u64> for PayloadValue {
    fn from(number: u64) -> Self {
        PayloadValue::Number(number.into())
    }
}

impl From<u32> for PayloadValue {
    fn from(number: u32) -> Self {
        PayloadValue::Number(number.into())
    }
}

impl From<Vec<PayloadValue>> for PayloadValue {
    fn from(items: Vec<PayloadValue>) -> Self {
        PayloadValue::List(items)
    }
}

impl From<PayloadRecord> for PayloadValue {
    fn from(fields: PayloadRecord) -> Self {
        PayloadValue::Record(fields)
    }
}
