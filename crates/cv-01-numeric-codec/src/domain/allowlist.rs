//! Field names whose digit-only string values carry amounts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Amount-bearing field names recognized by default.
pub const DEFAULT_AMOUNT_FIELDS: [&str; 5] = ["amount", "fee", "value", "satoshis", "balance"];

/// Set of record keys decoded as amounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAllowlist {
    fields: BTreeSet<String>,
}

impl Default for FieldAllowlist {
    fn default() -> Self {
        Self::new(DEFAULT_AMOUNT_FIELDS)
    }
}

impl FieldAllowlist {
    /// Allowlist with exactly the given fields.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Builder-style method to add a field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into());
        self
    }

    /// True if `key` is amount-bearing.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains(key)
    }

    /// Allowlisted field names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}
