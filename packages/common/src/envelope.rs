//! # Error Envelope
//!
//! The one serializable shape every domain failure and merge conflict is
//! reported in. Envelopes are compared and hashed, so they only ever carry
//! values derived from their inputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sorted detail map attached to an envelope
pub type Details = BTreeMap<String, Value>;

/// `{code, op, reason, details}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Stable machine code, e.g. `E_CORE_PROJECT_NOT_FOUND`
    pub code: String,

    /// Operation that failed, e.g. `project.applyTextEdit`
    pub op: String,

    /// Condition name, e.g. `PROJECT_NOT_FOUND`
    pub reason: String,

    #[serde(default)]
    pub details: Details,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, op: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            op: op.into(),
            reason: reason.into(),
            details: Details::new(),
        }
    }

    /// Attach a detail field
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Look up a string detail
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }

    /// JSON form of the envelope (infallible: every field is plain JSON)
    pub fn to_value(&self) -> Value {
        let details: serde_json::Map<String, Value> = self
            .details
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        serde_json::json!({
            "code": self.code,
            "op": self.op,
            "reason": self.reason,
            "details": details,
        })
    }
}

impl std::fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.op, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonical_string;

    #[test]
    fn test_detail_order_is_stable() {
        let a = ErrorEnvelope::new("E_X", "op", "REASON")
            .with_detail("b", 2)
            .with_detail("a", "one");
        let b = ErrorEnvelope::new("E_X", "op", "REASON")
            .with_detail("a", "one")
            .with_detail("b", 2);

        assert_eq!(a, b);
        assert_eq!(canonical_string(&a.to_value()), canonical_string(&b.to_value()));
    }

    #[test]
    fn test_to_value_matches_serde() {
        let envelope = ErrorEnvelope::new("E_X", "op", "REASON").with_detail("opId", "op-1");
        assert_eq!(envelope.to_value(), serde_json::to_value(&envelope).unwrap());
        assert_eq!(envelope.detail_str("opId"), Some("op-1"));
    }
}
