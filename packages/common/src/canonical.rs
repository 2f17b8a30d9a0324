//! # Canonical JSON
//!
//! Every hash in the workspace is taken over this encoding, never over
//! `serde_json`'s default output.
//!
//! Rules:
//! - object keys sorted by UTF-8 byte order, recursively
//! - no insignificant whitespace
//! - strings escaped exactly as `serde_json` escapes them
//! - numbers in `serde_json`'s formatting (integers in decimal, floats in
//!   shortest round-trip form)

use serde::Serialize;
use serde_json::Value;

use crate::error::CommonResult;

/// Encode an already-built JSON value canonically.
pub fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// Convert any serializable value into a JSON value suitable for
/// [`canonical_string`].
pub fn to_canonical_value<T: Serialize>(value: &T) -> CommonResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Serialize and canonically encode in one step.
pub fn to_canonical_string<T: Serialize>(value: &T) -> CommonResult<String> {
    let value = to_canonical_value(value)?;
    Ok(canonical_string(&value))
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(number) => out.push_str(&number.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    // Display on a string value yields its quoted, escaped JSON form
    out.push_str(&Value::String(s.to_owned()).to_string());
}
