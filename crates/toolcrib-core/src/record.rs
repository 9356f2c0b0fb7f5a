//! Wire records — untyped field maps exchanged with the REST API.
//!
//! A record is a flat mapping from field name to JSON value. Field equality
//! is `serde_json::Value` equality, which is deep for arrays and objects.

use std::collections::BTreeMap;

use serde_json::Value;

pub type Record = BTreeMap<String, Value>;

/// Convert a JSON value into a [`Record`]. Non-object values yield `None`.
pub fn record_from_value(value: Value) -> Option<Record> {
  match value {
    Value::Object(map) => Some(map.into_iter().collect()),
    _ => None,
  }
}

/// Convert a [`Record`] back into a JSON object value.
pub fn record_to_value(record: &Record) -> Value {
  Value::Object(record.clone().into_iter().collect())
}

/// Overlay `unsaved` entries on top of `saved`, yielding the record a save
/// operation sends to the server.
pub fn overlay(saved: &Record, unsaved: &Record) -> Record {
  let mut merged = saved.clone();
  for (field, value) in unsaved {
    merged.insert(field.clone(), value.clone());
  }
  merged
}

/// The string value of `field`, or `""` when absent or not a string.
pub fn text<'a>(record: &'a Record, field: &str) -> &'a str {
  record.get(field).and_then(Value::as_str).unwrap_or("")
}
