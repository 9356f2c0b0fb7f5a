//! Static resource schemas: id field, REST root, attribute defaults.

use serde_json::Value;

use crate::record::Record;

// ─── Defaults ────────────────────────────────────────────────────────────────

/// Compile-time default for one attribute, `const`-constructible so schemas
/// can live in statics. Materialised to a [`Value`] on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
  Null,
  Bool(bool),
  Int(i64),
  Text(&'static str),
  EmptyList,
}

impl DefaultValue {
  pub fn to_value(self) -> Value {
    match self {
      Self::Null => Value::Null,
      Self::Bool(b) => Value::Bool(b),
      Self::Int(n) => Value::from(n),
      Self::Text(s) => Value::from(s),
      Self::EmptyList => Value::Array(Vec::new()),
    }
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

/// One named attribute and its default.
#[derive(Debug, Clone, Copy)]
pub struct Attribute {
  pub name:    &'static str,
  pub default: DefaultValue,
}

/// Static description of one REST resource type.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
  /// Short singular name, used in log and confirmation messages.
  pub name:       &'static str,
  /// Field carrying the server-assigned id.
  pub id_field:   &'static str,
  /// REST collection root, e.g. `/membership/member`.
  pub root_url:   &'static str,
  pub attributes: &'static [Attribute],
}

impl Schema {
  pub fn attribute(&self, name: &str) -> Option<&Attribute> {
    self.attributes.iter().find(|a| a.name == name)
  }

  /// The default value for `field`. Fields outside the schema resolve to
  /// `Null` rather than erroring.
  pub fn default_of(&self, field: &str) -> Value {
    self
      .attribute(field)
      .map(|a| a.default.to_value())
      .unwrap_or(Value::Null)
  }

  /// A record with every attribute set to its default.
  pub fn default_record(&self) -> Record {
    self
      .attributes
      .iter()
      .map(|a| (a.name.to_string(), a.default.to_value()))
      .collect()
  }
}

// ─── Resource trait ──────────────────────────────────────────────────────────

/// Behaviour shared by all resource marker types.
pub trait Resource {
  fn schema() -> &'static Schema;

  /// Whether the current edited state is complete enough to persist.
  /// `record` is the merged saved+unsaved view; `dirty` is whether any
  /// field differs from the last known server state.
  fn can_save(_record: &Record, dirty: bool) -> bool {
    dirty
  }

  /// Human-readable confirmation string shown before deletion.
  fn delete_confirm_message(record: &Record) -> String;
}
