//! Entity model — saved/unsaved overlay with change notification.
//!
//! A model is the single source of truth for one server-backed record.
//! `saved` mirrors the last known server state; `unsaved` holds exactly the
//! fields whose current value differs from it, so dirtiness is simply
//! "unsaved is non-empty". Every mutation notifies subscribers
//! synchronously.

use std::{collections::BTreeSet, marker::PhantomData};

use serde_json::Value;
use toolcrib_core::{
  record::{Record, overlay, record_from_value, record_to_value},
  schema::Resource,
};

use crate::{
  error::{Error, Result},
  gateway::Gateway,
  subscribe::{SubscriberId, Subscribers},
};

/// The state handed to subscribers: the merged record plus the set of
/// fields that differ from the saved state.
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
  pub record: Record,
  pub dirty:  BTreeSet<String>,
}

pub struct Model<R: Resource> {
  saved:       Record,
  unsaved:     Record,
  subscribers: Subscribers<ModelSnapshot>,
  _resource:   PhantomData<R>,
}

impl<R: Resource> Model<R> {
  /// A new, never-persisted entity with every attribute at its default.
  pub fn new() -> Self {
    Self {
      saved:       R::schema().default_record(),
      unsaved:     Record::new(),
      subscribers: Subscribers::new(),
      _resource:   PhantomData,
    }
  }

  /// Wrap an existing entity. `record` may be partial; reads fall back to
  /// schema defaults for absent fields.
  pub fn from_record(record: Record) -> Self {
    Self {
      saved:       record,
      unsaved:     Record::new(),
      subscribers: Subscribers::new(),
      _resource:   PhantomData,
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The server-assigned id, when the entity has been persisted.
  pub fn id(&self) -> Option<&Value> {
    self.saved.get(R::schema().id_field).filter(|v| !v.is_null())
  }

  /// Resolve `field`: unsaved first, then saved, then the schema default.
  /// Unknown fields resolve to `Null` rather than erroring.
  pub fn get(&self, field: &str) -> Value {
    if let Some(value) = self.unsaved.get(field) {
      return value.clone();
    }
    if let Some(value) = self.saved.get(field) {
      return value.clone();
    }
    R::schema().default_of(field)
  }

  pub fn is_dirty(&self) -> bool {
    !self.unsaved.is_empty()
  }

  pub fn is_field_dirty(&self, field: &str) -> bool {
    self.unsaved.contains_key(field)
  }

  pub fn can_save(&self) -> bool {
    R::can_save(&self.merged(), self.is_dirty())
  }

  /// The record a save sends: saved state with unsaved edits overlaid.
  pub fn merged(&self) -> Record {
    overlay(&self.saved, &self.unsaved)
  }

  pub fn delete_confirm_message(&self) -> String {
    R::delete_confirm_message(&self.merged())
  }

  fn snapshot(&self) -> ModelSnapshot {
    ModelSnapshot {
      record: self.merged(),
      dirty:  self.unsaved.keys().cloned().collect(),
    }
  }

  // ── Edits ─────────────────────────────────────────────────────────────

  /// Set `field`. A value equal to the saved one (schema default when the
  /// saved record lacks the field) clears the unsaved entry, keeping the
  /// invariant that `unsaved` holds exactly the differing fields.
  /// Subscribers are notified either way.
  pub fn set(&mut self, field: &str, value: Value) {
    let saved_value = self
      .saved
      .get(field)
      .cloned()
      .unwrap_or_else(|| R::schema().default_of(field));

    if value == saved_value {
      self.unsaved.remove(field);
    } else {
      self.unsaved.insert(field.to_string(), value);
    }
    self.notify();
  }

  /// Discard all unsaved edits.
  pub fn reset(&mut self) {
    self.unsaved.clear();
    self.notify();
  }

  // ── Subscription ──────────────────────────────────────────────────────

  /// Register `callback`, replay the current snapshot to it exactly once,
  /// and return the id for `unsubscribe`. The replay means consumers need
  /// no separate initial-render path.
  pub fn subscribe(
    &mut self,
    mut callback: impl FnMut(&ModelSnapshot) + Send + 'static,
  ) -> SubscriberId {
    callback(&self.snapshot());
    self.subscribers.subscribe(callback)
  }

  pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
    self.subscribers.unsubscribe(id)
  }

  fn notify(&mut self) {
    let snapshot = self.snapshot();
    self.subscribers.notify(&snapshot);
  }

  // ── Persistence ───────────────────────────────────────────────────────

  /// Create (`POST`, no id) or update (`PUT`, id present) the entity. On
  /// success the server's record becomes the new saved state and all edits
  /// are cleared; on failure local state is untouched.
  pub async fn save<G: Gateway>(&mut self, gateway: &G) -> Result<()> {
    let body = record_to_value(&self.merged());
    let envelope = match self.id() {
      Some(id) => {
        let url = format!("{}/{}", R::schema().root_url, id_segment(id));
        gateway.put(&url, &body, Some("updated")).await?
      }
      None => {
        gateway.post(R::schema().root_url, &body, Some("created")).await?
      }
    };
    let Some(envelope) = envelope else { return Ok(()) };

    self.saved = record_from_value(envelope.data)
      .ok_or(Error::UnexpectedPayload("an object"))?;
    self.unsaved.clear();
    self.notify();
    Ok(())
  }

  /// Remove the entity server-side. A never-persisted entity resolves
  /// trivially with no request.
  pub async fn delete<G: Gateway>(&mut self, gateway: &G) -> Result<()> {
    let Some(id) = self.id() else { return Ok(()) };
    let url = format!("{}/{}", R::schema().root_url, id_segment(id));
    gateway.delete(&url, Some("deleted")).await?;
    Ok(())
  }

  /// Re-fetch the saved state by id, discarding unsaved edits. Calling on
  /// an entity without an id is a usage error, reported before any request
  /// is issued.
  pub async fn refresh<G: Gateway>(&mut self, gateway: &G) -> Result<()> {
    let Some(id) = self.id() else { return Err(Error::MissingId) };
    let url = format!("{}/{}", R::schema().root_url, id_segment(id));

    let Some(envelope) = gateway.get(&url, &[]).await? else {
      return Ok(());
    };
    self.saved = record_from_value(envelope.data)
      .ok_or(Error::UnexpectedPayload("an object"))?;
    self.unsaved.clear();
    self.notify();
    Ok(())
  }

  /// Fetch an entity by id. `Ok(None)` means the request was consumed by
  /// the global auth policy.
  pub async fn fetch<G: Gateway>(gateway: &G, id: i64) -> Result<Option<Self>> {
    let url = format!("{}/{}", R::schema().root_url, id);
    let Some(envelope) = gateway.get(&url, &[]).await? else {
      return Ok(None);
    };
    let record = record_from_value(envelope.data)
      .ok_or(Error::UnexpectedPayload("an object"))?;
    Ok(Some(Self::from_record(record)))
  }
}

impl<R: Resource> Default for Model<R> {
  fn default() -> Self {
    Self::new()
  }
}

/// Render an id value as a URL path segment, without JSON string quotes.
fn id_segment(id: &Value) -> String {
  match id {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}
