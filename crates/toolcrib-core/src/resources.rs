//! Resource definitions — the entity types the admin UI operates on.
//!
//! Each resource is a unit marker type bound to a static [`Schema`]. The
//! attribute lists mirror the server's wire records; absent fields resolve
//! to their schema defaults on read.

use crate::{
  record::{Record, text},
  schema::{Attribute, DefaultValue, Resource, Schema},
};

// ─── Member ──────────────────────────────────────────────────────────────────

pub static MEMBER: Schema = Schema {
  name:       "member",
  id_field:   "member_id",
  root_url:   "/membership/member",
  attributes: &[
    Attribute { name: "member_id", default: DefaultValue::Null },
    Attribute { name: "member_number", default: DefaultValue::Null },
    Attribute { name: "created_at", default: DefaultValue::Null },
    Attribute { name: "updated_at", default: DefaultValue::Null },
    Attribute { name: "firstname", default: DefaultValue::Text("") },
    Attribute { name: "lastname", default: DefaultValue::Text("") },
    Attribute { name: "civicregno", default: DefaultValue::Text("") },
    Attribute { name: "email", default: DefaultValue::Text("") },
    Attribute { name: "phone", default: DefaultValue::Text("") },
    Attribute { name: "address_street", default: DefaultValue::Text("") },
    Attribute { name: "address_extra", default: DefaultValue::Text("") },
    Attribute { name: "address_zipcode", default: DefaultValue::Text("") },
    Attribute { name: "address_city", default: DefaultValue::Text("") },
    Attribute { name: "address_country", default: DefaultValue::Text("se") },
  ],
};

pub struct Member;

impl Resource for Member {
  fn schema() -> &'static Schema {
    &MEMBER
  }

  /// A member needs at least a first name and a plausible email before the
  /// server will accept it.
  fn can_save(record: &Record, dirty: bool) -> bool {
    dirty
      && !text(record, "firstname").is_empty()
      && plausible_email(text(record, "email"))
  }

  fn delete_confirm_message(record: &Record) -> String {
    format!(
      "Are you sure you want to delete member {} {}?",
      text(record, "firstname"),
      text(record, "lastname"),
    )
  }
}

/// Syntactic email check: something before `@`, a dot somewhere in the
/// domain, and no dot at either domain edge. Real validation is the
/// server's job.
fn plausible_email(address: &str) -> bool {
  let Some((local, domain)) = address.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && domain.contains('.')
    && !domain.starts_with('.')
    && !domain.ends_with('.')
}

// ─── Group ───────────────────────────────────────────────────────────────────

pub static GROUP: Schema = Schema {
  name:       "group",
  id_field:   "group_id",
  root_url:   "/membership/group",
  attributes: &[
    Attribute { name: "group_id", default: DefaultValue::Null },
    Attribute { name: "created_at", default: DefaultValue::Null },
    Attribute { name: "updated_at", default: DefaultValue::Null },
    Attribute { name: "name", default: DefaultValue::Text("") },
    Attribute { name: "title", default: DefaultValue::Text("") },
    Attribute { name: "description", default: DefaultValue::Text("") },
    Attribute { name: "num_members", default: DefaultValue::Int(0) },
  ],
};

pub struct Group;

impl Resource for Group {
  fn schema() -> &'static Schema {
    &GROUP
  }

  fn delete_confirm_message(record: &Record) -> String {
    format!(
      "Are you sure you want to delete group {}?",
      text(record, "title"),
    )
  }
}

// ─── Key ─────────────────────────────────────────────────────────────────────

pub static KEY: Schema = Schema {
  name:       "key",
  id_field:   "key_id",
  root_url:   "/membership/key",
  attributes: &[
    Attribute { name: "key_id", default: DefaultValue::Null },
    Attribute { name: "member_id", default: DefaultValue::Null },
    Attribute { name: "created_at", default: DefaultValue::Null },
    Attribute { name: "updated_at", default: DefaultValue::Null },
    Attribute { name: "tagid", default: DefaultValue::Text("") },
    Attribute { name: "description", default: DefaultValue::Text("") },
  ],
};

pub struct Key;

impl Resource for Key {
  fn schema() -> &'static Schema {
    &KEY
  }

  fn can_save(record: &Record, dirty: bool) -> bool {
    dirty && !text(record, "tagid").is_empty()
  }

  fn delete_confirm_message(record: &Record) -> String {
    format!(
      "Are you sure you want to delete key {}?",
      text(record, "tagid"),
    )
  }
}

// ─── Span ────────────────────────────────────────────────────────────────────

pub static SPAN: Schema = Schema {
  name:       "span",
  id_field:   "span_id",
  root_url:   "/membership/span",
  attributes: &[
    Attribute { name: "span_id", default: DefaultValue::Null },
    Attribute { name: "member_id", default: DefaultValue::Null },
    Attribute { name: "type", default: DefaultValue::Text("") },
    Attribute { name: "startdate", default: DefaultValue::Null },
    Attribute { name: "enddate", default: DefaultValue::Null },
    Attribute { name: "creation_reason", default: DefaultValue::Text("") },
    Attribute { name: "deleted_at", default: DefaultValue::Null },
  ],
};

pub struct Span;

impl Resource for Span {
  fn schema() -> &'static Schema {
    &SPAN
  }

  fn delete_confirm_message(record: &Record) -> String {
    format!(
      "Are you sure you want to delete the {} span {} .. {}?",
      text(record, "type"),
      text(record, "startdate"),
      text(record, "enddate"),
    )
  }
}

// ─── Message ─────────────────────────────────────────────────────────────────

pub static MESSAGE: Schema = Schema {
  name:       "message",
  id_field:   "message_id",
  root_url:   "/messages",
  attributes: &[
    Attribute { name: "message_id", default: DefaultValue::Null },
    Attribute { name: "created_at", default: DefaultValue::Null },
    Attribute { name: "recipient", default: DefaultValue::Text("") },
    Attribute { name: "subject", default: DefaultValue::Text("") },
    Attribute { name: "body", default: DefaultValue::Text("") },
    Attribute { name: "status", default: DefaultValue::Text("queued") },
  ],
};

pub struct Message;

impl Resource for Message {
  fn schema() -> &'static Schema {
    &MESSAGE
  }

  fn can_save(record: &Record, dirty: bool) -> bool {
    dirty
      && !text(record, "subject").is_empty()
      && !text(record, "body").is_empty()
  }

  fn delete_confirm_message(record: &Record) -> String {
    format!(
      "Are you sure you want to delete message {}?",
      text(record, "subject"),
    )
  }
}

// ─── Product ─────────────────────────────────────────────────────────────────

pub static PRODUCT: Schema = Schema {
  name:       "product",
  id_field:   "product_id",
  root_url:   "/webshop/product",
  attributes: &[
    Attribute { name: "product_id", default: DefaultValue::Null },
    Attribute { name: "category_id", default: DefaultValue::Null },
    Attribute { name: "created_at", default: DefaultValue::Null },
    Attribute { name: "updated_at", default: DefaultValue::Null },
    Attribute { name: "name", default: DefaultValue::Text("") },
    Attribute { name: "description", default: DefaultValue::Text("") },
    Attribute { name: "unit", default: DefaultValue::Text("") },
    Attribute { name: "price", default: DefaultValue::Text("0.00") },
    Attribute { name: "smallest_multiple", default: DefaultValue::Int(1) },
  ],
};

pub struct Product;

impl Resource for Product {
  fn schema() -> &'static Schema {
    &PRODUCT
  }

  fn can_save(record: &Record, dirty: bool) -> bool {
    dirty && !text(record, "name").is_empty()
  }

  fn delete_confirm_message(record: &Record) -> String {
    format!(
      "Are you sure you want to delete product {}?",
      text(record, "name"),
    )
  }
}

// ─── Product action ──────────────────────────────────────────────────────────

pub static PRODUCT_ACTION: Schema = Schema {
  name:       "product action",
  id_field:   "product_action_id",
  root_url:   "/webshop/product_action",
  attributes: &[
    Attribute { name: "product_action_id", default: DefaultValue::Null },
    Attribute { name: "product_id", default: DefaultValue::Null },
    Attribute { name: "action_type", default: DefaultValue::Text("") },
    Attribute { name: "value", default: DefaultValue::Int(0) },
  ],
};

pub struct ProductAction;

impl Resource for ProductAction {
  fn schema() -> &'static Schema {
    &PRODUCT_ACTION
  }

  fn delete_confirm_message(record: &Record) -> String {
    format!(
      "Are you sure you want to delete the {} action?",
      text(record, "action_type"),
    )
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
