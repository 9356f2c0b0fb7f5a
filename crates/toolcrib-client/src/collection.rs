//! Collection — a paginated, sorted, filtered list view over models.
//!
//! A collection re-fetches from the server whenever one of its query
//! parameters changes and re-broadcasts `{items, page}` to subscribers on
//! every successful fetch. Failed fetches leave items and page untouched.

use std::{collections::BTreeMap, marker::PhantomData};

use serde_json::Value;
use strum::{Display, EnumString};
use toolcrib_core::{
  record::{Record, record_from_value},
  schema::Resource,
};

use crate::{
  error::{Error, Result},
  gateway::Gateway,
  model::Model,
  subscribe::{SubscriberId, Subscribers},
};

// ─── Query state ─────────────────────────────────────────────────────────────

/// Sort direction. `up`/`down` parse as synonyms for `asc`/`desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum SortOrder {
  #[strum(serialize = "up", serialize = "asc")]
  Asc,
  #[strum(serialize = "down", serialize = "desc")]
  Desc,
}

/// Sort specification, sent as `sort_by` / `sort_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
  pub key:   String,
  pub order: SortOrder,
}

/// 1-based page cursor and the server-reported page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub index: u32,
  pub count: u32,
}

/// Construction parameters. `url` defaults to the schema root;
/// `page_size = 0` disables pagination entirely (no `page`/`per_page`
/// params). `id_list_name` enables `add`/`remove` for membership-style
/// relations.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
  pub url:          Option<String>,
  pub page_size:    u32,
  pub sort:         Option<Sort>,
  pub filter:       BTreeMap<String, String>,
  pub id_list_name: Option<String>,
}

impl Default for CollectionConfig {
  fn default() -> Self {
    Self {
      url:          None,
      page_size:    25,
      sort:         None,
      filter:       BTreeMap::new(),
      id_list_name: None,
    }
  }
}

/// What subscribers receive on every change: the merged item records plus
/// the page cursor.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot {
  pub items: Vec<Record>,
  pub page:  Page,
}

// ─── Collection ──────────────────────────────────────────────────────────────

pub struct Collection<R: Resource> {
  url:          String,
  page_size:    u32,
  sort:         Option<Sort>,
  filter:       BTreeMap<String, String>,
  id_list_name: Option<String>,
  items:        Option<Vec<Model<R>>>,
  page:         Page,
  subscribers:  Subscribers<CollectionSnapshot>,
  _resource:    PhantomData<R>,
}

impl<R: Resource> Collection<R> {
  pub fn new(config: CollectionConfig) -> Self {
    Self {
      url:          config
        .url
        .unwrap_or_else(|| R::schema().root_url.to_string()),
      page_size:    config.page_size,
      sort:         config.sort,
      filter:       config.filter,
      id_list_name: config.id_list_name,
      items:        None,
      page:         Page { index: 1, count: 1 },
      subscribers:  Subscribers::new(),
      _resource:    PhantomData,
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// `None` until the first successful fetch.
  pub fn items(&self) -> Option<&[Model<R>]> {
    self.items.as_deref()
  }

  pub fn page(&self) -> Page {
    self.page
  }

  pub fn sort(&self) -> Option<&Sort> {
    self.sort.as_ref()
  }

  pub fn filter(&self) -> &BTreeMap<String, String> {
    &self.filter
  }

  fn params_for(&self, index: u32) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if self.page_size > 0 {
      params.push(("page".to_string(), index.to_string()));
      params.push(("per_page".to_string(), self.page_size.to_string()));
    }
    if let Some(sort) = &self.sort {
      params.push(("sort_by".to_string(), sort.key.clone()));
      params.push(("sort_order".to_string(), sort.order.to_string()));
    }
    for (field, value) in &self.filter {
      params.push((field.clone(), value.clone()));
    }
    params
  }

  fn snapshot(&self) -> CollectionSnapshot {
    CollectionSnapshot {
      items: self
        .items
        .as_ref()
        .map(|models| models.iter().map(|m| m.merged()).collect())
        .unwrap_or_default(),
      page:  self.page,
    }
  }

  // ── Subscription ──────────────────────────────────────────────────────

  /// Register `callback`, replay the current snapshot to it exactly once,
  /// and return the id for `unsubscribe`.
  pub fn subscribe(
    &mut self,
    mut callback: impl FnMut(&CollectionSnapshot) + Send + 'static,
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

  // ── Fetching ──────────────────────────────────────────────────────────

  /// Fetch the current view. On success items and page are replaced and
  /// subscribers notified. When the server reports fewer pages than the
  /// cursor, the index is clamped into `[1, count]` and the request
  /// re-issued once for the page that actually exists.
  pub async fn fetch<G: Gateway>(&mut self, gateway: &G) -> Result<()> {
    let mut index = self.page.index.max(1);
    let mut retried = false;

    loop {
      let params = self.params_for(index);
      let Some(envelope) = gateway.get(&self.url, &params).await? else {
        return Ok(());
      };
      let Value::Array(rows) = envelope.data else {
        return Err(Error::UnexpectedPayload("an array"));
      };

      let count = envelope.last_page.unwrap_or(1).max(1);
      let clamped = index.clamp(1, count);
      if self.page_size > 0 && clamped != index && !retried {
        index = clamped;
        retried = true;
        continue;
      }

      let mut items = Vec::with_capacity(rows.len());
      for row in rows {
        let record = record_from_value(row)
          .ok_or(Error::UnexpectedPayload("an object"))?;
        items.push(Model::from_record(record));
      }
      self.items = Some(items);
      self.page = Page { index: clamped, count };
      self.notify();
      return Ok(());
    }
  }

  /// Change the sort key/order and re-fetch.
  pub async fn update_sort<G: Gateway>(
    &mut self,
    gateway: &G,
    sort: Sort,
  ) -> Result<()> {
    self.sort = Some(sort);
    self.fetch(gateway).await
  }

  /// Replace the filter, rewind to the first page, and re-fetch.
  pub async fn update_filter<G: Gateway>(
    &mut self,
    gateway: &G,
    filter: BTreeMap<String, String>,
  ) -> Result<()> {
    self.filter = filter;
    self.page.index = 1;
    self.fetch(gateway).await
  }

  /// Move the page cursor and re-fetch. The index is clamped against the
  /// server-reported page count during the fetch.
  pub async fn update_page<G: Gateway>(
    &mut self,
    gateway: &G,
    index: u32,
  ) -> Result<()> {
    self.page.index = index.max(1);
    self.fetch(gateway).await
  }

  // ── Relation management ───────────────────────────────────────────────

  /// Attach `id` to a membership-style relation, then re-fetch. Only valid
  /// for collections constructed with `id_list_name`; others are rejected
  /// before any request is issued.
  pub async fn add<G: Gateway>(&mut self, gateway: &G, id: &Value) -> Result<()> {
    self.relate(gateway, "add", id).await
  }

  /// Detach `id` from a membership-style relation, then re-fetch.
  pub async fn remove<G: Gateway>(
    &mut self,
    gateway: &G,
    id: &Value,
  ) -> Result<()> {
    self.relate(gateway, "remove", id).await
  }

  async fn relate<G: Gateway>(
    &mut self,
    gateway: &G,
    verb: &str,
    id: &Value,
  ) -> Result<()> {
    let Some(list_name) = &self.id_list_name else {
      return Err(Error::UnsupportedRelation);
    };

    let mut body = serde_json::Map::new();
    body.insert(list_name.clone(), Value::Array(vec![id.clone()]));
    let body = Value::Object(body);

    let url = format!("{}/{}", self.url, verb);
    gateway.post(&url, &body, None).await?;
    self.fetch(gateway).await
  }
}
