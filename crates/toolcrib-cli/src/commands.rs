//! Subcommand implementations over the reactive client layer.

use std::{
  collections::BTreeMap,
  io::{self, BufRead, Write},
  sync::Arc,
};

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::Value;
use toolcrib_client::{
  collection::{Collection, CollectionConfig, Sort, SortOrder},
  gateway::HttpGateway,
  model::Model,
  spans::{apply_span_diff, plan_span_changes},
};
use toolcrib_core::{
  period::{AccessCategory, Period, periods, spans_of_category},
  record::Record,
  resources::{Group, Member, Span},
  schema::Resource,
};
use uuid::Uuid;

// ─── Argument shapes ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum ResourceCommand {
  /// List entities.
  List(ListArgs),
  /// Show one entity by id.
  Show { id: i64 },
  /// Create a new entity from `field=value` pairs.
  Create {
    #[arg(required = true)]
    fields: Vec<String>,
  },
  /// Edit fields of an existing entity and save.
  Edit {
    id: i64,
    #[arg(required = true)]
    fields: Vec<String>,
  },
  /// Delete an entity.
  Delete {
    id: i64,
    /// Skip the confirmation prompt.
    #[arg(long)]
    yes: bool,
  },
}

#[derive(Debug, Args)]
pub struct ListArgs {
  #[arg(long, default_value_t = 1)]
  page: u32,

  /// Items per page; 0 fetches everything.
  #[arg(long, default_value_t = 25)]
  page_size: u32,

  /// Sort specification, `key` or `key:asc|desc`.
  #[arg(long)]
  sort: Option<String>,

  /// Substring filter, `field=value`; repeatable.
  #[arg(long = "filter")]
  filters: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum SpanCommand {
  /// Print the derived access periods for one member.
  Show {
    member_id: i64,
    #[arg(long)]
    category: AccessCategory,
  },
  /// Reconcile a member's spans against an edited period list.
  Set {
    member_id: i64,
    #[arg(long)]
    category: AccessCategory,
    /// Target period, `START:END` (inclusive ISO dates); repeatable.
    #[arg(long = "period", required = true)]
    periods: Vec<String>,
    /// Apply without prompting.
    #[arg(long)]
    yes: bool,
  },
}

// ─── Session ─────────────────────────────────────────────────────────────────

pub async fn login(gateway: &HttpGateway, username: &str) -> Result<()> {
  let password = read_password()?;
  gateway.login(username, &password).await.context("login failed")?;
  println!("logged in as {username}");
  Ok(())
}

pub async fn logout(gateway: &HttpGateway) -> Result<()> {
  gateway.logout().await.context("logout failed")?;
  println!("logged out");
  Ok(())
}

// ─── Generic resource commands ───────────────────────────────────────────────

pub async fn resource<R: Resource>(
  command: ResourceCommand,
  gateway: &HttpGateway,
) -> Result<()> {
  match command {
    ResourceCommand::List(args) => list::<R>(args, gateway).await,
    ResourceCommand::Show { id } => show::<R>(id, gateway).await,
    ResourceCommand::Create { fields } => create::<R>(&fields, gateway).await,
    ResourceCommand::Edit { id, fields } => edit::<R>(id, &fields, gateway).await,
    ResourceCommand::Delete { id, yes } => delete::<R>(id, yes, gateway).await,
  }
}

async fn list<R: Resource>(args: ListArgs, gateway: &HttpGateway) -> Result<()> {
  let sort = args.sort.as_deref().map(parse_sort).transpose()?;
  let filter = parse_filters(&args.filters)?;

  let mut collection: Collection<R> = Collection::new(CollectionConfig {
    page_size: args.page_size,
    sort,
    filter,
    ..CollectionConfig::default()
  });
  collection.update_page(gateway, args.page).await?;

  for model in collection.items().unwrap_or(&[]) {
    println!("{}", render(&model.merged())?);
  }
  let page = collection.page();
  if args.page_size > 0 {
    eprintln!("page {}/{}", page.index, page.count);
  }
  Ok(())
}

async fn show<R: Resource>(id: i64, gateway: &HttpGateway) -> Result<()> {
  let model = fetch::<R>(id, gateway).await?;
  println!("{}", render_pretty(&model.merged())?);
  Ok(())
}

async fn create<R: Resource>(
  fields: &[String],
  gateway: &HttpGateway,
) -> Result<()> {
  let mut model = Model::<R>::new();
  for raw in fields {
    let (field, value) = parse_field(raw)?;
    model.set(&field, value);
  }
  if !model.can_save() {
    bail!("{} is not complete enough to save", R::schema().name);
  }
  model.save(gateway).await?;
  println!("{}", render_pretty(&model.merged())?);
  Ok(())
}

async fn edit<R: Resource>(
  id: i64,
  fields: &[String],
  gateway: &HttpGateway,
) -> Result<()> {
  let mut model = fetch::<R>(id, gateway).await?;
  for raw in fields {
    let (field, value) = parse_field(raw)?;
    model.set(&field, value);
  }
  if !model.is_dirty() {
    println!("nothing to change");
    return Ok(());
  }
  if !model.can_save() {
    bail!("{} is not complete enough to save", R::schema().name);
  }
  model.save(gateway).await?;
  println!("{}", render_pretty(&model.merged())?);
  Ok(())
}

async fn delete<R: Resource>(
  id: i64,
  yes: bool,
  gateway: &HttpGateway,
) -> Result<()> {
  let mut model = fetch::<R>(id, gateway).await?;
  if !yes && !confirm(&model.delete_confirm_message())? {
    return Ok(());
  }
  model.delete(gateway).await?;
  println!("deleted {} {id}", R::schema().name);
  Ok(())
}

async fn fetch<R: Resource>(id: i64, gateway: &HttpGateway) -> Result<Model<R>> {
  Model::<R>::fetch(gateway, id)
    .await?
    .ok_or_else(|| anyhow!("not logged in; run `toolcrib login <username>`"))
}

// ─── Group relations ─────────────────────────────────────────────────────────

pub async fn member_groups(
  gateway: &HttpGateway,
  member_id: i64,
  add: &[i64],
  remove: &[i64],
) -> Result<()> {
  let mut groups: Collection<Group> = Collection::new(CollectionConfig {
    url:          Some(format!(
      "{}/{member_id}/groups",
      Member::schema().root_url
    )),
    page_size:    0,
    id_list_name: Some("groups".to_string()),
    ..CollectionConfig::default()
  });

  for id in add {
    groups.add(gateway, &Value::from(*id)).await?;
  }
  for id in remove {
    groups.remove(gateway, &Value::from(*id)).await?;
  }
  if add.is_empty() && remove.is_empty() {
    groups.fetch(gateway).await?;
  }

  for model in groups.items().unwrap_or(&[]) {
    println!("{}", render(&model.merged())?);
  }
  Ok(())
}

// ─── Spans ───────────────────────────────────────────────────────────────────

pub async fn spans(command: SpanCommand, gateway: &HttpGateway) -> Result<()> {
  match command {
    SpanCommand::Show { member_id, category } => {
      let records = member_span_records(gateway, member_id).await?;
      let spans = spans_of_category(&records, category)?;
      for period in periods(&spans) {
        println!("{} .. {}", period.start, period.end);
      }
      Ok(())
    }
    SpanCommand::Set { member_id, category, periods: edits, yes } => {
      let records = member_span_records(gateway, member_id).await?;
      let edited = edits
        .iter()
        .map(|raw| parse_period(raw))
        .collect::<Result<Vec<_>>>()?;

      let diff = plan_span_changes(&records, category, edited)?;
      if diff.is_empty() {
        println!("spans already match");
        return Ok(());
      }
      for span in &diff.delete_spans {
        println!("delete {} .. {}", span.start, span.end);
      }
      for span in &diff.add_spans {
        println!("create {} .. {}", span.start, span.end);
      }
      if !yes && !confirm("apply these changes?")? {
        return Ok(());
      }

      let reason =
        format!("{category} edited for member {member_id} ({})", Uuid::new_v4());
      apply_span_diff(
        Arc::new(gateway.clone()),
        member_id,
        category,
        diff,
        &reason,
      )
      .await?;
      println!("applied");
      Ok(())
    }
  }
}

async fn member_span_records(
  gateway: &HttpGateway,
  member_id: i64,
) -> Result<Vec<Record>> {
  let mut collection: Collection<Span> = Collection::new(CollectionConfig {
    page_size: 0,
    filter: BTreeMap::from([(
      "member_id".to_string(),
      member_id.to_string(),
    )]),
    ..CollectionConfig::default()
  });
  collection.fetch(gateway).await?;
  Ok(
    collection
      .items()
      .unwrap_or(&[])
      .iter()
      .map(|model| model.merged())
      .collect(),
  )
}

// ─── Parsing and prompting helpers ───────────────────────────────────────────

/// Parse `field=value`. The value side is taken as JSON when it parses as
/// such, otherwise as a plain string.
fn parse_field(raw: &str) -> Result<(String, Value)> {
  let (field, value) = raw
    .split_once('=')
    .ok_or_else(|| anyhow!("expected field=value, got {raw:?}"))?;
  let value = serde_json::from_str(value)
    .unwrap_or_else(|_| Value::String(value.to_string()));
  Ok((field.to_string(), value))
}

fn parse_filters(raw: &[String]) -> Result<BTreeMap<String, String>> {
  raw
    .iter()
    .map(|entry| {
      entry
        .split_once('=')
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .ok_or_else(|| anyhow!("expected field=value, got {entry:?}"))
    })
    .collect()
}

fn parse_sort(raw: &str) -> Result<Sort> {
  let (key, order) = match raw.split_once(':') {
    Some((key, order)) => {
      let order = order
        .parse::<SortOrder>()
        .map_err(|_| anyhow!("unknown sort order {order:?}"))?;
      (key, order)
    }
    None => (raw, SortOrder::Asc),
  };
  if key.is_empty() {
    bail!("empty sort key");
  }
  Ok(Sort { key: key.to_string(), order })
}

/// Parse `START:END` into an inclusive period.
fn parse_period(raw: &str) -> Result<Period> {
  let (start, end) = raw
    .split_once(':')
    .ok_or_else(|| anyhow!("expected START:END, got {raw:?}"))?;
  let start: NaiveDate = start
    .parse()
    .with_context(|| format!("invalid start date {start:?}"))?;
  let end: NaiveDate = end
    .parse()
    .with_context(|| format!("invalid end date {end:?}"))?;
  if end < start {
    bail!("period ends before it starts: {raw:?}");
  }
  Ok(Period { start, end })
}

fn render(record: &Record) -> Result<String> {
  serde_json::to_string(record).context("rendering record")
}

fn render_pretty(record: &Record) -> Result<String> {
  serde_json::to_string_pretty(record).context("rendering record")
}

fn confirm(prompt: &str) -> Result<bool> {
  print!("{prompt} [y/N] ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

/// Read a password from stdin.
fn read_password() -> Result<String> {
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
