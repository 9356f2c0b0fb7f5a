//! Span change sets — planning and applying access-period edits.
//!
//! Planning runs entirely locally; applying issues the deletes and creates
//! as independent, unordered requests. There is no rollback: a failure
//! mid-batch leaves the member's spans partially reconciled, and the caller
//! is expected to re-plan from fresh server state.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::task::JoinSet;
use toolcrib_core::{
  period::{
    AccessCategory, DateSpan, Period, SpanDiff, calculate_span_diff,
    merge_periods, spans_of_category,
  },
  record::Record,
  resources::Span,
  schema::Resource,
};

use crate::{
  error::{Error, Result},
  gateway::Gateway,
};

/// Compute the operations needed so the persisted spans of `category`
/// cover exactly `edited_periods`. The edited list is normalised (sorted,
/// connected entries merged) before diffing.
pub fn plan_span_changes(
  records: &[Record],
  category: AccessCategory,
  edited_periods: Vec<Period>,
) -> Result<SpanDiff> {
  let existing = spans_of_category(records, category)?;
  let target = merge_periods(edited_periods);
  Ok(calculate_span_diff(&existing, &target))
}

/// Materialise one new span as the wire record POSTed to the span root.
fn add_record(
  member_id: i64,
  category: AccessCategory,
  span: &DateSpan,
  reason: &str,
) -> Value {
  json!({
    "member_id":       member_id,
    "type":            category.to_string(),
    "startdate":       span.start.to_string(),
    "enddate":         span.end.to_string(),
    "creation_reason": reason,
  })
}

/// Apply a planned diff: every delete and create dispatched as its own
/// task, awaited together. The first error is reported after all tasks
/// have settled; tasks that succeeded are not rolled back.
pub async fn apply_span_diff<G>(
  gateway: Arc<G>,
  member_id: i64,
  category: AccessCategory,
  diff: SpanDiff,
  reason: &str,
) -> Result<()>
where
  G: Gateway + 'static,
{
  let root = Span::schema().root_url;
  let mut tasks: JoinSet<Result<()>> = JoinSet::new();

  for span in &diff.delete_spans {
    // Spans without an id only exist in a pending diff; nothing to delete.
    let Some(id) = span.id else { continue };
    let gateway = Arc::clone(&gateway);
    let url = format!("{root}/{id}");
    tasks.spawn(async move {
      gateway.delete(&url, Some("deleted")).await.map(|_| ())
    });
  }

  for span in &diff.add_spans {
    let gateway = Arc::clone(&gateway);
    let body = add_record(member_id, category, span, reason);
    tasks.spawn(async move {
      gateway.post(root, &body, Some("created")).await.map(|_| ())
    });
  }

  let mut first_error = None;
  while let Some(joined) = tasks.join_next().await {
    let outcome = match joined {
      Ok(outcome) => outcome,
      Err(e) => Err(Error::Join(e)),
    };
    if let Err(e) = outcome {
      if first_error.is_none() {
        first_error = Some(e);
      }
    }
  }

  match first_error {
    Some(e) => Err(e),
    None => Ok(()),
  }
}
