//! Access spans and derived periods.
//!
//! A span is one persisted inclusive date interval of an access category.
//! A period is the union of a maximal run of connected spans; it is derived
//! on read and never persisted. [`calculate_span_diff`] reconciles the
//! persisted spans against a user-edited period list, producing the minimal
//! set of delete and create operations that makes the coverage match.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use strum::{Display, EnumString};

use crate::{
  error::{Error, Result},
  record::Record,
};

// ─── Categories ──────────────────────────────────────────────────────────────

/// The access categories a span can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessCategory {
  #[strum(serialize = "labaccess")]
  Labaccess,
  #[strum(serialize = "membership")]
  Membership,
  #[strum(serialize = "special_labaccess")]
  SpecialLabaccess,
}

// ─── Types ───────────────────────────────────────────────────────────────────

/// One date interval, bounds inclusive. `id` is `None` for spans that exist
/// only in a pending diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateSpan {
  pub id:    Option<i64>,
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

/// A maximal run of connected spans, bounded by the earliest start and the
/// latest end of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

/// The operations needed to make persisted spans cover exactly an edited
/// period list. Spans are immutable once persisted, so a boundary mismatch
/// is expressed as a delete plus a precisely-bounded create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpanDiff {
  pub delete_spans: Vec<DateSpan>,
  pub add_spans:    Vec<DateSpan>,
}

impl SpanDiff {
  pub fn is_empty(&self) -> bool {
    self.delete_spans.is_empty() && self.add_spans.is_empty()
  }
}

// ─── Connectivity ────────────────────────────────────────────────────────────

fn day_after(date: NaiveDate) -> NaiveDate {
  date + Days::new(1)
}

fn day_before(date: NaiveDate) -> NaiveDate {
  date - Days::new(1)
}

/// Two intervals in start order are connected when the second begins no
/// later than the day after the first ends. Adjacency counts; so does
/// overlap.
fn connected(first_end: NaiveDate, second_start: NaiveDate) -> bool {
  second_start <= day_after(first_end)
}

// ─── Period derivation ───────────────────────────────────────────────────────

/// Group spans into maximal connected runs, each bounded by the run's
/// earliest start and latest end. Input order does not matter.
pub fn periods(spans: &[DateSpan]) -> Vec<Period> {
  let mut sorted: Vec<&DateSpan> = spans.iter().collect();
  sorted.sort_by_key(|s| (s.start, s.end));

  let mut runs: Vec<Period> = Vec::new();
  for span in sorted {
    match runs.last_mut() {
      Some(run) if connected(run.end, span.start) => {
        run.end = run.end.max(span.end);
      }
      _ => runs.push(Period { start: span.start, end: span.end }),
    }
  }
  runs
}

/// Normalise a user-edited period list: sort by start and merge connected
/// entries into maximal runs.
pub fn merge_periods(mut edited: Vec<Period>) -> Vec<Period> {
  edited.sort_by_key(|p| (p.start, p.end));

  let mut merged: Vec<Period> = Vec::new();
  for period in edited {
    match merged.last_mut() {
      Some(prev) if connected(prev.end, period.start) => {
        prev.end = prev.end.max(period.end);
      }
      _ => merged.push(period),
    }
  }
  merged
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

/// Compute the minimal delete/create operations that make the coverage of
/// `existing` match `target` exactly.
///
/// A span that crosses outside every target period is deleted and any
/// uncovered range re-created with precise bounds, rather than trimmed in
/// place. A contained span whose range is a subset of another retained
/// span in the same period is redundant and deleted.
pub fn calculate_span_diff(existing: &[DateSpan], target: &[Period]) -> SpanDiff {
  let mut diff = SpanDiff::default();
  let mut contained: Vec<Vec<&DateSpan>> = vec![Vec::new(); target.len()];

  for span in existing {
    let home = target
      .iter()
      .position(|p| p.start <= span.start && span.end <= p.end);
    match home {
      Some(idx) => contained[idx].push(span),
      None => diff.delete_spans.push(span.clone()),
    }
  }

  for (period, mut candidates) in target.iter().zip(contained) {
    // Widest-first within equal starts, so a subset span is compared
    // against its cover before the redundancy check reaches it.
    candidates.sort_by_key(|s| (s.start, std::cmp::Reverse(s.end)));

    let mut kept: Vec<&DateSpan> = Vec::new();
    for span in candidates {
      let redundant = kept
        .iter()
        .any(|k| k.start <= span.start && span.end <= k.end);
      if redundant {
        diff.delete_spans.push(span.clone());
      } else {
        kept.push(span);
      }
    }

    // Create spans for every range the kept spans leave uncovered.
    let mut cursor = period.start;
    for span in kept {
      if span.start > cursor {
        diff.add_spans.push(DateSpan {
          id:    None,
          start: cursor,
          end:   day_before(span.start),
        });
      }
      cursor = cursor.max(day_after(span.end));
      if cursor > period.end {
        break;
      }
    }
    if cursor <= period.end {
      diff.add_spans.push(DateSpan { id: None, start: cursor, end: period.end });
    }
  }

  diff
}

// ─── Wire conversion ─────────────────────────────────────────────────────────

/// Convert one wire record into a [`DateSpan`].
pub fn span_from_record(record: &Record) -> Result<DateSpan> {
  Ok(DateSpan {
    id:    record.get("span_id").and_then(Value::as_i64),
    start: parse_date(record, "startdate")?,
    end:   parse_date(record, "enddate")?,
  })
}

/// Read the spans of one category out of wire records, skipping rows that
/// are soft-deleted or belong to another category.
pub fn spans_of_category(
  records: &[Record],
  category: AccessCategory,
) -> Result<Vec<DateSpan>> {
  let wanted = category.to_string();
  let mut spans = Vec::new();
  for record in records {
    let deleted = record.get("deleted_at").is_some_and(|v| !v.is_null());
    if deleted {
      continue;
    }
    if record.get("type").and_then(Value::as_str) != Some(wanted.as_str()) {
      continue;
    }
    spans.push(span_from_record(record)?);
  }
  Ok(spans)
}

fn parse_date(record: &Record, field: &'static str) -> Result<NaiveDate> {
  let raw = record
    .get(field)
    .and_then(Value::as_str)
    .ok_or(Error::MissingField(field))?;
  raw.parse().map_err(|_| Error::InvalidDate(raw.to_string()))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  /// Day `n` of January 2026.
  fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
  }

  fn span(id: i64, start: NaiveDate, end: NaiveDate) -> DateSpan {
    DateSpan { id: Some(id), start, end }
  }

  fn period(start: NaiveDate, end: NaiveDate) -> Period {
    Period { start, end }
  }

  // ── Period derivation ─────────────────────────────────────────────────

  #[test]
  fn periods_of_nothing_is_empty() {
    assert!(periods(&[]).is_empty());
  }

  #[test]
  fn periods_groups_overlapping_and_adjacent_spans() {
    let spans = [
      span(1, d(1), d(4)),
      span(2, d(5), d(8)),   // adjacent to the first
      span(3, d(7), d(10)),  // overlaps the second
      span(4, d(20), d(22)), // disconnected
    ];
    assert_eq!(
      periods(&spans),
      vec![period(d(1), d(10)), period(d(20), d(22))]
    );
  }

  #[test]
  fn periods_ignores_input_order() {
    let spans = [span(2, d(5), d(8)), span(1, d(1), d(4))];
    assert_eq!(periods(&spans), vec![period(d(1), d(8))]);
  }

  #[test]
  fn periods_keeps_a_gap_of_more_than_one_day() {
    let spans = [span(1, d(1), d(4)), span(2, d(6), d(8))];
    assert_eq!(
      periods(&spans),
      vec![period(d(1), d(4)), period(d(6), d(8))]
    );
  }

  #[test]
  fn periods_handles_single_day_spans() {
    let spans = [span(1, d(3), d(3)), span(2, d(4), d(4))];
    assert_eq!(periods(&spans), vec![period(d(3), d(4))]);
  }

  #[test]
  fn periods_absorbs_a_span_inside_a_wider_run() {
    let spans = [span(1, d(1), d(10)), span(2, d(3), d(5))];
    assert_eq!(periods(&spans), vec![period(d(1), d(10))]);
  }

  // ── Period merging ────────────────────────────────────────────────────

  #[test]
  fn merge_periods_merges_connected_entries() {
    let edited = vec![period(d(6), d(9)), period(d(1), d(5))];
    assert_eq!(merge_periods(edited), vec![period(d(1), d(9))]);
  }

  #[test]
  fn merge_periods_keeps_disjoint_entries() {
    let edited = vec![period(d(1), d(3)), period(d(10), d(12))];
    assert_eq!(
      merge_periods(edited),
      vec![period(d(1), d(3)), period(d(10), d(12))]
    );
  }

  // ── Reconciliation ────────────────────────────────────────────────────

  #[test]
  fn diff_exact_match_is_a_noop() {
    let existing = [span(1, d(1), d(5))];
    let target = [period(d(1), d(5))];
    let diff = calculate_span_diff(&existing, &target);
    assert!(diff.is_empty(), "unexpected operations: {diff:?}");
  }

  #[test]
  fn diff_redundant_span_is_deleted_without_adds() {
    let existing = [span(1, d(1), d(5)), span(2, d(2), d(3))];
    let target = [period(d(1), d(5))];
    let diff = calculate_span_diff(&existing, &target);
    assert_eq!(diff.delete_spans, vec![span(2, d(2), d(3))]);
    assert!(diff.add_spans.is_empty());
  }

  #[test]
  fn diff_fills_a_period_with_no_existing_spans() {
    let target = [period(d(3), d(7))];
    let diff = calculate_span_diff(&[], &target);
    assert!(diff.delete_spans.is_empty());
    assert_eq!(
      diff.add_spans,
      vec![DateSpan { id: None, start: d(3), end: d(7) }]
    );
  }

  #[test]
  fn diff_replaces_a_span_with_excess_coverage() {
    // The old span starts before the target period, so it is deleted and
    // the period re-created with precise bounds.
    let existing = [span(1, d(2), d(7))];
    let target = [period(d(3), d(7))];
    let diff = calculate_span_diff(&existing, &target);
    assert_eq!(diff.delete_spans, vec![span(1, d(2), d(7))]);
    assert_eq!(
      diff.add_spans,
      vec![DateSpan { id: None, start: d(3), end: d(7) }]
    );
  }

  #[test]
  fn diff_deletes_spans_outside_every_period() {
    let existing = [span(1, d(1), d(2)), span(2, d(10), d(12))];
    let target = [period(d(10), d(12))];
    let diff = calculate_span_diff(&existing, &target);
    assert_eq!(diff.delete_spans, vec![span(1, d(1), d(2))]);
    assert!(diff.add_spans.is_empty());
  }

  #[test]
  fn diff_fills_gaps_around_a_retained_span() {
    let existing = [span(1, d(4), d(6))];
    let target = [period(d(1), d(9))];
    let diff = calculate_span_diff(&existing, &target);
    assert!(diff.delete_spans.is_empty());
    assert_eq!(
      diff.add_spans,
      vec![
        DateSpan { id: None, start: d(1), end: d(3) },
        DateSpan { id: None, start: d(7), end: d(9) },
      ]
    );
  }

  #[test]
  fn diff_keeps_partially_overlapping_contained_spans() {
    // Neither span contains the other; together they cover the period.
    let existing = [span(1, d(1), d(4)), span(2, d(3), d(7))];
    let target = [period(d(1), d(7))];
    let diff = calculate_span_diff(&existing, &target);
    assert!(diff.is_empty(), "unexpected operations: {diff:?}");
  }

  #[test]
  fn diff_creates_a_single_day_span() {
    let target = [period(d(5), d(5))];
    let diff = calculate_span_diff(&[], &target);
    assert_eq!(
      diff.add_spans,
      vec![DateSpan { id: None, start: d(5), end: d(5) }]
    );
  }

  #[test]
  fn diff_handles_multiple_periods_independently() {
    let existing = [span(1, d(1), d(3)), span(2, d(10), d(11))];
    let target = [period(d(1), d(3)), period(d(10), d(14))];
    let diff = calculate_span_diff(&existing, &target);
    assert!(diff.delete_spans.is_empty());
    assert_eq!(
      diff.add_spans,
      vec![DateSpan { id: None, start: d(12), end: d(14) }]
    );
  }

  #[test]
  fn diff_of_empty_target_deletes_everything() {
    let existing = [span(1, d(1), d(3)), span(2, d(5), d(6))];
    let diff = calculate_span_diff(&existing, &[]);
    assert_eq!(diff.delete_spans.len(), 2);
    assert!(diff.add_spans.is_empty());
  }

  // ── Wire conversion ───────────────────────────────────────────────────

  fn span_record(id: i64, category: &str, start: &str, end: &str) -> Record {
    [
      ("span_id".to_string(), json!(id)),
      ("type".to_string(), json!(category)),
      ("startdate".to_string(), json!(start)),
      ("enddate".to_string(), json!(end)),
      ("deleted_at".to_string(), json!(null)),
    ]
    .into_iter()
    .collect()
  }

  #[test]
  fn spans_of_category_filters_category_and_soft_deletes() {
    let mut deleted = span_record(3, "labaccess", "2026-01-01", "2026-01-05");
    deleted.insert("deleted_at".to_string(), json!("2026-02-01T12:00:00Z"));

    let records = vec![
      span_record(1, "labaccess", "2026-01-01", "2026-01-05"),
      span_record(2, "membership", "2026-01-01", "2026-12-31"),
      deleted,
    ];

    let spans = spans_of_category(&records, AccessCategory::Labaccess).unwrap();
    assert_eq!(spans, vec![span(1, d(1), d(5))]);
  }

  #[test]
  fn span_from_record_rejects_missing_and_bad_dates() {
    let mut record = span_record(1, "labaccess", "2026-01-01", "2026-01-05");
    record.remove("enddate");
    assert!(matches!(
      span_from_record(&record),
      Err(Error::MissingField("enddate"))
    ));

    let record = span_record(1, "labaccess", "not-a-date", "2026-01-05");
    assert!(matches!(
      span_from_record(&record),
      Err(Error::InvalidDate(_))
    ));
  }

  #[test]
  fn access_category_round_trips_through_strings() {
    assert_eq!(AccessCategory::SpecialLabaccess.to_string(), "special_labaccess");
    assert_eq!(
      "labaccess".parse::<AccessCategory>().unwrap(),
      AccessCategory::Labaccess
    );
  }
}
