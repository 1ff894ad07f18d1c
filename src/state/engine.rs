//! Filter / sort / paginate engine.
//!
//! A pure function from (records, query) to the visible page. Steps run in a
//! fixed order so that interactions are deterministic:
//!
//! 1. search (case-insensitive substring over the searchable fields)
//! 2. filters (AND of every non-empty filter)
//! 3. stable sort on the sort field, missing values last
//! 4. paginate, clamping the page index to the last page

use crate::model::{FieldValue, Record};
use crate::state::query::{FilterValue, QueryState, SortDirection};
use std::cmp::Ordering;

// ===== Output types =====

/// Result of running the engine, as positions into the input slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedPage {
    /// Positions of the visible rows, in display order.
    pub indices: Vec<usize>,
    /// Rows passing search and filters, before pagination.
    pub total: usize,
    /// The page actually shown, after clamping.
    pub page_index: usize,
}

/// Result of running the engine, borrowing the visible rows.
#[derive(Debug)]
pub struct PageView<'a, R> {
    /// Rows on the page, in display order.
    pub rows: Vec<&'a R>,
    /// Matching records across all pages.
    pub total: usize,
    /// Clamped 1-based page the rows belong to.
    pub page_index: usize,
}

/// Footer summary: "page 2 of 3, rows 11-20 of 25".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// Clamped 1-based page.
    pub page_index: usize,
    /// Number of pages, at least 1.
    pub page_count: usize,
    /// Rows per page.
    pub page_size: usize,
    /// Matching records across all pages.
    pub total: usize,
    /// 1-based position of the first visible row; 0 when there are no rows.
    pub first_row: usize,
    /// 1-based position of the last visible row; 0 when there are no rows.
    pub last_row: usize,
}

impl PageInfo {
    /// Footer numbers for `page_index`, clamped into range.
    pub fn new(page_index: usize, page_size: usize, total: usize) -> Self {
        let page_size = page_size.max(1);
        let page_count = total.div_ceil(page_size).max(1);
        let page_index = page_index.clamp(1, page_count);
        let (first_row, last_row) = if total == 0 {
            (0, 0)
        } else {
            let first = (page_index - 1) * page_size + 1;
            (first, first.saturating_add(page_size - 1).min(total))
        };
        Self {
            page_index,
            page_count,
            page_size,
            total,
            first_row,
            last_row,
        }
    }

    /// Whether a previous page exists.
    pub fn has_previous(&self) -> bool {
        self.page_index > 1
    }

    /// Whether a next page exists.
    pub fn has_next(&self) -> bool {
        self.page_index < self.page_count
    }
}

// ===== Entry points =====

/// Run the engine and borrow the visible rows.
pub fn apply<'a, R: Record>(
    records: &'a [R],
    query: &QueryState,
    searchable: &[String],
) -> PageView<'a, R> {
    let page = apply_indices(records, query, searchable);
    PageView {
        rows: page.indices.iter().map(|&i| &records[i]).collect(),
        total: page.total,
        page_index: page.page_index,
    }
}

/// Run the engine and return positions of the visible rows.
pub fn apply_indices<R: Record>(
    records: &[R],
    query: &QueryState,
    searchable: &[String],
) -> IndexedPage {
    let matching = matching_indices(records, query, searchable);
    let sorted = sort_indices(records, matching, query);

    let total = sorted.len();
    let page_size = query.page_size();
    let page_index = query.page_index().min(query.page_count(total));
    let start = (page_index - 1) * page_size;
    let indices = sorted.into_iter().skip(start).take(page_size).collect();

    IndexedPage {
        indices,
        total,
        page_index,
    }
}

/// Positions of records passing search and filters, in source order.
pub fn matching_indices<R: Record>(
    records: &[R],
    query: &QueryState,
    searchable: &[String],
) -> Vec<usize> {
    let needle = query.search_term().trim().to_lowercase();
    let filters: Vec<(&String, &FilterValue)> = query
        .filters()
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .collect();

    records
        .iter()
        .enumerate()
        .filter(|(_, record)| needle.is_empty() || matches_search(*record, &needle, searchable))
        .filter(|(_, record)| {
            filters
                .iter()
                .all(|(key, filter)| matches_filter(record.field(key.as_str()).as_ref(), filter))
        })
        .map(|(i, _)| i)
        .collect()
}

// ===== Search =====

fn matches_search<R: Record>(record: &R, needle_lower: &str, searchable: &[String]) -> bool {
    searchable.iter().any(|key| {
        record
            .field(key)
            .and_then(|value| value.search_text())
            .is_some_and(|text| text.to_lowercase().contains(needle_lower))
    })
}

// ===== Filters =====

/// Whether a field value satisfies one non-empty filter.
///
/// A missing field fails every filter except `Flag(false)`, where absence
/// reads as false.
pub fn matches_filter(value: Option<&FieldValue>, filter: &FilterValue) -> bool {
    let value = value.filter(|v| !v.is_null());
    match filter {
        FilterValue::Flag(expected) => match value {
            Some(FieldValue::Bool(actual)) => actual == expected,
            None => !expected,
            Some(_) => false,
        },
        FilterValue::Equals(expected) => value.is_some_and(|v| values_equal(v, expected)),
        FilterValue::OneOf(options) => {
            value.is_some_and(|v| options.iter().any(|option| values_equal(v, option)))
        }
        FilterValue::Range { from, to } => {
            let Some(v) = value else {
                return false;
            };
            let above = bound_holds(v, from.as_ref(), Ordering::Less);
            let below = bound_holds(v, to.as_ref(), Ordering::Greater);
            above && below
        }
    }
}

fn values_equal(a: &FieldValue, b: &FieldValue) -> bool {
    a.is_comparable_with(b) && a.compare_natural(b) == Ordering::Equal
}

/// An absent or null bound is open. `forbidden` is the ordering of the value
/// against the bound that falls outside the range.
fn bound_holds(value: &FieldValue, bound: Option<&FieldValue>, forbidden: Ordering) -> bool {
    match bound {
        None | Some(FieldValue::Null) => true,
        Some(bound) => value.is_comparable_with(bound) && value.compare_natural(bound) != forbidden,
    }
}

// ===== Sort =====

fn sort_indices<R: Record>(records: &[R], indices: Vec<usize>, query: &QueryState) -> Vec<usize> {
    let Some(spec) = query.sort() else {
        return indices;
    };

    // Pull each key once; comparators would otherwise look fields up O(n log n) times.
    let mut keyed: Vec<(Option<FieldValue>, usize)> = indices
        .into_iter()
        .map(|i| {
            let key = records[i].field(&spec.field).filter(|v| !v.is_null());
            (key, i)
        })
        .collect();

    // slice::sort_by is stable: equal keys keep their pre-sort order.
    keyed.sort_by(|(a, _), (b, _)| compare_keys(a.as_ref(), b.as_ref(), spec.direction));
    keyed.into_iter().map(|(_, i)| i).collect()
}

/// Missing values sort last in both directions.
fn compare_keys(a: Option<&FieldValue>, b: Option<&FieldValue>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.compare_natural(b);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
