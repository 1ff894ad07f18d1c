//! Query state: what subset, in what order, at what page.
//!
//! Any setter that changes the result set (search, sort, filters) sends the
//! user back to page 1. Page setters validate their input and leave the state
//! untouched on rejection, so UI code can pass raw input straight through.

use crate::model::{FieldValue, ValidationError};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Page size used when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Delay a UI should wait after the last keystroke before calling
/// [`QueryState::set_search`].
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

// ===== Sort =====

/// Column sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Column sort. The absence of a sort is `Option::None` on [`QueryState`],
/// so "no sort / ascending / descending" is exactly one of three.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Field to sort by.
    pub field: String,
    /// Sort order.
    pub direction: SortDirection,
}

// ===== Filters =====

/// One filter constraint, keyed by field name in [`QueryState`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Field equals the value (text compares case-insensitively).
    Equals(FieldValue),
    /// Field equals any of the values.
    OneOf(Vec<FieldValue>),
    /// Field lies within the bounds, both inclusive. A missing bound is open.
    Range {
        /// Lower bound.
        from: Option<FieldValue>,
        /// Upper bound.
        to: Option<FieldValue>,
    },
    /// Boolean toggle: field must be exactly this flag.
    Flag(bool),
}

impl FilterValue {
    /// An empty filter places no constraint and is skipped.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Equals(v) => v.is_null(),
            FilterValue::OneOf(values) => values.is_empty(),
            FilterValue::Range { from, to } => {
                from.as_ref().is_none_or(FieldValue::is_null)
                    && to.as_ref().is_none_or(FieldValue::is_null)
            }
            FilterValue::Flag(_) => false,
        }
    }
}

// ===== QueryState =====

/// The combined search/sort/filter/pagination intent of one list screen.
///
/// Lives as long as the screen; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    search_term: String,
    sort: Option<SortSpec>,
    filters: BTreeMap<String, FilterValue>,
    page_index: usize,
    page_size: usize,
    default_page_size: usize,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl QueryState {
    /// Fresh query for a newly mounted screen. A zero page size falls back
    /// to [`DEFAULT_PAGE_SIZE`].
    pub fn new(page_size: usize) -> Self {
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        Self {
            search_term: String::new(),
            sort: None,
            filters: BTreeMap::new(),
            page_index: 1,
            page_size,
            default_page_size: page_size,
        }
    }

    /// Current search term, empty when not searching.
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Active sort, if any.
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Active filters by field.
    pub fn filters(&self) -> &BTreeMap<String, FilterValue> {
        &self.filters
    }

    /// Filter on `key`, if any.
    pub fn filter(&self, key: &str) -> Option<&FilterValue> {
        self.filters.get(key)
    }

    /// 1-based page index.
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Rows per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Zero-based offset of the first row on the current page.
    pub fn offset(&self) -> usize {
        (self.page_index - 1).saturating_mul(self.page_size)
    }

    /// Number of pages for `total` rows. Always at least 1.
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    /// Back to page 1. Returns whether the index moved.
    fn rewind(&mut self) -> bool {
        let moved = self.page_index != 1;
        self.page_index = 1;
        moved
    }

    /// Set the search term. The caller debounces keystrokes.
    pub fn set_search(&mut self, term: impl Into<String>) -> bool {
        let term = term.into();
        if term == self.search_term {
            return false;
        }
        debug!(term = %term, "search term changed");
        self.search_term = term;
        self.rewind();
        true
    }

    /// Sort by `field` in `direction`.
    pub fn set_sort(&mut self, field: impl Into<String>, direction: SortDirection) -> bool {
        let spec = SortSpec {
            field: field.into(),
            direction,
        };
        if self.sort.as_ref() == Some(&spec) {
            return false;
        }
        debug!(field = %spec.field, ?direction, "sort changed");
        self.sort = Some(spec);
        self.rewind();
        true
    }

    /// Remove the column sort, restoring source order.
    pub fn clear_sort(&mut self) -> bool {
        if self.sort.take().is_none() {
            return false;
        }
        debug!("sort cleared");
        self.rewind();
        true
    }

    /// Column header click: none -> ascending -> descending -> none.
    /// Clicking a different column starts it at ascending.
    pub fn toggle_sort(&mut self, field: &str) -> bool {
        let current = self
            .sort
            .as_ref()
            .filter(|spec| spec.field == field)
            .map(|spec| spec.direction);
        match current {
            Some(SortDirection::Ascending) => self.set_sort(field, SortDirection::Descending),
            Some(SortDirection::Descending) => self.clear_sort(),
            None => self.set_sort(field, SortDirection::Ascending),
        }
    }

    /// Set or replace a filter. An empty value removes the key instead.
    pub fn set_filter(&mut self, key: impl Into<String>, value: FilterValue) -> bool {
        let key = key.into();
        if value.is_empty() {
            return self.remove_filter(&key);
        }
        if self.filters.get(&key) == Some(&value) {
            return false;
        }
        debug!(key = %key, ?value, "filter set");
        self.filters.insert(key, value);
        self.rewind();
        true
    }

    /// Drop the filter on `key`.
    pub fn remove_filter(&mut self, key: &str) -> bool {
        if self.filters.remove(key).is_none() {
            return false;
        }
        debug!(key = %key, "filter removed");
        self.rewind();
        true
    }

    /// "Clear filters": drops every filter and the search term. Sort and
    /// page size survive.
    pub fn clear_filters(&mut self) -> bool {
        if self.filters.is_empty() && self.search_term.is_empty() {
            return false;
        }
        debug!(count = self.filters.len(), "filters cleared");
        self.filters.clear();
        self.search_term.clear();
        self.rewind();
        true
    }

    /// Back to the state the screen mounted with.
    pub fn reset(&mut self) -> bool {
        let fresh = Self::new(self.default_page_size);
        if *self == fresh {
            return false;
        }
        *self = fresh;
        true
    }

    /// Jump to a 1-based page. Rejects 0 and leaves the state untouched.
    ///
    /// Indices past the last page are accepted here and clamped by the next
    /// recompute, which knows the total.
    pub fn set_page(&mut self, index: usize) -> Result<bool, ValidationError> {
        if index == 0 {
            warn!(index, "rejected page index");
            return Err(ValidationError::PageIndexOutOfRange(index));
        }
        if index == self.page_index {
            return Ok(false);
        }
        self.page_index = index;
        Ok(true)
    }

    /// Change the number of rows per page. Rejects 0.
    pub fn set_page_size(&mut self, size: usize) -> Result<bool, ValidationError> {
        if size == 0 {
            warn!("rejected zero page size");
            return Err(ValidationError::PageSizeZero);
        }
        if size == self.page_size {
            return Ok(false);
        }
        debug!(size, "page size changed");
        self.page_size = size;
        Ok(true)
    }

    /// Clamp the page index into `[1, page_count(total)]`. Returns whether
    /// it moved.
    pub fn clamp_page(&mut self, total: usize) -> bool {
        let last = self.page_count(total);
        if self.page_index > last {
            debug!(from = self.page_index, to = last, total, "page index clamped");
            self.page_index = last;
            return true;
        }
        false
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
