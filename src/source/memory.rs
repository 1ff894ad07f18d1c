//! In-memory paged record service.
//!
//! Behaves like a remote backend: it runs the query itself and returns one
//! page plus the total. Used by the binary's `--remote` mode and by tests
//! that need a backend to page, fail, or refuse deletes.

use crate::model::{FetchError, Record};
use crate::source::{RecordDeleter, RecordSource};
use crate::state::bulk::DeleteOutcome;
use crate::state::engine;
use crate::state::fetch::FetchResponse;
use crate::state::query::QueryState;
use std::collections::BTreeSet;
use tracing::debug;

/// Record service over a `Vec`, answering queries one page at a time.
#[derive(Debug, Clone)]
pub struct MemorySource<R: Record> {
    records: Vec<R>,
    searchable: Vec<String>,
    /// Ids the backend refuses to delete.
    protected: BTreeSet<R::Id>,
    /// Error returned by the next fetch, then cleared.
    fail_next: Option<FetchError>,
    fetches: usize,
}

impl<R: Record + Clone> MemorySource<R> {
    /// Service over `records`, searching `searchable` fields.
    pub fn new(records: Vec<R>, searchable: Vec<String>) -> Self {
        Self {
            records,
            searchable,
            protected: BTreeSet::new(),
            fail_next: None,
            fetches: 0,
        }
    }

    /// Refuse deletes of these ids (reported as failed).
    pub fn protect(mut self, ids: impl IntoIterator<Item = R::Id>) -> Self {
        self.protected.extend(ids);
        self
    }

    /// Make the next fetch fail with `err`.
    pub fn fail_next_fetch(&mut self, err: FetchError) {
        self.fail_next = Some(err);
    }

    /// Records still held, deleted ones excluded.
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Whether a record with `id` is still held.
    pub fn contains(&self, id: &R::Id) -> bool {
        self.records.iter().any(|r| &r.id() == id)
    }

    /// Number of fetches served, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }
}

impl<R: Record + Clone> RecordSource<R> for MemorySource<R> {
    fn fetch(&mut self, query: &QueryState) -> Result<FetchResponse<R>, FetchError> {
        self.fetches += 1;
        if let Some(err) = self.fail_next.take() {
            return Err(err);
        }
        // The backend pages without clamping: past the end is an empty page.
        let matching = engine::apply_indices(&self.records, query, &self.searchable);
        let records = if matching.page_index == query.page_index() {
            matching
                .indices
                .iter()
                .map(|&i| self.records[i].clone())
                .collect()
        } else {
            Vec::new()
        };
        debug!(rows = records.len(), total = matching.total, "memory source served page");
        Ok(FetchResponse {
            records,
            total: matching.total,
        })
    }
}

impl<R: Record + Clone> RecordDeleter<R::Id> for MemorySource<R> {
    fn delete(&mut self, ids: &[R::Id]) -> Result<DeleteOutcome<R::Id>, FetchError> {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for id in ids {
            if self.protected.contains(id) || !self.contains(id) {
                failed.push(id.clone());
            } else {
                succeeded.push(id.clone());
            }
        }
        let removed: BTreeSet<&R::Id> = succeeded.iter().collect();
        self.records.retain(|r| !removed.contains(&r.id()));
        Ok(DeleteOutcome { succeeded, failed })
    }
}
