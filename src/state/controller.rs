//! Table controller: one list screen's query, selection, fetches and bulk
//! actions, over either an in-memory or a remote record source.
//!
//! Follows the Elm pattern: every mutator updates state synchronously and
//! returns an [`Effect`] describing any I/O the shell must perform. Local
//! sources never produce effects; remote sources produce
//! [`Effect::Fetch`] whenever the visible page has to be reloaded.

use crate::model::{BulkError, ExportFailure, FetchError, Record, ValidationError};
use crate::source::{RecordDeleter, RecordExporter, RecordSource};
use crate::state::bulk::{
    BulkGateway, Capabilities, DeleteOutcome, DeleteReport, DeleteTicket, ExportReceipt,
    ExportTicket, DEFAULT_MIN_JUSTIFICATION_LEN,
};
use crate::state::engine::{self, PageInfo};
use crate::state::fetch::{
    FetchCoordinator, FetchOutcome, FetchRequest, FetchResponse, FetchStatus, FetchToken,
};
use crate::state::query::{
    FilterValue, QueryState, SortDirection, DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_DEBOUNCE_MS,
};
use crate::state::selection::{PageSelection, SelectionSet};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, warn};

// ===== Options =====

/// Per-screen settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    /// Rows per page when the screen mounts.
    pub page_size: usize,
    /// Fields the search box looks at.
    pub searchable: Vec<String>,
    /// Minimum export justification length, in characters.
    pub min_justification_len: usize,
    /// Keystroke debounce a UI applies before calling `set_search`. The
    /// controller itself never waits.
    pub search_debounce_ms: u64,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            searchable: vec!["name".to_string()],
            min_justification_len: DEFAULT_MIN_JUSTIFICATION_LEN,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
        }
    }
}

impl TableOptions {
    /// Search these fields instead.
    pub fn with_searchable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Mount with this page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

// ===== Effect =====

/// I/O requested by a state transition.
///
/// Local data never produces [`Effect::Fetch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Nothing to do.
    None,
    /// Run this fetch and feed the result to
    /// [`TableController::apply_fetch`].
    Fetch(FetchRequest),
}

impl Effect {
    /// Whether there is nothing to do.
    pub fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }
}

// ===== Data =====

#[derive(Debug)]
enum Data<R: Record> {
    /// The full record set lives here; the engine runs locally.
    Local(Vec<R>),
    /// Only the current page lives here; the backend runs the query.
    Remote {
        page: Vec<R>,
        /// Copies of selected rows, taken while they were on a page, so an
        /// export can cover selections made across pages.
        picked: BTreeMap<R::Id, R>,
    },
}

// ===== TableController =====

/// Tabular data controller for one list screen.
///
/// Records must be `Clone`: a remote table keeps a copy of every selected row
/// so bulk export still sees rows whose page is no longer loaded.
#[derive(Debug)]
pub struct TableController<R: Record> {
    searchable: Vec<String>,
    search_debounce: Duration,
    query: QueryState,
    selection: SelectionSet<R::Id>,
    fetch: FetchCoordinator,
    bulk: BulkGateway,
    data: Data<R>,
    /// Positions in `data` of the visible rows, in display order.
    visible: Vec<usize>,
    total: usize,
}

impl<R: Record + Clone> TableController<R> {
    fn with_data(data: Data<R>, options: TableOptions) -> Self {
        Self {
            searchable: options.searchable,
            search_debounce: Duration::from_millis(options.search_debounce_ms),
            query: QueryState::new(options.page_size),
            selection: SelectionSet::new(),
            fetch: FetchCoordinator::new(),
            bulk: BulkGateway::new(options.min_justification_len),
            data,
            visible: Vec::new(),
            total: 0,
        }
    }

    /// Controller over a fully materialized collection. The first page is
    /// computed immediately.
    pub fn local(records: Vec<R>, options: TableOptions) -> Self {
        let mut controller = Self::with_data(Data::Local(records), options);
        controller.recompute();
        controller
    }

    /// Controller over a paged remote source. Starts empty; call
    /// [`refresh`](Self::refresh) to issue the first fetch.
    pub fn remote(options: TableOptions) -> Self {
        Self::with_data(
            Data::Remote {
                page: Vec::new(),
                picked: BTreeMap::new(),
            },
            options,
        )
    }

    /// Whether the backend runs the query.
    pub fn is_remote(&self) -> bool {
        matches!(self.data, Data::Remote { .. })
    }

    // ===== Read side =====

    fn records(&self) -> &[R] {
        match &self.data {
            Data::Local(records) | Data::Remote { page: records, .. } => records,
        }
    }

    /// Rows on the current page, in display order.
    pub fn rows(&self) -> Vec<&R> {
        let records = self.records();
        self.visible.iter().map(|&i| &records[i]).collect()
    }

    /// Ids of the rows on the current page.
    pub fn visible_ids(&self) -> Vec<R::Id> {
        let records = self.records();
        self.visible.iter().map(|&i| records[i].id()).collect()
    }

    /// Matching records across all pages.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Footer numbers for the current page.
    pub fn page_info(&self) -> PageInfo {
        PageInfo::new(self.query.page_index(), self.query.page_size(), self.total)
    }

    /// Current query.
    pub fn query(&self) -> &QueryState {
        &self.query
    }

    /// Current selection, across pages.
    pub fn selection(&self) -> &SelectionSet<R::Id> {
        &self.selection
    }

    /// Selected ids in ascending order.
    pub fn selected_ids(&self) -> Vec<R::Id> {
        self.selection.selected_ids()
    }

    /// Whether `id` is selected.
    pub fn is_selected(&self, id: &R::Id) -> bool {
        self.selection.is_selected(id)
    }

    /// Header checkbox state for the current page.
    pub fn page_selection(&self) -> PageSelection {
        self.selection.page_state(&self.visible_ids())
    }

    /// Loading/error status of remote fetches. Always idle for local data.
    pub fn status(&self) -> &FetchStatus {
        self.fetch.status()
    }

    /// Whether a bulk action is running.
    pub fn is_busy(&self) -> bool {
        self.bulk.is_busy()
    }

    /// How long a UI should wait after the last keystroke before calling
    /// [`set_search`](Self::set_search).
    pub fn search_debounce(&self) -> Duration {
        self.search_debounce
    }

    // ===== Recompute / fetch =====

    /// Recompute the local view and write back the clamped page index.
    fn recompute(&mut self) {
        let Data::Local(records) = &self.data else {
            return;
        };
        let page = engine::apply_indices(records, &self.query, &self.searchable);
        self.visible = page.indices;
        self.total = page.total;
        self.query.clamp_page(self.total);
        debug!(
            total = self.total,
            page = self.query.page_index(),
            rows = self.visible.len(),
            "view recomputed"
        );
    }

    /// Bring the view in line with the query: recompute locally, or issue a
    /// fetch for remote data.
    pub fn refresh(&mut self) -> Effect {
        match self.data {
            Data::Local(_) => {
                self.recompute();
                Effect::None
            }
            Data::Remote { .. } => Effect::Fetch(FetchRequest {
                token: self.fetch.begin(),
                query: self.query.clone(),
            }),
        }
    }

    /// Re-issue the current query after an error. Never automatic.
    pub fn retry(&mut self) -> Effect {
        self.refresh()
    }

    fn refresh_if(&mut self, changed: bool) -> Effect {
        if changed {
            self.refresh()
        } else {
            Effect::None
        }
    }

    /// Feed a remote response back in.
    ///
    /// Stale responses are dropped silently. If the applied total leaves the
    /// current page past the end, the page is clamped and a follow-up fetch
    /// is returned.
    pub fn apply_fetch(
        &mut self,
        token: FetchToken,
        result: Result<FetchResponse<R>, FetchError>,
    ) -> Result<Effect, FetchError> {
        match self.fetch.complete(token, result) {
            FetchOutcome::Discarded => Ok(Effect::None),
            FetchOutcome::Failed(err) => Err(err),
            FetchOutcome::Applied(response) => {
                let Data::Remote { page, picked } = &mut self.data else {
                    return Ok(Effect::None);
                };
                *page = response.records;
                // A backend that ignores the page size still shows one page.
                page.truncate(self.query.page_size());
                for record in page.iter() {
                    if let Some(copy) = picked.get_mut(&record.id()) {
                        *copy = record.clone();
                    }
                }
                self.visible = (0..page.len()).collect();
                self.total = response.total;
                if self.query.clamp_page(self.total) {
                    return Ok(self.refresh());
                }
                Ok(Effect::None)
            }
        }
    }

    /// Replace the local collection (the source reloaded). Selected ids that
    /// no longer exist are dropped. No-op for remote data.
    pub fn replace_records(&mut self, records: Vec<R>) {
        let Data::Local(current) = &mut self.data else {
            return;
        };
        *current = records;
        let existing: BTreeSet<R::Id> = current.iter().map(|r| r.id()).collect();
        let dropped = self.selection.retain_existing(|id| existing.contains(id));
        if dropped > 0 {
            debug!(dropped, "selection pruned after reload");
        }
        self.recompute();
    }

    // ===== Query mutators =====

    /// Search for `term` and go back to page 1.
    pub fn set_search(&mut self, term: impl Into<String>) -> Effect {
        let changed = self.query.set_search(term);
        self.refresh_if(changed)
    }

    /// Sort by `field` and go back to page 1.
    pub fn set_sort(&mut self, field: impl Into<String>, direction: SortDirection) -> Effect {
        let changed = self.query.set_sort(field, direction);
        self.refresh_if(changed)
    }

    /// Back to source order.
    pub fn clear_sort(&mut self) -> Effect {
        let changed = self.query.clear_sort();
        self.refresh_if(changed)
    }

    /// Header click: ascending, then descending, then unsorted.
    pub fn toggle_sort(&mut self, field: &str) -> Effect {
        let changed = self.query.toggle_sort(field);
        self.refresh_if(changed)
    }

    /// Constrain `key` and go back to page 1.
    pub fn set_filter(&mut self, key: impl Into<String>, value: FilterValue) -> Effect {
        let changed = self.query.set_filter(key, value);
        self.refresh_if(changed)
    }

    /// Drop the filter on `key`.
    pub fn remove_filter(&mut self, key: &str) -> Effect {
        let changed = self.query.remove_filter(key);
        self.refresh_if(changed)
    }

    /// Drop every filter and the search term. Sort and page size stay.
    pub fn clear_filters(&mut self) -> Effect {
        let changed = self.query.clear_filters();
        self.refresh_if(changed)
    }

    /// Back to the query the screen mounted with.
    pub fn reset_query(&mut self) -> Effect {
        let changed = self.query.reset();
        self.refresh_if(changed)
    }

    /// Jump to a 1-based page. Zero is rejected.
    pub fn set_page(&mut self, index: usize) -> Result<Effect, ValidationError> {
        let changed = self.query.set_page(index)?;
        Ok(self.refresh_if(changed))
    }

    /// Change rows per page. Zero is rejected.
    pub fn set_page_size(&mut self, size: usize) -> Result<Effect, ValidationError> {
        let changed = self.query.set_page_size(size)?;
        Ok(self.refresh_if(changed))
    }

    /// Next page; no-op on the last one.
    pub fn next_page(&mut self) -> Effect {
        let info = self.page_info();
        if !info.has_next() {
            return Effect::None;
        }
        self.set_page(info.page_index + 1).unwrap_or(Effect::None)
    }

    /// Previous page; no-op on the first one.
    pub fn previous_page(&mut self) -> Effect {
        let info = self.page_info();
        if !info.has_previous() {
            return Effect::None;
        }
        self.set_page(info.page_index - 1).unwrap_or(Effect::None)
    }

    // ===== Selection =====

    fn is_known(&self, id: &R::Id) -> bool {
        self.records().iter().any(|r| &r.id() == id)
    }

    /// Keep remote row copies in step with the selection: copy rows among
    /// `touched` that are now selected, drop copies of deselected ids.
    fn sync_picked(&mut self, touched: &[R::Id]) {
        let Data::Remote { page, picked } = &mut self.data else {
            return;
        };
        for record in page.iter() {
            let id = record.id();
            if self.selection.is_selected(&id) && touched.contains(&id) {
                picked.insert(id, record.clone());
            }
        }
        picked.retain(|id, _| self.selection.is_selected(id));
    }

    /// Toggle one row. Ids the controller does not know (not in the local
    /// collection, or not on the current remote page) are ignored.
    /// Returns whether the id is selected afterwards.
    pub fn toggle(&mut self, id: R::Id) -> bool {
        if !self.is_selected(&id) && !self.is_known(&id) {
            debug!(?id, "ignoring toggle of unknown id");
            return false;
        }
        let selected = self.selection.toggle(id.clone());
        self.sync_picked(&[id]);
        selected
    }

    /// "Select page" checkbox over the rows currently visible.
    pub fn toggle_page(&mut self) {
        let visible = self.visible_ids();
        self.selection.toggle_all(&visible);
        self.sync_picked(&visible);
    }

    /// Deselect everything, on every page.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.sync_picked(&[]);
    }

    // ===== Bulk delete =====

    /// Start deleting the selection. The ticket goes back to [`finish_delete`](Self::finish_delete).
    pub fn begin_delete(&mut self, caps: &Capabilities) -> Result<DeleteTicket<R::Id>, BulkError> {
        self.bulk.begin_delete(&self.selection, caps)
    }

    /// Apply the backend's answer: removed ids leave the source and the
    /// selection, failed ids stay selected. Remote data gets a refetch so the
    /// page refills.
    pub fn finish_delete(
        &mut self,
        ticket: DeleteTicket<R::Id>,
        result: Result<DeleteOutcome<R::Id>, FetchError>,
    ) -> Result<(DeleteReport<R::Id>, Effect), BulkError> {
        let report = self.bulk.finish_delete(ticket, result)?;
        if report.removed.is_empty() {
            return Ok((report, Effect::None));
        }

        let removed: BTreeSet<&R::Id> = report.removed.iter().collect();
        self.selection.prune(report.removed.iter());
        let effect = match &mut self.data {
            Data::Local(records) => {
                records.retain(|r| !removed.contains(&r.id()));
                self.recompute();
                Effect::None
            }
            Data::Remote { page, picked } => {
                picked.retain(|id, _| !removed.contains(id));
                let before = page.len();
                page.retain(|r| !removed.contains(&r.id()));
                self.visible = (0..page.len()).collect();
                self.total = self.total.saturating_sub(before - page.len());
                self.refresh()
            }
        };
        Ok((report, effect))
    }

    // ===== Bulk export =====

    /// Start exporting the selection. Hand [`export_snapshot`](Self::export_snapshot) to the
    /// exporter, then pass the ticket to [`finish_export`](Self::finish_export).
    pub fn begin_export(
        &mut self,
        justification: &str,
        caps: &Capabilities,
    ) -> Result<ExportTicket<R::Id>, BulkError> {
        self.bulk.begin_export(&self.selection, justification, caps)
    }

    /// Records to hand to the export collaborator, in id order.
    ///
    /// Remote rows come from the copies taken when they were selected, so the
    /// snapshot covers the whole selection whichever page is loaded.
    pub fn export_snapshot(&self, ticket: &ExportTicket<R::Id>) -> Vec<&R> {
        match &self.data {
            Data::Local(records) => {
                let wanted: BTreeSet<&R::Id> = ticket.ids().iter().collect();
                let mut rows: Vec<&R> = records
                    .iter()
                    .filter(|r| wanted.contains(&r.id()))
                    .collect();
                rows.sort_by_key(|r| r.id());
                rows
            }
            Data::Remote { picked, .. } => {
                let rows: Vec<&R> = ticket.ids().iter().filter_map(|id| picked.get(id)).collect();
                if rows.len() < ticket.ids().len() {
                    warn!(
                        selected = ticket.ids().len(),
                        available = rows.len(),
                        "export snapshot is missing selected rows"
                    );
                }
                rows
            }
        }
    }

    /// Record the exporter's answer and release the in-flight guard.
    pub fn finish_export(
        &mut self,
        ticket: ExportTicket<R::Id>,
        exported: usize,
        result: Result<(), ExportFailure>,
    ) -> Result<ExportReceipt, BulkError> {
        self.bulk.finish_export(ticket, exported, result)
    }

    // ===== Synchronous shell =====

    /// Execute an effect against `source`, following up clamping refetches
    /// until the view settles.
    pub fn run_effect<S>(&mut self, mut effect: Effect, source: &mut S) -> Result<(), FetchError>
    where
        S: RecordSource<R> + ?Sized,
    {
        while let Effect::Fetch(request) = effect {
            let result = source.fetch(&request.query);
            effect = self.apply_fetch(request.token, result)?;
        }
        Ok(())
    }

    /// Refresh and, for remote data, fetch synchronously.
    pub fn refresh_with<S>(&mut self, source: &mut S) -> Result<(), FetchError>
    where
        S: RecordSource<R> + ?Sized,
    {
        let effect = self.refresh();
        self.run_effect(effect, source)
    }

    /// Delete the selection through `deleter` in one call. A follow-up fetch
    /// for remote data is returned for the caller to run.
    pub fn delete_selected<D>(
        &mut self,
        deleter: &mut D,
        caps: &Capabilities,
    ) -> Result<(DeleteReport<R::Id>, Effect), BulkError>
    where
        D: RecordDeleter<R::Id> + ?Sized,
    {
        let ticket = self.begin_delete(caps)?;
        let result = deleter.delete(ticket.ids());
        self.finish_delete(ticket, result)
    }

    /// Export the selection through `exporter` in one call.
    pub fn export_selected<E>(
        &mut self,
        exporter: &mut E,
        justification: &str,
        caps: &Capabilities,
    ) -> Result<ExportReceipt, BulkError>
    where
        E: RecordExporter<R> + ?Sized,
    {
        let ticket = self.begin_export(justification, caps)?;
        let (exported, result) = {
            let snapshot = self.export_snapshot(&ticket);
            let result = exporter.export(&snapshot, ticket.justification());
            (snapshot.len(), result)
        };
        self.finish_export(ticket, exported, result)
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
