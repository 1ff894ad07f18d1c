//! Record sources and bulk-action collaborators.
//!
//! The controller talks to the outside world only through these traits:
//! - [`RecordSource`] - fetch one page of records for a query (remote mode)
//! - [`RecordDeleter`] - batched delete by id
//! - [`RecordExporter`] - hand a snapshot plus justification to export/audit
//!
//! Built-in implementations:
//! - [`MemorySource`] - an in-memory "backend" that pages with the engine
//! - [`JsonLinesExporter`] - writes snapshots as JSON Lines with an audit line
//! - [`file::load_records`] - reads `DynRecord`s from a JSON Lines file

use crate::model::{ExportFailure, FetchError};
use crate::state::bulk::{DeleteOutcome, ExportJustification};
use crate::state::fetch::FetchResponse;
use crate::state::query::QueryState;

pub mod export;
pub mod file;
pub mod memory;

pub use export::JsonLinesExporter;
pub use file::{load_records, parse_records};
pub use memory::MemorySource;

/// Supplies pages of records for a query.
pub trait RecordSource<R> {
    /// Fetch the page `query` points at, with the total match count.
    fn fetch(&mut self, query: &QueryState) -> Result<FetchResponse<R>, FetchError>;
}

/// Deletes records by id.
pub trait RecordDeleter<Id> {
    /// Delete `ids` in one batch, reporting per-id success.
    ///
    /// `Err` means the whole call failed and nothing was deleted.
    fn delete(&mut self, ids: &[Id]) -> Result<DeleteOutcome<Id>, FetchError>;
}

/// Accepts an export snapshot for formatting and auditing.
pub trait RecordExporter<R> {
    /// Format and audit `records`. `Err` means nothing was exported.
    fn export(
        &mut self,
        records: &[&R],
        justification: &ExportJustification,
    ) -> Result<(), ExportFailure>;
}

impl<R, F> RecordSource<R> for F
where
    F: FnMut(&QueryState) -> Result<FetchResponse<R>, FetchError>,
{
    fn fetch(&mut self, query: &QueryState) -> Result<FetchResponse<R>, FetchError> {
        self(query)
    }
}

impl<Id, F> RecordDeleter<Id> for F
where
    F: FnMut(&[Id]) -> Result<DeleteOutcome<Id>, FetchError>,
{
    fn delete(&mut self, ids: &[Id]) -> Result<DeleteOutcome<Id>, FetchError> {
        self(ids)
    }
}
