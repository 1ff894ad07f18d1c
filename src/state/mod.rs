//! Table state machine (pure).
//!
//! All state transitions are plain functions over owned data; I/O is
//! described by [`controller::Effect`] and performed by the caller.

pub mod bulk;
pub mod controller;
pub mod engine;
pub mod fetch;
pub mod query;
pub mod selection;

// Re-export for convenience
pub use bulk::{
    BulkGateway, Capabilities, DeleteOutcome, DeleteReport, DeleteTicket, ExportJustification,
    ExportReceipt, ExportTicket,
};
pub use controller::{Effect, TableController, TableOptions};
pub use engine::{PageInfo, PageView};
pub use fetch::{FetchCoordinator, FetchOutcome, FetchRequest, FetchResponse, FetchStatus, FetchToken};
pub use query::{FilterValue, QueryState, SortDirection, SortSpec};
pub use selection::{PageSelection, SelectionSet};
