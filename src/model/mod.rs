//! Domain model types (pure).
//!
//! Records, typed field values and the error taxonomy.

pub mod error;
pub mod record;

// Re-export for convenience
pub use error::{
    AppError, BulkAction, BulkError, ExportFailure, FetchError, InputError, ValidationError,
};
pub use record::{parse_scalar, DynRecord, FieldValue, Record, RecordKey};
