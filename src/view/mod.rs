//! Plain-text rendering of a table page (impure shell).
//!
//! The controller never formats output; this module turns its read side
//! into the aligned text the binary prints.

pub mod table;

pub use table::{dyn_columns, footer, render_table};
