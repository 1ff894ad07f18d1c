//! tablectl - tabular data controller
//!
//! Turns a record collection plus a mutable query (search text, column sort,
//! filters, pagination, row selection) into a displayed page of rows, and
//! coordinates bulk delete/export against the selection.
//!
//! Follows a Pure Core / Impure Shell split: `model` and `state` are pure and
//! synchronous; `source`, `view`, `config` and `logging` touch the outside
//! world. Remote I/O is requested through [`state::Effect`] values and fed
//! back in by the caller.

pub mod cli;
pub mod config;
pub mod logging;
pub mod model;
pub mod source;
pub mod state;
pub mod view;
