//! Sequence substrate
//!
//! Lazy query type, source cursors, resumable consumption and the terminal
//! conversions every wrapper shares.

pub mod iter;
pub mod query;
pub mod resumable;
pub(crate) mod sources;
pub mod terminal;

pub use iter::QueryIter;
pub use query::Query;
pub use resumable::{consume_with_options, ConsumeOptions, SharedCursor};
pub use terminal::Sequence;
