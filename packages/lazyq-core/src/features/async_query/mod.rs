//! Async query engine
//!
//! Mirrors the synchronous engine over [`AsyncCursor`](crate::shared::ports::AsyncCursor):
//! the same laziness and close-exactly-once guarantees, with pulls and
//! callbacks that may suspend. Realizing stages (sort, grouping, dominance)
//! materialize asynchronously and then reuse the synchronous algorithms.

pub mod grouping;
pub mod hierarchy;
pub mod operators;
pub mod ordering;
pub mod query;
pub mod resumable;

pub use hierarchy::AsyncHierarchyQuery;
pub use ordering::AsyncOrderedQuery;
pub use query::{AsyncQuery, AsyncSequence};
pub use resumable::AsyncSharedCursor;
