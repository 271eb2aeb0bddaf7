//! Feature modules - one vertical slice per query concern
//!
//! - sequence/    - Lazy query type, sources, terminals, resumable consumption
//! - operators/   - Element-wise and structural pipeline stages
//! - ordering/    - Deferred multi-key stable sort
//! - grouping/    - Lookup, group-by and joins
//! - hierarchy/   - Tree axes and top-most/bottom-most reduction
//! - async_query/ - Async mirror of all of the above

pub mod async_query;
pub mod grouping;
pub mod hierarchy;
pub mod operators;
pub mod ordering;
pub mod sequence;
