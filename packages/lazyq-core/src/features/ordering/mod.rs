//! Deferred multi-key sort

pub mod ordered_query;
pub(crate) mod tier;

pub use ordered_query::OrderedQuery;
