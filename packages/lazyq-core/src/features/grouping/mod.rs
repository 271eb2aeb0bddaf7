//! Grouping/join engine
//!
//! Everything here is built on one single-pass bucketing step
//! ([`builder::build_groupings`]) producing an insertion-ordered [`Lookup`].

pub(crate) mod builder;
pub mod domain;
pub mod join;

pub(crate) use builder::build_groupings;
pub use domain::{Group, Lookup};
pub(crate) use join::full_join_pairs;
