//! Grouping domain types

pub mod group;
pub mod lookup;

pub use group::Group;
pub(crate) use lookup::LookupBuilder;
pub use lookup::Lookup;
