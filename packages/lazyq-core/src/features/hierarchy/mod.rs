//! Hierarchy axes and dominance reduction

pub mod axes;
pub mod dominance;
pub mod hierarchy_query;

pub use axes::Axis;
pub use dominance::Dominance;
pub(crate) use dominance::reduce_dominated;
pub use hierarchy_query::HierarchyQuery;
