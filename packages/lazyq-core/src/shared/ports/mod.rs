//! Ports - contracts consumed from callers

pub mod cursor;
pub mod equaler;
pub mod hierarchy;
pub mod selectors;

pub use cursor::{AsyncCursor, AsyncUpstream, BoxAsyncCursor, BoxCursor, Cursor, Upstream};
pub use equaler::{
    default_equaler, rc_identity, CaseInsensitive, DefaultEqualer, Equaler, FnEqualer, RcIdentity, SharedEqualer,
};
pub use hierarchy::{
    hierarchy_from_fns, with_node_identity, FnHierarchy, HierarchyProvider, IdentifiedHierarchy, SharedHierarchy,
};
pub use selectors::{
    natural_order, AsyncPredicate, AsyncProjection, AsyncSelector, Comparer, Predicate, Projection, Selector,
};
