/*
 * lazyq - deferred query engine over lazy sequences
 *
 * Feature-First Layout:
 * - shared/   : Pull contracts and caller-supplied ports (cursor, equaler, hierarchy)
 * - features/ : Vertical slices (sequence → operators → ordering → grouping → hierarchy → async)
 * - config/   : Engine presets and YAML overrides
 *
 * Nothing is realized until a terminal runs; every opened cursor is closed
 * exactly once, whether it is drained, abandoned or fails.
 */

#![allow(clippy::type_complexity)] // Boxed callback and cursor types
#![allow(clippy::new_without_default)] // Builders take required collaborators

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports
// ═══════════════════════════════════════════════════════════════════════════

/// Shared contracts
pub mod shared;

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use errors::{QueryError, Result};
pub use features::async_query::{AsyncHierarchyQuery, AsyncOrderedQuery, AsyncQuery, AsyncSequence, AsyncSharedCursor};
pub use features::grouping::{Group, Lookup};
pub use features::hierarchy::{Axis, Dominance, HierarchyQuery};
pub use features::ordering::OrderedQuery;
pub use features::sequence::{consume_with_options, ConsumeOptions, Query, QueryIter, Sequence, SharedCursor};

/// Everything needed to build and run queries
pub mod prelude {
    pub use crate::config::{EngineConfig, Preset, SortStrategy};
    pub use crate::errors::{QueryError, Result};
    pub use crate::features::async_query::{
        AsyncHierarchyQuery, AsyncOrderedQuery, AsyncQuery, AsyncSequence, AsyncSharedCursor,
    };
    pub use crate::features::grouping::{Group, Lookup};
    pub use crate::features::hierarchy::{Axis, Dominance, HierarchyQuery};
    pub use crate::features::ordering::OrderedQuery;
    pub use crate::features::sequence::{consume_with_options, ConsumeOptions, Query, QueryIter, Sequence, SharedCursor};
    pub use crate::shared::ports::{
        default_equaler, hierarchy_from_fns, natural_order, rc_identity, with_node_identity, AsyncCursor, BoxAsyncCursor,
        BoxCursor, CaseInsensitive, Comparer, Cursor, Equaler, FnEqualer, HierarchyProvider, RcIdentity, SharedEqualer,
        SharedHierarchy,
    };
}
