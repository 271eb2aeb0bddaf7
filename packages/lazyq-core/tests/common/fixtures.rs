//! Tree fixtures
//!
//! ```text
//! root
//! ├── x
//! │   └── y
//! │       └── z
//! ├── p
//! │   ├── q
//! │   └── r
//! └── s
//! ```

use lazyq_core::prelude::*;

const EDGES: &[(&str, &str)] = &[
    ("x", "root"),
    ("y", "x"),
    ("z", "y"),
    ("p", "root"),
    ("q", "p"),
    ("r", "p"),
    ("s", "root"),
];

pub fn parent_of(node: &str) -> Option<&'static str> {
    EDGES
        .iter()
        .find(|(child, _)| *child == node)
        .map(|(_, parent)| *parent)
}

pub fn children_of(node: &str) -> Vec<&'static str> {
    EDGES
        .iter()
        .filter(|(_, parent)| *parent == node)
        .map(|(child, _)| *child)
        .collect()
}

pub fn tree() -> SharedHierarchy<&'static str> {
    hierarchy_from_fns(
        |node: &&'static str| parent_of(node),
        |node: &&'static str| children_of(node).into_iter().map(Some).collect(),
    )
}

/// Tagged query over `nodes`
pub fn nodes(nodes: &[&'static str]) -> HierarchyQuery<&'static str> {
    Query::from_vec(nodes.to_vec()).with_hierarchy(tree())
}

/// Record used by the ordering tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub a: i32,
    pub b: i32,
    pub tag: &'static str,
}

pub fn row(a: i32, b: i32, tag: &'static str) -> Row {
    Row { a, b, tag }
}
