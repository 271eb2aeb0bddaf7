//! Hierarchy axes and dominance reduction over the fixture tree

mod common;

use common::*;
use lazyq_core::prelude::*;
use pretty_assertions::assert_eq;
use std::rc::Rc;

#[test]
fn test_vertical_axes() {
    assert_eq!(nodes(&["y"]).ancestors().to_vec().unwrap(), vec!["x", "root"]);
    assert_eq!(
        nodes(&["y"]).ancestors_and_self().to_vec().unwrap(),
        vec!["y", "x", "root"]
    );
    assert_eq!(
        nodes(&["root"]).descendants().to_vec().unwrap(),
        vec!["x", "y", "z", "p", "q", "r", "s"]
    );
    assert_eq!(
        nodes(&["p"]).descendants_and_self().to_vec().unwrap(),
        vec!["p", "q", "r"]
    );
    assert_eq!(nodes(&["z", "s"]).root().to_vec().unwrap(), vec!["root", "root"]);
    assert_eq!(nodes(&["root"]).root().to_vec().unwrap(), vec!["root"]);
    assert_eq!(nodes(&["y", "root"]).parents().to_vec().unwrap(), vec!["x"]);
    assert_eq!(nodes(&["p", "z"]).children().to_vec().unwrap(), vec!["q", "r"]);
    assert_eq!(nodes(&["q"]).self_axis().to_vec().unwrap(), vec!["q"]);
}

#[test]
fn test_sibling_axes() {
    assert_eq!(nodes(&["p"]).siblings().to_vec().unwrap(), vec!["x", "s"]);
    assert_eq!(nodes(&["p"]).siblings_and_self().to_vec().unwrap(), vec!["x", "p", "s"]);
    assert_eq!(nodes(&["s"]).siblings_before_self().to_vec().unwrap(), vec!["x", "p"]);
    assert_eq!(nodes(&["x"]).siblings_after_self().to_vec().unwrap(), vec!["p", "s"]);
    assert_eq!(nodes(&["r"]).siblings_after_self().to_vec().unwrap(), Vec::<&str>::new());
}

#[test]
fn test_root_has_no_siblings() {
    let root = nodes(&["root"]);
    assert!(root.siblings().to_vec().unwrap().is_empty());
    assert!(root.siblings_and_self().to_vec().unwrap().is_empty());
    assert!(root.siblings_before_self().to_vec().unwrap().is_empty());
}

#[test]
fn test_axes_chain_and_keep_provider() {
    let cousins = nodes(&["q"]).parents().siblings().children();
    assert_eq!(cousins.to_vec().unwrap(), vec!["y"]);

    let filtered = nodes(&["root"]).children().filter(|n| Ok(*n != "x"));
    let grandchildren = filtered.as_hierarchy().unwrap().children().to_vec().unwrap();
    assert_eq!(grandchildren, vec!["q", "r"]);
}

#[test]
fn test_axis_selection_by_value() {
    let walked = nodes(&["y"]).axis(Axis::AncestorsAndSelf).to_vec().unwrap();
    assert_eq!(walked, vec!["y", "x", "root"]);
    assert_eq!(Axis::SiblingsBeforeSelf.to_string(), Axis::SiblingsBeforeSelf.as_str());
}

#[test]
fn test_untagged_sequence_is_rejected() {
    let err = Query::from_vec(vec!["x"]).as_hierarchy().unwrap_err();
    assert!(matches!(err, QueryError::Argument(_)));
}

#[test]
fn test_dominance_on_chain() {
    let set = nodes(&["x", "y"]);
    assert_eq!(set.top_most().to_vec().unwrap(), vec!["x"]);
    assert_eq!(set.bottom_most().to_vec().unwrap(), vec!["y"]);
}

#[test]
fn test_dominance_keeps_survivor_order() {
    let set = nodes(&["z", "p", "x", "q", "s"]);
    assert_eq!(set.top_most().to_vec().unwrap(), vec!["p", "x", "s"]);
    assert_eq!(set.bottom_most().to_vec().unwrap(), vec!["z", "q", "s"]);
}

#[test]
fn test_dominance_keeps_duplicates() {
    let set = nodes(&["x", "x", "y"]);
    assert_eq!(set.top_most().to_vec().unwrap(), vec!["x", "x"]);
    assert_eq!(set.bottom_most().to_vec().unwrap(), vec!["y"]);
}

#[test]
fn test_dominance_is_deferred() {
    let probe = Probe::new();
    let provider = hierarchy_from_fns(|n: &u64| n.checked_sub(1), |n: &u64| vec![Some(n + 1)]);
    let reduced = finite(4, &probe).with_hierarchy(provider).top_most();
    assert_eq!(probe.pulls(), 0);
    assert_eq!(reduced.to_vec().unwrap(), vec![0]);
    assert_eq!(probe.closes(), 1);
}

// ============================================================================
// Node identity: distinct handles with equal contents
// ============================================================================

#[derive(Debug, PartialEq, Eq, Hash)]
struct Node {
    name: &'static str,
}

/// root -> {a, b}, b -> {c}; `a` and `b` have equal contents
struct LeafTree {
    root: Rc<Node>,
    a: Rc<Node>,
    b: Rc<Node>,
    c: Rc<Node>,
}

impl LeafTree {
    fn new() -> Self {
        Self {
            root: Rc::new(Node { name: "root" }),
            a: Rc::new(Node { name: "leaf" }),
            b: Rc::new(Node { name: "leaf" }),
            c: Rc::new(Node { name: "twig" }),
        }
    }

    fn provider(&self) -> SharedHierarchy<Rc<Node>> {
        let parents = vec![
            (self.a.clone(), self.root.clone()),
            (self.b.clone(), self.root.clone()),
            (self.c.clone(), self.b.clone()),
        ];
        let kids = vec![
            (self.root.clone(), vec![Some(self.a.clone()), Some(self.b.clone())]),
            (self.b.clone(), vec![Some(self.c.clone())]),
        ];
        hierarchy_from_fns(
            move |node: &Rc<Node>| {
                parents
                    .iter()
                    .find(|(child, _)| Rc::ptr_eq(child, node))
                    .map(|(_, parent)| parent.clone())
            },
            move |node: &Rc<Node>| {
                kids.iter()
                    .find(|(parent, _)| Rc::ptr_eq(parent, node))
                    .map(|(_, children)| children.clone())
                    .unwrap_or_default()
            },
        )
    }
}

#[test]
fn test_pointer_identity_keeps_equal_siblings_apart() {
    let tree = LeafTree::new();
    let provider = with_node_identity(tree.provider(), rc_identity());

    let siblings = Query::once(tree.a.clone())
        .with_hierarchy(provider.clone())
        .siblings()
        .to_vec()
        .unwrap();
    assert_eq!(siblings.len(), 1);
    assert!(Rc::ptr_eq(&siblings[0], &tree.b));

    let before = Query::once(tree.b.clone())
        .with_hierarchy(provider)
        .siblings_before_self()
        .to_vec()
        .unwrap();
    assert_eq!(before.len(), 1);
    assert!(Rc::ptr_eq(&before[0], &tree.a));

    // value equality cannot tell the two leaves apart
    let by_value = Query::once(tree.a.clone()).with_hierarchy(tree.provider()).siblings();
    assert_eq!(by_value.count().unwrap(), 0);
}

#[test]
fn test_pointer_identity_in_dominance() {
    let tree = LeafTree::new();
    let provider = with_node_identity(tree.provider(), rc_identity());
    let items = vec![tree.a.clone(), tree.c.clone()];

    let nodes = Query::from_vec(items.clone()).with_hierarchy(provider);
    assert_eq!(nodes.top_most().count().unwrap(), 2);
    assert_eq!(nodes.bottom_most().count().unwrap(), 2);

    // by value, `c` looks like it descends from `a`
    let kept = Query::from_vec(items).with_hierarchy(tree.provider()).top_most().to_vec().unwrap();
    assert_eq!(kept.len(), 1);
    assert!(Rc::ptr_eq(&kept[0], &tree.a));
}
