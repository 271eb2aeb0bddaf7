//! Hierarchy provider port
//!
//! The hierarchy lives in caller-owned nodes. The engine only looks up
//! relationships through this trait and never clones the node graph; node
//! handles (ids, `Rc`s) are what flows through queries.

use std::rc::Rc;

use super::equaler::SharedEqualer;

/// Parent/children lookup over caller-owned nodes
///
/// Traversal assumes no node is its own ancestor. Behavior under cycles is
/// unspecified (ancestor and descendant walks will not terminate).
pub trait HierarchyProvider<T> {
    /// Direct parent, `None` for a root
    fn parent(&self, node: &T) -> Option<T>;

    /// Direct children; vacant `None` slots are skipped by every axis
    fn children(&self, node: &T) -> Vec<Option<T>>;

    /// How two handles are recognized as the same node
    ///
    /// Sibling axes exclude the start and dominance matches ancestors
    /// through this identity. `None` means value equality; providers over
    /// `Rc` handles with structurally equal contents return a pointer
    /// identity ([`RcIdentity`](super::RcIdentity)).
    fn node_identity(&self) -> Option<SharedEqualer<T>> {
        None
    }
}

pub type SharedHierarchy<T> = Rc<dyn HierarchyProvider<T>>;

/// Provider built from a pair of closures
pub struct FnHierarchy<P, C> {
    parent: P,
    children: C,
}

impl<P, C> FnHierarchy<P, C> {
    pub fn new(parent: P, children: C) -> Self {
        Self { parent, children }
    }
}

impl<T, P, C> HierarchyProvider<T> for FnHierarchy<P, C>
where
    P: Fn(&T) -> Option<T>,
    C: Fn(&T) -> Vec<Option<T>>,
{
    fn parent(&self, node: &T) -> Option<T> {
        (self.parent)(node)
    }

    fn children(&self, node: &T) -> Vec<Option<T>> {
        (self.children)(node)
    }
}

/// Convenience constructor returning a shared provider
pub fn hierarchy_from_fns<T, P, C>(parent: P, children: C) -> SharedHierarchy<T>
where
    T: 'static,
    P: Fn(&T) -> Option<T> + 'static,
    C: Fn(&T) -> Vec<Option<T>> + 'static,
{
    Rc::new(FnHierarchy::new(parent, children))
}

/// Provider that delegates lookups and overrides node identity
pub struct IdentifiedHierarchy<T> {
    inner: SharedHierarchy<T>,
    identity: SharedEqualer<T>,
}

impl<T> HierarchyProvider<T> for IdentifiedHierarchy<T> {
    fn parent(&self, node: &T) -> Option<T> {
        self.inner.parent(node)
    }

    fn children(&self, node: &T) -> Vec<Option<T>> {
        self.inner.children(node)
    }

    fn node_identity(&self) -> Option<SharedEqualer<T>> {
        Some(self.identity.clone())
    }
}

/// Wrap `provider` so nodes are told apart by `identity`
pub fn with_node_identity<T: 'static>(provider: SharedHierarchy<T>, identity: SharedEqualer<T>) -> SharedHierarchy<T> {
    Rc::new(IdentifiedHierarchy {
        inner: provider,
        identity,
    })
}
