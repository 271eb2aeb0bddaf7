// Dominance reduction - top-most / bottom-most
//
// Top-most drops every element that descends from another element of the
// set; bottom-most drops every element that is an ancestor of another one.
// Pairs are compared back to front (outer i from the end, inner j from i-1
// down to 0). Strict-ancestor closures are computed on first need and
// memoized per node identity. Survivors keep their relative order, and
// duplicates never dominate each other.

use std::hash::Hash;
use std::iter;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::debug;

use crate::shared::ports::{default_equaler, HierarchyProvider, SharedEqualer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    /// Keep elements with no ancestor in the set
    TopMost,
    /// Keep elements with no descendant in the set
    BottomMost,
}

/// Hash buckets keyed by node identity rather than node value
struct NodeMap<T, V> {
    identity: SharedEqualer<T>,
    buckets: AHashMap<u64, Vec<(T, V)>>,
}

impl<T, V> NodeMap<T, V> {
    fn new(identity: SharedEqualer<T>) -> Self {
        Self {
            identity,
            buckets: AHashMap::new(),
        }
    }

    fn get(&self, node: &T) -> Option<&V> {
        self.buckets
            .get(&self.identity.hash(node))?
            .iter()
            .find(|(candidate, _)| self.identity.equals(candidate, node))
            .map(|(_, value)| value)
    }

    fn contains(&self, node: &T) -> bool {
        self.get(node).is_some()
    }

    /// Caller guarantees `node` is not present yet
    fn insert(&mut self, node: T, value: V) {
        let hash = self.identity.hash(&node);
        self.buckets.entry(hash).or_default().push((node, value));
    }

    fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

struct AncestorClosures<'a, T> {
    provider: &'a dyn HierarchyProvider<T>,
    memo: NodeMap<T, Rc<NodeMap<T, ()>>>,
}

impl<'a, T: Clone> AncestorClosures<'a, T> {
    fn new(provider: &'a dyn HierarchyProvider<T>, identity: SharedEqualer<T>) -> Self {
        Self {
            provider,
            memo: NodeMap::new(identity),
        }
    }

    /// Strict ancestors of `node` (the node itself is not included)
    fn of(&mut self, node: &T) -> Rc<NodeMap<T, ()>> {
        if let Some(closure) = self.memo.get(node) {
            return closure.clone();
        }
        let provider = self.provider;
        let mut closure = NodeMap::new(self.memo.identity.clone());
        for ancestor in iter::successors(provider.parent(node), |current| provider.parent(current)) {
            if !closure.contains(&ancestor) {
                closure.insert(ancestor, ());
            }
        }
        let closure = Rc::new(closure);
        self.memo.insert(node.clone(), closure.clone());
        closure
    }
}

/// Remove dominated elements from `items`
///
/// Nodes are told apart by the provider's node identity, falling back to
/// value equality.
pub(crate) fn reduce_dominated<T>(mut items: Vec<T>, provider: &dyn HierarchyProvider<T>, dominance: Dominance) -> Vec<T>
where
    T: Clone + Eq + Hash + 'static,
{
    let before = items.len();
    let identity = provider.node_identity().unwrap_or_else(default_equaler);
    let mut closures = AncestorClosures::new(provider, identity);

    let mut i = items.len();
    while i > 0 {
        i -= 1;
        let mut j = i;
        while j > 0 {
            j -= 1;
            // items[i] descends from items[j]
            if closures.of(&items[i]).contains(&items[j]) {
                match dominance {
                    Dominance::TopMost => {
                        items.remove(i);
                        break;
                    }
                    Dominance::BottomMost => {
                        items.remove(j);
                        i -= 1;
                        continue;
                    }
                }
            }
            // items[j] descends from items[i]
            if closures.of(&items[j]).contains(&items[i]) {
                match dominance {
                    Dominance::TopMost => {
                        items.remove(j);
                        i -= 1;
                    }
                    Dominance::BottomMost => {
                        items.remove(i);
                        break;
                    }
                }
            }
        }
    }

    debug!(
        before,
        after = items.len(),
        closures = closures.memo.len(),
        dominance = ?dominance,
        "dominance reduced"
    );
    items
}
