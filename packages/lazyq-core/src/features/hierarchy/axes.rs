// Hierarchy axes - lazy structural traversals from one start node
//
// Every axis is a Query re-invoked per consumption. Traversal touches the
// provider only as elements are pulled. A `None` start yields nothing, and
// vacant child slots are skipped.

use std::iter;
use std::rc::Rc;

use crate::features::sequence::Query;
use crate::shared::ports::SharedHierarchy;

/// One named traversal relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Ancestors,
    AncestorsAndSelf,
    Descendants,
    DescendantsAndSelf,
    Root,
    Parents,
    Children,
    Siblings,
    SiblingsAndSelf,
    SiblingsBeforeSelf,
    SiblingsAfterSelf,
    SelfAxis,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Ancestors => "ancestors",
            Axis::AncestorsAndSelf => "ancestors_and_self",
            Axis::Descendants => "descendants",
            Axis::DescendantsAndSelf => "descendants_and_self",
            Axis::Root => "root",
            Axis::Parents => "parents",
            Axis::Children => "children",
            Axis::Siblings => "siblings",
            Axis::SiblingsAndSelf => "siblings_and_self",
            Axis::SiblingsBeforeSelf => "siblings_before_self",
            Axis::SiblingsAfterSelf => "siblings_after_self",
            Axis::SelfAxis => "self",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Traverse `axis` from `start`
pub fn traverse<T>(provider: &SharedHierarchy<T>, axis: Axis, start: Option<T>) -> Query<T>
where
    T: Clone + PartialEq + 'static,
{
    match axis {
        Axis::Ancestors => ancestors(provider, start),
        Axis::AncestorsAndSelf => ancestors_and_self(provider, start),
        Axis::Descendants => descendants(provider, start),
        Axis::DescendantsAndSelf => descendants_and_self(provider, start),
        Axis::Root => root(provider, start),
        Axis::Parents => parents(provider, start),
        Axis::Children => children(provider, start),
        Axis::Siblings => siblings(provider, start),
        Axis::SiblingsAndSelf => siblings_and_self(provider, start),
        Axis::SiblingsBeforeSelf => siblings_before_self(provider, start),
        Axis::SiblingsAfterSelf => siblings_after_self(provider, start),
        Axis::SelfAxis => self_axis(start),
    }
}

/// Start node, then each parent up to the root
pub fn ancestors_and_self<T: Clone + 'static>(provider: &SharedHierarchy<T>, start: Option<T>) -> Query<T> {
    let provider = provider.clone();
    Query::from_fn(move || {
        let provider = provider.clone();
        iter::successors(start.clone(), move |node| provider.parent(node))
    })
}

/// Each parent up to the root, nearest first
pub fn ancestors<T: Clone + 'static>(provider: &SharedHierarchy<T>, start: Option<T>) -> Query<T> {
    let provider = provider.clone();
    Query::from_fn(move || {
        let provider = provider.clone();
        iter::successors(start.clone(), move |node| provider.parent(node)).skip(1)
    })
}

/// Depth-first pre-order walk below a node
struct PreOrder<T> {
    provider: SharedHierarchy<T>,
    pending: Option<T>,
    stack: Vec<std::vec::IntoIter<Option<T>>>,
}

impl<T> Iterator for PreOrder<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if let Some(root) = self.pending.take() {
            self.stack.push(self.provider.children(&root).into_iter());
        }
        while let Some(level) = self.stack.last_mut() {
            match level.next() {
                Some(Some(node)) => {
                    self.stack.push(self.provider.children(&node).into_iter());
                    return Some(node);
                }
                Some(None) => continue,
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

pub fn descendants<T: Clone + 'static>(provider: &SharedHierarchy<T>, start: Option<T>) -> Query<T> {
    let provider = provider.clone();
    Query::from_fn(move || PreOrder {
        provider: provider.clone(),
        pending: start.clone(),
        stack: Vec::new(),
    })
}

pub fn descendants_and_self<T: Clone + 'static>(provider: &SharedHierarchy<T>, start: Option<T>) -> Query<T> {
    let provider = provider.clone();
    Query::from_fn(move || {
        start.clone().into_iter().chain(PreOrder {
            provider: provider.clone(),
            pending: start.clone(),
            stack: Vec::new(),
        })
    })
}

/// Topmost ancestor (the start itself when it has no parent)
pub fn root<T: Clone + 'static>(provider: &SharedHierarchy<T>, start: Option<T>) -> Query<T> {
    let provider = provider.clone();
    Query::from_fn(move || {
        let provider = provider.clone();
        let start = start.clone();
        iter::once_with(move || iter::successors(start, |node| provider.parent(node)).last()).flatten()
    })
}

/// Zero or one element: the direct parent
pub fn parents<T: Clone + 'static>(provider: &SharedHierarchy<T>, start: Option<T>) -> Query<T> {
    let provider = provider.clone();
    Query::from_fn(move || {
        let provider = provider.clone();
        let start = start.clone();
        iter::once_with(move || start.and_then(|node| provider.parent(&node))).flatten()
    })
}

pub fn children<T: Clone + 'static>(provider: &SharedHierarchy<T>, start: Option<T>) -> Query<T> {
    let provider = provider.clone();
    Query::from_fn(move || {
        let provider = provider.clone();
        let start = start.clone();
        iter::once_with(move || start.map(|node| provider.children(&node)).unwrap_or_default())
            .flatten()
            .flatten()
    })
}

pub fn self_axis<T: Clone + 'static>(start: Option<T>) -> Query<T> {
    Query::from_fn(move || start.clone())
}

type SiblingFilter<T> = Rc<dyn Fn(Vec<T>, &T) -> Vec<T>>;

/// Children of the start's parent, narrowed by `select`; a root has no siblings
fn sibling_axis<T: Clone + 'static>(provider: &SharedHierarchy<T>, start: Option<T>, select: SiblingFilter<T>) -> Query<T> {
    let provider = provider.clone();
    Query::from_fn(move || {
        let (provider, start, select) = (provider.clone(), start.clone(), select.clone());
        iter::once_with(move || {
            let Some(start) = start else {
                return Vec::new();
            };
            let Some(parent) = provider.parent(&start) else {
                return Vec::new();
            };
            let siblings: Vec<T> = provider.children(&parent).into_iter().flatten().collect();
            select(siblings, &start)
        })
        .flatten()
    })
}

/// Same-node test under the provider's node identity, value equality otherwise
fn same_node<T: PartialEq + 'static>(provider: &SharedHierarchy<T>) -> Rc<dyn Fn(&T, &T) -> bool> {
    match provider.node_identity() {
        Some(identity) => Rc::new(move |a: &T, b: &T| identity.equals(a, b)),
        None => Rc::new(|a: &T, b: &T| a == b),
    }
}

pub fn siblings<T: Clone + PartialEq + 'static>(provider: &SharedHierarchy<T>, start: Option<T>) -> Query<T> {
    let same = same_node(provider);
    sibling_axis(
        provider,
        start,
        Rc::new(move |siblings: Vec<T>, start: &T| siblings.into_iter().filter(|node| !same(node, start)).collect()),
    )
}

pub fn siblings_and_self<T: Clone + PartialEq + 'static>(provider: &SharedHierarchy<T>, start: Option<T>) -> Query<T> {
    sibling_axis(provider, start, Rc::new(|siblings: Vec<T>, _: &T| siblings))
}

/// Siblings before the first occurrence of the start (all of them if it is missing)
pub fn siblings_before_self<T: Clone + PartialEq + 'static>(provider: &SharedHierarchy<T>, start: Option<T>) -> Query<T> {
    let same = same_node(provider);
    sibling_axis(
        provider,
        start,
        Rc::new(move |siblings: Vec<T>, start: &T| siblings.into_iter().take_while(|node| !same(node, start)).collect()),
    )
}

/// Siblings strictly after the first occurrence of the start (none if it is missing)
pub fn siblings_after_self<T: Clone + PartialEq + 'static>(provider: &SharedHierarchy<T>, start: Option<T>) -> Query<T> {
    let same = same_node(provider);
    sibling_axis(
        provider,
        start,
        Rc::new(move |siblings: Vec<T>, start: &T| {
            siblings
                .into_iter()
                .skip_while(|node| !same(node, start))
                .skip(1)
                .collect()
        }),
    )
}
