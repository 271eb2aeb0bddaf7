// HierarchyQuery - a query bound to a hierarchy provider
//
// Axis methods flat-map the axis over every element and keep the provider,
// so traversals chain (`children().descendants()`). Plain operators reached
// through Deref return a Query that still carries the provider; call
// `as_hierarchy` on it to get the axis methods back.

use std::hash::Hash;
use std::ops::Deref;

use super::axes::{traverse, Axis};
use super::dominance::{reduce_dominated, Dominance};
use crate::errors::{QueryError, Result};
use crate::features::sequence::sources::{materialize, DeferredCursor};
use crate::features::sequence::{Query, Sequence};
use crate::shared::ports::{BoxCursor, SharedHierarchy};

pub struct HierarchyQuery<T> {
    query: Query<T>,
    provider: SharedHierarchy<T>,
}

impl<T> Clone for HierarchyQuery<T> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            provider: self.provider.clone(),
        }
    }
}

impl<T> std::fmt::Debug for HierarchyQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchyQuery")
            .field("query", &self.query)
            .finish()
    }
}

impl<T: 'static> HierarchyQuery<T> {
    pub(crate) fn new(query: Query<T>, provider: SharedHierarchy<T>) -> Self {
        let query = query.tagged(Some(provider.clone()));
        Self { query, provider }
    }

    pub fn provider(&self) -> &SharedHierarchy<T> {
        &self.provider
    }

    pub fn into_query(self) -> Query<T> {
        self.query
    }
}

impl<T: Clone + PartialEq + 'static> HierarchyQuery<T> {
    /// Flat-map `axis` over every element
    pub fn axis(&self, axis: Axis) -> HierarchyQuery<T> {
        let provider = self.provider.clone();
        let expanded = self
            .query
            .flat_map(move |node| Ok(traverse(&provider, axis, Some(node))));
        HierarchyQuery::new(expanded, self.provider.clone())
    }

    pub fn ancestors(&self) -> HierarchyQuery<T> {
        self.axis(Axis::Ancestors)
    }

    pub fn ancestors_and_self(&self) -> HierarchyQuery<T> {
        self.axis(Axis::AncestorsAndSelf)
    }

    pub fn descendants(&self) -> HierarchyQuery<T> {
        self.axis(Axis::Descendants)
    }

    pub fn descendants_and_self(&self) -> HierarchyQuery<T> {
        self.axis(Axis::DescendantsAndSelf)
    }

    pub fn root(&self) -> HierarchyQuery<T> {
        self.axis(Axis::Root)
    }

    pub fn parents(&self) -> HierarchyQuery<T> {
        self.axis(Axis::Parents)
    }

    pub fn children(&self) -> HierarchyQuery<T> {
        self.axis(Axis::Children)
    }

    pub fn siblings(&self) -> HierarchyQuery<T> {
        self.axis(Axis::Siblings)
    }

    pub fn siblings_and_self(&self) -> HierarchyQuery<T> {
        self.axis(Axis::SiblingsAndSelf)
    }

    pub fn siblings_before_self(&self) -> HierarchyQuery<T> {
        self.axis(Axis::SiblingsBeforeSelf)
    }

    pub fn siblings_after_self(&self) -> HierarchyQuery<T> {
        self.axis(Axis::SiblingsAfterSelf)
    }

    pub fn self_axis(&self) -> HierarchyQuery<T> {
        self.axis(Axis::SelfAxis)
    }
}

impl<T: Clone + Eq + Hash + 'static> HierarchyQuery<T> {
    /// Elements with no ancestor in the sequence; realized on first pull
    pub fn top_most(&self) -> HierarchyQuery<T> {
        self.reduce(Dominance::TopMost)
    }

    /// Elements with no descendant in the sequence; realized on first pull
    pub fn bottom_most(&self) -> HierarchyQuery<T> {
        self.reduce(Dominance::BottomMost)
    }

    fn reduce(&self, dominance: Dominance) -> HierarchyQuery<T> {
        let source = self.query.clone();
        let provider = self.provider.clone();
        let reduced = Query::from_factory(move || {
            let (source, provider) = (source.clone(), provider.clone());
            Box::new(DeferredCursor::new(Box::new(move || {
                let items = materialize(source.open())?;
                Ok(reduce_dominated(items, &*provider, dominance))
            }))) as BoxCursor<T>
        });
        HierarchyQuery::new(reduced, self.provider.clone())
    }
}

impl<T> Deref for HierarchyQuery<T> {
    type Target = Query<T>;

    fn deref(&self) -> &Query<T> {
        &self.query
    }
}

impl<T: 'static> Sequence<T> for HierarchyQuery<T> {
    fn to_query(&self) -> Query<T> {
        self.query.clone()
    }
}

impl<T: 'static> Query<T> {
    /// Attach `provider`, enabling axis traversal
    pub fn with_hierarchy(&self, provider: SharedHierarchy<T>) -> HierarchyQuery<T> {
        HierarchyQuery::new(self.clone(), provider)
    }

    /// Axis view of a query that already carries a provider
    pub fn as_hierarchy(&self) -> Result<HierarchyQuery<T>> {
        match self.hierarchy() {
            Some(provider) => Ok(HierarchyQuery::new(self.clone(), provider.clone())),
            None => Err(QueryError::argument(
                "sequence has no hierarchy provider; attach one with with_hierarchy",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ports::hierarchy_from_fns;
    use pretty_assertions::assert_eq;

    // 0 -> {1 -> {3, 4}, 2 -> {5}}
    fn tree() -> SharedHierarchy<u8> {
        hierarchy_from_fns(
            |node: &u8| match node {
                1 | 2 => Some(0),
                3 | 4 => Some(1),
                5 => Some(2),
                _ => None,
            },
            |node: &u8| match node {
                0 => vec![Some(1), Some(2)],
                1 => vec![Some(3), Some(4)],
                2 => vec![Some(5)],
                _ => Vec::new(),
            },
        )
    }

    #[test]
    fn test_axes_flat_map_and_chain() {
        let nodes = Query::from_vec(vec![1u8, 2]).with_hierarchy(tree());
        assert_eq!(nodes.children().to_vec().unwrap(), vec![3, 4, 5]);
        assert_eq!(nodes.parents().to_vec().unwrap(), vec![0, 0]);
        assert_eq!(
            Query::once(0u8).with_hierarchy(tree()).children().descendants_and_self().to_vec().unwrap(),
            vec![1, 3, 4, 2, 5]
        );
    }

    #[test]
    fn test_axis_output_keeps_provider() {
        let nodes = Query::once(3u8).with_hierarchy(tree());
        let filtered = nodes.ancestors().filter(|n| Ok(*n != 0));
        assert_eq!(filtered.as_hierarchy().unwrap().siblings().to_vec().unwrap(), vec![2]);
    }

    #[test]
    fn test_untagged_query_rejects_axes() {
        let plain = Query::from_vec(vec![1u8]);
        assert!(matches!(plain.as_hierarchy(), Err(QueryError::Argument(_))));
        assert!(!plain.map(Ok).is_tagged());
    }

    #[test]
    fn test_dominance_on_query() {
        let nodes = Query::from_vec(vec![4u8, 1, 5, 0]).with_hierarchy(tree());
        assert_eq!(nodes.top_most().to_vec().unwrap(), vec![0]);
        assert_eq!(nodes.bottom_most().to_vec().unwrap(), vec![4, 5]);
        assert!(nodes.top_most().is_tagged());
    }
}
