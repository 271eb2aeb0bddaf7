// AsyncHierarchyQuery - axes and dominance over an async sequence
//
// The provider stays synchronous: axes are expanded with the synchronous
// traversal per element, and dominance runs the shared reduction after an
// async materialization.

use std::hash::Hash;
use std::ops::Deref;

use futures::future::FutureExt;

use super::query::{materialize_async, AsyncQuery, AsyncSequence};
use crate::errors::{QueryError, Result};
use crate::features::hierarchy::axes::traverse;
use crate::features::hierarchy::{reduce_dominated, Axis, Dominance};
use crate::shared::ports::SharedHierarchy;

pub struct AsyncHierarchyQuery<T> {
    query: AsyncQuery<T>,
    provider: SharedHierarchy<T>,
}

impl<T> Clone for AsyncHierarchyQuery<T> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            provider: self.provider.clone(),
        }
    }
}

impl<T: 'static> AsyncHierarchyQuery<T> {
    fn new(query: AsyncQuery<T>, provider: SharedHierarchy<T>) -> Self {
        let query = query.tagged(Some(provider.clone()));
        Self { query, provider }
    }

    pub fn provider(&self) -> &SharedHierarchy<T> {
        &self.provider
    }

    pub fn into_query(self) -> AsyncQuery<T> {
        self.query
    }
}

impl<T: Clone + PartialEq + 'static> AsyncHierarchyQuery<T> {
    pub fn axis(&self, axis: Axis) -> AsyncHierarchyQuery<T> {
        let provider = self.provider.clone();
        let expanded = self
            .query
            .flat_map_query(move |node| Ok(AsyncQuery::from_query(&traverse(&provider, axis, Some(node)))));
        AsyncHierarchyQuery::new(expanded, self.provider.clone())
    }

    pub fn ancestors(&self) -> AsyncHierarchyQuery<T> {
        self.axis(Axis::Ancestors)
    }

    pub fn ancestors_and_self(&self) -> AsyncHierarchyQuery<T> {
        self.axis(Axis::AncestorsAndSelf)
    }

    pub fn descendants(&self) -> AsyncHierarchyQuery<T> {
        self.axis(Axis::Descendants)
    }

    pub fn descendants_and_self(&self) -> AsyncHierarchyQuery<T> {
        self.axis(Axis::DescendantsAndSelf)
    }

    pub fn root(&self) -> AsyncHierarchyQuery<T> {
        self.axis(Axis::Root)
    }

    pub fn parents(&self) -> AsyncHierarchyQuery<T> {
        self.axis(Axis::Parents)
    }

    pub fn children(&self) -> AsyncHierarchyQuery<T> {
        self.axis(Axis::Children)
    }

    pub fn siblings(&self) -> AsyncHierarchyQuery<T> {
        self.axis(Axis::Siblings)
    }

    pub fn siblings_and_self(&self) -> AsyncHierarchyQuery<T> {
        self.axis(Axis::SiblingsAndSelf)
    }

    pub fn siblings_before_self(&self) -> AsyncHierarchyQuery<T> {
        self.axis(Axis::SiblingsBeforeSelf)
    }

    pub fn siblings_after_self(&self) -> AsyncHierarchyQuery<T> {
        self.axis(Axis::SiblingsAfterSelf)
    }

    pub fn self_axis(&self) -> AsyncHierarchyQuery<T> {
        self.axis(Axis::SelfAxis)
    }
}

impl<T: Clone + Eq + Hash + 'static> AsyncHierarchyQuery<T> {
    pub fn top_most(&self) -> AsyncHierarchyQuery<T> {
        self.reduce(Dominance::TopMost)
    }

    pub fn bottom_most(&self) -> AsyncHierarchyQuery<T> {
        self.reduce(Dominance::BottomMost)
    }

    fn reduce(&self, dominance: Dominance) -> AsyncHierarchyQuery<T> {
        let source = self.query.clone();
        let provider = self.provider.clone();
        let reduced = AsyncQuery::deferred(move || {
            let (source, provider) = (source.clone(), provider.clone());
            async move {
                let items = materialize_async(source.open()).await?;
                Ok(reduce_dominated(items, &*provider, dominance))
            }
            .boxed_local()
        });
        AsyncHierarchyQuery::new(reduced, self.provider.clone())
    }
}

impl<T> Deref for AsyncHierarchyQuery<T> {
    type Target = AsyncQuery<T>;

    fn deref(&self) -> &AsyncQuery<T> {
        &self.query
    }
}

impl<T: 'static> AsyncSequence<T> for AsyncHierarchyQuery<T> {
    fn to_async_query(&self) -> AsyncQuery<T> {
        self.query.clone()
    }
}

impl<T: 'static> AsyncQuery<T> {
    pub fn with_hierarchy(&self, provider: SharedHierarchy<T>) -> AsyncHierarchyQuery<T> {
        AsyncHierarchyQuery::new(self.clone(), provider)
    }

    pub fn as_hierarchy(&self) -> Result<AsyncHierarchyQuery<T>> {
        match self.hierarchy() {
            Some(provider) => Ok(AsyncHierarchyQuery::new(self.clone(), provider.clone())),
            None => Err(QueryError::argument(
                "sequence has no hierarchy provider; attach one with with_hierarchy",
            )),
        }
    }
}
