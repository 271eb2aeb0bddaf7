// Query - the composable lazy sequence
//
// A Query is a cursor factory: each consumption opens a fresh cursor, and
// composing operators only wraps factories, so building a pipeline never
// pulls an element. A Query may carry a hierarchy provider ("tag") that
// element-preserving operators re-attach to their output.

use std::rc::Rc;

use super::sources::{EmptyCursor, IterCursor, RepeatCursor, ResultIterCursor, VecCursor};
use crate::errors::Result;
use crate::shared::ports::{BoxCursor, Cursor, SharedHierarchy};

/// Composable, re-consumable lazy sequence
pub struct Query<T> {
    factory: Rc<dyn Fn() -> BoxCursor<T>>,
    hierarchy: Option<SharedHierarchy<T>>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            hierarchy: self.hierarchy.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("tagged", &self.hierarchy.is_some())
            .finish()
    }
}

impl<T: 'static> Query<T> {
    pub(crate) fn from_factory(factory: impl Fn() -> BoxCursor<T> + 'static) -> Self {
        Self {
            factory: Rc::new(factory),
            hierarchy: None,
        }
    }

    /// Query over caller-authored cursors, one per consumption
    ///
    /// The engine calls `close` on each cursor exactly once.
    pub fn from_cursor_fn<C, F>(factory: F) -> Self
    where
        C: Cursor<Item = T> + 'static,
        F: Fn() -> C + 'static,
    {
        Self::from_factory(move || Box::new(factory()) as BoxCursor<T>)
    }

    /// Query over a generator-like closure, re-invoked per consumption
    ///
    /// ```
    /// use lazyq_core::prelude::*;
    ///
    /// let evens = Query::from_fn(|| (0..).step_by(2)).take(3);
    /// assert_eq!(evens.to_vec().unwrap(), vec![0, 2, 4]);
    /// ```
    pub fn from_fn<I, F>(generator: F) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
        F: Fn() -> I + 'static,
    {
        Self::from_factory(move || Box::new(IterCursor::new(generator().into_iter())) as BoxCursor<T>)
    }

    /// Query over a fallible producer; the first `Err` aborts the pull chain
    pub fn from_results<I, F>(generator: F) -> Self
    where
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
        F: Fn() -> I + 'static,
    {
        Self::from_factory(move || {
            Box::new(ResultIterCursor::new(generator().into_iter())) as BoxCursor<T>
        })
    }

    pub fn empty() -> Self {
        Self::from_factory(|| Box::new(EmptyCursor::new()) as BoxCursor<T>)
    }

    /// Open one consumption
    pub fn open(&self) -> BoxCursor<T> {
        (self.factory)()
    }

    /// Hierarchy provider attached to this sequence, if any
    pub fn hierarchy(&self) -> Option<&SharedHierarchy<T>> {
        self.hierarchy.as_ref()
    }

    pub fn is_tagged(&self) -> bool {
        self.hierarchy.is_some()
    }

    pub(crate) fn tagged(mut self, hierarchy: Option<SharedHierarchy<T>>) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    /// Re-attach this query's provider to an element-preserving derivative
    pub(crate) fn flow(&self, derived: Query<T>) -> Query<T> {
        derived.tagged(self.hierarchy.clone())
    }
}

impl<T: Clone + 'static> Query<T> {
    /// Query over an owned vector (`of`/`from`)
    pub fn from_vec(items: Vec<T>) -> Self {
        Self::from_shared(Rc::new(items))
    }

    /// Query over a shared buffer without copying it
    pub fn from_shared(items: Rc<Vec<T>>) -> Self {
        Self::from_factory(move || Box::new(VecCursor::new(items.clone())) as BoxCursor<T>)
    }

    pub fn once(item: T) -> Self {
        Self::repeat(item, 1)
    }

    pub fn repeat(item: T, count: usize) -> Self {
        Self::from_factory(move || Box::new(RepeatCursor::new(item.clone(), count)) as BoxCursor<T>)
    }
}

impl<T: Clone + 'static> FromIterator<T> for Query<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Clone + 'static> From<Vec<T>> for Query<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}
