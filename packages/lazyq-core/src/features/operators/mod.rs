//! Element-wise operators
//!
//! Composition only wraps cursor factories; nothing is pulled until a
//! terminal runs. Element-preserving operators keep the hierarchy tag of
//! their input, element-transforming ones produce an untagged query.

mod adapters;

use std::hash::Hash;
use std::rc::Rc;

use adapters::{
    ChunkCursor, ConcatCursor, DefaultIfEmptyCursor, DistinctCursor, FilterCursor, FlatMapCursor, MapCursor,
    SkipCursor, SkipWhileCursor, TakeCursor, TakeWhileCursor, ZipCursor,
};

use crate::errors::{QueryError, Result};
use crate::features::sequence::sources::{materialize, DeferredCursor};
use crate::features::sequence::Query;
use crate::shared::ports::selectors::selector;
use crate::shared::ports::{BoxCursor, Predicate, Projection};

impl<T: 'static> Query<T> {
    pub fn map<U, F>(&self, f: F) -> Query<U>
    where
        U: 'static,
        F: Fn(T) -> Result<U> + 'static,
    {
        let source = self.clone();
        let project: Projection<T, U> = Rc::new(f);
        Query::from_factory(move || Box::new(MapCursor::new(source.open(), project.clone())) as BoxCursor<U>)
    }

    pub fn filter<P>(&self, predicate: P) -> Query<T>
    where
        P: Fn(&T) -> Result<bool> + 'static,
    {
        let source = self.clone();
        let predicate: Predicate<T> = selector(predicate);
        self.flow(Query::from_factory(move || {
            Box::new(FilterCursor::new(source.open(), predicate.clone())) as BoxCursor<T>
        }))
    }

    /// Expand each element into a query and flatten, in order
    pub fn flat_map<U, F>(&self, f: F) -> Query<U>
    where
        U: 'static,
        F: Fn(T) -> Result<Query<U>> + 'static,
    {
        let source = self.clone();
        let expand: Projection<T, Query<U>> = Rc::new(f);
        Query::from_factory(move || Box::new(FlatMapCursor::new(source.open(), expand.clone())) as BoxCursor<U>)
    }

    pub fn take(&self, count: usize) -> Query<T> {
        let source = self.clone();
        self.flow(Query::from_factory(move || {
            Box::new(TakeCursor::new(source.open(), count)) as BoxCursor<T>
        }))
    }

    pub fn skip(&self, count: usize) -> Query<T> {
        let source = self.clone();
        self.flow(Query::from_factory(move || {
            Box::new(SkipCursor::new(source.open(), count)) as BoxCursor<T>
        }))
    }

    pub fn take_while<P>(&self, predicate: P) -> Query<T>
    where
        P: Fn(&T) -> Result<bool> + 'static,
    {
        let source = self.clone();
        let predicate: Predicate<T> = selector(predicate);
        self.flow(Query::from_factory(move || {
            Box::new(TakeWhileCursor::new(source.open(), predicate.clone())) as BoxCursor<T>
        }))
    }

    pub fn skip_while<P>(&self, predicate: P) -> Query<T>
    where
        P: Fn(&T) -> Result<bool> + 'static,
    {
        let source = self.clone();
        let predicate: Predicate<T> = selector(predicate);
        self.flow(Query::from_factory(move || {
            Box::new(SkipWhileCursor::new(source.open(), predicate.clone())) as BoxCursor<T>
        }))
    }

    /// This sequence followed by `other`; `other` opens only once this one is exhausted
    pub fn concat(&self, other: Query<T>) -> Query<T> {
        let source = self.clone();
        self.flow(Query::from_factory(move || {
            Box::new(ConcatCursor::new(source.open(), other.clone())) as BoxCursor<T>
        }))
    }

    /// Reversed order; realized on first pull
    pub fn reverse(&self) -> Query<T> {
        let source = self.clone();
        self.flow(Query::from_factory(move || {
            let source = source.clone();
            Box::new(DeferredCursor::new(Box::new(move || {
                let mut items = materialize(source.open())?;
                items.reverse();
                Ok(items)
            }))) as BoxCursor<T>
        }))
    }

    pub fn default_if_empty(&self, fallback: T) -> Query<T>
    where
        T: Clone,
    {
        let source = self.clone();
        self.flow(Query::from_factory(move || {
            Box::new(DefaultIfEmptyCursor::new(source.open(), fallback.clone())) as BoxCursor<T>
        }))
    }

    /// Positional pairs, as long as the shorter side
    pub fn zip<U: 'static>(&self, other: &Query<U>) -> Query<(T, U)> {
        let left = self.clone();
        let right = other.clone();
        Query::from_factory(move || Box::new(ZipCursor::new(left.open(), right.open())) as BoxCursor<(T, U)>)
    }

    /// Consecutive chunks of `size`; the last chunk may be shorter
    pub fn chunk(&self, size: usize) -> Result<Query<Vec<T>>> {
        if size == 0 {
            return Err(QueryError::argument("chunk size must be greater than zero"));
        }
        let source = self.clone();
        Ok(Query::from_factory(move || {
            Box::new(ChunkCursor::new(source.open(), size)) as BoxCursor<Vec<T>>
        }))
    }
}

impl<T: Eq + Hash + Clone + 'static> Query<T> {
    /// First occurrence of each element, in order
    pub fn distinct(&self) -> Query<T> {
        let source = self.clone();
        self.flow(Query::from_factory(move || {
            Box::new(DistinctCursor::new(source.open())) as BoxCursor<T>
        }))
    }
}
