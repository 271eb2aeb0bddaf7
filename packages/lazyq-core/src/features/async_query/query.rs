// AsyncQuery - lazy sequence whose pulls may suspend
//
// Same shape as Query: a cursor factory plus an optional hierarchy tag.
// Terminals are inherent async methods; wrappers (ordered, hierarchy) reach
// them through Deref.

use std::hash::Hash;
use std::rc::Rc;

use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use futures::stream::{LocalBoxStream, Stream, StreamExt};
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use crate::errors::{QueryError, Result};
use crate::features::sequence::sources::MaterializeBudget;
use crate::features::sequence::Query;
use crate::shared::ports::{AsyncCursor, AsyncUpstream, BoxAsyncCursor, SharedHierarchy, Upstream};

/// Composable, re-consumable lazy sequence with suspending pulls
pub struct AsyncQuery<T> {
    factory: Rc<dyn Fn() -> BoxAsyncCursor<T>>,
    hierarchy: Option<SharedHierarchy<T>>,
}

impl<T> Clone for AsyncQuery<T> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            hierarchy: self.hierarchy.clone(),
        }
    }
}

impl<T> std::fmt::Debug for AsyncQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncQuery")
            .field("tagged", &self.hierarchy.is_some())
            .finish()
    }
}

/// Wrapper types that expose an async sequence
pub trait AsyncSequence<T: 'static> {
    fn to_async_query(&self) -> AsyncQuery<T>;
}

impl<T: 'static> AsyncSequence<T> for AsyncQuery<T> {
    fn to_async_query(&self) -> AsyncQuery<T> {
        self.clone()
    }
}

/// Drives a synchronous cursor from async code
struct SyncBridge<T> {
    upstream: Upstream<T>,
}

#[async_trait(?Send)]
impl<T: 'static> AsyncCursor for SyncBridge<T> {
    type Item = T;

    async fn take_next(&mut self) -> Result<Option<T>> {
        self.upstream.pull()
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}

struct StreamCursor<T> {
    stream: Option<LocalBoxStream<'static, Result<T>>>,
}

#[async_trait(?Send)]
impl<T: 'static> AsyncCursor for StreamCursor<T> {
    type Item = T;

    async fn take_next(&mut self) -> Result<Option<T>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        match stream.next().await {
            Some(Ok(item)) => Ok(Some(item)),
            Some(Err(err)) => {
                self.stream = None;
                Err(err)
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

/// Realizes its whole output on the first pull, then replays it
pub(crate) struct DeferredAsyncCursor<T> {
    realize: Option<LocalBoxFuture<'static, Result<Vec<T>>>>,
    buffer: std::vec::IntoIter<T>,
}

impl<T> DeferredAsyncCursor<T> {
    pub(crate) fn new(realize: LocalBoxFuture<'static, Result<Vec<T>>>) -> Self {
        Self {
            realize: Some(realize),
            buffer: Vec::new().into_iter(),
        }
    }
}

#[async_trait(?Send)]
impl<T: 'static> AsyncCursor for DeferredAsyncCursor<T> {
    type Item = T;

    async fn take_next(&mut self) -> Result<Option<T>> {
        if let Some(realize) = self.realize.take() {
            self.buffer = realize.await?.into_iter();
        }
        Ok(self.buffer.next())
    }

    fn close(&mut self) {
        self.realize = None;
        self.buffer = Vec::new().into_iter();
    }
}

/// Pull an async cursor to exhaustion under the active materialization budget
pub(crate) async fn materialize_async<T>(cursor: BoxAsyncCursor<T>) -> Result<Vec<T>> {
    let budget = MaterializeBudget::current();
    let mut upstream = AsyncUpstream::new(cursor);
    let mut items = Vec::with_capacity(budget.initial_capacity);
    while let Some(item) = upstream.pull().await? {
        upstream.guard(budget.admit(items.len()))?;
        items.push(item);
    }
    Ok(items)
}

impl<T: 'static> AsyncQuery<T> {
    pub(crate) fn from_factory(factory: impl Fn() -> BoxAsyncCursor<T> + 'static) -> Self {
        Self {
            factory: Rc::new(factory),
            hierarchy: None,
        }
    }

    /// Query over caller-authored async cursors, one per consumption
    pub fn from_cursor_fn<C, F>(factory: F) -> Self
    where
        C: AsyncCursor<Item = T> + 'static,
        F: Fn() -> C + 'static,
    {
        Self::from_factory(move || Box::new(factory()) as BoxAsyncCursor<T>)
    }

    /// Async view of a synchronous query; keeps its hierarchy tag
    pub fn from_query(query: &Query<T>) -> Self {
        let source = query.clone();
        Self::from_factory(move || {
            Box::new(SyncBridge {
                upstream: Upstream::new(source.open()),
            }) as BoxAsyncCursor<T>
        })
        .tagged(query.hierarchy().cloned())
    }

    /// Query over a fallible stream, re-created per consumption
    pub fn from_stream_fn<S, F>(factory: F) -> Self
    where
        S: Stream<Item = Result<T>> + 'static,
        F: Fn() -> S + 'static,
    {
        Self::from_factory(move || {
            Box::new(StreamCursor {
                stream: Some(factory().boxed_local()),
            }) as BoxAsyncCursor<T>
        })
    }

    pub fn empty() -> Self {
        Self::from_factory(|| {
            Box::new(SyncBridge {
                upstream: Upstream::released(),
            }) as BoxAsyncCursor<T>
        })
    }

    pub fn open(&self) -> BoxAsyncCursor<T> {
        (self.factory)()
    }

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

    pub(crate) fn flow(&self, derived: AsyncQuery<T>) -> AsyncQuery<T> {
        derived.tagged(self.hierarchy.clone())
    }

    pub(crate) fn deferred<F>(realize: F) -> Self
    where
        F: Fn() -> LocalBoxFuture<'static, Result<Vec<T>>> + 'static,
    {
        Self::from_factory(move || Box::new(DeferredAsyncCursor::new(realize())) as BoxAsyncCursor<T>)
    }

    pub async fn to_vec(&self) -> Result<Vec<T>> {
        let mut upstream = AsyncUpstream::new(self.open());
        let mut items = Vec::new();
        while let Some(item) = upstream.pull().await? {
            items.push(item);
        }
        Ok(items)
    }

    pub async fn count(&self) -> Result<usize> {
        let mut upstream = AsyncUpstream::new(self.open());
        let mut count = 0;
        while upstream.pull().await?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// Pulls exactly one element and closes
    pub async fn first_or_none(&self) -> Result<Option<T>> {
        let mut upstream = AsyncUpstream::new(self.open());
        let first = upstream.pull().await?;
        upstream.release();
        Ok(first)
    }

    pub async fn first(&self) -> Result<T> {
        self.first_or_none().await?.ok_or_else(QueryError::no_elements)
    }

    pub async fn last(&self) -> Result<T> {
        let mut upstream = AsyncUpstream::new(self.open());
        let mut last = None;
        while let Some(item) = upstream.pull().await? {
            last = Some(item);
        }
        last.ok_or_else(QueryError::no_elements)
    }

    pub async fn single(&self) -> Result<T> {
        let mut upstream = AsyncUpstream::new(self.open());
        let first = upstream.pull().await?.ok_or_else(QueryError::no_elements)?;
        let second = upstream.pull().await?;
        upstream.release();
        match second {
            None => Ok(first),
            Some(_) => Err(QueryError::value("sequence contains more than one element")),
        }
    }

    pub async fn element_at(&self, index: usize) -> Result<T> {
        let mut upstream = AsyncUpstream::new(self.open());
        let mut position = 0;
        while let Some(item) = upstream.pull().await? {
            if position == index {
                upstream.release();
                return Ok(item);
            }
            position += 1;
        }
        Err(QueryError::value(format!(
            "index {} out of range for sequence of length {}",
            index, position
        )))
    }

    pub async fn any<P>(&self, mut predicate: P) -> Result<bool>
    where
        P: FnMut(&T) -> Result<bool>,
    {
        let mut upstream = AsyncUpstream::new(self.open());
        while let Some(item) = upstream.pull().await? {
            let matched = predicate(&item);
            if upstream.guard(matched)? {
                upstream.release();
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn all<P>(&self, mut predicate: P) -> Result<bool>
    where
        P: FnMut(&T) -> Result<bool>,
    {
        let negated = self.any(|item| predicate(item).map(|matched| !matched)).await?;
        Ok(!negated)
    }

    pub async fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(T) -> Result<()>,
    {
        let mut upstream = AsyncUpstream::new(self.open());
        while let Some(item) = upstream.pull().await? {
            let done = f(item);
            upstream.guard(done)?;
        }
        Ok(())
    }

    pub async fn to_set(&self) -> Result<IndexSet<T, ahash::RandomState>>
    where
        T: Eq + Hash,
    {
        let mut set = IndexSet::with_hasher(ahash::RandomState::new());
        let mut upstream = AsyncUpstream::new(self.open());
        while let Some(item) = upstream.pull().await? {
            set.insert(item);
        }
        Ok(set)
    }

    pub async fn to_map<K, V, KF, VF>(&self, mut key: KF, mut value: VF) -> Result<IndexMap<K, V, ahash::RandomState>>
    where
        K: Eq + Hash,
        KF: FnMut(&T) -> Result<K>,
        VF: FnMut(&T) -> Result<V>,
    {
        let mut map = IndexMap::with_hasher(ahash::RandomState::new());
        let mut upstream = AsyncUpstream::new(self.open());
        while let Some(item) = upstream.pull().await? {
            let entry = key(&item).and_then(|k| value(&item).map(|v| (k, v)));
            let (k, v) = upstream.guard(entry)?;
            map.insert(k, v);
        }
        Ok(map)
    }

    pub async fn to_record<KF, VF>(&self, mut key: KF, mut value: VF) -> Result<Map<String, Value>>
    where
        KF: FnMut(&T) -> Result<String>,
        VF: FnMut(&T) -> Result<Value>,
    {
        let mut record = Map::new();
        let mut upstream = AsyncUpstream::new(self.open());
        while let Some(item) = upstream.pull().await? {
            let entry = key(&item).and_then(|k| value(&item).map(|v| (k, v)));
            let (k, v) = upstream.guard(entry)?;
            record.insert(k, v);
        }
        Ok(record)
    }
}

impl<T: Clone + 'static> AsyncQuery<T> {
    pub fn from_vec(items: Vec<T>) -> Self {
        Self::from_query(&Query::from_vec(items))
    }

    pub fn once(item: T) -> Self {
        Self::from_query(&Query::once(item))
    }
}

impl<T: 'static> From<Query<T>> for AsyncQuery<T> {
    fn from(query: Query<T>) -> Self {
        Self::from_query(&query)
    }
}

impl<T: 'static> Query<T> {
    /// Async view of this query
    pub fn to_async(&self) -> AsyncQuery<T> {
        AsyncQuery::from_query(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{self, FutureExt};
    use futures::stream;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::Cell;

    /// Yields one element, then never completes its second pull
    struct Stalling {
        yielded: bool,
        closes: Rc<Cell<usize>>,
    }

    #[async_trait(?Send)]
    impl AsyncCursor for Stalling {
        type Item = u8;

        async fn take_next(&mut self) -> Result<Option<u8>> {
            if !self.yielded {
                self.yielded = true;
                return Ok(Some(1));
            }
            future::pending::<Result<Option<u8>>>().await
        }

        fn close(&mut self) {
            self.closes.set(self.closes.get() + 1);
        }
    }

    fn stalling(closes: &Rc<Cell<usize>>) -> AsyncQuery<u8> {
        let closes = closes.clone();
        AsyncQuery::from_cursor_fn(move || Stalling {
            yielded: false,
            closes: closes.clone(),
        })
    }

    #[tokio::test]
    async fn test_terminals() {
        let query = AsyncQuery::from_vec(vec![3, 1, 2]);
        assert_eq!(query.to_vec().await.unwrap(), vec![3, 1, 2]);
        assert_eq!(query.count().await.unwrap(), 3);
        assert_eq!(query.first().await.unwrap(), 3);
        assert_eq!(query.last().await.unwrap(), 2);
        assert_eq!(query.element_at(1).await.unwrap(), 1);
        assert!(matches!(query.single().await, Err(QueryError::Value(_))));
        assert!(query.any(|x| Ok(*x == 2)).await.unwrap());
        assert!(!query.all(|x| Ok(*x > 1)).await.unwrap());
        assert!(matches!(AsyncQuery::<i32>::empty().first().await, Err(QueryError::Value(_))));
    }

    #[tokio::test]
    async fn test_collections() {
        let query = AsyncQuery::from_vec(vec![("a", 1), ("b", 2), ("a", 3)]);
        let map = query.to_map(|(k, _)| Ok(*k), |(_, v)| Ok(*v)).await.unwrap();
        assert_eq!(map["a"], 3);
        let record = query
            .to_record(|(k, _)| Ok(k.to_string()), |(_, v)| Ok(json!(v)))
            .await
            .unwrap();
        assert_eq!(Value::Object(record), json!({"a": 3, "b": 2}));
        let set = AsyncQuery::from_vec(vec![2, 2, 1]).to_set().await.unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_stream_source_stops_on_error() {
        let query = AsyncQuery::from_stream_fn(|| {
            stream::iter(vec![Ok(1), Err(QueryError::source("disconnected")), Ok(3)])
        });
        assert_eq!(query.to_vec().await.unwrap_err(), QueryError::source("disconnected"));
        assert_eq!(query.first().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sync_bridge_keeps_order() {
        let sync = Query::from_fn(|| 0..5);
        assert_eq!(sync.to_async().to_vec().await.unwrap(), vec![0, 1, 2, 3, 4]);
        let converted: AsyncQuery<i32> = sync.into();
        assert_eq!(converted.count().await.unwrap(), 5);
    }

    #[test]
    fn test_dropping_pending_terminal_closes_source() {
        let closes = Rc::new(Cell::new(0));
        let query = stalling(&closes);

        assert!(query.to_vec().now_or_never().is_none());
        assert_eq!(closes.get(), 1);

        let pipeline = query.filter(|_| Ok(true)).map(Ok).take(3);
        assert!(pipeline.count().now_or_never().is_none());
        assert_eq!(closes.get(), 2);
    }

    #[test]
    fn test_dropping_pending_sort_closes_source() {
        let closes = Rc::new(Cell::new(0));
        let sorted = stalling(&closes).order_by(|x| Ok(*x));
        assert!(sorted.first().now_or_never().is_none());
        assert_eq!(closes.get(), 1);
    }
}
