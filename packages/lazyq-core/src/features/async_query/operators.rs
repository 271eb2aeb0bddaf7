// Async element-wise operators
//
// Mirrors the synchronous stage cursors; the difference is that pulls and
// (optionally) callbacks suspend. Synchronous callbacks are lifted into
// already-completed futures so every stage has one code path.

use std::future::Future;
use std::rc::Rc;

use async_trait::async_trait;

use super::query::AsyncQuery;
use crate::errors::Result;
use crate::shared::ports::selectors::{async_projection, async_selector, lift_projection, lift_selector, selector};
use crate::shared::ports::{AsyncCursor, AsyncPredicate, AsyncProjection, AsyncUpstream, BoxAsyncCursor, Projection};

struct MapCursor<T, U> {
    upstream: AsyncUpstream<T>,
    project: AsyncProjection<T, U>,
}

#[async_trait(?Send)]
impl<T: 'static, U: 'static> AsyncCursor for MapCursor<T, U> {
    type Item = U;

    async fn take_next(&mut self) -> Result<Option<U>> {
        match self.upstream.pull().await? {
            Some(item) => {
                let mapped = (self.project)(item).await;
                self.upstream.guard(mapped).map(Some)
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}

struct FilterCursor<T> {
    upstream: AsyncUpstream<T>,
    predicate: AsyncPredicate<T>,
}

#[async_trait(?Send)]
impl<T: 'static> AsyncCursor for FilterCursor<T> {
    type Item = T;

    async fn take_next(&mut self) -> Result<Option<T>> {
        while let Some(item) = self.upstream.pull().await? {
            let keep = (self.predicate)(&item).await;
            if self.upstream.guard(keep)? {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}

struct FlatMapCursor<T, U> {
    outer: AsyncUpstream<T>,
    inner: AsyncUpstream<U>,
    expand: Projection<T, AsyncQuery<U>>,
}

#[async_trait(?Send)]
impl<T: 'static, U: 'static> AsyncCursor for FlatMapCursor<T, U> {
    type Item = U;

    async fn take_next(&mut self) -> Result<Option<U>> {
        loop {
            match self.inner.pull().await {
                Ok(Some(item)) => return Ok(Some(item)),
                Ok(None) => {}
                Err(err) => {
                    self.outer.release();
                    return Err(err);
                }
            }
            let Some(item) = self.outer.pull().await? else {
                return Ok(None);
            };
            let expanded = (self.expand)(item);
            let query = self.outer.guard(expanded)?;
            self.inner = AsyncUpstream::new(query.open());
        }
    }

    fn close(&mut self) {
        self.inner.release();
        self.outer.release();
    }
}

struct TakeCursor<T> {
    upstream: AsyncUpstream<T>,
    remaining: usize,
}

#[async_trait(?Send)]
impl<T: 'static> AsyncCursor for TakeCursor<T> {
    type Item = T;

    async fn take_next(&mut self) -> Result<Option<T>> {
        if self.remaining == 0 {
            self.upstream.release();
            return Ok(None);
        }
        let item = self.upstream.pull().await?;
        if item.is_some() {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.upstream.release();
            }
        }
        Ok(item)
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}

struct SkipCursor<T> {
    upstream: AsyncUpstream<T>,
    to_skip: usize,
}

#[async_trait(?Send)]
impl<T: 'static> AsyncCursor for SkipCursor<T> {
    type Item = T;

    async fn take_next(&mut self) -> Result<Option<T>> {
        while self.to_skip > 0 {
            self.to_skip -= 1;
            if self.upstream.pull().await?.is_none() {
                return Ok(None);
            }
        }
        self.upstream.pull().await
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}

struct TakeWhileCursor<T> {
    upstream: AsyncUpstream<T>,
    predicate: AsyncPredicate<T>,
}

#[async_trait(?Send)]
impl<T: 'static> AsyncCursor for TakeWhileCursor<T> {
    type Item = T;

    async fn take_next(&mut self) -> Result<Option<T>> {
        let Some(item) = self.upstream.pull().await? else {
            return Ok(None);
        };
        let keep = (self.predicate)(&item).await;
        if self.upstream.guard(keep)? {
            Ok(Some(item))
        } else {
            self.upstream.release();
            Ok(None)
        }
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}

struct ConcatCursor<T> {
    first: AsyncUpstream<T>,
    second: AsyncUpstream<T>,
    pending: Option<AsyncQuery<T>>,
}

#[async_trait(?Send)]
impl<T: 'static> AsyncCursor for ConcatCursor<T> {
    type Item = T;

    async fn take_next(&mut self) -> Result<Option<T>> {
        if let Some(item) = self.first.pull().await? {
            return Ok(Some(item));
        }
        if let Some(second) = self.pending.take() {
            self.second = AsyncUpstream::new(second.open());
        }
        self.second.pull().await
    }

    fn close(&mut self) {
        self.first.release();
        self.pending = None;
        self.second.release();
    }
}

impl<T: 'static> AsyncQuery<T> {
    fn map_with<U: 'static>(&self, project: AsyncProjection<T, U>) -> AsyncQuery<U> {
        let source = self.clone();
        AsyncQuery::from_factory(move || {
            Box::new(MapCursor {
                upstream: AsyncUpstream::new(source.open()),
                project: project.clone(),
            }) as BoxAsyncCursor<U>
        })
    }

    pub fn map<U, F>(&self, f: F) -> AsyncQuery<U>
    where
        U: 'static,
        F: Fn(T) -> Result<U> + 'static,
    {
        let project: Projection<T, U> = Rc::new(f);
        self.map_with(lift_projection(project))
    }

    /// Map with a projection that may suspend
    pub fn map_async<U, F, Fut>(&self, f: F) -> AsyncQuery<U>
    where
        U: 'static,
        F: Fn(T) -> Fut + 'static,
        Fut: Future<Output = Result<U>> + 'static,
    {
        self.map_with(async_projection(f))
    }

    fn filter_with(&self, predicate: AsyncPredicate<T>) -> AsyncQuery<T> {
        let source = self.clone();
        self.flow(AsyncQuery::from_factory(move || {
            Box::new(FilterCursor {
                upstream: AsyncUpstream::new(source.open()),
                predicate: predicate.clone(),
            }) as BoxAsyncCursor<T>
        }))
    }

    pub fn filter<P>(&self, predicate: P) -> AsyncQuery<T>
    where
        P: Fn(&T) -> Result<bool> + 'static,
    {
        self.filter_with(lift_selector(selector(predicate)))
    }

    /// Filter with a predicate that may suspend
    pub fn filter_async<P, Fut>(&self, predicate: P) -> AsyncQuery<T>
    where
        P: Fn(&T) -> Fut + 'static,
        Fut: Future<Output = Result<bool>> + 'static,
    {
        self.filter_with(async_selector(predicate))
    }

    /// Expand each element into an async query and flatten, in order
    pub fn flat_map_query<U, F>(&self, f: F) -> AsyncQuery<U>
    where
        U: 'static,
        F: Fn(T) -> Result<AsyncQuery<U>> + 'static,
    {
        let source = self.clone();
        let expand: Projection<T, AsyncQuery<U>> = Rc::new(f);
        AsyncQuery::from_factory(move || {
            Box::new(FlatMapCursor {
                outer: AsyncUpstream::new(source.open()),
                inner: AsyncUpstream::released(),
                expand: expand.clone(),
            }) as BoxAsyncCursor<U>
        })
    }

    pub fn take(&self, count: usize) -> AsyncQuery<T> {
        let source = self.clone();
        self.flow(AsyncQuery::from_factory(move || {
            Box::new(TakeCursor {
                upstream: AsyncUpstream::new(source.open()),
                remaining: count,
            }) as BoxAsyncCursor<T>
        }))
    }

    pub fn skip(&self, count: usize) -> AsyncQuery<T> {
        let source = self.clone();
        self.flow(AsyncQuery::from_factory(move || {
            Box::new(SkipCursor {
                upstream: AsyncUpstream::new(source.open()),
                to_skip: count,
            }) as BoxAsyncCursor<T>
        }))
    }

    pub fn take_while<P>(&self, predicate: P) -> AsyncQuery<T>
    where
        P: Fn(&T) -> Result<bool> + 'static,
    {
        let source = self.clone();
        let predicate = lift_selector(selector(predicate));
        self.flow(AsyncQuery::from_factory(move || {
            Box::new(TakeWhileCursor {
                upstream: AsyncUpstream::new(source.open()),
                predicate: predicate.clone(),
            }) as BoxAsyncCursor<T>
        }))
    }

    /// This sequence followed by `other`; `other` opens only once this one is exhausted
    pub fn concat(&self, other: AsyncQuery<T>) -> AsyncQuery<T> {
        let source = self.clone();
        self.flow(AsyncQuery::from_factory(move || {
            Box::new(ConcatCursor {
                first: AsyncUpstream::new(source.open()),
                second: AsyncUpstream::released(),
                pending: Some(other.clone()),
            }) as BoxAsyncCursor<T>
        }))
    }
}
