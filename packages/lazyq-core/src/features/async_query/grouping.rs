// Async grouping and joins
//
// Bucketing pulls from an async cursor and may await key selectors; the
// resulting Lookup and the full-join key union are the synchronous ones.

use std::future::Future;
use std::hash::Hash;
use std::rc::Rc;

use async_trait::async_trait;
use futures::future::{self, FutureExt, LocalBoxFuture};
use tracing::debug;

use super::query::AsyncQuery;
use crate::errors::Result;
use crate::features::grouping::domain::LookupBuilder;
use crate::features::grouping::{full_join_pairs, Group, Lookup};
use crate::features::sequence::sources::MaterializeBudget;
use crate::features::sequence::Query;
use crate::shared::ports::selectors::{async_selector, lift_projection, lift_selector, selector};
use crate::shared::ports::{
    default_equaler, AsyncCursor, AsyncProjection, AsyncSelector, AsyncUpstream, BoxAsyncCursor, Projection,
    SharedEqualer,
};

type AsyncJoinResult<T, I, R> = Rc<dyn Fn(&T, &I) -> LocalBoxFuture<'static, Result<R>>>;

fn identity<T: 'static>() -> AsyncProjection<T, T> {
    Rc::new(|item: T| future::ready(Ok(item)).boxed_local())
}

/// Async single-pass bucketing; the cursor is closed before any failure returns
pub(crate) async fn build_groupings_async<T, K, V>(
    cursor: BoxAsyncCursor<T>,
    key: &AsyncSelector<T, K>,
    element: &AsyncProjection<T, V>,
    equaler: SharedEqualer<K>,
) -> Result<Lookup<K, V>> {
    let budget = MaterializeBudget::current();
    let mut upstream = AsyncUpstream::new(cursor);
    let mut builder = LookupBuilder::new(equaler);
    let mut admitted = 0;

    while let Some(item) = upstream.pull().await? {
        upstream.guard(budget.admit(admitted))?;
        admitted += 1;
        let k = key(&item).await;
        let k = upstream.guard(k)?;
        let value = element(item).await;
        let value = upstream.guard(value)?;
        builder.push(k, value);
    }

    let lookup = builder.finish();
    debug!(elements = admitted, keys = lookup.len(), "async lookup built");
    Ok(lookup)
}

struct JoinCursor<T, I, K, R> {
    outer: AsyncUpstream<T>,
    outer_key: AsyncSelector<T, K>,
    inner: Option<AsyncQuery<I>>,
    inner_key: AsyncSelector<I, K>,
    equaler: SharedEqualer<K>,
    lookup: Option<Lookup<K, I>>,
    result: AsyncJoinResult<T, I, R>,
    current: Option<(T, Rc<Vec<I>>, usize)>,
}

#[async_trait(?Send)]
impl<T: 'static, I: 'static, K: 'static, R: 'static> AsyncCursor for JoinCursor<T, I, K, R> {
    type Item = R;

    async fn take_next(&mut self) -> Result<Option<R>> {
        if let Some(inner) = self.inner.take() {
            let built = build_groupings_async(inner.open(), &self.inner_key, &identity(), self.equaler.clone()).await;
            self.lookup = Some(self.outer.guard(built)?);
        }
        loop {
            if let Some((item, matches, position)) = self.current.as_mut() {
                if let Some(matched) = matches.get(*position) {
                    *position += 1;
                    let joined = (self.result)(item, matched).await;
                    return self.outer.guard(joined).map(Some);
                }
            }
            self.current = None;

            let Some(item) = self.outer.pull().await? else {
                return Ok(None);
            };
            let key = (self.outer_key)(&item).await;
            let key = self.outer.guard(key)?;
            if let Some(matches) = self.lookup.as_ref().and_then(|lookup| lookup.get_shared(&key)) {
                self.current = Some((item, matches, 0));
            }
        }
    }

    fn close(&mut self) {
        self.current = None;
        self.inner = None;
        self.outer.release();
    }
}

struct GroupJoinCursor<T, I, K, R> {
    outer: AsyncUpstream<T>,
    outer_key: AsyncSelector<T, K>,
    inner: Option<AsyncQuery<I>>,
    inner_key: AsyncSelector<I, K>,
    equaler: SharedEqualer<K>,
    lookup: Option<Lookup<K, I>>,
    result: Rc<dyn Fn(&T, AsyncQuery<I>) -> Result<R>>,
}

#[async_trait(?Send)]
impl<T: 'static, I: Clone + 'static, K: 'static, R: 'static> AsyncCursor for GroupJoinCursor<T, I, K, R> {
    type Item = R;

    async fn take_next(&mut self) -> Result<Option<R>> {
        if let Some(inner) = self.inner.take() {
            let built = build_groupings_async(inner.open(), &self.inner_key, &identity(), self.equaler.clone()).await;
            self.lookup = Some(self.outer.guard(built)?);
        }
        let Some(item) = self.outer.pull().await? else {
            return Ok(None);
        };
        let key = (self.outer_key)(&item).await;
        let key = self.outer.guard(key)?;
        let group = match self.lookup.as_ref().and_then(|lookup| lookup.get_shared(&key)) {
            Some(values) => AsyncQuery::from_query(&Query::from_shared(values)),
            None => AsyncQuery::empty(),
        };
        let joined = (self.result)(&item, group);
        self.outer.guard(joined).map(Some)
    }

    fn close(&mut self) {
        self.inner = None;
        self.outer.release();
    }
}

impl<T: 'static> AsyncQuery<T> {
    fn group_with<K, V>(
        &self,
        key: AsyncSelector<T, K>,
        element: AsyncProjection<T, V>,
        equaler: SharedEqualer<K>,
    ) -> AsyncQuery<Group<K, V>>
    where
        K: 'static,
        V: 'static,
    {
        let source = self.clone();
        AsyncQuery::deferred(move || {
            let (source, key, element, equaler) = (source.clone(), key.clone(), element.clone(), equaler.clone());
            async move {
                let lookup = build_groupings_async(source.open(), &key, &element, equaler).await?;
                Ok(lookup.into_groups())
            }
            .boxed_local()
        })
    }

    pub fn group_by<K, F>(&self, key: F) -> AsyncQuery<Group<K, T>>
    where
        K: Eq + Hash + 'static,
        F: Fn(&T) -> Result<K> + 'static,
    {
        self.group_with(lift_selector(selector(key)), identity(), default_equaler())
    }

    /// Group projected elements under a custom key equality
    pub fn group_by_with<K, V, KF, VF>(&self, key: KF, element: VF, equaler: SharedEqualer<K>) -> AsyncQuery<Group<K, V>>
    where
        K: 'static,
        V: 'static,
        KF: Fn(&T) -> Result<K> + 'static,
        VF: Fn(T) -> Result<V> + 'static,
    {
        let element: Projection<T, V> = Rc::new(element);
        self.group_with(lift_selector(selector(key)), lift_projection(element), equaler)
    }

    /// Group by a key whose evaluation may suspend
    pub fn group_by_async<K, F, Fut>(&self, key: F) -> AsyncQuery<Group<K, T>>
    where
        K: Eq + Hash + 'static,
        F: Fn(&T) -> Fut + 'static,
        Fut: Future<Output = Result<K>> + 'static,
    {
        self.group_with(async_selector(key), identity(), default_equaler())
    }

    fn join_internal<I, K, R>(
        &self,
        inner: &AsyncQuery<I>,
        outer_key: AsyncSelector<T, K>,
        inner_key: AsyncSelector<I, K>,
        result: AsyncJoinResult<T, I, R>,
        equaler: SharedEqualer<K>,
    ) -> AsyncQuery<R>
    where
        I: 'static,
        K: 'static,
        R: 'static,
    {
        let source = self.clone();
        let inner = inner.clone();
        AsyncQuery::from_factory(move || {
            Box::new(JoinCursor {
                outer: AsyncUpstream::new(source.open()),
                outer_key: outer_key.clone(),
                inner: Some(inner.clone()),
                inner_key: inner_key.clone(),
                equaler: equaler.clone(),
                lookup: None,
                result: result.clone(),
                current: None,
            }) as BoxAsyncCursor<R>
        })
    }

    /// Inner equi-join, outer order then inner order
    pub fn join<I, K, R, OK, IK, RF>(&self, inner: &AsyncQuery<I>, outer_key: OK, inner_key: IK, result: RF) -> AsyncQuery<R>
    where
        I: 'static,
        K: Eq + Hash + 'static,
        R: 'static,
        OK: Fn(&T) -> Result<K> + 'static,
        IK: Fn(&I) -> Result<K> + 'static,
        RF: Fn(&T, &I) -> Result<R> + 'static,
    {
        self.join_with(inner, outer_key, inner_key, result, default_equaler())
    }

    pub fn join_with<I, K, R, OK, IK, RF>(
        &self,
        inner: &AsyncQuery<I>,
        outer_key: OK,
        inner_key: IK,
        result: RF,
        equaler: SharedEqualer<K>,
    ) -> AsyncQuery<R>
    where
        I: 'static,
        K: 'static,
        R: 'static,
        OK: Fn(&T) -> Result<K> + 'static,
        IK: Fn(&I) -> Result<K> + 'static,
        RF: Fn(&T, &I) -> Result<R> + 'static,
    {
        let result: AsyncJoinResult<T, I, R> =
            Rc::new(move |left: &T, right: &I| future::ready(result(left, right)).boxed_local());
        self.join_internal(
            inner,
            lift_selector(selector(outer_key)),
            lift_selector(selector(inner_key)),
            result,
            equaler,
        )
    }

    /// Join whose key and result selectors may suspend
    pub fn join_async<I, K, R, OK, IK, RF, OKF, IKF, RFut>(
        &self,
        inner: &AsyncQuery<I>,
        outer_key: OK,
        inner_key: IK,
        result: RF,
    ) -> AsyncQuery<R>
    where
        I: 'static,
        K: Eq + Hash + 'static,
        R: 'static,
        OK: Fn(&T) -> OKF + 'static,
        IK: Fn(&I) -> IKF + 'static,
        RF: Fn(&T, &I) -> RFut + 'static,
        OKF: Future<Output = Result<K>> + 'static,
        IKF: Future<Output = Result<K>> + 'static,
        RFut: Future<Output = Result<R>> + 'static,
    {
        let result: AsyncJoinResult<T, I, R> = Rc::new(move |left: &T, right: &I| result(left, right).boxed_local());
        self.join_internal(
            inner,
            async_selector(outer_key),
            async_selector(inner_key),
            result,
            default_equaler(),
        )
    }

    /// One result per outer element with its (possibly empty) inner group
    pub fn group_join<I, K, R, OK, IK, RF>(
        &self,
        inner: &AsyncQuery<I>,
        outer_key: OK,
        inner_key: IK,
        result: RF,
    ) -> AsyncQuery<R>
    where
        I: Clone + 'static,
        K: Eq + Hash + 'static,
        R: 'static,
        OK: Fn(&T) -> Result<K> + 'static,
        IK: Fn(&I) -> Result<K> + 'static,
        RF: Fn(&T, AsyncQuery<I>) -> Result<R> + 'static,
    {
        self.group_join_with(inner, outer_key, inner_key, result, default_equaler())
    }

    pub fn group_join_with<I, K, R, OK, IK, RF>(
        &self,
        inner: &AsyncQuery<I>,
        outer_key: OK,
        inner_key: IK,
        result: RF,
        equaler: SharedEqualer<K>,
    ) -> AsyncQuery<R>
    where
        I: Clone + 'static,
        K: 'static,
        R: 'static,
        OK: Fn(&T) -> Result<K> + 'static,
        IK: Fn(&I) -> Result<K> + 'static,
        RF: Fn(&T, AsyncQuery<I>) -> Result<R> + 'static,
    {
        let source = self.clone();
        let inner = inner.clone();
        let outer_key = lift_selector(selector(outer_key));
        let inner_key = lift_selector(selector(inner_key));
        let result: Rc<dyn Fn(&T, AsyncQuery<I>) -> Result<R>> = Rc::new(result);
        AsyncQuery::from_factory(move || {
            Box::new(GroupJoinCursor {
                outer: AsyncUpstream::new(source.open()),
                outer_key: outer_key.clone(),
                inner: Some(inner.clone()),
                inner_key: inner_key.clone(),
                equaler: equaler.clone(),
                lookup: None,
                result: result.clone(),
            }) as BoxAsyncCursor<R>
        })
    }

    /// Full outer join in key-discovery order; a missing side is `None`
    pub fn full_join<I, K, R, OK, IK, RF>(
        &self,
        inner: &AsyncQuery<I>,
        outer_key: OK,
        inner_key: IK,
        result: RF,
    ) -> AsyncQuery<R>
    where
        T: Clone,
        I: Clone + 'static,
        K: Eq + Hash + 'static,
        R: 'static,
        OK: Fn(&T) -> Result<K> + 'static,
        IK: Fn(&I) -> Result<K> + 'static,
        RF: Fn(Option<T>, Option<I>) -> Result<R> + 'static,
    {
        self.full_join_with(inner, outer_key, inner_key, result, default_equaler())
    }

    pub fn full_join_with<I, K, R, OK, IK, RF>(
        &self,
        inner: &AsyncQuery<I>,
        outer_key: OK,
        inner_key: IK,
        result: RF,
        equaler: SharedEqualer<K>,
    ) -> AsyncQuery<R>
    where
        T: Clone,
        I: Clone + 'static,
        K: 'static,
        R: 'static,
        OK: Fn(&T) -> Result<K> + 'static,
        IK: Fn(&I) -> Result<K> + 'static,
        RF: Fn(Option<T>, Option<I>) -> Result<R> + 'static,
    {
        let source = self.clone();
        let inner = inner.clone();
        let outer_key = lift_selector(selector(outer_key));
        let inner_key = lift_selector(selector(inner_key));
        let pairs = AsyncQuery::deferred(move || {
            let (source, inner, outer_key, inner_key, equaler) = (
                source.clone(),
                inner.clone(),
                outer_key.clone(),
                inner_key.clone(),
                equaler.clone(),
            );
            async move {
                let outer = build_groupings_async(source.open(), &outer_key, &identity(), equaler.clone()).await?;
                let inner = build_groupings_async(inner.open(), &inner_key, &identity(), equaler).await?;
                Ok(full_join_pairs(&outer, &inner))
            }
            .boxed_local()
        });
        pairs.map(move |(left, right)| result(left, right))
    }

    /// Bucket every element under `key`
    pub async fn to_lookup<K, F>(&self, key: F) -> Result<Lookup<K, T>>
    where
        K: Eq + Hash + 'static,
        F: Fn(&T) -> Result<K> + 'static,
    {
        self.to_lookup_with(key, |item: T| Ok(item), default_equaler()).await
    }

    pub async fn to_lookup_with<K, V, KF, VF>(&self, key: KF, element: VF, equaler: SharedEqualer<K>) -> Result<Lookup<K, V>>
    where
        K: 'static,
        V: 'static,
        KF: Fn(&T) -> Result<K> + 'static,
        VF: Fn(T) -> Result<V> + 'static,
    {
        let element: Projection<T, V> = Rc::new(element);
        build_groupings_async(self.open(), &lift_selector(selector(key)), &lift_projection(element), equaler).await
    }
}
