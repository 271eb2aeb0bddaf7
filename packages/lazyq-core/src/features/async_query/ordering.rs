// Async deferred sort
//
// Keys may suspend, so each tier computes its keys with an async pass. The
// permutation sort itself is the shared synchronous one.

use std::cmp::Ordering;
use std::future::Future;
use std::ops::Deref;
use std::rc::Rc;

use async_trait::async_trait;
use futures::future::FutureExt;
use tracing::debug;

use super::query::{materialize_async, AsyncQuery, AsyncSequence};
use crate::config::EngineConfig;
use crate::errors::Result;
use crate::features::ordering::tier::{apply_permutation, keyed_comparator, sort_permutation, TierComparator};
use crate::shared::ports::selectors::{async_selector, lift_selector, selector};
use crate::shared::ports::{natural_order, AsyncSelector, Comparer};

pub(crate) type SharedAsyncTier<T> = Rc<dyn AsyncSortTier<T>>;

#[async_trait(?Send)]
pub(crate) trait AsyncSortTier<T> {
    async fn key_comparator(&self, items: &[T]) -> Result<TierComparator>;

    fn parent(&self) -> Option<&SharedAsyncTier<T>>;
}

struct AsyncKeyTier<T, K> {
    key: AsyncSelector<T, K>,
    comparer: Comparer<K>,
    descending: bool,
    parent: Option<SharedAsyncTier<T>>,
}

#[async_trait(?Send)]
impl<T: 'static, K: 'static> AsyncSortTier<T> for AsyncKeyTier<T, K> {
    async fn key_comparator(&self, items: &[T]) -> Result<TierComparator> {
        let mut keys = Vec::with_capacity(items.len());
        for item in items {
            keys.push((self.key)(item).await?);
        }
        Ok(keyed_comparator(keys, self.comparer.clone(), self.descending))
    }

    fn parent(&self) -> Option<&SharedAsyncTier<T>> {
        self.parent.as_ref()
    }
}

async fn sort_by_async_tiers<T>(items: Vec<T>, tier: &dyn AsyncSortTier<T>) -> Result<Vec<T>> {
    let mut chain: Vec<&dyn AsyncSortTier<T>> = vec![tier];
    let mut next = tier.parent();
    while let Some(parent) = next {
        chain.push(&**parent);
        next = parent.parent();
    }
    let mut comparators = Vec::with_capacity(chain.len());
    for tier in chain.iter().rev() {
        comparators.push(tier.key_comparator(&items).await?);
    }

    let strategy = EngineConfig::current().sort.strategy;
    debug!(
        elements = items.len(),
        tiers = comparators.len(),
        strategy = ?strategy,
        "async sort realized"
    );
    let permutation = sort_permutation(items.len(), &comparators, strategy);
    Ok(apply_permutation(items, &permutation))
}

/// Async sorted view that accepts further tie-breaking keys
pub struct AsyncOrderedQuery<T> {
    source: AsyncQuery<T>,
    tier: SharedAsyncTier<T>,
    sorted: AsyncQuery<T>,
}

impl<T> Clone for AsyncOrderedQuery<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            tier: self.tier.clone(),
            sorted: self.sorted.clone(),
        }
    }
}

impl<T: 'static> AsyncOrderedQuery<T> {
    fn new<K: 'static>(
        source: AsyncQuery<T>,
        key: AsyncSelector<T, K>,
        comparer: Comparer<K>,
        descending: bool,
        parent: Option<SharedAsyncTier<T>>,
    ) -> Self {
        let tier: SharedAsyncTier<T> = Rc::new(AsyncKeyTier {
            key,
            comparer,
            descending,
            parent,
        });
        let input = source.clone();
        let realize_tier = tier.clone();
        let sorted = source.flow(AsyncQuery::deferred(move || {
            let (input, tier) = (input.clone(), realize_tier.clone());
            async move {
                let items = materialize_async(input.open()).await?;
                sort_by_async_tiers(items, &*tier).await
            }
            .boxed_local()
        }));
        Self { source, tier, sorted }
    }

    pub fn then_by<K, F>(&self, key: F) -> AsyncOrderedQuery<T>
    where
        K: Ord + 'static,
        F: Fn(&T) -> Result<K> + 'static,
    {
        self.then_by_with(key, |a: &K, b: &K| a.cmp(b), false)
    }

    pub fn then_by_descending<K, F>(&self, key: F) -> AsyncOrderedQuery<T>
    where
        K: Ord + 'static,
        F: Fn(&T) -> Result<K> + 'static,
    {
        self.then_by_with(key, |a: &K, b: &K| a.cmp(b), true)
    }

    pub fn then_by_with<K, F, C>(&self, key: F, comparer: C, descending: bool) -> AsyncOrderedQuery<T>
    where
        K: 'static,
        F: Fn(&T) -> Result<K> + 'static,
        C: Fn(&K, &K) -> Ordering + 'static,
    {
        Self::new(
            self.source.clone(),
            lift_selector(selector(key)),
            Rc::new(comparer),
            descending,
            Some(self.tier.clone()),
        )
    }

    /// Tie-break with a key whose evaluation may suspend
    pub fn then_by_async<K, F, Fut>(&self, key: F, descending: bool) -> AsyncOrderedQuery<T>
    where
        K: Ord + 'static,
        F: Fn(&T) -> Fut + 'static,
        Fut: Future<Output = Result<K>> + 'static,
    {
        Self::new(
            self.source.clone(),
            async_selector(key),
            natural_order(),
            descending,
            Some(self.tier.clone()),
        )
    }
}

impl<T> Deref for AsyncOrderedQuery<T> {
    type Target = AsyncQuery<T>;

    fn deref(&self) -> &AsyncQuery<T> {
        &self.sorted
    }
}

impl<T: 'static> AsyncSequence<T> for AsyncOrderedQuery<T> {
    fn to_async_query(&self) -> AsyncQuery<T> {
        self.sorted.clone()
    }
}

impl<T: 'static> AsyncQuery<T> {
    pub fn order_by<K, F>(&self, key: F) -> AsyncOrderedQuery<T>
    where
        K: Ord + 'static,
        F: Fn(&T) -> Result<K> + 'static,
    {
        AsyncOrderedQuery::new(self.clone(), lift_selector(selector(key)), natural_order(), false, None)
    }

    pub fn order_by_descending<K, F>(&self, key: F) -> AsyncOrderedQuery<T>
    where
        K: Ord + 'static,
        F: Fn(&T) -> Result<K> + 'static,
    {
        AsyncOrderedQuery::new(self.clone(), lift_selector(selector(key)), natural_order(), true, None)
    }

    pub fn order_by_with<K, F, C>(&self, key: F, comparer: C, descending: bool) -> AsyncOrderedQuery<T>
    where
        K: 'static,
        F: Fn(&T) -> Result<K> + 'static,
        C: Fn(&K, &K) -> Ordering + 'static,
    {
        AsyncOrderedQuery::new(self.clone(), lift_selector(selector(key)), Rc::new(comparer), descending, None)
    }

    /// Sort by a key whose evaluation may suspend
    pub fn order_by_async<K, F, Fut>(&self, key: F, descending: bool) -> AsyncOrderedQuery<T>
    where
        K: Ord + 'static,
        F: Fn(&T) -> Fut + 'static,
        Fut: Future<Output = Result<K>> + 'static,
    {
        AsyncOrderedQuery::new(self.clone(), async_selector(key), natural_order(), descending, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QueryError;
    use crate::features::sequence::{Query, Sequence};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_multi_key_matches_sync() {
        let rows = vec![(1, 2, 'a'), (1, 1, 'b'), (0, 9, 'c'), (1, 2, 'd')];
        let sync = Query::from_vec(rows.clone())
            .order_by(|r| Ok(r.0))
            .then_by_descending(|r| Ok(r.1))
            .to_vec()
            .unwrap();
        let async_sorted = AsyncQuery::from_vec(rows)
            .order_by_async(
                |r: &(i32, i32, char)| {
                    let key = r.0;
                    async move { Ok(key) }
                },
                false,
            )
            .then_by_descending(|r| Ok(r.1))
            .to_vec()
            .await
            .unwrap();
        assert_eq!(async_sorted, sync);
        assert_eq!(sync, vec![(0, 9, 'c'), (1, 2, 'a'), (1, 2, 'd'), (1, 1, 'b')]);
    }

    #[tokio::test]
    async fn test_async_sort_is_stable() {
        let sorted = AsyncQuery::from_vec(vec![(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd')])
            .order_by(|r| Ok(r.0))
            .to_vec()
            .await
            .unwrap();
        assert_eq!(sorted, vec![(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c')]);
    }

    #[tokio::test]
    async fn test_primary_key_failure_wins() {
        let result = AsyncQuery::from_vec(vec![2, 1])
            .order_by(|_| Err::<i32, _>(QueryError::callback("primary key")))
            .then_by_async(|_: &i32| async { Err::<i32, _>(QueryError::callback("secondary key")) }, false)
            .to_vec()
            .await;
        assert_eq!(result.unwrap_err(), QueryError::callback("primary key"));
    }
}
