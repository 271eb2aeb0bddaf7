// OrderedQuery - deferred multi-key sort
//
// Holding an OrderedQuery pulls nothing. The sort is realized by the first
// pull of a consumption; `then_by*` appends a finer tier that references the
// previous one without re-iterating or mutating it.

use std::cmp::Ordering;
use std::ops::Deref;
use std::rc::Rc;

use super::tier::{sort_by_tiers, KeyTier, SharedTier};
use crate::errors::Result;
use crate::features::sequence::sources::{materialize, DeferredCursor};
use crate::features::sequence::{Query, Sequence};
use crate::shared::ports::selectors::selector;
use crate::shared::ports::{natural_order, BoxCursor, Comparer};

/// Sorted view of a query that accepts further tie-breaking keys
pub struct OrderedQuery<T> {
    source: Query<T>,
    tier: SharedTier<T>,
    sorted: Query<T>,
}

impl<T> Clone for OrderedQuery<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            tier: self.tier.clone(),
            sorted: self.sorted.clone(),
        }
    }
}

impl<T: 'static> OrderedQuery<T> {
    fn new(source: Query<T>, tier: SharedTier<T>) -> Self {
        let input = source.clone();
        let realize_tier = tier.clone();
        let sorted = source.flow(Query::from_factory(move || {
            let input = input.clone();
            let tier = realize_tier.clone();
            Box::new(DeferredCursor::new(Box::new(move || {
                let items = materialize(input.open())?;
                sort_by_tiers(items, &*tier)
            }))) as BoxCursor<T>
        }));
        Self { source, tier, sorted }
    }

    fn with_tier<K, F>(source: Query<T>, key: F, comparer: Comparer<K>, descending: bool, parent: Option<SharedTier<T>>) -> Self
    where
        K: 'static,
        F: Fn(&T) -> Result<K> + 'static,
    {
        let tier: SharedTier<T> = Rc::new(KeyTier::new(selector(key), comparer, descending, parent));
        Self::new(source, tier)
    }

    pub fn then_by<K, F>(&self, key: F) -> OrderedQuery<T>
    where
        K: Ord + 'static,
        F: Fn(&T) -> Result<K> + 'static,
    {
        self.then_by_with(key, |a: &K, b: &K| a.cmp(b), false)
    }

    pub fn then_by_descending<K, F>(&self, key: F) -> OrderedQuery<T>
    where
        K: Ord + 'static,
        F: Fn(&T) -> Result<K> + 'static,
    {
        self.then_by_with(key, |a: &K, b: &K| a.cmp(b), true)
    }

    pub fn then_by_with<K, F, C>(&self, key: F, comparer: C, descending: bool) -> OrderedQuery<T>
    where
        K: 'static,
        F: Fn(&T) -> Result<K> + 'static,
        C: Fn(&K, &K) -> Ordering + 'static,
    {
        Self::with_tier(
            self.source.clone(),
            key,
            Rc::new(comparer),
            descending,
            Some(self.tier.clone()),
        )
    }

    /// The sorted sequence as a plain query
    pub fn as_query(&self) -> &Query<T> {
        &self.sorted
    }
}

impl<T> Deref for OrderedQuery<T> {
    type Target = Query<T>;

    fn deref(&self) -> &Query<T> {
        &self.sorted
    }
}

impl<T: 'static> Sequence<T> for OrderedQuery<T> {
    fn to_query(&self) -> Query<T> {
        self.sorted.clone()
    }
}

impl<T: 'static> Query<T> {
    /// Stable ascending sort by `key`, realized on first pull
    pub fn order_by<K, F>(&self, key: F) -> OrderedQuery<T>
    where
        K: Ord + 'static,
        F: Fn(&T) -> Result<K> + 'static,
    {
        OrderedQuery::with_tier(self.clone(), key, natural_order(), false, None)
    }

    pub fn order_by_descending<K, F>(&self, key: F) -> OrderedQuery<T>
    where
        K: Ord + 'static,
        F: Fn(&T) -> Result<K> + 'static,
    {
        OrderedQuery::with_tier(self.clone(), key, natural_order(), true, None)
    }

    pub fn order_by_with<K, F, C>(&self, key: F, comparer: C, descending: bool) -> OrderedQuery<T>
    where
        K: 'static,
        F: Fn(&T) -> Result<K> + 'static,
        C: Fn(&K, &K) -> Ordering + 'static,
    {
        OrderedQuery::with_tier(self.clone(), key, Rc::new(comparer), descending, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, Preset, SortStrategy};
    use crate::errors::QueryError;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        k: i32,
        v: &'static str,
    }

    #[test]
    fn test_order_by_is_stable() {
        let rows = Query::from_vec(vec![
            Row { k: 1, v: "a" },
            Row { k: 1, v: "b" },
            Row { k: 0, v: "c" },
        ]);
        let sorted = rows.order_by(|row| Ok(row.k)).to_vec().unwrap();
        let values: Vec<_> = sorted.iter().map(|row| row.v).collect();
        assert_eq!(values, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_then_by_descending() {
        let rows = Query::from_vec(vec![(1, 2), (1, 1), (0, 9)]);
        let sorted = rows
            .order_by(|row| Ok(row.0))
            .then_by_descending(|row| Ok(row.1))
            .to_vec()
            .unwrap();
        assert_eq!(sorted, vec![(0, 9), (1, 2), (1, 1)]);
    }

    #[test]
    fn test_then_by_leaves_previous_tier_untouched() {
        let rows = Query::from_vec(vec![(1, 'b'), (0, 'z'), (1, 'a')]);
        let coarse = rows.order_by(|row| Ok(row.0));
        let fine = coarse.then_by(|row| Ok(row.1));
        assert_eq!(fine.to_vec().unwrap(), vec![(0, 'z'), (1, 'a'), (1, 'b')]);
        assert_eq!(coarse.to_vec().unwrap(), vec![(0, 'z'), (1, 'b'), (1, 'a')]);
    }

    #[test]
    fn test_sort_is_deferred() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let sorted = Query::from_vec(vec![3, 1, 2]).order_by(move |x| {
            counter.set(counter.get() + 1);
            Ok(*x)
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(sorted.first().unwrap(), 1);
        // one key evaluation per element
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_custom_comparer() {
        let words = Query::from_vec(vec!["bb", "a", "ccc"]);
        let sorted = words
            .order_by_with(|w| Ok(w.len()), |a: &usize, b: &usize| b.cmp(a), false)
            .to_vec()
            .unwrap();
        assert_eq!(sorted, vec!["ccc", "bb", "a"]);
    }

    #[test]
    fn test_key_failure_surfaces_on_pull() {
        let sorted = Query::from_vec(vec![1, 2]).order_by(|_| Err::<i32, _>(QueryError::callback("no key")));
        assert_eq!(sorted.to_vec().unwrap_err(), QueryError::callback("no key"));
    }

    #[test]
    fn test_strategies_agree() {
        let rows = Query::from_vec(vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')]);
        let permutation = rows.order_by(|row| Ok(row.0)).to_vec().unwrap();
        let stable = EngineConfig::preset(Preset::Custom)
            .sort_strategy(SortStrategy::Stable)
            .scoped(|| rows.order_by(|row| Ok(row.0)).to_vec())
            .unwrap()
            .unwrap();
        assert_eq!(permutation, stable);
    }

    #[test]
    fn test_primary_key_failure_wins() {
        let result = Query::from_vec(vec![2, 1])
            .order_by(|_| Err::<i32, _>(QueryError::callback("primary key")))
            .then_by(|_| Err::<i32, _>(QueryError::callback("secondary key")))
            .to_vec();
        assert_eq!(result.unwrap_err(), QueryError::callback("primary key"));
    }
}
