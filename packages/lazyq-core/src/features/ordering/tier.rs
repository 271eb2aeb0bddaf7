// Sort tiers - one key/comparer level of a chained multi-key sort
//
// Realization computes each tier's keys once per element, turns every tier
// into an index comparator, and sorts a permutation of 0..n. The primary
// tier compares first, finer tiers break its ties, and the original index
// breaks whatever is left, which is what makes the sort stable.

use std::cmp::Ordering;
use std::rc::Rc;

use tracing::debug;

use crate::config::{EngineConfig, SortStrategy};
use crate::errors::Result;
use crate::shared::ports::{Comparer, Selector};

/// Compares two positions of the materialized input
pub(crate) type TierComparator = Box<dyn Fn(usize, usize) -> Ordering>;

pub(crate) type SharedTier<T> = Rc<dyn SortTier<T>>;

pub(crate) trait SortTier<T> {
    /// Precompute keys for `items` and return a comparator over their positions
    fn key_comparator(&self, items: &[T]) -> Result<TierComparator>;

    /// The coarser tier this one breaks ties for
    fn parent(&self) -> Option<&SharedTier<T>>;
}

pub(crate) struct KeyTier<T, K> {
    key: Selector<T, K>,
    comparer: Comparer<K>,
    descending: bool,
    parent: Option<SharedTier<T>>,
}

impl<T, K> KeyTier<T, K> {
    pub(crate) fn new(
        key: Selector<T, K>,
        comparer: Comparer<K>,
        descending: bool,
        parent: Option<SharedTier<T>>,
    ) -> Self {
        Self {
            key,
            comparer,
            descending,
            parent,
        }
    }
}

impl<T, K: 'static> SortTier<T> for KeyTier<T, K> {
    fn key_comparator(&self, items: &[T]) -> Result<TierComparator> {
        let keys = items.iter().map(|item| (self.key)(item)).collect::<Result<Vec<K>>>()?;
        Ok(keyed_comparator(keys, self.comparer.clone(), self.descending))
    }

    fn parent(&self) -> Option<&SharedTier<T>> {
        self.parent.as_ref()
    }
}

/// Comparator over precomputed keys; descending reverses this tier only
pub(crate) fn keyed_comparator<K: 'static>(keys: Vec<K>, comparer: Comparer<K>, descending: bool) -> TierComparator {
    Box::new(move |a, b| {
        let ordering = comparer(&keys[a], &keys[b]);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    })
}

/// Sorted permutation of `0..len` under `tiers` (primary first), index as last resort
pub(crate) fn sort_permutation(len: usize, tiers: &[TierComparator], strategy: SortStrategy) -> Vec<usize> {
    let mut permutation: Vec<usize> = (0..len).collect();
    let compare = |a: &usize, b: &usize| {
        tiers
            .iter()
            .map(|tier| tier(*a, *b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.cmp(b))
    };
    match strategy {
        SortStrategy::Permutation => permutation.sort_unstable_by(compare),
        SortStrategy::Stable => permutation.sort_by(compare),
    }
    permutation
}

/// Move `items` into permutation order
pub(crate) fn apply_permutation<T>(items: Vec<T>, permutation: &[usize]) -> Vec<T> {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    permutation.iter().filter_map(|&index| slots[index].take()).collect()
}

/// Sort materialized items by the tier chain ending at `tier`
pub(crate) fn sort_by_tiers<T>(items: Vec<T>, tier: &dyn SortTier<T>) -> Result<Vec<T>> {
    // the chain links finest to primary; keys are computed primary first
    let mut chain: Vec<&dyn SortTier<T>> = vec![tier];
    let mut next = tier.parent();
    while let Some(parent) = next {
        chain.push(&**parent);
        next = parent.parent();
    }
    let comparators = chain
        .iter()
        .rev()
        .map(|tier| tier.key_comparator(&items))
        .collect::<Result<Vec<_>>>()?;

    let strategy = EngineConfig::current().sort.strategy;
    debug!(
        elements = items.len(),
        tiers = comparators.len(),
        strategy = ?strategy,
        "sort realized"
    );
    let permutation = sort_permutation(items.len(), &comparators, strategy);
    Ok(apply_permutation(items, &permutation))
}
