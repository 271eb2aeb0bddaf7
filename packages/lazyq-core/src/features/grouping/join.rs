// Grouping and join operators over the lookup engine
//
// - group_by:   one group per distinct key, first-occurrence order
// - join:       inner lookup built on first pull, outer side streamed
// - group_join: one result per outer element with its (possibly empty) group
// - full_join:  both sides bucketed; outer keys first, then inner-only keys

use std::hash::Hash;
use std::rc::Rc;

use super::builder::build_groupings;
use super::domain::{Group, Lookup};
use crate::errors::{QueryError, Result};
use crate::features::sequence::sources::DeferredCursor;
use crate::features::sequence::Query;
use crate::shared::ports::selectors::selector;
use crate::shared::ports::{default_equaler, BoxCursor, Cursor, Selector, SharedEqualer, Upstream};

/// Inner side of a join, bucketed on first use
pub(crate) struct LazyLookup<I, K> {
    inner: Option<Query<I>>,
    key: Selector<I, K>,
    equaler: SharedEqualer<K>,
    lookup: Option<Lookup<K, I>>,
}

impl<I: 'static, K> LazyLookup<I, K> {
    pub(crate) fn new(inner: Query<I>, key: Selector<I, K>, equaler: SharedEqualer<K>) -> Self {
        Self {
            inner: Some(inner),
            key,
            equaler,
            lookup: None,
        }
    }

    pub(crate) fn get(&mut self) -> Result<&Lookup<K, I>> {
        if let Some(inner) = self.inner.take() {
            let lookup = build_groupings(inner.open(), &*self.key, &|item: I| Ok(item), self.equaler.clone())?;
            self.lookup = Some(lookup);
        }
        self.lookup
            .as_ref()
            .ok_or_else(|| QueryError::value("join lookup unavailable after a failed build"))
    }
}

struct JoinCursor<T, I, K, R> {
    outer: Upstream<T>,
    outer_key: Selector<T, K>,
    inner: LazyLookup<I, K>,
    result: Rc<dyn Fn(&T, &I) -> Result<R>>,
    current: Option<(T, Rc<Vec<I>>, usize)>,
}

impl<T, I: 'static, K, R> Cursor for JoinCursor<T, I, K, R> {
    type Item = R;

    fn take_next(&mut self) -> Result<Option<R>> {
        loop {
            if let Some((item, matches, position)) = self.current.as_mut() {
                if let Some(matched) = matches.get(*position) {
                    *position += 1;
                    let joined = (self.result)(item, matched);
                    return self.outer.guard(joined).map(Some);
                }
            }
            self.current = None;

            let lookup = self.inner.get();
            let lookup = self.outer.guard(lookup)?;
            let Some(item) = self.outer.pull()? else {
                return Ok(None);
            };
            let key = self.outer.guard((self.outer_key)(&item))?;
            if let Some(matches) = lookup.get_shared(&key) {
                self.current = Some((item, matches, 0));
            }
        }
    }

    fn close(&mut self) {
        self.current = None;
        self.outer.release();
    }
}

struct GroupJoinCursor<T, I, K, R> {
    outer: Upstream<T>,
    outer_key: Selector<T, K>,
    inner: LazyLookup<I, K>,
    result: Rc<dyn Fn(&T, Query<I>) -> Result<R>>,
}

impl<T, I: Clone + 'static, K, R> Cursor for GroupJoinCursor<T, I, K, R> {
    type Item = R;

    fn take_next(&mut self) -> Result<Option<R>> {
        let lookup = self.inner.get();
        let lookup = self.outer.guard(lookup)?;
        let Some(item) = self.outer.pull()? else {
            return Ok(None);
        };
        let key = self.outer.guard((self.outer_key)(&item))?;
        let group = lookup.values(&key);
        let joined = (self.result)(&item, group);
        self.outer.guard(joined).map(Some)
    }

    fn close(&mut self) {
        self.outer.release();
    }
}

/// Key union of two lookups: outer keys (outer-major cross product), then inner-only keys
///
/// A side with no values for a key is padded with a single `None`.
pub(crate) fn full_join_pairs<K, T: Clone, I: Clone>(
    outer: &Lookup<K, T>,
    inner: &Lookup<K, I>,
) -> Vec<(Option<T>, Option<I>)> {
    let mut pairs = Vec::new();
    for (key, outers) in outer.iter() {
        match inner.get(key) {
            Some(inners) => {
                for left in outers {
                    for right in inners {
                        pairs.push((Some(left.clone()), Some(right.clone())));
                    }
                }
            }
            None => pairs.extend(outers.iter().map(|left| (Some(left.clone()), None))),
        }
    }
    for (key, inners) in inner.iter() {
        if !outer.contains(key) {
            pairs.extend(inners.iter().map(|right| (None, Some(right.clone()))));
        }
    }
    pairs
}

impl<T: 'static> Query<T> {
    /// One group per distinct key, in first-occurrence order
    pub fn group_by<K, F>(&self, key: F) -> Query<Group<K, T>>
    where
        K: Eq + Hash + 'static,
        F: Fn(&T) -> Result<K> + 'static,
    {
        self.group_by_with(key, |item: T| Ok(item), default_equaler())
    }

    pub fn group_by_with<K, V, KF, VF>(&self, key: KF, element: VF, equaler: SharedEqualer<K>) -> Query<Group<K, V>>
    where
        K: 'static,
        V: 'static,
        KF: Fn(&T) -> Result<K> + 'static,
        VF: Fn(T) -> Result<V> + 'static,
    {
        let source = self.clone();
        let key = selector(key);
        let element: Rc<dyn Fn(T) -> Result<V>> = Rc::new(element);
        Query::from_factory(move || {
            let (source, key, element, equaler) = (source.clone(), key.clone(), element.clone(), equaler.clone());
            Box::new(DeferredCursor::new(Box::new(move || {
                let lookup = build_groupings(source.open(), &*key, &*element, equaler)?;
                Ok(lookup.into_groups())
            }))) as BoxCursor<Group<K, V>>
        })
    }

    /// Inner equi-join: one result per matching (outer, inner) pair, outer order
    pub fn join<I, K, R, OK, IK, RF>(&self, inner: &Query<I>, outer_key: OK, inner_key: IK, result: RF) -> Query<R>
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
        inner: &Query<I>,
        outer_key: OK,
        inner_key: IK,
        result: RF,
        equaler: SharedEqualer<K>,
    ) -> Query<R>
    where
        I: 'static,
        K: 'static,
        R: 'static,
        OK: Fn(&T) -> Result<K> + 'static,
        IK: Fn(&I) -> Result<K> + 'static,
        RF: Fn(&T, &I) -> Result<R> + 'static,
    {
        let source = self.clone();
        let inner = inner.clone();
        let outer_key = selector(outer_key);
        let inner_key = selector(inner_key);
        let result: Rc<dyn Fn(&T, &I) -> Result<R>> = Rc::new(result);
        Query::from_factory(move || {
            Box::new(JoinCursor {
                outer: Upstream::new(source.open()),
                outer_key: outer_key.clone(),
                inner: LazyLookup::new(inner.clone(), inner_key.clone(), equaler.clone()),
                result: result.clone(),
                current: None,
            }) as BoxCursor<R>
        })
    }

    /// One result per outer element, paired with its matching inner group
    pub fn group_join<I, K, R, OK, IK, RF>(&self, inner: &Query<I>, outer_key: OK, inner_key: IK, result: RF) -> Query<R>
    where
        I: Clone + 'static,
        K: Eq + Hash + 'static,
        R: 'static,
        OK: Fn(&T) -> Result<K> + 'static,
        IK: Fn(&I) -> Result<K> + 'static,
        RF: Fn(&T, Query<I>) -> Result<R> + 'static,
    {
        self.group_join_with(inner, outer_key, inner_key, result, default_equaler())
    }

    pub fn group_join_with<I, K, R, OK, IK, RF>(
        &self,
        inner: &Query<I>,
        outer_key: OK,
        inner_key: IK,
        result: RF,
        equaler: SharedEqualer<K>,
    ) -> Query<R>
    where
        I: Clone + 'static,
        K: 'static,
        R: 'static,
        OK: Fn(&T) -> Result<K> + 'static,
        IK: Fn(&I) -> Result<K> + 'static,
        RF: Fn(&T, Query<I>) -> Result<R> + 'static,
    {
        let source = self.clone();
        let inner = inner.clone();
        let outer_key = selector(outer_key);
        let inner_key = selector(inner_key);
        let result: Rc<dyn Fn(&T, Query<I>) -> Result<R>> = Rc::new(result);
        Query::from_factory(move || {
            Box::new(GroupJoinCursor {
                outer: Upstream::new(source.open()),
                outer_key: outer_key.clone(),
                inner: LazyLookup::new(inner.clone(), inner_key.clone(), equaler.clone()),
                result: result.clone(),
            }) as BoxCursor<R>
        })
    }

    /// Full outer join; a missing side is `None`
    ///
    /// Both sides are bucketed on first pull. Results come in key-discovery
    /// order across both sides, the result selector runs lazily per pair.
    pub fn full_join<I, K, R, OK, IK, RF>(&self, inner: &Query<I>, outer_key: OK, inner_key: IK, result: RF) -> Query<R>
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
        inner: &Query<I>,
        outer_key: OK,
        inner_key: IK,
        result: RF,
        equaler: SharedEqualer<K>,
    ) -> Query<R>
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
        let outer_key = selector(outer_key);
        let inner_key = selector(inner_key);
        let pairs = Query::from_factory(move || {
            let (source, inner, outer_key, inner_key, equaler) = (
                source.clone(),
                inner.clone(),
                outer_key.clone(),
                inner_key.clone(),
                equaler.clone(),
            );
            Box::new(DeferredCursor::new(Box::new(move || {
                let outer = build_groupings(source.open(), &*outer_key, &|item: T| Ok(item), equaler.clone())?;
                let inner = build_groupings(inner.open(), &*inner_key, &|item: I| Ok(item), equaler)?;
                Ok(full_join_pairs(&outer, &inner))
            }))) as BoxCursor<(Option<T>, Option<I>)>
        });
        pairs.map(move |(left, right)| result(left, right))
    }
}
