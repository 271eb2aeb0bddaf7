// Sequence - statically-typed query interface
//
// Every sequence wrapper (Query, OrderedQuery, HierarchyQuery, Group,
// Lookup) implements `to_query`; the terminal conversions below come for
// free. Terminals are the only operations that realize a sequence.

use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use super::iter::QueryIter;
use super::query::Query;
use crate::errors::{QueryError, Result};
use crate::features::grouping::{build_groupings, Lookup};
use crate::shared::ports::{default_equaler, BoxCursor, SharedEqualer};

pub trait Sequence<T: 'static> {
    /// The lazy sequence behind this wrapper
    fn to_query(&self) -> Query<T>;

    fn cursor(&self) -> BoxCursor<T> {
        self.to_query().open()
    }

    fn iter(&self) -> QueryIter<T> {
        QueryIter::new(self.cursor())
    }

    fn to_vec(&self) -> Result<Vec<T>> {
        self.iter().collect()
    }

    fn count(&self) -> Result<usize> {
        let mut count = 0;
        for item in self.iter() {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// First element; pulls exactly one element and closes
    fn first(&self) -> Result<T> {
        self.first_or_none()?.ok_or_else(QueryError::no_elements)
    }

    fn first_or_none(&self) -> Result<Option<T>> {
        let mut iter = self.iter();
        let first = iter.next().transpose();
        iter.close();
        first
    }

    fn last(&self) -> Result<T> {
        let mut last = None;
        for item in self.iter() {
            last = Some(item?);
        }
        last.ok_or_else(QueryError::no_elements)
    }

    /// The only element; fails on zero or more than one
    fn single(&self) -> Result<T> {
        let mut iter = self.iter();
        let first = iter.next().transpose()?.ok_or_else(QueryError::no_elements)?;
        let second = iter.next().transpose()?;
        iter.close();
        match second {
            None => Ok(first),
            Some(_) => Err(QueryError::value("sequence contains more than one element")),
        }
    }

    fn element_at(&self, index: usize) -> Result<T> {
        let mut iter = self.iter();
        let mut position = 0;
        while let Some(item) = iter.next() {
            let item = item?;
            if position == index {
                iter.close();
                return Ok(item);
            }
            position += 1;
        }
        Err(QueryError::value(format!(
            "index {} out of range for sequence of length {}",
            index, position
        )))
    }

    fn any<P>(&self, mut predicate: P) -> Result<bool>
    where
        P: FnMut(&T) -> Result<bool>,
    {
        let mut iter = self.iter();
        while let Some(item) = iter.next() {
            let item = item?;
            let matched = predicate(&item).inspect_err(|_| iter.close())?;
            if matched {
                iter.close();
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn all<P>(&self, mut predicate: P) -> Result<bool>
    where
        P: FnMut(&T) -> Result<bool>,
    {
        let negated = self.any(|item| predicate(item).map(|matched| !matched))?;
        Ok(!negated)
    }

    fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(T) -> Result<()>,
    {
        let mut iter = self.iter();
        while let Some(item) = iter.next() {
            f(item?).inspect_err(|_| iter.close())?;
        }
        Ok(())
    }

    /// Distinct elements in first-occurrence order
    fn to_set(&self) -> Result<IndexSet<T, ahash::RandomState>>
    where
        T: Eq + Hash,
    {
        let mut set = IndexSet::with_hasher(ahash::RandomState::new());
        for item in self.iter() {
            set.insert(item?);
        }
        Ok(set)
    }

    /// Key/value map; a repeated key keeps its first position and last value
    fn to_map<K, V, KF, VF>(&self, mut key: KF, mut value: VF) -> Result<IndexMap<K, V, ahash::RandomState>>
    where
        K: Eq + Hash,
        KF: FnMut(&T) -> Result<K>,
        VF: FnMut(&T) -> Result<V>,
    {
        let mut map = IndexMap::with_hasher(ahash::RandomState::new());
        let mut iter = self.iter();
        while let Some(item) = iter.next() {
            let item = item?;
            let entry = key(&item)
                .and_then(|k| value(&item).map(|v| (k, v)))
                .inspect_err(|_| iter.close())?;
            map.insert(entry.0, entry.1);
        }
        Ok(map)
    }

    fn to_lookup<K, F>(&self, key: F) -> Result<Lookup<K, T>>
    where
        K: Eq + Hash + 'static,
        F: Fn(&T) -> Result<K>,
    {
        self.to_lookup_with(key, |item: T| Ok(item), default_equaler())
    }

    fn to_lookup_with<K, V, KF, VF>(&self, key: KF, element: VF, equaler: SharedEqualer<K>) -> Result<Lookup<K, V>>
    where
        KF: Fn(&T) -> Result<K>,
        VF: Fn(T) -> Result<V>,
    {
        build_groupings(self.cursor(), &key, &element, equaler)
    }

    /// Plain keyed record; later elements overwrite earlier keys
    fn to_record<KF, VF>(&self, mut key: KF, mut value: VF) -> Result<Map<String, Value>>
    where
        KF: FnMut(&T) -> Result<String>,
        VF: FnMut(&T) -> Result<Value>,
    {
        let mut record = Map::new();
        let mut iter = self.iter();
        while let Some(item) = iter.next() {
            let item = item?;
            let entry = key(&item)
                .and_then(|k| value(&item).map(|v| (k, v)))
                .inspect_err(|_| iter.close())?;
            record.insert(entry.0, entry.1);
        }
        Ok(record)
    }
}

impl<T: 'static> Sequence<T> for Query<T> {
    fn to_query(&self) -> Query<T> {
        self.clone()
    }
}
