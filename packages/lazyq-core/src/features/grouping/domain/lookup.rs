//! Lookup - finalized key -> values multimap
//!
//! Keys keep first-occurrence order (IndexMap). Key equality goes through
//! the lookup's [`Equaler`], so buckets are addressed by a precomputed hash
//! plus the equaler's `equals`.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::{Equivalent, IndexMap};

use super::group::Group;
use crate::features::sequence::{Query, Sequence};
use crate::shared::ports::{Equaler, SharedEqualer};

/// Stored key: hashes to the equaler's hash, compares with its `equals`
pub(crate) struct LookupKey<K> {
    key: K,
    hash: u64,
    equaler: SharedEqualer<K>,
}

impl<K> Hash for LookupKey<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl<K> PartialEq for LookupKey<K> {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.equaler.equals(&self.key, &other.key)
    }
}

impl<K> Eq for LookupKey<K> {}

/// Borrowed probe for lookups without building a `LookupKey`
struct KeyProbe<'a, K> {
    key: &'a K,
    hash: u64,
    equaler: &'a dyn Equaler<K>,
}

impl<K> Hash for KeyProbe<'_, K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl<K> Equivalent<LookupKey<K>> for KeyProbe<'_, K> {
    fn equivalent(&self, stored: &LookupKey<K>) -> bool {
        self.hash == stored.hash && self.equaler.equals(self.key, &stored.key)
    }
}

type Buckets<K, V> = IndexMap<LookupKey<K>, V, ahash::RandomState>;

/// Single-pass builder; buckets are created on first occurrence
pub(crate) struct LookupBuilder<K, V> {
    buckets: Buckets<K, Vec<V>>,
    equaler: SharedEqualer<K>,
}

impl<K, V> LookupBuilder<K, V> {
    pub(crate) fn new(equaler: SharedEqualer<K>) -> Self {
        Self {
            buckets: IndexMap::with_hasher(ahash::RandomState::new()),
            equaler,
        }
    }

    pub(crate) fn push(&mut self, key: K, value: V) {
        let hash = self.equaler.hash(&key);
        let probe = KeyProbe {
            key: &key,
            hash,
            equaler: &*self.equaler,
        };
        if let Some(bucket) = self.buckets.get_mut(&probe) {
            bucket.push(value);
            return;
        }
        let stored = LookupKey {
            key,
            hash,
            equaler: self.equaler.clone(),
        };
        self.buckets.insert(stored, vec![value]);
    }

    pub(crate) fn finish(self) -> Lookup<K, V> {
        let groups = self
            .buckets
            .into_iter()
            .map(|(key, values)| (key, Rc::new(values)))
            .collect::<IndexMap<_, _, ahash::RandomState>>();
        Lookup {
            groups,
            equaler: self.equaler,
        }
    }
}

/// Key -> group multimap in first-occurrence key order
pub struct Lookup<K, V> {
    groups: Buckets<K, Rc<Vec<V>>>,
    equaler: SharedEqualer<K>,
}

impl<K, V> Lookup<K, V> {
    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn probe<'a>(&'a self, key: &'a K) -> KeyProbe<'a, K> {
        KeyProbe {
            key,
            hash: self.equaler.hash(key),
            equaler: &*self.equaler,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.groups.contains_key(&self.probe(key))
    }

    /// Values for `key`, in source order
    pub fn get(&self, key: &K) -> Option<&[V]> {
        self.groups.get(&self.probe(key)).map(|values| values.as_slice())
    }

    pub(crate) fn get_shared(&self, key: &K) -> Option<Rc<Vec<V>>> {
        self.groups.get(&self.probe(key)).cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.groups.keys().map(|stored| &stored.key)
    }

    /// `(key, values)` in first-occurrence key order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.groups
            .iter()
            .map(|(stored, values)| (&stored.key, values.as_slice()))
    }

    pub fn into_groups(self) -> Vec<Group<K, V>> {
        self.groups
            .into_iter()
            .map(|(stored, values)| Group::new(stored.key, values))
            .collect()
    }
}

impl<K, V: Clone + 'static> Lookup<K, V> {
    /// Lazy values for `key`; empty when the key is absent
    pub fn values(&self, key: &K) -> Query<V> {
        match self.get_shared(key) {
            Some(values) => Query::from_shared(values),
            None => Query::empty(),
        }
    }
}

impl<K: Clone, V> Lookup<K, V> {
    pub fn group(&self, key: &K) -> Option<Group<K, V>> {
        let (_, stored, values) = self.groups.get_full(&self.probe(key))?;
        Some(Group::new(stored.key.clone(), values.clone()))
    }

    pub fn groups(&self) -> Vec<Group<K, V>> {
        self.groups
            .iter()
            .map(|(stored, values)| Group::new(stored.key.clone(), values.clone()))
            .collect()
    }
}

impl<K: Clone + 'static, V: 'static> Sequence<Group<K, V>> for Lookup<K, V> {
    fn to_query(&self) -> Query<Group<K, V>> {
        Query::from_vec(self.groups())
    }
}
