//! Group - a key paired with its values

use std::rc::Rc;

use crate::features::sequence::{Query, Sequence};

/// Immutable key + values pair produced by grouping
pub struct Group<K, V> {
    key: K,
    values: Rc<Vec<V>>,
}

impl<K: Clone, V> Clone for Group<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            values: self.values.clone(),
        }
    }
}

impl<K: std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for Group<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("key", &self.key)
            .field("values", &self.values)
            .finish()
    }
}

impl<K, V> Group<K, V> {
    pub(crate) fn new(key: K, values: Rc<Vec<V>>) -> Self {
        Self { key, values }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_parts(self) -> (K, Rc<Vec<V>>) {
        (self.key, self.values)
    }
}

impl<K, V: Clone + 'static> Sequence<V> for Group<K, V> {
    fn to_query(&self) -> Query<V> {
        Query::from_shared(self.values.clone())
    }
}
