//! Key equality strategies
//!
//! Grouping and join operators compare keys through an [`Equaler`]. The
//! default uses the key's own `Eq + Hash`; callers can supply a custom one
//! (case-insensitive strings, rounded floats, ...).

use std::hash::{BuildHasher, Hash};
use std::rc::Rc;

/// Equality + hash strategy for keys
///
/// `equals(a, b)` must imply `hash(a) == hash(b)`.
pub trait Equaler<K> {
    fn equals(&self, a: &K, b: &K) -> bool;

    fn hash(&self, value: &K) -> u64;
}

pub type SharedEqualer<K> = Rc<dyn Equaler<K>>;

/// `Eq + Hash` equality
#[derive(Clone, Default)]
pub struct DefaultEqualer {
    state: ahash::RandomState,
}

impl<K: Eq + Hash> Equaler<K> for DefaultEqualer {
    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }

    fn hash(&self, value: &K) -> u64 {
        self.state.hash_one(value)
    }
}

pub fn default_equaler<K: Eq + Hash + 'static>() -> SharedEqualer<K> {
    Rc::new(DefaultEqualer::default())
}

/// Equaler built from closures
pub struct FnEqualer<E, H> {
    equals: E,
    hash: H,
}

impl<E, H> FnEqualer<E, H> {
    pub fn new(equals: E, hash: H) -> Self {
        Self { equals, hash }
    }
}

impl<K, E, H> Equaler<K> for FnEqualer<E, H>
where
    E: Fn(&K, &K) -> bool,
    H: Fn(&K) -> u64,
{
    fn equals(&self, a: &K, b: &K) -> bool {
        (self.equals)(a, b)
    }

    fn hash(&self, value: &K) -> u64 {
        (self.hash)(value)
    }
}

/// ASCII case-insensitive string keys
#[derive(Clone, Default)]
pub struct CaseInsensitive {
    state: ahash::RandomState,
}

impl Equaler<String> for CaseInsensitive {
    fn equals(&self, a: &String, b: &String) -> bool {
        a.eq_ignore_ascii_case(b)
    }

    fn hash(&self, value: &String) -> u64 {
        self.state.hash_one(value.to_ascii_lowercase())
    }
}

/// Pointer identity for `Rc` handles: equal only when both point at the
/// same allocation, whatever the contents
#[derive(Clone, Default)]
pub struct RcIdentity {
    state: ahash::RandomState,
}

impl<N: ?Sized> Equaler<Rc<N>> for RcIdentity {
    fn equals(&self, a: &Rc<N>, b: &Rc<N>) -> bool {
        Rc::ptr_eq(a, b)
    }

    fn hash(&self, value: &Rc<N>) -> u64 {
        self.state.hash_one(Rc::as_ptr(value) as *const () as usize)
    }
}

pub fn rc_identity<N: ?Sized + 'static>() -> SharedEqualer<Rc<N>> {
    Rc::new(RcIdentity::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_equaler_is_consistent() {
        let equaler = DefaultEqualer::default();
        assert!(Equaler::<i32>::equals(&equaler, &3, &3));
        assert_eq!(
            Equaler::<i32>::hash(&equaler, &3),
            Equaler::<i32>::hash(&equaler, &3)
        );
    }

    #[test]
    fn test_case_insensitive() {
        let equaler = CaseInsensitive::default();
        let a = "Apple".to_string();
        let b = "aPPLE".to_string();
        assert!(equaler.equals(&a, &b));
        assert_eq!(equaler.hash(&a), equaler.hash(&b));
    }

    #[test]
    fn test_rc_identity_ignores_contents() {
        let equaler = RcIdentity::default();
        let a = Rc::new("leaf".to_string());
        let b = Rc::new("leaf".to_string());
        assert!(!equaler.equals(&a, &b));
        assert!(equaler.equals(&a, &a.clone()));
        assert_eq!(equaler.hash(&a), equaler.hash(&a.clone()));
    }
}
