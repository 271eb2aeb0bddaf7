//! Callback shapes shared by operators
//!
//! Selectors are fallible: a failing selector aborts the pull chain after
//! the stage has closed its own source. Comparers are infallible.

use std::cmp::Ordering;
use std::future::Future;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::errors::Result;

pub type Selector<T, K> = Rc<dyn Fn(&T) -> Result<K>>;

pub type Predicate<T> = Selector<T, bool>;

pub type Projection<T, U> = Rc<dyn Fn(T) -> Result<U>>;

pub type Comparer<K> = Rc<dyn Fn(&K, &K) -> Ordering>;

/// Selector whose evaluation may suspend
///
/// Receives a borrow; the returned future owns whatever it needs.
pub type AsyncSelector<T, K> = Rc<dyn Fn(&T) -> LocalBoxFuture<'static, Result<K>>>;

pub type AsyncPredicate<T> = AsyncSelector<T, bool>;

/// Owning projection whose evaluation may suspend
pub type AsyncProjection<T, U> = Rc<dyn Fn(T) -> LocalBoxFuture<'static, Result<U>>>;

pub fn natural_order<K: Ord>() -> Comparer<K> {
    Rc::new(|a: &K, b: &K| a.cmp(b))
}

pub(crate) fn selector<T, K, F>(f: F) -> Selector<T, K>
where
    F: Fn(&T) -> Result<K> + 'static,
{
    Rc::new(f)
}

pub(crate) fn async_selector<T, K, F, Fut>(f: F) -> AsyncSelector<T, K>
where
    F: Fn(&T) -> Fut + 'static,
    Fut: Future<Output = Result<K>> + 'static,
{
    Rc::new(move |value: &T| f(value).boxed_local())
}

pub(crate) fn async_projection<T, U, F, Fut>(f: F) -> AsyncProjection<T, U>
where
    F: Fn(T) -> Fut + 'static,
    Fut: Future<Output = Result<U>> + 'static,
{
    Rc::new(move |value: T| f(value).boxed_local())
}

/// Evaluate a synchronous selector as an already-completed future
pub(crate) fn lift_selector<T: 'static, K: 'static>(f: Selector<T, K>) -> AsyncSelector<T, K> {
    Rc::new(move |value: &T| future::ready(f(value)).boxed_local())
}

pub(crate) fn lift_projection<T: 'static, U: 'static>(f: Projection<T, U>) -> AsyncProjection<T, U> {
    Rc::new(move |value: T| future::ready(f(value)).boxed_local())
}
