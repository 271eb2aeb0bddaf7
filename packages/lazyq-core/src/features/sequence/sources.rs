// Source cursors - where elements enter a query
//
// Every source is cheap to create: no element is produced until the first
// `take_next`. `DeferredCursor` is the shared shape of every stage that has
// to see its whole input before yielding (sort, group, reverse, dominance).

use std::rc::Rc;

use tracing::warn;

use crate::config::EngineConfig;
use crate::errors::{QueryError, Result};
use crate::shared::ports::{BoxCursor, Cursor, Upstream};

/// Replays a shared buffer by index
pub(crate) struct VecCursor<T> {
    items: Rc<Vec<T>>,
    position: usize,
}

impl<T> VecCursor<T> {
    pub(crate) fn new(items: Rc<Vec<T>>) -> Self {
        Self { items, position: 0 }
    }
}

impl<T: Clone> Cursor for VecCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        let item = self.items.get(self.position).cloned();
        if item.is_some() {
            self.position += 1;
        }
        Ok(item)
    }

    fn close(&mut self) {
        self.position = self.items.len();
    }
}

/// Wraps a plain iterator; closing drops it (and whatever it captured)
pub(crate) struct IterCursor<I> {
    iter: Option<I>,
}

impl<I> IterCursor<I> {
    pub(crate) fn new(iter: I) -> Self {
        Self { iter: Some(iter) }
    }
}

impl<I: Iterator> Cursor for IterCursor<I> {
    type Item = I::Item;

    fn take_next(&mut self) -> Result<Option<I::Item>> {
        Ok(self.iter.as_mut().and_then(|iter| iter.next()))
    }

    fn close(&mut self) {
        self.iter = None;
    }
}

/// Wraps a fallible iterator
pub(crate) struct ResultIterCursor<I> {
    iter: Option<I>,
}

impl<I> ResultIterCursor<I> {
    pub(crate) fn new(iter: I) -> Self {
        Self { iter: Some(iter) }
    }
}

impl<T, I: Iterator<Item = Result<T>>> Cursor for ResultIterCursor<I> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        match self.iter.as_mut().and_then(|iter| iter.next()) {
            Some(Ok(item)) => Ok(Some(item)),
            Some(Err(err)) => {
                self.iter = None;
                Err(err)
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.iter = None;
    }
}

pub(crate) struct RepeatCursor<T> {
    item: T,
    remaining: usize,
}

impl<T> RepeatCursor<T> {
    pub(crate) fn new(item: T, remaining: usize) -> Self {
        Self { item, remaining }
    }
}

impl<T: Clone> Cursor for RepeatCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(self.item.clone()))
    }

    fn close(&mut self) {
        self.remaining = 0;
    }
}

pub(crate) struct EmptyCursor<T>(std::marker::PhantomData<T>);

impl<T> EmptyCursor<T> {
    pub(crate) fn new() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<T> Cursor for EmptyCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        Ok(None)
    }

    fn close(&mut self) {}
}

pub(crate) type Realize<T> = Box<dyn FnOnce() -> Result<Vec<T>>>;

/// Realizes its whole output on the first pull, then replays it
///
/// Closing before the first pull drops the realization without running it,
/// so no source is ever opened.
pub(crate) struct DeferredCursor<T> {
    realize: Option<Realize<T>>,
    buffer: std::vec::IntoIter<T>,
}

impl<T> DeferredCursor<T> {
    pub(crate) fn new(realize: Realize<T>) -> Self {
        Self {
            realize: Some(realize),
            buffer: Vec::new().into_iter(),
        }
    }
}

impl<T> Cursor for DeferredCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        if let Some(realize) = self.realize.take() {
            self.buffer = realize()?.into_iter();
        }
        Ok(self.buffer.next())
    }

    fn close(&mut self) {
        self.realize = None;
        self.buffer = Vec::new().into_iter();
    }
}

/// Materialization limits read from the active configuration
#[derive(Debug, Clone, Copy)]
pub(crate) struct MaterializeBudget {
    pub(crate) initial_capacity: usize,
    pub(crate) max_len: Option<usize>,
}

impl MaterializeBudget {
    pub(crate) fn current() -> Self {
        let config = EngineConfig::current();
        Self {
            initial_capacity: config.materialize.initial_capacity,
            max_len: config.materialize.max_len,
        }
    }

    /// Check before admitting one more element into a buffer of `len`
    pub(crate) fn admit(&self, len: usize) -> Result<()> {
        match self.max_len {
            Some(max_len) if len >= max_len => {
                warn!(max_len, "materialization limit exceeded");
                Err(QueryError::value(format!(
                    "materialization limit of {} elements exceeded",
                    max_len
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Pull a cursor to exhaustion
///
/// The cursor is closed exactly once whether the pull completes, fails or
/// trips the materialization limit.
pub(crate) fn materialize<T>(cursor: BoxCursor<T>) -> Result<Vec<T>> {
    let budget = MaterializeBudget::current();
    let mut upstream = Upstream::new(cursor);
    let mut items = Vec::with_capacity(budget.initial_capacity);
    while let Some(item) = upstream.pull()? {
        if let Err(err) = budget.admit(items.len()) {
            upstream.release();
            return Err(err);
        }
        items.push(item);
    }
    Ok(items)
}
