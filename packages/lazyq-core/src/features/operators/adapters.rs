// Stage cursors for the element-wise operators
//
// Each stage owns its source through an `Upstream`, so the source is closed
// exactly once: when the stage is closed, when the source is exhausted, or
// before a source/callback failure is returned.

use std::hash::Hash;

use ahash::AHashSet;

use crate::errors::Result;
use crate::features::sequence::sources::MaterializeBudget;
use crate::features::sequence::Query;
use crate::shared::ports::{BoxCursor, Cursor, Predicate, Projection, Upstream};

pub(crate) struct MapCursor<T, U> {
    upstream: Upstream<T>,
    project: Projection<T, U>,
}

impl<T, U> MapCursor<T, U> {
    pub(crate) fn new(source: BoxCursor<T>, project: Projection<T, U>) -> Self {
        Self {
            upstream: Upstream::new(source),
            project,
        }
    }
}

impl<T, U> Cursor for MapCursor<T, U> {
    type Item = U;

    fn take_next(&mut self) -> Result<Option<U>> {
        match self.upstream.pull()? {
            Some(item) => {
                let mapped = (self.project)(item);
                self.upstream.guard(mapped).map(Some)
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}

pub(crate) struct FilterCursor<T> {
    upstream: Upstream<T>,
    predicate: Predicate<T>,
}

impl<T> FilterCursor<T> {
    pub(crate) fn new(source: BoxCursor<T>, predicate: Predicate<T>) -> Self {
        Self {
            upstream: Upstream::new(source),
            predicate,
        }
    }
}

impl<T> Cursor for FilterCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        while let Some(item) = self.upstream.pull()? {
            let keep = (self.predicate)(&item);
            if self.upstream.guard(keep)? {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}

/// Expands each outer element into an inner query, one inner cursor at a time
pub(crate) struct FlatMapCursor<T, U> {
    outer: Upstream<T>,
    inner: Upstream<U>,
    expand: Projection<T, Query<U>>,
}

impl<T, U> FlatMapCursor<T, U> {
    pub(crate) fn new(source: BoxCursor<T>, expand: Projection<T, Query<U>>) -> Self {
        Self {
            outer: Upstream::new(source),
            inner: Upstream::released(),
            expand,
        }
    }
}

impl<T, U: 'static> Cursor for FlatMapCursor<T, U> {
    type Item = U;

    fn take_next(&mut self) -> Result<Option<U>> {
        loop {
            match self.inner.pull() {
                Ok(Some(item)) => return Ok(Some(item)),
                Ok(None) => {}
                Err(err) => {
                    self.outer.release();
                    return Err(err);
                }
            }
            let Some(item) = self.outer.pull()? else {
                return Ok(None);
            };
            let expanded = (self.expand)(item);
            let query = self.outer.guard(expanded)?;
            self.inner = Upstream::new(query.open());
        }
    }

    fn close(&mut self) {
        self.inner.release();
        self.outer.release();
    }
}

/// Yields at most `remaining` elements; releases the source right after the last
pub(crate) struct TakeCursor<T> {
    upstream: Upstream<T>,
    remaining: usize,
}

impl<T> TakeCursor<T> {
    pub(crate) fn new(source: BoxCursor<T>, count: usize) -> Self {
        Self {
            upstream: Upstream::new(source),
            remaining: count,
        }
    }
}

impl<T> Cursor for TakeCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        if self.remaining == 0 {
            self.upstream.release();
            return Ok(None);
        }
        let item = self.upstream.pull()?;
        if item.is_some() {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.upstream.release();
            }
        }
        Ok(item)
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}

pub(crate) struct SkipCursor<T> {
    upstream: Upstream<T>,
    to_skip: usize,
}

impl<T> SkipCursor<T> {
    pub(crate) fn new(source: BoxCursor<T>, count: usize) -> Self {
        Self {
            upstream: Upstream::new(source),
            to_skip: count,
        }
    }
}

impl<T> Cursor for SkipCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        while self.to_skip > 0 {
            self.to_skip -= 1;
            if self.upstream.pull()?.is_none() {
                return Ok(None);
            }
        }
        self.upstream.pull()
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}

pub(crate) struct TakeWhileCursor<T> {
    upstream: Upstream<T>,
    predicate: Predicate<T>,
}

impl<T> TakeWhileCursor<T> {
    pub(crate) fn new(source: BoxCursor<T>, predicate: Predicate<T>) -> Self {
        Self {
            upstream: Upstream::new(source),
            predicate,
        }
    }
}

impl<T> Cursor for TakeWhileCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        let Some(item) = self.upstream.pull()? else {
            return Ok(None);
        };
        let keep = (self.predicate)(&item);
        if self.upstream.guard(keep)? {
            Ok(Some(item))
        } else {
            self.upstream.release();
            Ok(None)
        }
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}

pub(crate) struct SkipWhileCursor<T> {
    upstream: Upstream<T>,
    predicate: Predicate<T>,
    skipping: bool,
}

impl<T> SkipWhileCursor<T> {
    pub(crate) fn new(source: BoxCursor<T>, predicate: Predicate<T>) -> Self {
        Self {
            upstream: Upstream::new(source),
            predicate,
            skipping: true,
        }
    }
}

impl<T> Cursor for SkipWhileCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        while self.skipping {
            let Some(item) = self.upstream.pull()? else {
                return Ok(None);
            };
            let skip = (self.predicate)(&item);
            if !self.upstream.guard(skip)? {
                self.skipping = false;
                return Ok(Some(item));
            }
        }
        self.upstream.pull()
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}

/// First source, then the second; the second is not opened until needed
pub(crate) struct ConcatCursor<T> {
    first: Upstream<T>,
    second: Upstream<T>,
    pending: Option<Query<T>>,
}

impl<T> ConcatCursor<T> {
    pub(crate) fn new(first: BoxCursor<T>, second: Query<T>) -> Self {
        Self {
            first: Upstream::new(first),
            second: Upstream::released(),
            pending: Some(second),
        }
    }
}

impl<T: 'static> Cursor for ConcatCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        if let Some(item) = self.first.pull()? {
            return Ok(Some(item));
        }
        if let Some(second) = self.pending.take() {
            self.second = Upstream::new(second.open());
        }
        self.second.pull()
    }

    fn close(&mut self) {
        self.first.release();
        self.pending = None;
        self.second.release();
    }
}

pub(crate) struct DistinctCursor<T> {
    upstream: Upstream<T>,
    seen: AHashSet<T>,
}

impl<T> DistinctCursor<T> {
    pub(crate) fn new(source: BoxCursor<T>) -> Self {
        Self {
            upstream: Upstream::new(source),
            seen: AHashSet::new(),
        }
    }
}

impl<T: Eq + Hash + Clone> Cursor for DistinctCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        while let Some(item) = self.upstream.pull()? {
            if self.seen.insert(item.clone()) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.upstream.release();
        self.seen.clear();
    }
}

pub(crate) struct DefaultIfEmptyCursor<T> {
    upstream: Upstream<T>,
    fallback: Option<T>,
}

impl<T> DefaultIfEmptyCursor<T> {
    pub(crate) fn new(source: BoxCursor<T>, fallback: T) -> Self {
        Self {
            upstream: Upstream::new(source),
            fallback: Some(fallback),
        }
    }
}

impl<T> Cursor for DefaultIfEmptyCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        match self.upstream.pull()? {
            Some(item) => {
                self.fallback = None;
                Ok(Some(item))
            }
            None => Ok(self.fallback.take()),
        }
    }

    fn close(&mut self) {
        self.fallback = None;
        self.upstream.release();
    }
}

/// Pairs elements positionally; stops (and closes both) at the shorter side
pub(crate) struct ZipCursor<A, B> {
    left: Upstream<A>,
    right: Upstream<B>,
}

impl<A, B> ZipCursor<A, B> {
    pub(crate) fn new(left: BoxCursor<A>, right: BoxCursor<B>) -> Self {
        Self {
            left: Upstream::new(left),
            right: Upstream::new(right),
        }
    }
}

impl<A, B> Cursor for ZipCursor<A, B> {
    type Item = (A, B);

    fn take_next(&mut self) -> Result<Option<(A, B)>> {
        let left = match self.left.pull() {
            Ok(Some(item)) => item,
            other => {
                self.right.release();
                return other.map(|_| None);
            }
        };
        match self.right.pull() {
            Ok(Some(right)) => Ok(Some((left, right))),
            other => {
                self.left.release();
                other.map(|_| None)
            }
        }
    }

    fn close(&mut self) {
        self.left.release();
        self.right.release();
    }
}

pub(crate) struct ChunkCursor<T> {
    upstream: Upstream<T>,
    size: usize,
    // preallocation is capped; a chunk may be far larger than its input
    capacity: usize,
}

impl<T> ChunkCursor<T> {
    pub(crate) fn new(source: BoxCursor<T>, size: usize) -> Self {
        Self {
            upstream: Upstream::new(source),
            size,
            capacity: size.min(MaterializeBudget::current().initial_capacity),
        }
    }
}

impl<T> Cursor for ChunkCursor<T> {
    type Item = Vec<T>;

    fn take_next(&mut self) -> Result<Option<Vec<T>>> {
        let mut chunk = Vec::with_capacity(self.capacity);
        while chunk.len() < self.size {
            match self.upstream.pull()? {
                Some(item) => chunk.push(item),
                None => break,
            }
        }
        Ok(if chunk.is_empty() { None } else { Some(chunk) })
    }

    fn close(&mut self) {
        self.upstream.release();
    }
}
