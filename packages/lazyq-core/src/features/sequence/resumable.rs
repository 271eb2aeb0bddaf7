// Resumable consumption - one underlying cursor, many consumers
//
// `SharedCursor` lets a sequence be split: a prefix is read eagerly, and
// the remainder is handed out as a Query that continues from the same
// underlying cursor instead of re-reading the source.
//
// - cache:      every consumption first replays what earlier caching
//               consumptions pulled, so the remainder can be re-consumed
// - leave_open: ending a consumption does not close the underlying cursor;
//               whoever consumes the shared cursor next is responsible

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace};

use super::query::Query;
use crate::config::EngineConfig;
use crate::errors::Result;
use crate::shared::ports::{BoxCursor, Cursor, Upstream};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsumeOptions {
    pub cache: bool,
    pub leave_open: bool,
}

impl ConsumeOptions {
    pub fn cached() -> Self {
        Self {
            cache: true,
            leave_open: false,
        }
    }

    pub fn leave_open() -> Self {
        Self {
            cache: false,
            leave_open: true,
        }
    }
}

struct SharedSource<T> {
    cursor: Option<BoxCursor<T>>,
    cached: Vec<T>,
}

impl<T> SharedSource<T> {
    fn pull(&mut self, release_on_failure: bool) -> Result<Option<T>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        match cursor.take_next() {
            Ok(Some(item)) => Ok(Some(item)),
            Ok(None) => {
                self.release();
                Ok(None)
            }
            Err(err) => {
                if release_on_failure {
                    self.release();
                }
                Err(err)
            }
        }
    }

    fn release(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            trace!("shared cursor closed");
            cursor.close();
        }
    }
}

impl<T> Drop for SharedSource<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Handle to one underlying cursor shared by several consumers
pub struct SharedCursor<T> {
    source: Rc<RefCell<SharedSource<T>>>,
}

impl<T> Clone for SharedCursor<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
        }
    }
}

impl<T: Clone + 'static> SharedCursor<T> {
    pub fn new(cursor: BoxCursor<T>) -> Self {
        Self {
            source: Rc::new(RefCell::new(SharedSource {
                cursor: Some(cursor),
                cached: Vec::new(),
            })),
        }
    }

    /// Lazy sequence continuing from the shared cursor
    pub fn consume(&self, options: ConsumeOptions) -> Query<T> {
        let source = self.source.clone();
        Query::from_factory(move || {
            Box::new(ResumableCursor {
                source: source.clone(),
                options,
                position: 0,
                finished: false,
            }) as BoxCursor<T>
        })
    }

    /// Pull directly from the shared cursor (bypasses the cache)
    pub fn take_next(&self) -> Result<Option<T>> {
        self.source.borrow_mut().pull(true)
    }

    pub fn close(&self) {
        self.source.borrow_mut().release();
    }

    pub fn is_open(&self) -> bool {
        self.source.borrow().cursor.is_some()
    }
}

/// Wrap `cursor` so it can be consumed in pieces
pub fn consume_with_options<T: Clone + 'static>(cursor: BoxCursor<T>, options: ConsumeOptions) -> Query<T> {
    SharedCursor::new(cursor).consume(options)
}

struct ResumableCursor<T> {
    source: Rc<RefCell<SharedSource<T>>>,
    options: ConsumeOptions,
    position: usize,
    finished: bool,
}

impl<T: Clone> Cursor for ResumableCursor<T> {
    type Item = T;

    fn take_next(&mut self) -> Result<Option<T>> {
        if self.finished {
            return Ok(None);
        }
        let mut source = self.source.borrow_mut();
        if self.options.cache {
            if let Some(item) = source.cached.get(self.position) {
                self.position += 1;
                return Ok(Some(item.clone()));
            }
        }
        match source.pull(!self.options.leave_open) {
            Ok(Some(item)) => {
                if self.options.cache {
                    source.cached.push(item.clone());
                    self.position = source.cached.len();
                }
                Ok(Some(item))
            }
            Ok(None) => {
                self.finished = true;
                Ok(None)
            }
            Err(err) => {
                self.finished = true;
                Err(err)
            }
        }
    }

    fn close(&mut self) {
        self.finished = true;
        if !self.options.leave_open {
            self.source.borrow_mut().release();
        }
    }
}

impl<T: Clone + 'static> Query<T> {
    /// Open one consumption behind a shareable handle
    pub fn share(&self) -> SharedCursor<T> {
        SharedCursor::new(self.open())
    }

    /// Split into the longest prefix satisfying `predicate` and the rest
    ///
    /// The prefix is read eagerly. The remainder starts with the first
    /// element that failed the predicate and continues lazily from the same
    /// underlying cursor; concatenating both reproduces the source.
    pub fn span<P>(&self, mut predicate: P) -> Result<(Query<T>, Query<T>)>
    where
        P: FnMut(&T) -> Result<bool>,
    {
        let options = ConsumeOptions {
            cache: EngineConfig::current().span.cache_remainder,
            leave_open: false,
        };
        let mut upstream = Upstream::new(self.open());
        let mut prefix = Vec::new();

        while let Some(item) = upstream.pull()? {
            if !upstream.guard(predicate(&item))? {
                debug!(prefix_len = prefix.len(), "span split at pivot");
                let rest = upstream
                    .detach()
                    .map(|cursor| SharedCursor::new(cursor).consume(options))
                    .unwrap_or_else(Query::empty);
                let remainder = Query::once(item).concat(rest);
                return Ok((self.flow(Query::from_vec(prefix)), self.flow(remainder)));
            }
            prefix.push(item);
        }

        Ok((self.flow(Query::from_vec(prefix)), self.flow(Query::empty())))
    }

    /// `span` with the predicate negated: prefix runs until the first match
    pub fn break_at<P>(&self, mut predicate: P) -> Result<(Query<T>, Query<T>)>
    where
        P: FnMut(&T) -> Result<bool>,
    {
        self.span(move |item| predicate(item).map(|matched| !matched))
    }

    /// First element plus a lazy remainder over the same cursor
    pub fn split_first(&self) -> Result<(Option<T>, Query<T>)> {
        let options = ConsumeOptions {
            cache: EngineConfig::current().span.cache_remainder,
            leave_open: false,
        };
        let mut upstream = Upstream::new(self.open());
        let head = upstream.pull()?;
        let rest = upstream
            .detach()
            .map(|cursor| SharedCursor::new(cursor).consume(options))
            .unwrap_or_else(Query::empty);
        Ok((head, self.flow(rest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QueryError;
    use crate::features::sequence::Sequence;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn counted(limit: usize, pulls: Rc<Cell<usize>>) -> Query<usize> {
        Query::from_fn(move || {
            let pulls = pulls.clone();
            (0..limit).inspect(move |_| pulls.set(pulls.get() + 1))
        })
    }

    #[test]
    fn test_span_splits_at_first_failure() {
        let (prefix, rest) = Query::from_vec(vec![1, 2, 5, 3, 7])
            .span(|x| Ok(*x < 4))
            .unwrap();
        assert_eq!(prefix.to_vec().unwrap(), vec![1, 2]);
        assert_eq!(rest.to_vec().unwrap(), vec![5, 3, 7]);
        // cached remainder is re-consumable
        assert_eq!(rest.to_vec().unwrap(), vec![5, 3, 7]);
    }

    #[test]
    fn test_span_does_not_double_read() {
        let pulls = Rc::new(Cell::new(0));
        let (prefix, rest) = counted(6, pulls.clone()).span(|x| Ok(*x < 2)).unwrap();
        assert_eq!(pulls.get(), 3);
        assert_eq!(prefix.count().unwrap(), 2);
        assert_eq!(rest.to_vec().unwrap(), vec![2, 3, 4, 5]);
        assert_eq!(pulls.get(), 6);
    }

    #[test]
    fn test_span_all_match() {
        let (prefix, rest) = Query::from_vec(vec![1, 2]).span(|_| Ok(true)).unwrap();
        assert_eq!(prefix.to_vec().unwrap(), vec![1, 2]);
        assert!(rest.to_vec().unwrap().is_empty());
    }

    #[test]
    fn test_span_predicate_failure() {
        let result = Query::from_vec(vec![1, 2]).span(|_| Err(QueryError::callback("boom")));
        assert_eq!(result.unwrap_err(), QueryError::callback("boom"));
    }

    #[test]
    fn test_break_at() {
        let (prefix, rest) = Query::from_vec(vec!["a", "b", "", "c"])
            .break_at(|s| Ok(s.is_empty()))
            .unwrap();
        assert_eq!(prefix.to_vec().unwrap(), vec!["a", "b"]);
        assert_eq!(rest.to_vec().unwrap(), vec!["", "c"]);
    }

    #[test]
    fn test_split_first() {
        let (head, rest) = Query::from_vec(vec![10, 20, 30]).split_first().unwrap();
        assert_eq!(head, Some(10));
        assert_eq!(rest.to_vec().unwrap(), vec![20, 30]);

        let (head, rest) = Query::<i32>::empty().split_first().unwrap();
        assert_eq!(head, None);
        assert!(rest.to_vec().unwrap().is_empty());
    }

    #[test]
    fn test_uncached_consumers_share_progress() {
        let shared = Query::from_vec(vec![1, 2, 3, 4]).share();
        let first = shared.consume(ConsumeOptions::leave_open());
        assert_eq!(first.take(2).to_vec().unwrap(), vec![1, 2]);
        assert!(shared.is_open());

        let second = shared.consume(ConsumeOptions::default());
        assert_eq!(second.to_vec().unwrap(), vec![3, 4]);
        assert!(!shared.is_open());
    }

    #[test]
    fn test_cached_consumers_replay() {
        let shared = Query::from_vec(vec![1, 2, 3]).share();
        let query = shared.consume(ConsumeOptions {
            cache: true,
            leave_open: true,
        });
        assert_eq!(query.take(2).to_vec().unwrap(), vec![1, 2]);
        assert_eq!(query.to_vec().unwrap(), vec![1, 2, 3]);
    }
}
