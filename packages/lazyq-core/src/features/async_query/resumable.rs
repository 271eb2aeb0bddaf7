// Async resumable consumption
//
// Same contract as the synchronous SharedCursor. Consumers of one shared
// cursor may live in different tasks on the same thread, so pulls are
// serialized through an async mutex. Closing is synchronous; a close that
// lands while another consumer is mid-pull takes effect when that pull
// returns.

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;
use futures::lock::{Mutex, MutexGuard};
use tracing::{debug, trace};

use super::query::AsyncQuery;
use crate::config::EngineConfig;
use crate::errors::Result;
use crate::features::sequence::ConsumeOptions;
use crate::shared::ports::{AsyncCursor, AsyncUpstream, BoxAsyncCursor};

struct AsyncSharedSource<T> {
    cursor: Option<BoxAsyncCursor<T>>,
    cached: Vec<T>,
}

impl<T> AsyncSharedSource<T> {
    async fn pull(&mut self, release_on_failure: bool) -> Result<Option<T>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        match cursor.take_next().await {
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
            trace!("shared async cursor closed");
            cursor.close();
        }
    }
}

impl<T> Drop for AsyncSharedSource<T> {
    fn drop(&mut self) {
        self.release();
    }
}

struct AsyncShared<T> {
    state: Mutex<AsyncSharedSource<T>>,
    /// Close requested while another consumer held the lock mid-pull
    close_pending: Cell<bool>,
}

impl<T> AsyncShared<T> {
    /// Close now, or as soon as the in-flight pull hands the lock back
    fn request_close(&self) {
        match self.state.try_lock() {
            Some(mut state) => state.release(),
            None => self.close_pending.set(true),
        }
    }

    async fn lock(&self) -> MutexGuard<'_, AsyncSharedSource<T>> {
        let mut state = self.state.lock().await;
        if self.close_pending.take() {
            state.release();
        }
        state
    }

    /// Honor a close that arrived while `state` was held
    fn settle(&self, state: &mut AsyncSharedSource<T>) {
        if self.close_pending.take() {
            state.release();
        }
    }
}

/// Handle to one underlying async cursor shared by several consumers
///
/// The underlying cursor is closed when a consumption that does not leave
/// it open ends, on `close`, or when the last handle is dropped.
pub struct AsyncSharedCursor<T> {
    shared: Rc<AsyncShared<T>>,
}

impl<T> Clone for AsyncSharedCursor<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + 'static> AsyncSharedCursor<T> {
    pub fn new(cursor: BoxAsyncCursor<T>) -> Self {
        Self {
            shared: Rc::new(AsyncShared {
                state: Mutex::new(AsyncSharedSource {
                    cursor: Some(cursor),
                    cached: Vec::new(),
                }),
                close_pending: Cell::new(false),
            }),
        }
    }

    pub fn consume(&self, options: ConsumeOptions) -> AsyncQuery<T> {
        let shared = self.shared.clone();
        AsyncQuery::from_factory(move || {
            Box::new(ResumableAsyncCursor {
                shared: shared.clone(),
                options,
                position: 0,
                finished: false,
            }) as BoxAsyncCursor<T>
        })
    }

    pub async fn take_next(&self) -> Result<Option<T>> {
        let mut state = self.shared.lock().await;
        let pulled = state.pull(true).await;
        self.shared.settle(&mut state);
        pulled
    }

    pub fn close(&self) {
        self.shared.request_close();
    }

    pub async fn is_open(&self) -> bool {
        self.shared.lock().await.cursor.is_some()
    }
}

struct ResumableAsyncCursor<T> {
    shared: Rc<AsyncShared<T>>,
    options: ConsumeOptions,
    position: usize,
    finished: bool,
}

#[async_trait(?Send)]
impl<T: Clone + 'static> AsyncCursor for ResumableAsyncCursor<T> {
    type Item = T;

    async fn take_next(&mut self) -> Result<Option<T>> {
        if self.finished {
            return Ok(None);
        }
        let mut state = self.shared.lock().await;
        if self.options.cache {
            if let Some(item) = state.cached.get(self.position) {
                self.position += 1;
                return Ok(Some(item.clone()));
            }
        }
        let pulled = state.pull(!self.options.leave_open).await;
        self.shared.settle(&mut state);
        match pulled {
            Ok(Some(item)) => {
                if self.options.cache {
                    state.cached.push(item.clone());
                    self.position = state.cached.len();
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
            self.shared.request_close();
        }
    }
}

impl<T: Clone + 'static> AsyncQuery<T> {
    pub fn share(&self) -> AsyncSharedCursor<T> {
        AsyncSharedCursor::new(self.open())
    }

    /// Longest prefix satisfying `predicate` (read eagerly) and the lazy rest
    pub async fn span<P>(&self, mut predicate: P) -> Result<(AsyncQuery<T>, AsyncQuery<T>)>
    where
        P: FnMut(&T) -> Result<bool>,
    {
        let options = ConsumeOptions {
            cache: EngineConfig::current().span.cache_remainder,
            leave_open: false,
        };
        let mut upstream = AsyncUpstream::new(self.open());
        let mut prefix = Vec::new();

        while let Some(item) = upstream.pull().await? {
            let matched = predicate(&item);
            if !upstream.guard(matched)? {
                debug!(prefix_len = prefix.len(), "async span split at pivot");
                let rest = upstream
                    .detach()
                    .map(|cursor| AsyncSharedCursor::new(cursor).consume(options))
                    .unwrap_or_else(AsyncQuery::empty);
                let remainder = AsyncQuery::once(item).concat(rest);
                return Ok((self.flow(AsyncQuery::from_vec(prefix)), self.flow(remainder)));
            }
            prefix.push(item);
        }

        Ok((self.flow(AsyncQuery::from_vec(prefix)), self.flow(AsyncQuery::empty())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::sequence::{Query, Sequence};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_span_matches_sync() {
        let items = vec![2, 4, 5, 6, 8];
        let (sync_prefix, sync_rest) = Query::from_vec(items.clone()).span(|x| Ok(x % 2 == 0)).unwrap();
        let (prefix, rest) = AsyncQuery::from_vec(items).span(|x| Ok(x % 2 == 0)).await.unwrap();

        assert_eq!(prefix.to_vec().await.unwrap(), sync_prefix.to_vec().unwrap());
        assert_eq!(rest.to_vec().await.unwrap(), sync_rest.to_vec().unwrap());
        assert_eq!(rest.to_vec().await.unwrap(), vec![5, 6, 8]);
    }

    #[tokio::test]
    async fn test_shared_consumers_resume() {
        let shared = AsyncQuery::from_vec(vec![1, 2, 3]).share();
        let head = shared.consume(ConsumeOptions::leave_open()).take(1).to_vec().await.unwrap();
        assert_eq!(head, vec![1]);
        assert!(shared.is_open().await);
        assert_eq!(shared.take_next().await.unwrap(), Some(2));
        let tail = shared.consume(ConsumeOptions::default()).to_vec().await.unwrap();
        assert_eq!(tail, vec![3]);
        assert!(!shared.is_open().await);
    }
}
