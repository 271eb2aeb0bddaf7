//! Pull contracts
//!
//! A cursor is one in-progress consumption of a lazy sequence. Every
//! composed stage owns its source through [`Upstream`], which guarantees the
//! source is closed exactly once: on exhaustion, on failure, or when the
//! stage itself is closed.

use async_trait::async_trait;

use crate::errors::Result;

/// Synchronous pull contract
///
/// `close` must be safe to call repeatedly and after exhaustion.
pub trait Cursor {
    type Item;

    /// Pull the next element; `Ok(None)` means exhausted
    fn take_next(&mut self) -> Result<Option<Self::Item>>;

    /// Stop early and release any held resources
    fn close(&mut self);
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Item = C::Item;

    fn take_next(&mut self) -> Result<Option<Self::Item>> {
        (**self).take_next()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

pub type BoxCursor<T> = Box<dyn Cursor<Item = T>>;

/// Asynchronous pull contract: each pull may suspend
///
/// Pulls on the same cursor are strictly sequential (`&mut self`). Closing
/// never suspends, so a consumer dropped mid-pull can still release its
/// source from `Drop`.
#[async_trait(?Send)]
pub trait AsyncCursor {
    type Item;

    async fn take_next(&mut self) -> Result<Option<Self::Item>>;

    fn close(&mut self);
}

pub type BoxAsyncCursor<T> = Box<dyn AsyncCursor<Item = T>>;

/// Owned source of a composed stage
///
/// Releasing takes the cursor out of the slot, so `close` reaches the
/// source at most once no matter how often the stage is closed.
pub struct Upstream<T> {
    cursor: Option<BoxCursor<T>>,
}

impl<T> Upstream<T> {
    pub fn new(cursor: BoxCursor<T>) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }

    /// A slot that is already released (yields nothing)
    pub fn released() -> Self {
        Self { cursor: None }
    }

    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    /// Pull from the source, releasing it on exhaustion or failure
    pub fn pull(&mut self) -> Result<Option<T>> {
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
                self.release();
                Err(err)
            }
        }
    }

    pub fn release(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
    }

    /// Release the source before a callback failure propagates
    pub fn guard<R>(&mut self, result: Result<R>) -> Result<R> {
        if result.is_err() {
            self.release();
        }
        result
    }

    /// Hand the still-open cursor to a new owner
    pub fn detach(&mut self) -> Option<BoxCursor<T>> {
        self.cursor.take()
    }
}

/// Async counterpart of [`Upstream`]
pub struct AsyncUpstream<T> {
    cursor: Option<BoxAsyncCursor<T>>,
}

impl<T> AsyncUpstream<T> {
    pub fn new(cursor: BoxAsyncCursor<T>) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }

    pub fn released() -> Self {
        Self { cursor: None }
    }

    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    pub async fn pull(&mut self) -> Result<Option<T>> {
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
                self.release();
                Err(err)
            }
        }
    }

    pub fn release(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
    }

    pub fn guard<R>(&mut self, result: Result<R>) -> Result<R> {
        if result.is_err() {
            self.release();
        }
        result
    }

    pub fn detach(&mut self) -> Option<BoxAsyncCursor<T>> {
        self.cursor.take()
    }
}

/// Dropping a consumer mid-pull (cancellation) still closes the source
impl<T> Drop for AsyncUpstream<T> {
    fn drop(&mut self) {
        self.release();
    }
}
