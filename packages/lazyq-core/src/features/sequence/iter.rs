// QueryIter - std Iterator over one consumption
//
// Dropping the iterator closes the cursor, so `break` out of a `for` loop
// (or `take(n)` on the std side) releases the source.

use super::query::Query;
use crate::errors::Result;
use crate::shared::ports::{BoxCursor, Upstream};

pub struct QueryIter<T> {
    upstream: Upstream<T>,
}

impl<T> QueryIter<T> {
    pub fn new(cursor: BoxCursor<T>) -> Self {
        Self {
            upstream: Upstream::new(cursor),
        }
    }

    /// Stop early without waiting for drop
    pub fn close(&mut self) {
        self.upstream.release();
    }
}

impl<T> Iterator for QueryIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.upstream.pull().transpose()
    }
}

impl<T> Drop for QueryIter<T> {
    fn drop(&mut self) {
        self.upstream.release();
    }
}

impl<T: 'static> IntoIterator for Query<T> {
    type Item = Result<T>;
    type IntoIter = QueryIter<T>;

    fn into_iter(self) -> QueryIter<T> {
        QueryIter::new(self.open())
    }
}

impl<T: 'static> IntoIterator for &Query<T> {
    type Item = Result<T>;
    type IntoIter = QueryIter<T>;

    fn into_iter(self) -> QueryIter<T> {
        QueryIter::new(self.open())
    }
}
