//! Instrumented cursors

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;
use lazyq_core::prelude::*;

/// Shared pull/close counters for one source
#[derive(Clone, Default)]
pub struct Probe {
    pulls: Rc<Cell<usize>>,
    closes: Rc<Cell<usize>>,
    opens: Rc<Cell<usize>>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulls(&self) -> usize {
        self.pulls.get()
    }

    pub fn closes(&self) -> usize {
        self.closes.get()
    }

    pub fn opens(&self) -> usize {
        self.opens.get()
    }

    fn record_pull(&self) {
        self.pulls.set(self.pulls.get() + 1);
    }

    fn record_close(&self) {
        self.closes.set(self.closes.get() + 1);
    }

    fn record_open(&self) {
        self.opens.set(self.opens.get() + 1);
    }
}

/// Yields `0..limit` (or forever); counts every pull and close
pub struct CountingCursor {
    next: u64,
    limit: Option<u64>,
    probe: Probe,
}

impl Cursor for CountingCursor {
    type Item = u64;

    fn take_next(&mut self) -> Result<Option<u64>> {
        self.probe.record_pull();
        if self.limit.is_some_and(|limit| self.next >= limit) {
            return Ok(None);
        }
        self.next += 1;
        Ok(Some(self.next - 1))
    }

    fn close(&mut self) {
        self.probe.record_close();
    }
}

#[async_trait(?Send)]
impl AsyncCursor for CountingCursor {
    type Item = u64;

    async fn take_next(&mut self) -> Result<Option<u64>> {
        Cursor::take_next(self)
    }

    fn close(&mut self) {
        Cursor::close(self)
    }
}

fn counting(limit: Option<u64>, probe: &Probe) -> impl Fn() -> CountingCursor + 'static {
    let probe = probe.clone();
    move || {
        probe.record_open();
        CountingCursor {
            next: 0,
            limit,
            probe: probe.clone(),
        }
    }
}

/// Infinite `0, 1, 2, ...`
pub fn naturals(probe: &Probe) -> Query<u64> {
    Query::from_cursor_fn(counting(None, probe))
}

/// `0..limit`
pub fn finite(limit: u64, probe: &Probe) -> Query<u64> {
    Query::from_cursor_fn(counting(Some(limit), probe))
}

pub fn async_naturals(probe: &Probe) -> AsyncQuery<u64> {
    AsyncQuery::from_cursor_fn(counting(None, probe))
}

pub fn async_finite(limit: u64, probe: &Probe) -> AsyncQuery<u64> {
    AsyncQuery::from_cursor_fn(counting(Some(limit), probe))
}

/// Yields `0..fail_at`, then fails every later pull; counts closes
pub struct FailingCursor {
    next: u64,
    fail_at: u64,
    probe: Probe,
}

impl Cursor for FailingCursor {
    type Item = u64;

    fn take_next(&mut self) -> Result<Option<u64>> {
        self.probe.record_pull();
        if self.next == self.fail_at {
            return Err(QueryError::source("producer failed"));
        }
        self.next += 1;
        Ok(Some(self.next - 1))
    }

    fn close(&mut self) {
        self.probe.record_close();
    }
}

pub fn failing(fail_at: u64, probe: &Probe) -> BoxCursor<u64> {
    probe.record_open();
    Box::new(FailingCursor {
        next: 0,
        fail_at,
        probe: probe.clone(),
    })
}
