//! Common test utilities for lazyq-core
//!
//! Counting cursors that record pulls and closes, and small tree fixtures
//! for the hierarchy axes.

#![allow(dead_code)]

mod fixtures;
mod probes;

pub use fixtures::*;
pub use probes::*;
