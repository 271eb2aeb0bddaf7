//! Laziness and close-exactly-once across every kind of stage

mod common;

use common::*;
use lazyq_core::prelude::*;
use pretty_assertions::assert_eq;

#[test]
fn test_composition_performs_no_pulls() {
    let probe = Probe::new();
    let pipeline = naturals(&probe)
        .map(|x| Ok(x * 2))
        .filter(|x| Ok(x % 3 == 0))
        .skip(1)
        .take(4);
    let _ordered = finite(10, &probe).order_by(|x| Ok(*x)).then_by_descending(|x| Ok(x % 2));
    let _grouped = finite(10, &probe).group_by(|x| Ok(x % 3));
    let _reversed = finite(10, &probe).reverse();

    assert_eq!(probe.opens(), 0);
    assert_eq!(probe.pulls(), 0);
    assert_eq!(pipeline.to_vec().unwrap(), vec![6, 12, 18, 24]);
}

#[test]
fn test_prefix_of_infinite_closes_once() {
    let probe = Probe::new();
    let taken = naturals(&probe).take(2).to_vec().unwrap();
    assert_eq!(taken, vec![0, 1]);
    assert_eq!(probe.closes(), 1);
}

#[test]
fn test_exhaustion_closes_once() {
    let probe = Probe::new();
    let query = finite(3, &probe).map(|x| Ok(x + 1)).concat(Query::from_vec(vec![9]));
    assert_eq!(query.to_vec().unwrap(), vec![1, 2, 3, 9]);
    assert_eq!(probe.closes(), 1);
}

#[test]
fn test_early_terminals_close_once() {
    let probe = Probe::new();
    assert_eq!(naturals(&probe).first().unwrap(), 0);
    assert!(naturals(&probe).any(|x| Ok(*x == 5)).unwrap());
    assert_eq!(naturals(&probe).element_at(3).unwrap(), 3);
    assert_eq!(probe.opens(), 3);
    assert_eq!(probe.closes(), 3);
}

#[test]
fn test_callback_failure_closes_source() {
    let probe = Probe::new();
    let failing = naturals(&probe).map(|x| {
        if x == 2 {
            Err(QueryError::callback("selector failed"))
        } else {
            Ok(x)
        }
    });
    assert_eq!(failing.to_vec().unwrap_err(), QueryError::callback("selector failed"));
    assert_eq!(probe.closes(), 1);
}

#[test]
fn test_dropping_iterator_closes() {
    let probe = Probe::new();
    for item in naturals(&probe).filter(|x| Ok(x % 2 == 1)) {
        if item.unwrap() > 4 {
            break;
        }
    }
    assert_eq!(probe.closes(), 1);
}

#[test]
fn test_realizing_stages_close_after_materializing() {
    let probe = Probe::new();
    let sorted = finite(5, &probe).order_by_descending(|x| Ok(*x));
    assert_eq!(sorted.first().unwrap(), 4);
    assert_eq!(probe.pulls(), 6);
    assert_eq!(probe.closes(), 1);
}

#[test]
fn test_zip_closes_both_sides() {
    let left = Probe::new();
    let right = Probe::new();
    let pairs = naturals(&left).zip(&finite(2, &right)).to_vec().unwrap();
    assert_eq!(pairs, vec![(0, 0), (1, 1)]);
    assert_eq!(left.closes(), 1);
    assert_eq!(right.closes(), 1);
}

#[test]
fn test_materialization_limit_closes_infinite_source() {
    let probe = Probe::new();
    let config = EngineConfig::preset(Preset::Custom).max_materialized(Some(100));
    let result = config
        .scoped(|| naturals(&probe).order_by(|x| Ok(*x)).to_vec())
        .unwrap();
    assert!(matches!(result, Err(QueryError::Value(_))));
    assert_eq!(probe.closes(), 1);
}

#[test]
fn test_round_trip_through_vec() {
    let original = Query::from_fn(|| (0..20).map(|x| x * 7 % 11));
    let realized = original.to_vec().unwrap();
    assert_eq!(Query::from_vec(realized.clone()).to_vec().unwrap(), realized);
}

#[test]
fn test_resumable_failure_closes_source_once() {
    let probe = Probe::new();
    let resumed = consume_with_options(failing(2, &probe), ConsumeOptions::cached());

    assert_eq!(resumed.to_vec().unwrap_err(), QueryError::source("producer failed"));
    assert_eq!(probe.closes(), 1);

    // cached elements replay; the closed source adds nothing
    assert_eq!(resumed.to_vec().unwrap(), vec![0, 1]);
    assert_eq!(probe.closes(), 1);
}

#[test]
fn test_leave_open_failure_defers_close() {
    let probe = Probe::new();
    let shared = SharedCursor::new(failing(1, &probe));

    let view = shared.consume(ConsumeOptions::leave_open());
    assert_eq!(view.to_vec().unwrap_err(), QueryError::source("producer failed"));
    assert_eq!(probe.closes(), 0);
    assert!(shared.is_open());

    shared.close();
    shared.close();
    assert_eq!(probe.closes(), 1);
    assert!(!shared.is_open());
}
