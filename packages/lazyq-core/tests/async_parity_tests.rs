//! The async engine yields what the sync engine yields for the same composition

mod common;

use common::*;
use futures::future;
use lazyq_core::prelude::*;
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn words() -> Vec<&'static str> {
    vec!["pear", "fig", "plum", "kiwi", "lime", "date", "apple"]
}

#[tokio::test]
async fn test_pipeline_parity() {
    let sync = Query::from_vec(words())
        .filter(|w| Ok(w.len() > 3))
        .map(|w| Ok(w.to_uppercase()))
        .skip(1)
        .take(3)
        .to_vec()
        .unwrap();
    let async_result = AsyncQuery::from_vec(words())
        .filter_async(|w| future::ready(Ok(w.len() > 3)))
        .map_async(|w| future::ready(Ok(w.to_uppercase())))
        .skip(1)
        .take(3)
        .to_vec()
        .await
        .unwrap();
    assert_eq!(async_result, sync);
}

#[tokio::test]
async fn test_ordering_parity() {
    let sync = Query::from_vec(words())
        .order_by(|w| Ok(w.len()))
        .then_by_descending(|w| Ok(w.to_string()))
        .to_vec()
        .unwrap();
    let async_result = AsyncQuery::from_vec(words())
        .order_by_async(|w| future::ready(Ok(w.len())), false)
        .then_by_descending(|w| Ok(w.to_string()))
        .to_vec()
        .await
        .unwrap();
    assert_eq!(async_result, sync);
}

#[tokio::test]
async fn test_grouping_parity() {
    let sync: Vec<(usize, Vec<&str>)> = Query::from_vec(words())
        .group_by(|w| Ok(w.len()))
        .map(|g| Ok((*g.key(), g.values().to_vec())))
        .to_vec()
        .unwrap();
    let async_result: Vec<(usize, Vec<&str>)> = AsyncQuery::from_vec(words())
        .group_by_async(|w| future::ready(Ok(w.len())))
        .map(|g| Ok((*g.key(), g.values().to_vec())))
        .to_vec()
        .await
        .unwrap();
    assert_eq!(async_result, sync);
}

#[tokio::test]
async fn test_join_parity() {
    let left = vec![1, 2, 3, 2];
    let right = vec![(2, 'a'), (3, 'b'), (2, 'c'), (7, 'd')];
    let sync = Query::from_vec(left.clone())
        .join(&Query::from_vec(right.clone()), |x| Ok(*x), |y| Ok(y.0), |x, y| Ok((*x, y.1)))
        .to_vec()
        .unwrap();
    let async_result = AsyncQuery::from_vec(left)
        .join(&AsyncQuery::from_vec(right), |x| Ok(*x), |y| Ok(y.0), |x, y| Ok((*x, y.1)))
        .to_vec()
        .await
        .unwrap();
    assert_eq!(async_result, sync);
}

#[tokio::test]
async fn test_case_insensitive_join_parity() {
    let langs = vec!["Rust".to_string(), "go".to_string(), "Zig".to_string()];
    let tags = vec![("rust".to_string(), 1), ("GO".to_string(), 2), ("RUST".to_string(), 3)];
    let equaler: SharedEqualer<String> = Rc::new(CaseInsensitive::default());

    let sync = Query::from_vec(langs.clone())
        .join_with(
            &Query::from_vec(tags.clone()),
            |l| Ok(l.clone()),
            |t| Ok(t.0.clone()),
            |l, t| Ok((l.clone(), t.1)),
            equaler.clone(),
        )
        .to_vec()
        .unwrap();
    let async_result = AsyncQuery::from_vec(langs.clone())
        .join_with(
            &AsyncQuery::from_vec(tags.clone()),
            |l| Ok(l.clone()),
            |t| Ok(t.0.clone()),
            |l, t| Ok((l.clone(), t.1)),
            equaler.clone(),
        )
        .to_vec()
        .await
        .unwrap();
    assert_eq!(async_result, sync);
    assert_eq!(
        async_result,
        vec![("Rust".to_string(), 1), ("Rust".to_string(), 3), ("go".to_string(), 2)]
    );

    let grouped = AsyncQuery::from_vec(tags.clone())
        .group_by_with(|t| Ok(t.0.clone()), |t| Ok(t.1), equaler.clone())
        .to_vec()
        .await
        .unwrap();
    let summary: Vec<(String, Vec<i32>)> = grouped.iter().map(|g| (g.key().clone(), g.values().to_vec())).collect();
    assert_eq!(summary, vec![("rust".to_string(), vec![1, 3]), ("GO".to_string(), vec![2])]);

    let counts = AsyncQuery::from_vec(langs)
        .group_join_with(
            &AsyncQuery::from_vec(tags),
            |l| Ok(l.clone()),
            |t| Ok(t.0.clone()),
            |l, group| Ok((l.clone(), group)),
            equaler,
        )
        .to_vec()
        .await
        .unwrap();
    assert_eq!(counts.len(), 3);
    assert_eq!(counts[0].1.count().await.unwrap(), 2);
    assert_eq!(counts[2].1.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_hierarchy_parity() {
    let sync = nodes(&["q", "z"]).ancestors().top_most().to_vec().unwrap();
    let async_result = AsyncQuery::from_vec(vec!["q", "z"])
        .with_hierarchy(tree())
        .ancestors()
        .top_most()
        .to_vec()
        .await
        .unwrap();
    assert_eq!(async_result, sync);
    assert_eq!(async_result, vec!["root", "root"]);
}

#[tokio::test]
async fn test_async_prefix_closes_once() {
    let probe = Probe::new();
    let taken = async_naturals(&probe)
        .map(|x| Ok(x * 10))
        .take(2)
        .to_vec()
        .await
        .unwrap();
    assert_eq!(taken, vec![0, 10]);
    assert_eq!(probe.closes(), 1);
}

#[tokio::test]
async fn test_async_composition_is_lazy() {
    let probe = Probe::new();
    let pipeline = async_finite(6, &probe)
        .filter(|x| Ok(x % 2 == 0))
        .order_by_descending(|x| Ok(*x));
    assert_eq!(probe.opens(), 0);
    assert_eq!(pipeline.to_vec().await.unwrap(), vec![4, 2, 0]);
    assert_eq!(probe.closes(), 1);
}

#[tokio::test]
async fn test_async_span_matches_sync() {
    let (sync_prefix, sync_rest) = Query::from_vec(words()).span(|w| Ok(w.starts_with('p'))).unwrap();
    let (prefix, rest) = AsyncQuery::from_vec(words())
        .span(|w| Ok(w.starts_with('p')))
        .await
        .unwrap();
    assert_eq!(prefix.to_vec().await.unwrap(), sync_prefix.to_vec().unwrap());
    assert_eq!(rest.to_vec().await.unwrap(), sync_rest.to_vec().unwrap());
}
