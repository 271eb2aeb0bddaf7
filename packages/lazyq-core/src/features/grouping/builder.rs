// build_groupings - the single pass behind group_by, joins and to_lookup

use tracing::debug;

use super::domain::{Lookup, LookupBuilder};
use crate::errors::Result;
use crate::features::sequence::sources::MaterializeBudget;
use crate::shared::ports::{BoxCursor, SharedEqualer, Upstream};

/// Pull `cursor` to exhaustion, bucketing `element(item)` under `key(&item)`
///
/// The cursor is closed exactly once, before any selector failure is
/// returned.
pub(crate) fn build_groupings<T, K, V>(
    cursor: BoxCursor<T>,
    key: &dyn Fn(&T) -> Result<K>,
    element: &dyn Fn(T) -> Result<V>,
    equaler: SharedEqualer<K>,
) -> Result<Lookup<K, V>> {
    let budget = MaterializeBudget::current();
    let mut upstream = Upstream::new(cursor);
    let mut builder = LookupBuilder::new(equaler);
    let mut admitted = 0;

    while let Some(item) = upstream.pull()? {
        upstream.guard(budget.admit(admitted))?;
        admitted += 1;
        let key = upstream.guard(key(&item))?;
        let value = upstream.guard(element(item))?;
        builder.push(key, value);
    }

    let lookup = builder.finish();
    debug!(elements = admitted, keys = lookup.len(), "lookup built");
    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QueryError;
    use crate::features::sequence::Query;
    use crate::shared::ports::default_equaler;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_pass_grouping() {
        let source = Query::from_vec(vec![1, 2, 3, 4, 5]);
        let lookup = build_groupings(source.open(), &|x: &i32| Ok(x % 2), &|x: i32| Ok(x * 10), default_equaler())
            .unwrap();
        assert_eq!(lookup.keys().copied().collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(lookup.get(&1), Some(&[10, 30, 50][..]));
    }

    #[test]
    fn test_key_failure_aborts() {
        let source = Query::from_vec(vec![1, 2]);
        let result = build_groupings(
            source.open(),
            &|_: &i32| Err::<i32, _>(QueryError::callback("no key")),
            &|x: i32| Ok(x),
            default_equaler(),
        );
        assert!(matches!(result, Err(QueryError::Callback(_))));
    }
}
