//! Conformance tests for cursor backends driven through [`CursorStream`].
//!
//! These tests verify that a backend, iterated through [`IterateExt`],
//! upholds the stream contract: default stepping, recorded movements taking
//! precedence, last call wins, identity, exhaustion, and independence of
//! concurrent streams. To use these tests with a custom backend, call
//! [`conformance`] with a function that builds a source holding records
//! keyed `1..=count`.

use crate::{
    Cursor, CursorQuery, CursorRead, CursorSource, CursorStream, IterateExt, iterate_cursor,
    unwrap,
};
use futures_util::StreamExt;
use std::sync::Arc;

type TestResult<S> = Result<(), <<S as CursorSource>::Cursor as Cursor>::Error>;

/// Run all conformance tests against sources built by `make_source`.
///
/// `make_source(count)` must return a fresh source whose cursors visit
/// records keyed `1..=count` in ascending order for the default query.
pub async fn conformance<S, F>(make_source: F) -> TestResult<S>
where
    F: Fn(u64) -> S,
    S: CursorSource<Query = CursorQuery<u64>> + Clone + Send + 'static,
    S::Cursor: CursorRead<Key = u64>,
{
    test_default_drive(&make_source(5)).await?;
    test_empty_source(&make_source(0)).await?;
    test_override_precedence(&make_source(5)).await?;
    test_last_call_wins(&make_source(5)).await?;
    test_identity(&make_source(3)).await?;
    test_exhaustion(&make_source(2)).await?;
    test_instance_isolation(&make_source(5)).await?;
    Ok(())
}

/// Pull every remaining position, returning their keys.
async fn drain<C>(stream: &mut CursorStream<C>) -> Result<Vec<u64>, C::Error>
where
    C: Cursor + CursorRead<Key = u64>,
{
    let mut keys = vec![];
    while let Some(pos) = stream.next().await {
        keys.push(*pos?.key());
    }
    Ok(keys)
}

/// Pull the next position, which must exist.
async fn pull<C: Cursor>(
    stream: &mut CursorStream<C>,
) -> Result<crate::CursorAdapter<C>, C::Error> {
    let Some(pos) = stream.next().await else {
        panic!("stream ended after {} positions", stream.position_count());
    };
    pos
}

/// Test that a stream with no recorded movements visits every position in
/// order and then ends.
pub async fn test_default_drive<S>(source: &S) -> TestResult<S>
where
    S: CursorSource<Query = CursorQuery<u64>> + Clone + Send + 'static,
    S::Cursor: CursorRead<Key = u64>,
{
    let mut stream = source.iterate(CursorQuery::new());
    assert_eq!(drain(&mut stream).await?, vec![1, 2, 3, 4, 5]);
    assert_eq!(stream.position_count(), 5);
    Ok(())
}

/// Test that a source with nothing to visit yields an empty stream.
pub async fn test_empty_source<S>(source: &S) -> TestResult<S>
where
    S: CursorSource<Query = CursorQuery<u64>> + Clone + Send + 'static,
    S::Cursor: CursorRead<Key = u64>,
{
    let mut stream = source.iterate(CursorQuery::new());
    assert!(drain(&mut stream).await?.is_empty());
    assert!(stream.is_done());
    Ok(())
}

/// Test that a movement recorded on the yielded adapter replaces the
/// default step.
pub async fn test_override_precedence<S>(source: &S) -> TestResult<S>
where
    S: CursorSource<Query = CursorQuery<u64>> + Clone + Send + 'static,
    S::Cursor: CursorRead<Key = u64>,
{
    let mut stream = source.iterate(CursorQuery::new());
    assert_eq!(*pull(&mut stream).await?.key(), 1);

    let second = pull(&mut stream).await?;
    assert_eq!(*second.key(), 2);
    second.advance(2);

    assert_eq!(drain(&mut stream).await?, vec![4, 5]);
    Ok(())
}

/// Test that only the last movement recorded in a step is honored, and
/// that discarding the earlier one raises no error.
pub async fn test_last_call_wins<S>(source: &S) -> TestResult<S>
where
    S: CursorSource<Query = CursorQuery<u64>> + Clone + Send + 'static,
    S::Cursor: CursorRead<Key = u64>,
{
    let mut stream = source.iterate(CursorQuery::new());
    pull(&mut stream).await?;

    let second = pull(&mut stream).await?;
    second.continue_to(None);
    second.advance(2);

    assert_eq!(drain(&mut stream).await?, vec![4, 5]);
    Ok(())
}

/// Test that unwrapping a yielded adapter returns the wrapped cursor.
pub async fn test_identity<S>(source: &S) -> TestResult<S>
where
    S: CursorSource<Query = CursorQuery<u64>> + Clone + Send + 'static,
    S::Cursor: CursorRead<Key = u64>,
{
    let Some(cursor) = source.open_cursor(CursorQuery::new()).await? else {
        panic!("source is empty");
    };
    let cursor = Arc::new(cursor);
    let mut stream = iterate_cursor(cursor.clone());

    let first = pull(&mut stream).await?;
    assert!(Arc::ptr_eq(&unwrap(&first), &cursor));

    while let Some(pos) = stream.next().await {
        let pos = pos?;
        assert!(Arc::ptr_eq(&unwrap(&pos), pos.cursor()));
    }
    Ok(())
}

/// Test that an exhausted stream stays exhausted, and that iterating again
/// requires a new stream.
pub async fn test_exhaustion<S>(source: &S) -> TestResult<S>
where
    S: CursorSource<Query = CursorQuery<u64>> + Clone + Send + 'static,
    S::Cursor: CursorRead<Key = u64>,
{
    let mut stream = source.iterate(CursorQuery::new());
    assert_eq!(drain(&mut stream).await?, vec![1, 2]);
    assert!(stream.next().await.is_none());
    assert!(stream.next().await.is_none());

    let mut again = source.iterate(CursorQuery::new());
    assert_eq!(drain(&mut again).await?, vec![1, 2]);
    Ok(())
}

/// Test that interleaved streams never observe each other's recorded
/// movements.
pub async fn test_instance_isolation<S>(source: &S) -> TestResult<S>
where
    S: CursorSource<Query = CursorQuery<u64>> + Clone + Send + 'static,
    S::Cursor: CursorRead<Key = u64>,
{
    let mut a = source.iterate(CursorQuery::new());
    let mut b = source.iterate(CursorQuery::new());

    let a1 = pull(&mut a).await?;
    let b1 = pull(&mut b).await?;
    assert_eq!((*a1.key(), *b1.key()), (1, 1));

    a1.advance(3);
    assert!(!b1.has_pending());

    assert_eq!(*pull(&mut b).await?.key(), 2);
    assert_eq!(*pull(&mut a).await?.key(), 4);
    assert_eq!(*pull(&mut b).await?.key(), 3);
    Ok(())
}
