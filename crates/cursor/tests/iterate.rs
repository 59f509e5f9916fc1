//! Integration tests for iterating stores and indexes.

use cursor_stream::{
    CursorQuery, CursorRead, CursorSource, Direction, IterateExt, KeyRange, iterate_cursor,
    mem::{CursorOp, MemCursorError, MemStore},
    unwrap,
};
use std::sync::Arc;
use tokio_stream::StreamExt;

/// A store holding rows keyed 1..=5.
fn five_rows() -> MemStore<u64, &'static str> {
    let store = MemStore::new();
    for (key, value) in [(1, "one"), (2, "two"), (3, "three"), (4, "four"), (5, "five")] {
        store.put(key, value).unwrap();
    }
    store
}

#[tokio::test]
async fn default_drive_yields_every_row() {
    let store = five_rows();
    let keys: Vec<u64> = store
        .iterate(CursorQuery::new())
        .map(|pos| *pos.unwrap().key())
        .collect()
        .await;
    assert_eq!(keys, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn advance_at_key_two_skips_key_three() {
    let store = five_rows();
    let mut stream = store.iterate(CursorQuery::new());

    let mut seen = vec![];
    while let Some(pos) = stream.next().await {
        let pos = pos.unwrap();
        seen.push(*pos.key());
        if *pos.key() == 2 {
            pos.advance(2);
        }
    }
    assert_eq!(seen, vec![1, 2, 4, 5]);
}

#[tokio::test]
async fn second_override_wins_without_error() {
    let store = five_rows();
    let mut stream = store.iterate(CursorQuery::new());

    let mut seen = vec![];
    while let Some(pos) = stream.next().await {
        let pos = pos.unwrap();
        seen.push(*pos.key());
        if *pos.key() == 2 {
            store.take_ops();
            pos.continue_to(None);
            pos.advance(2);
            // Both requests reached the backend.
            assert_eq!(store.take_ops(), vec![CursorOp::Continue(None), CursorOp::Advance(2)]);
        }
    }
    assert_eq!(seen, vec![1, 2, 4, 5]);
}

#[tokio::test]
async fn recorded_movement_skips_the_default_request() {
    let store = five_rows();
    let mut stream = store.iterate(CursorQuery::new());

    let first = stream.next().await.unwrap().unwrap();
    store.take_ops();
    first.advance(1);
    let second = stream.next().await.unwrap().unwrap();

    assert_eq!(*second.key(), 2);
    assert_eq!(store.take_ops(), vec![CursorOp::Advance(1)]);
}

#[tokio::test]
async fn reads_and_backend_operations_pass_through() {
    let store = five_rows();
    let mut stream = store.iterate(CursorQuery::new());

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(*first.value(), "one");
    assert_eq!(first.direction(), Direction::Next);
    assert_eq!(first.index_name(), None);

    first.update("uno").unwrap();
    assert_eq!(store.get(&1).unwrap(), Some("uno"));
    assert!(!first.has_pending());
}

#[tokio::test]
async fn failed_advance_surfaces_on_the_next_pull() {
    let store = five_rows();
    let mut stream = store.iterate(CursorQuery::new());

    let first = stream.next().await.unwrap().unwrap();
    first.continue_to(Some(1));

    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(err, MemCursorError::InvalidKey);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn abort_mid_stream_fails_the_pull() {
    let store = five_rows();
    let mut stream = store.iterate(CursorQuery::new());

    stream.next().await.unwrap().unwrap();
    store.abort();

    assert_eq!(stream.next().await.unwrap().unwrap_err(), MemCursorError::Aborted);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn failed_open_yields_one_error() {
    let store = five_rows();
    let mut stream = store.iterate(CursorQuery::new());
    store.abort();

    assert_eq!(stream.next().await.unwrap().unwrap_err(), MemCursorError::Aborted);
    assert!(stream.is_done());
    assert!(stream.next().await.is_none());
    assert_eq!(stream.position_count(), 0);
    assert_eq!(store.ops(), vec![CursorOp::Open]);
}

#[tokio::test]
async fn iterate_index_with_compound_jump() {
    // Records keyed 1..=6, indexed by parity.
    let store = MemStore::new();
    for key in 1..=6u64 {
        store.put(key, key).unwrap();
    }
    store.create_index("parity", |v: &u64| v % 2).unwrap();
    let index = store.index("parity").unwrap();

    let mut stream = index.iterate(CursorQuery::new());
    let mut seen = vec![];
    while let Some(pos) = stream.next().await {
        let pos = pos.unwrap();
        seen.push((*pos.key(), *pos.primary_key()));
        if seen.len() == 1 {
            pos.continue_primary_key(1, 3);
        }
    }
    assert_eq!(seen, vec![(0, 2), (1, 3), (1, 5)]);
}

#[tokio::test]
async fn reverse_range_with_key_jump() {
    let store = five_rows();
    let query = CursorQuery::from(KeyRange::upper_bound(4, false)).with_direction(Direction::Prev);
    let mut stream = store.iterate(query);

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(*first.key(), 4);
    first.continue_to(Some(2));

    let keys: Vec<u64> = stream.map(|pos| *pos.unwrap().key()).collect().await;
    assert_eq!(keys, vec![2, 1]);
}

#[tokio::test]
async fn iterate_positioned_cursor_preserves_identity() {
    let store = five_rows();
    let query = CursorQuery::from(KeyRange::lower_bound(3, false));
    let cursor = Arc::new(store.open_cursor(query).await.unwrap().unwrap());

    let mut stream = iterate_cursor(cursor.clone());
    let first = stream.next().await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&unwrap(&first), &cursor));
    assert!(Arc::ptr_eq(&unwrap(&cursor), &cursor));

    let keys: Vec<u64> = stream.map(|pos| *pos.unwrap().key()).collect().await;
    assert_eq!(keys, vec![4, 5]);
}

#[tokio::test]
async fn stale_adapter_does_not_affect_later_steps() {
    let store = five_rows();
    let mut stream = store.iterate(CursorQuery::new());

    let first = stream.next().await.unwrap().unwrap();
    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(*second.key(), 2);

    // Recorded on a step the stream has already left.
    first.advance(3);

    let third = stream.next().await.unwrap().unwrap();
    assert_eq!(*third.key(), 3);
}
