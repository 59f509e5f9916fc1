//! Conformance tests for the in-memory cursor backend.

use cursor_stream::{conformance::conformance, mem::MemStore};

fn make_store(count: u64) -> MemStore<u64, String> {
    let store = MemStore::new();
    for key in 1..=count {
        store.put(key, format!("row-{key}")).unwrap();
    }
    store
}

#[tokio::test]
async fn mem_store_conformance() {
    conformance(make_store).await.unwrap();
}

#[tokio::test]
async fn mem_index_conformance() {
    conformance(|count| {
        let store = make_store(count);
        store.create_index("by_key", |v: &String| v[4..].parse::<u64>().unwrap()).unwrap();
        store.index("by_key").unwrap()
    })
    .await
    .unwrap();
}
