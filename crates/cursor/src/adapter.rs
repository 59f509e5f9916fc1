//! The per-step cursor adapter yielded by [`CursorStream`].
//!
//! [`CursorStream`]: crate::CursorStream

use crate::{
    query::Direction,
    traits::{Cursor, CursorRead, MoveFuture},
};
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::{fmt, future::Future, ops::Deref, sync::Arc};
use tracing::trace;

/// Holds the movement future recorded during a single step.
///
/// Shared between an adapter (and its clones) and the stream that yielded
/// it. A later recording overwrites an earlier one.
pub(crate) struct PendingSlot<C: Cursor> {
    pending: Mutex<Option<MoveFuture<C>>>,
}

impl<C: Cursor> PendingSlot<C> {
    fn new() -> Self {
        Self { pending: Mutex::new(None) }
    }

    fn record<F>(&self, fut: F)
    where
        F: Future<Output = crate::Moved<C>> + Send + 'static,
    {
        let replaced = self.pending.lock().replace(fut.boxed()).is_some();
        if replaced {
            trace!("discarding earlier movement recorded in this step");
        }
    }

    /// Take the recorded future, leaving the slot empty.
    pub(crate) fn take(&self) -> Option<MoveFuture<C>> {
        self.pending.lock().take()
    }

    fn is_set(&self) -> bool {
        self.pending.lock().is_some()
    }
}

/// A cursor position yielded by [`CursorStream`].
///
/// Every read accessor of the wrapped cursor is available through
/// [`Deref`] and [`CursorRead`]. The movement methods [`next`],
/// [`continue_to`], [`continue_primary_key`] and [`advance`] are
/// intercepted: they issue the request against the wrapped cursor right
/// away, and the stream uses the response as its next position instead of
/// its default step. When several are called during one step, only the
/// last one is honored. The earlier requests have still been issued.
///
/// An adapter belongs to the step it was yielded for. Movement calls made
/// after the stream has moved on are issued but never observed.
///
/// [`CursorStream`]: crate::CursorStream
/// [`next`]: CursorAdapter::next
/// [`continue_to`]: CursorAdapter::continue_to
/// [`continue_primary_key`]: CursorAdapter::continue_primary_key
/// [`advance`]: CursorAdapter::advance
pub struct CursorAdapter<C: Cursor> {
    cursor: Arc<C>,
    slot: Arc<PendingSlot<C>>,
}

impl<C: Cursor> CursorAdapter<C> {
    /// Wrap `cursor` with an empty slot, returning the adapter and the
    /// stream's handle on the slot.
    pub(crate) fn wrap(cursor: Arc<C>) -> (Self, Arc<PendingSlot<C>>) {
        let slot = Arc::new(PendingSlot::new());
        (Self { cursor, slot: slot.clone() }, slot)
    }

    /// The wrapped cursor.
    pub const fn cursor(&self) -> &Arc<C> {
        &self.cursor
    }

    /// Returns true if a movement has been recorded for this step.
    pub fn has_pending(&self) -> bool {
        self.slot.is_set()
    }

    /// Move to the next position.
    pub fn next(&self) {
        self.slot.record(self.cursor.next());
    }

    /// Move to the next position, or to the first position at or beyond
    /// `key`.
    pub fn continue_to(&self, key: Option<C::Key>) {
        self.slot.record(self.cursor.continue_to(key));
    }

    /// Move to the first position at or beyond `(key, primary_key)`.
    pub fn continue_primary_key(&self, key: C::Key, primary_key: C::PrimaryKey) {
        self.slot.record(self.cursor.continue_primary_key(key, primary_key));
    }

    /// Skip `count` positions.
    pub fn advance(&self, count: u32) {
        self.slot.record(self.cursor.advance(count));
    }
}

impl<C: Cursor> Clone for CursorAdapter<C> {
    fn clone(&self) -> Self {
        Self { cursor: self.cursor.clone(), slot: self.slot.clone() }
    }
}

impl<C: Cursor> Deref for CursorAdapter<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.cursor
    }
}

impl<C: Cursor> CursorRead for CursorAdapter<C> {
    type Key = C::Key;
    type PrimaryKey = C::PrimaryKey;
    type Value = C::Value;

    fn key(&self) -> &Self::Key {
        self.cursor.key()
    }

    fn primary_key(&self) -> &Self::PrimaryKey {
        self.cursor.primary_key()
    }

    fn value(&self) -> &Self::Value {
        self.cursor.value()
    }

    fn direction(&self) -> Direction {
        self.cursor.direction()
    }
}

impl<C> fmt::Debug for CursorAdapter<C>
where
    C: Cursor + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorAdapter")
            .field("cursor", &self.cursor)
            .field("pending", &self.has_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CursorQuery, CursorSource,
        mem::{CursorOp, MemCursor, MemStore},
    };

    type Store = MemStore<u64, &'static str>;

    async fn first_cursor(store: &Store) -> Arc<MemCursor<u64, &'static str>> {
        Arc::new(store.open_cursor(CursorQuery::new()).await.unwrap().unwrap())
    }

    fn store() -> Store {
        let store = MemStore::new();
        for (k, v) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
            store.put(k, v).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn reads_pass_through() {
        let store = store();
        let (adapter, _slot) = CursorAdapter::wrap(first_cursor(&store).await);

        assert_eq!(*adapter.key(), 1);
        assert_eq!(*adapter.primary_key(), 1);
        assert_eq!(*adapter.value(), "a");
        assert_eq!(adapter.direction(), Direction::Next);
        assert!(!adapter.has_pending());
    }

    #[tokio::test]
    async fn movement_is_recorded_not_awaited() {
        let store = store();
        let (adapter, slot) = CursorAdapter::wrap(first_cursor(&store).await);
        store.take_ops();

        adapter.advance(2);
        assert!(adapter.has_pending());
        // The request was issued at call time.
        assert_eq!(store.take_ops(), vec![CursorOp::Advance(2)]);

        let moved = slot.take().unwrap().await.unwrap().unwrap();
        assert_eq!(*moved.key(), 3);
        assert!(!adapter.has_pending());
    }

    #[tokio::test]
    async fn last_recording_wins() {
        let store = store();
        let (adapter, slot) = CursorAdapter::wrap(first_cursor(&store).await);
        store.take_ops();

        adapter.continue_to(Some(4));
        adapter.next();
        assert_eq!(store.take_ops(), vec![CursorOp::Continue(Some(4)), CursorOp::Continue(None)]);

        let moved = slot.take().unwrap().await.unwrap().unwrap();
        assert_eq!(*moved.key(), 2);
    }

    #[tokio::test]
    async fn clones_share_the_slot() {
        let store = store();
        let (adapter, slot) = CursorAdapter::wrap(first_cursor(&store).await);

        let other = adapter.clone();
        other.advance(3);
        assert!(adapter.has_pending());
        assert!(Arc::ptr_eq(adapter.cursor(), other.cursor()));

        let moved = slot.take().unwrap().await.unwrap().unwrap();
        assert_eq!(*moved.key(), 4);
    }
}
