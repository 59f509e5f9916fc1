//! Core trait definitions for paginated cursor backends.
//!
//! A backend exposes positioned cursors through two capability groups:
//!
//! - [`CursorRead`]: read accessors for the current position. These are
//!   passed through verbatim by [`CursorAdapter`].
//! - [`Cursor`]: movement operations. Each one produces the cursor for the
//!   next position, or `None` once the sequence is exhausted.
//!
//! Stores and indexes that can open cursors implement [`CursorSource`].
//!
//! [`CursorAdapter`]: crate::CursorAdapter

use crate::query::Direction;
use futures_util::future::BoxFuture;
use std::future::Future;

/// The outcome of a movement operation.
///
/// `Ok(Some(cursor))` is the cursor at the new position. `Ok(None)` is the
/// end marker: no further positions exist.
pub type Moved<C> = Result<Option<C>, <C as Cursor>::Error>;

/// A boxed, type-erased movement future.
pub type MoveFuture<C> = BoxFuture<'static, Moved<C>>;

/// Read accessors for a positioned cursor.
pub trait CursorRead {
    /// The key type of the cursor's source.
    type Key;

    /// The primary key type of the underlying records.
    type PrimaryKey;

    /// The record value type.
    type Value;

    /// The key at the current position.
    ///
    /// For index cursors this is the index key. For store cursors it is the
    /// same as the primary key.
    fn key(&self) -> &Self::Key;

    /// The primary key of the record at the current position.
    fn primary_key(&self) -> &Self::PrimaryKey;

    /// The record value at the current position.
    fn value(&self) -> &Self::Value;

    /// The direction the cursor was opened with.
    fn direction(&self) -> Direction;
}

/// Movement operations on a positioned cursor.
///
/// # Implementation Guide
///
/// Implementers must ensure:
///
/// - **Eager dispatch**: each method issues its request against the backend
///   when it is called. The returned future only resolves the response, so
///   a caller may drop it without undoing the request.
/// - **Immutability**: a cursor value represents a single position. Moving
///   never changes `self`; it produces a new cursor.
/// - **End marker**: once there is no position to move to, the future
///   resolves to `Ok(None)`.
///
/// All futures are `Send + 'static` so they can be stored and awaited at a
/// later point.
pub trait Cursor: CursorRead + Sized + Send + Sync + 'static {
    /// Error type returned by the backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Move to the next position, or to the first position at or beyond
    /// `key` in the cursor's direction.
    fn continue_to(
        &self,
        key: Option<Self::Key>,
    ) -> impl Future<Output = Moved<Self>> + Send + 'static;

    /// Move to the first position at or beyond the compound
    /// `(key, primary_key)` in the cursor's direction.
    fn continue_primary_key(
        &self,
        key: Self::Key,
        primary_key: Self::PrimaryKey,
    ) -> impl Future<Output = Moved<Self>> + Send + 'static;

    /// Skip `count` positions forward in the cursor's direction.
    fn advance(&self, count: u32) -> impl Future<Output = Moved<Self>> + Send + 'static;

    /// Move to the next position. This is the default step used when
    /// iterating.
    fn next(&self) -> impl Future<Output = Moved<Self>> + Send + 'static {
        self.continue_to(None)
    }
}

/// A store or index that can open cursors.
pub trait CursorSource {
    /// The cursor type produced by this source.
    type Cursor: Cursor;

    /// Arguments accepted when opening a cursor.
    type Query;

    /// Open a cursor positioned at the first entry matching `query`.
    ///
    /// Resolves to `Ok(None)` when nothing matches.
    fn open_cursor(
        &self,
        query: Self::Query,
    ) -> impl Future<Output = Moved<Self::Cursor>> + Send + 'static + use<Self>;
}
