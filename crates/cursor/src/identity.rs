//! Recovering the underlying cursor from an adapter.
//!
//! An adapter owns the [`Arc`] of the cursor it wraps, so the association
//! between the two lives exactly as long as the adapter does. Code that
//! may receive either an adapter or a plain cursor can use [`Unwrap`] to
//! reach the underlying cursor without caring which one it has.

use crate::{adapter::CursorAdapter, traits::Cursor};
use std::sync::Arc;

/// Types that wrap, or are, a shared cursor.
pub trait Unwrap {
    /// The underlying cursor type.
    type Cursor: Cursor;

    /// The underlying cursor.
    ///
    /// The returned [`Arc`] is the same allocation that was wrapped, so
    /// [`Arc::ptr_eq`] holds between it and the original.
    fn unwrap_cursor(&self) -> &Arc<Self::Cursor>;
}

impl<C: Cursor> Unwrap for CursorAdapter<C> {
    type Cursor = C;

    fn unwrap_cursor(&self) -> &Arc<C> {
        self.cursor()
    }
}

impl<C: Cursor> Unwrap for Arc<C> {
    type Cursor = C;

    fn unwrap_cursor(&self) -> &Arc<C> {
        self
    }
}

impl<U: Unwrap> Unwrap for &U {
    type Cursor = U::Cursor;

    fn unwrap_cursor(&self) -> &Arc<U::Cursor> {
        U::unwrap_cursor(self)
    }
}

/// Recover a shared handle on the underlying cursor of `value`.
pub fn unwrap<U: Unwrap>(value: &U) -> Arc<U::Cursor> {
    value.unwrap_cursor().clone()
}
