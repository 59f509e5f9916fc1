//! Lazy async streams over request/response paginated cursors.
//!
//! Paginated cursor backends work one request at a time: open a cursor,
//! read the current position, explicitly request the next position, and so
//! on. This crate turns that protocol into a [`Stream`] of positions while
//! keeping the backend's alternate movements available to the consumer.
//!
//! # Overview
//!
//! - [`CursorStream`] drives a cursor. It yields one [`CursorAdapter`] per
//!   position and, when polled again, advances the cursor.
//! - [`CursorAdapter`] wraps the cursor at one position. Reads pass
//!   through. Calling [`advance`], [`continue_to`] or
//!   [`continue_primary_key`] on it issues that request immediately and
//!   makes its response the stream's next position, instead of the default
//!   [`Cursor::next`] step.
//! - [`Unwrap`] recovers the underlying cursor from an adapter.
//!
//! # Example
//!
//! ```ignore
//! use cursor_stream::{CursorQuery, CursorRead, IterateExt, mem::MemStore};
//! use tokio_stream::StreamExt;
//!
//! let store = MemStore::new();
//! for k in 1..=5u64 {
//!     store.put(k, k * 10)?;
//! }
//!
//! let mut positions = store.iterate(CursorQuery::new());
//! while let Some(pos) = positions.next().await {
//!     let pos = pos?;
//!     if *pos.key() == 2 {
//!         // Skip key 3. The stream continues at key 4.
//!         pos.advance(2);
//!     }
//! }
//! ```
//!
//! # Trait Model
//!
//! ```text
//! CursorSource             ← Opens cursors (stores, indexes)
//!   └─ open_cursor() → Cursor
//!                       ├─ CursorRead  ← Read accessors (passed through)
//!                       └─ Cursor      ← Movement (intercepted by the adapter)
//! IterateExt               ← iterate() for every CursorSource (blanket impl)
//! ```
//!
//! # Feature Flags
//!
//! - **`in-memory`**: Enables the [`mem`] module, providing an in-memory
//!   [`CursorSource`] backend for testing.
//! - **`test-utils`**: Enables the [`conformance`] module with backend
//!   conformance tests. Implies `in-memory`.
//!
//! [`Stream`]: futures_core::Stream
//! [`advance`]: CursorAdapter::advance
//! [`continue_to`]: CursorAdapter::continue_to
//! [`continue_primary_key`]: CursorAdapter::continue_primary_key

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod adapter;
pub use adapter::CursorAdapter;

pub mod config;
pub use config::ConfigError;

mod identity;
pub use identity::{Unwrap, unwrap};

mod query;
pub use query::{CursorQuery, Direction, KeyRange};

mod stream;
pub use stream::{CursorStream, IterateExt, iterate_cursor};

mod traits;
pub use traits::{Cursor, CursorRead, CursorSource, MoveFuture, Moved};

/// Conformance tests for cursor backends.
#[cfg(any(test, feature = "test-utils"))]
pub mod conformance;

#[cfg(any(test, feature = "in-memory"))]
pub mod mem;
