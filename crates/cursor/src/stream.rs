//! Lazy async iteration over a paginated cursor.

use crate::{
    adapter::{CursorAdapter, PendingSlot},
    traits::{Cursor, CursorSource, MoveFuture, Moved},
};
use futures_core::{FusedStream, Stream};
use futures_util::FutureExt;
use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tracing::{debug, trace};

/// Issues the open request when the stream is first polled.
type OpenFn<C> = Box<dyn FnOnce() -> MoveFuture<C> + Send>;

enum State<C: Cursor> {
    /// Not yet polled. The open request has not been issued.
    Opening(OpenFn<C>),
    /// Waiting for the cursor at the next position.
    Advancing(MoveFuture<C>),
    /// A cursor ready to be wrapped and yielded.
    Positioned(Arc<C>),
    /// An adapter for `cursor` has been yielded. The consumer may record a
    /// movement in `slot` until the stream is polled again.
    Yielded { cursor: Arc<C>, slot: Arc<PendingSlot<C>> },
    /// The end marker was reached, or an advance failed.
    Done,
}

/// A lazy, single-pass stream of cursor positions.
///
/// Each item is a [`CursorAdapter`] for one position. While an adapter is
/// held, the consumer may call one of its movement methods to choose how
/// the stream advances. When the stream is next polled it awaits the
/// recorded movement if there is one, and otherwise the cursor's default
/// [`Cursor::next`] step.
///
/// A failed advance is yielded as an `Err` item, after which the stream
/// ends. The stream cannot be restarted.
///
/// ```ignore
/// use cursor_stream::{CursorQuery, IterateExt};
/// use tokio_stream::StreamExt;
///
/// let mut positions = store.iterate(CursorQuery::new());
/// while let Some(pos) = positions.next().await {
///     let pos = pos?;
///     if should_skip(pos.value()) {
///         pos.advance(10);
///     }
/// }
/// ```
#[must_use = "streams do nothing unless polled"]
pub struct CursorStream<C: Cursor> {
    state: State<C>,
    positions: u64,
}

impl<C: Cursor> CursorStream<C> {
    /// Create a stream from a future resolving to the first position.
    ///
    /// If the future resolves to the end marker the stream is empty.
    pub fn from_open<F>(open: F) -> Self
    where
        F: Future<Output = Moved<C>> + Send + 'static,
    {
        Self { state: State::Advancing(open.boxed()), positions: 0 }
    }

    /// Create a stream that calls `open` when it is first polled.
    ///
    /// Nothing is requested from the backend until then, so the first
    /// position reflects the source as of the first poll.
    pub fn from_open_with<F, Fut>(open: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Moved<C>> + Send + 'static,
    {
        Self { state: State::Opening(Box::new(move || open().boxed())), positions: 0 }
    }

    /// Create a stream starting at an already positioned cursor.
    ///
    /// The first item wraps `cursor` itself.
    pub const fn from_cursor(cursor: Arc<C>) -> Self {
        Self { state: State::Positioned(cursor), positions: 0 }
    }

    /// The number of positions yielded so far.
    pub const fn position_count(&self) -> u64 {
        self.positions
    }

    /// Returns true once the stream has ended.
    pub const fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    fn yield_cursor(&mut self, cursor: Arc<C>) -> CursorAdapter<C> {
        let (adapter, slot) = CursorAdapter::wrap(cursor.clone());
        self.positions += 1;
        trace!(position = self.positions, "yielding cursor position");
        self.state = State::Yielded { cursor, slot };
        adapter
    }
}

impl<C: Cursor> From<Arc<C>> for CursorStream<C> {
    fn from(cursor: Arc<C>) -> Self {
        Self::from_cursor(cursor)
    }
}

impl<C: Cursor> Stream for CursorStream<C> {
    type Item = Result<CursorAdapter<C>, C::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match std::mem::replace(&mut this.state, State::Done) {
                State::Opening(open) => {
                    debug!("opening cursor");
                    this.state = State::Advancing(open());
                }
                State::Positioned(cursor) => {
                    return Poll::Ready(Some(Ok(this.yield_cursor(cursor))));
                }
                State::Yielded { cursor, slot } => {
                    // Taking the recording also clears it.
                    let fut = match slot.take() {
                        Some(fut) => {
                            trace!(position = this.positions, "advancing with recorded movement");
                            fut
                        }
                        None => {
                            trace!(position = this.positions, "advancing with default step");
                            cursor.next().boxed()
                        }
                    };
                    this.state = State::Advancing(fut);
                }
                State::Advancing(mut fut) => match fut.poll_unpin(cx) {
                    Poll::Pending => {
                        this.state = State::Advancing(fut);
                        return Poll::Pending;
                    }
                    Poll::Ready(Ok(Some(cursor))) => {
                        this.state = State::Positioned(Arc::new(cursor));
                    }
                    Poll::Ready(Ok(None)) => {
                        debug!(positions = this.positions, "cursor exhausted");
                        return Poll::Ready(None);
                    }
                    Poll::Ready(Err(err)) => {
                        debug!(positions = this.positions, %err, "cursor advance failed");
                        return Poll::Ready(Some(Err(err)));
                    }
                },
                State::Done => return Poll::Ready(None),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            State::Done => (0, Some(0)),
            State::Positioned(_) => (1, None),
            _ => (0, None),
        }
    }
}

impl<C: Cursor> FusedStream for CursorStream<C> {
    fn is_terminated(&self) -> bool {
        self.is_done()
    }
}

impl<C: Cursor> fmt::Debug for CursorStream<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Opening(_) => "opening",
            State::Advancing(_) => "advancing",
            State::Positioned(_) => "positioned",
            State::Yielded { .. } => "yielded",
            State::Done => "done",
        };
        f.debug_struct("CursorStream")
            .field("state", &state)
            .field("positions", &self.positions)
            .finish()
    }
}

/// Iterate over a positioned cursor.
///
/// Equivalent to [`CursorStream::from_cursor`].
pub const fn iterate_cursor<C: Cursor>(cursor: Arc<C>) -> CursorStream<C> {
    CursorStream::from_cursor(cursor)
}

/// Extension trait for iterating over a [`CursorSource`].
pub trait IterateExt: CursorSource {
    /// Open a cursor with `query` and iterate over its positions.
    ///
    /// The stream holds its own handle on the source. The open request is
    /// issued when the stream is first polled, not when this method is
    /// called.
    fn iterate(&self, query: Self::Query) -> CursorStream<Self::Cursor>
    where
        Self: Clone + Send + 'static,
        Self::Query: Send + 'static,
    {
        let source = self.clone();
        CursorStream::from_open_with(move || source.open_cursor(query))
    }
}

/// Blanket implementation of [`IterateExt`] for every [`CursorSource`].
impl<S: CursorSource + ?Sized> IterateExt for S {}
