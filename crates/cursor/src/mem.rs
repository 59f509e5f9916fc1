//! In-memory cursor backend for testing.
//!
//! [`MemStore`] keeps records ordered by primary key in a [`BTreeMap`] and
//! supports named secondary indexes defined by key extractors. Cursors are
//! computed against the store state at the time each request is issued,
//! and every request is appended to an operation log so tests can observe
//! exactly which requests reached the backend.

use crate::{
    query::{CursorQuery, Direction, KeyRange},
    traits::{Cursor, CursorRead, CursorSource, Moved},
};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    fmt,
    future::{Future, ready},
    ops::Bound,
    sync::Arc,
};
use tracing::trace;

/// Key extractor for a secondary index.
type KeyFn<K, V> = Arc<dyn Fn(&V) -> K + Send + Sync>;

/// Errors produced by the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemCursorError {
    /// The store was aborted. All later requests fail.
    #[error("transaction aborted")]
    Aborted,

    /// A continue target is not beyond the current position in the cursor's
    /// direction.
    #[error("continue target is not beyond the current cursor position")]
    InvalidKey,

    /// Compound continue was requested on a store cursor or a unique
    /// direction.
    #[error("continue_primary_key requires an index cursor with a non-unique direction")]
    InvalidAccess,

    /// `advance` was called with a count of zero.
    #[error("advance count must be greater than zero")]
    ZeroCount,

    /// The named index does not exist.
    #[error("unknown index: {0}")]
    UnknownIndex(String),

    /// The record under the cursor no longer exists.
    #[error("record under cursor was deleted")]
    RecordDeleted,
}

/// A request received by the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorOp<K> {
    /// A cursor was opened.
    Open,
    /// `continue_to`, including the default `next` step as `Continue(None)`.
    Continue(Option<K>),
    /// `continue_primary_key`.
    ContinuePrimaryKey(K, K),
    /// `advance`.
    Advance(u32),
}

/// Where a cursor reads its entries from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Store,
    Index(String),
}

/// A movement request, after the op has been logged.
enum Seek<K> {
    Next,
    Key(K),
    Compound(K, K),
    Skip(u32),
}

/// An entry as seen by a cursor: (key, primary key, value).
type Entry<K, V> = (K, K, V);

struct Data<K, V> {
    records: BTreeMap<K, V>,
    indexes: HashMap<String, KeyFn<K, V>>,
    aborted: bool,
}

struct Shared<K, V> {
    data: RwLock<Data<K, V>>,
    ops: Mutex<Vec<CursorOp<K>>>,
}

impl<K, V> Shared<K, V>
where
    K: Ord + Clone + fmt::Debug,
    V: Clone,
{
    fn log(&self, op: CursorOp<K>) {
        trace!(?op, "mem cursor request");
        self.ops.lock().push(op);
    }

    /// Read access to the data, failing once the store is aborted.
    fn active(&self) -> Result<RwLockReadGuard<'_, Data<K, V>>, MemCursorError> {
        let data = self.data.read();
        if data.aborted {
            return Err(MemCursorError::Aborted);
        }
        Ok(data)
    }

    /// Write access to the data, failing once the store is aborted.
    fn active_mut(&self) -> Result<RwLockWriteGuard<'_, Data<K, V>>, MemCursorError> {
        let data = self.data.write();
        if data.aborted {
            return Err(MemCursorError::Aborted);
        }
        Ok(data)
    }

    /// Find the store record `skip` positions past the first record at or
    /// beyond `start` in `direction`, staying inside `range`.
    ///
    /// `start` must already lie inside or beyond the cursor's position, so
    /// the records in `range` form a prefix of the walk.
    fn seek_store(
        &self,
        range: &KeyRange<K>,
        direction: Direction,
        start: Bound<&K>,
        skip: usize,
    ) -> Result<Option<(K, V)>, MemCursorError> {
        let data = self.active()?;
        let found = if direction.is_forward() {
            nth_in_range(data.records.range::<K, _>((start, Bound::Unbounded)), range, skip)
        } else {
            nth_in_range(data.records.range::<K, _>((Bound::Unbounded, start)).rev(), range, skip)
        };
        Ok(found)
    }

    /// Collect the entries visible through `source`, filtered by `range` and
    /// ordered for `direction`.
    fn entries(
        &self,
        source: &Source,
        range: &KeyRange<K>,
        direction: Direction,
    ) -> Result<Vec<Entry<K, V>>, MemCursorError> {
        let data = self.active()?;

        let mut entries: Vec<Entry<K, V>> = match source {
            Source::Store => data
                .records
                .iter()
                .filter(|(k, _)| range.contains(k))
                .map(|(k, v)| (k.clone(), k.clone(), v.clone()))
                .collect(),
            Source::Index(name) => {
                let key_fn = data
                    .indexes
                    .get(name)
                    .ok_or_else(|| MemCursorError::UnknownIndex(name.clone()))?;
                let mut entries: Vec<_> = data
                    .records
                    .iter()
                    .map(|(pk, v)| (key_fn(v), pk.clone(), v.clone()))
                    .filter(|(k, _, _)| range.contains(k))
                    .collect();
                entries.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
                entries
            }
        };

        // Entries are ascending by (key, primary key), so the first entry of
        // each key has the lowest primary key.
        if direction.is_unique() {
            entries.dedup_by(|later, kept| later.0 == kept.0);
        }
        if !direction.is_forward() {
            entries.reverse();
        }
        Ok(entries)
    }
}

fn nth_in_range<'a, K, V>(
    records: impl Iterator<Item = (&'a K, &'a V)>,
    range: &KeyRange<K>,
    n: usize,
) -> Option<(K, V)>
where
    K: Ord + Clone + 'a,
    V: Clone + 'a,
{
    records.take_while(|(k, _)| range.contains(k)).nth(n).map(|(k, v)| (k.clone(), v.clone()))
}

/// In-memory store.
///
/// Cloning the store produces another handle on the same records.
pub struct MemStore<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Default for MemStore<K, V> {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                data: RwLock::new(Data {
                    records: BTreeMap::new(),
                    indexes: HashMap::new(),
                    aborted: false,
                }),
                ops: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl<K, V> Clone for MemStore<K, V> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<K, V> fmt::Debug for MemStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemStore").finish_non_exhaustive()
    }
}

impl<K, V> MemStore<K, V>
where
    K: Ord + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Data<K, V>>, MemCursorError> {
        self.shared.active_mut()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Data<K, V>>, MemCursorError> {
        self.shared.active()
    }

    /// Insert or replace a record, returning the previous value.
    pub fn put(&self, key: K, value: V) -> Result<Option<V>, MemCursorError> {
        Ok(self.write()?.records.insert(key, value))
    }

    /// Get the record stored under `key`.
    pub fn get(&self, key: &K) -> Result<Option<V>, MemCursorError> {
        Ok(self.read()?.records.get(key).cloned())
    }

    /// Delete the record stored under `key`, returning it.
    pub fn delete(&self, key: &K) -> Result<Option<V>, MemCursorError> {
        Ok(self.write()?.records.remove(key))
    }

    /// Delete every record.
    pub fn clear(&self) -> Result<(), MemCursorError> {
        self.write()?.records.clear();
        Ok(())
    }

    /// The number of records.
    pub fn len(&self) -> usize {
        self.shared.data.read().records.len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Define a secondary index keyed by `key_fn`, replacing any index of the
    /// same name.
    pub fn create_index<F>(&self, name: impl Into<String>, key_fn: F) -> Result<(), MemCursorError>
    where
        F: Fn(&V) -> K + Send + Sync + 'static,
    {
        self.write()?.indexes.insert(name.into(), Arc::new(key_fn));
        Ok(())
    }

    /// Get a handle on the index named `name`.
    pub fn index(&self, name: &str) -> Result<MemIndex<K, V>, MemCursorError> {
        if !self.read()?.indexes.contains_key(name) {
            return Err(MemCursorError::UnknownIndex(name.to_owned()));
        }
        Ok(MemIndex { shared: self.shared.clone(), name: name.to_owned() })
    }

    /// Abort the store. Every later request fails with
    /// [`MemCursorError::Aborted`].
    pub fn abort(&self) {
        self.shared.data.write().aborted = true;
    }

    /// The requests received so far.
    pub fn ops(&self) -> Vec<CursorOp<K>> {
        self.shared.ops.lock().clone()
    }

    /// Drain and return the requests received so far.
    pub fn take_ops(&self) -> Vec<CursorOp<K>> {
        std::mem::take(&mut *self.shared.ops.lock())
    }
}

fn open_in<K, V>(
    shared: &Arc<Shared<K, V>>,
    source: Source,
    query: CursorQuery<K>,
) -> Result<Option<MemCursor<K, V>>, MemCursorError>
where
    K: Ord + Clone + fmt::Debug,
    V: Clone,
{
    shared.log(CursorOp::Open);
    let CursorQuery { range, direction } = query;
    let first = shared.entries(&source, &range, direction)?.into_iter().next();
    Ok(first.map(|(key, primary_key, value)| MemCursor {
        shared: shared.clone(),
        source,
        range,
        direction,
        key,
        primary_key,
        value,
    }))
}

impl<K, V> CursorSource for MemStore<K, V>
where
    K: Ord + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Cursor = MemCursor<K, V>;
    type Query = CursorQuery<K>;

    fn open_cursor(
        &self,
        query: CursorQuery<K>,
    ) -> impl Future<Output = Moved<Self::Cursor>> + Send + 'static + use<K, V> {
        ready(open_in(&self.shared, Source::Store, query))
    }
}

/// A handle on a secondary index of a [`MemStore`].
pub struct MemIndex<K, V> {
    shared: Arc<Shared<K, V>>,
    name: String,
}

impl<K, V> MemIndex<K, V> {
    /// The index name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<K, V> Clone for MemIndex<K, V> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone(), name: self.name.clone() }
    }
}

impl<K, V> fmt::Debug for MemIndex<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemIndex").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<K, V> CursorSource for MemIndex<K, V>
where
    K: Ord + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Cursor = MemCursor<K, V>;
    type Query = CursorQuery<K>;

    fn open_cursor(
        &self,
        query: CursorQuery<K>,
    ) -> impl Future<Output = Moved<Self::Cursor>> + Send + 'static + use<K, V> {
        ready(open_in(&self.shared, Source::Index(self.name.clone()), query))
    }
}

/// A cursor over a [`MemStore`] or [`MemIndex`], positioned at one entry.
pub struct MemCursor<K, V> {
    shared: Arc<Shared<K, V>>,
    source: Source,
    range: KeyRange<K>,
    direction: Direction,
    key: K,
    primary_key: K,
    value: V,
}

impl<K, V> fmt::Debug for MemCursor<K, V>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemCursor")
            .field("source", &self.source)
            .field("direction", &self.direction)
            .field("key", &self.key)
            .field("primary_key", &self.primary_key)
            .finish_non_exhaustive()
    }
}

impl<K, V> MemCursor<K, V>
where
    K: Ord + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// The index name, or `None` for a store cursor.
    pub fn index_name(&self) -> Option<&str> {
        match &self.source {
            Source::Store => None,
            Source::Index(name) => Some(name.as_str()),
        }
    }

    /// Replace the record under the cursor with `value`.
    ///
    /// The cursor keeps reporting the value it was positioned with.
    pub fn update(&self, value: V) -> Result<(), MemCursorError> {
        let mut data = self.shared.active_mut()?;
        match data.records.get_mut(&self.primary_key) {
            Some(record) => {
                *record = value;
                Ok(())
            }
            None => Err(MemCursorError::RecordDeleted),
        }
    }

    /// Delete the record under the cursor.
    pub fn delete(&self) -> Result<(), MemCursorError> {
        let mut data = self.shared.active_mut()?;
        data.records.remove(&self.primary_key).map(|_| ()).ok_or(MemCursorError::RecordDeleted)
    }

    /// Returns true if `(key, primary_key)` lies strictly beyond the current
    /// position in the cursor's direction. Unique directions compare keys
    /// only.
    fn is_beyond(&self, key: &K, primary_key: &K) -> bool {
        if self.direction.is_unique() {
            self.reaches_past(key.cmp(&self.key))
        } else {
            self.reaches_past((key, primary_key).cmp(&(&self.key, &self.primary_key)))
        }
    }

    /// Returns true if `ord`, the ordering of some target against the
    /// current position, points strictly ahead in the cursor's direction.
    fn reaches_past(&self, ord: Ordering) -> bool {
        if self.direction.is_forward() { ord == Ordering::Greater } else { ord == Ordering::Less }
    }

    /// Returns true if `ord`, the ordering of an entry against a target,
    /// reaches the target in the cursor's direction.
    fn reaches(&self, ord: Ordering) -> bool {
        if self.direction.is_forward() { ord != Ordering::Less } else { ord != Ordering::Greater }
    }

    fn at(&self, key: K, primary_key: K, value: V) -> Self {
        Self {
            shared: self.shared.clone(),
            source: self.source.clone(),
            range: self.range.clone(),
            direction: self.direction,
            key,
            primary_key,
            value,
        }
    }

    fn seek(&self, seek: Seek<K>) -> Result<Option<Self>, MemCursorError> {
        // An aborted store rejects the request before its arguments are
        // looked at.
        drop(self.shared.active()?);

        match &seek {
            Seek::Key(key) if !self.reaches_past(key.cmp(&self.key)) => {
                return Err(MemCursorError::InvalidKey);
            }
            Seek::Compound(..) if self.source == Source::Store || self.direction.is_unique() => {
                return Err(MemCursorError::InvalidAccess);
            }
            Seek::Compound(key, primary_key)
                if !self.reaches_past((key, primary_key).cmp(&(&self.key, &self.primary_key))) =>
            {
                return Err(MemCursorError::InvalidKey);
            }
            Seek::Skip(0) => return Err(MemCursorError::ZeroCount),
            _ => {}
        }

        if self.source == Source::Store {
            // Store keys are unique, so unique directions need no dedup.
            let (start, skip) = match &seek {
                Seek::Key(target) => (Bound::Included(target), 0),
                Seek::Skip(count) => (Bound::Excluded(&self.key), *count as usize - 1),
                _ => (Bound::Excluded(&self.key), 0),
            };
            let found = self.shared.seek_store(&self.range, self.direction, start, skip)?;
            return Ok(found.map(|(key, value)| self.at(key.clone(), key, value)));
        }

        let entries = self.shared.entries(&self.source, &self.range, self.direction)?;
        let mut candidates = entries.into_iter().filter(|(k, pk, _)| self.is_beyond(k, pk));

        let found = match seek {
            Seek::Next => candidates.next(),
            Seek::Key(target) => candidates.find(|(k, _, _)| self.reaches(k.cmp(&target))),
            Seek::Compound(target, target_pk) => {
                candidates.find(|(k, pk, _)| self.reaches((k, pk).cmp(&(&target, &target_pk))))
            }
            Seek::Skip(count) => candidates.nth(count as usize - 1),
        };

        Ok(found.map(|(key, primary_key, value)| self.at(key, primary_key, value)))
    }
}

impl<K, V> CursorRead for MemCursor<K, V> {
    type Key = K;
    type PrimaryKey = K;
    type Value = V;

    fn key(&self) -> &K {
        &self.key
    }

    fn primary_key(&self) -> &K {
        &self.primary_key
    }

    fn value(&self) -> &V {
        &self.value
    }

    fn direction(&self) -> Direction {
        self.direction
    }
}

impl<K, V> Cursor for MemCursor<K, V>
where
    K: Ord + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Error = MemCursorError;

    fn continue_to(&self, key: Option<K>) -> impl Future<Output = Moved<Self>> + Send + 'static {
        self.shared.log(CursorOp::Continue(key.clone()));
        ready(self.seek(key.map_or(Seek::Next, Seek::Key)))
    }

    fn continue_primary_key(
        &self,
        key: K,
        primary_key: K,
    ) -> impl Future<Output = Moved<Self>> + Send + 'static {
        self.shared.log(CursorOp::ContinuePrimaryKey(key.clone(), primary_key.clone()));
        ready(self.seek(Seek::Compound(key, primary_key)))
    }

    fn advance(&self, count: u32) -> impl Future<Output = Moved<Self>> + Send + 'static {
        self.shared.log(CursorOp::Advance(count));
        ready(self.seek(Seek::Skip(count)))
    }
}
