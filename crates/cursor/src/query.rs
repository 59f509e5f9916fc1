//! Arguments for opening a cursor.

use crate::config::ConfigError;
use std::{fmt, ops::Bound, str::FromStr};

/// Traversal direction of a cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Ascending order, visiting every entry.
    #[default]
    Next,
    /// Ascending order, visiting only the first entry of each distinct key.
    NextUnique,
    /// Descending order, visiting every entry.
    Prev,
    /// Descending order, visiting only the first entry of each distinct key.
    PrevUnique,
}

impl Direction {
    /// Returns true for the ascending directions.
    pub const fn is_forward(self) -> bool {
        matches!(self, Self::Next | Self::NextUnique)
    }

    /// Returns true for the directions that skip duplicate keys.
    pub const fn is_unique(self) -> bool {
        matches!(self, Self::NextUnique | Self::PrevUnique)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next => write!(f, "next"),
            Self::NextUnique => write!(f, "nextunique"),
            Self::Prev => write!(f, "prev"),
            Self::PrevUnique => write!(f, "prevunique"),
        }
    }
}

impl FromStr for Direction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "next" => Ok(Self::Next),
            "nextunique" => Ok(Self::NextUnique),
            "prev" => Ok(Self::Prev),
            "prevunique" => Ok(Self::PrevUnique),
            _ => Err(ConfigError::InvalidDirection(s.to_string())),
        }
    }
}

/// A contiguous range of keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange<K> {
    lower: Bound<K>,
    upper: Bound<K>,
}

impl<K> Default for KeyRange<K> {
    fn default() -> Self {
        Self::all()
    }
}

impl<K> KeyRange<K> {
    /// A range matching every key.
    pub const fn all() -> Self {
        Self { lower: Bound::Unbounded, upper: Bound::Unbounded }
    }

    /// A range matching keys at or above `key`, or strictly above it when
    /// `open` is set.
    pub const fn lower_bound(key: K, open: bool) -> Self {
        let lower = if open { Bound::Excluded(key) } else { Bound::Included(key) };
        Self { lower, upper: Bound::Unbounded }
    }

    /// A range matching keys at or below `key`, or strictly below it when
    /// `open` is set.
    pub const fn upper_bound(key: K, open: bool) -> Self {
        let upper = if open { Bound::Excluded(key) } else { Bound::Included(key) };
        Self { lower: Bound::Unbounded, upper }
    }

    /// A range between two keys, with each end optionally open.
    pub const fn bound(lower: K, upper: K, lower_open: bool, upper_open: bool) -> Self {
        Self {
            lower: if lower_open { Bound::Excluded(lower) } else { Bound::Included(lower) },
            upper: if upper_open { Bound::Excluded(upper) } else { Bound::Included(upper) },
        }
    }

    /// The lower end of the range.
    pub const fn lower(&self) -> &Bound<K> {
        &self.lower
    }

    /// The upper end of the range.
    pub const fn upper(&self) -> &Bound<K> {
        &self.upper
    }
}

impl<K: Clone> KeyRange<K> {
    /// A range matching exactly one key.
    pub fn only(key: K) -> Self {
        Self { lower: Bound::Included(key.clone()), upper: Bound::Included(key) }
    }
}

impl<K: Ord> KeyRange<K> {
    /// Returns true if `key` falls within the range.
    pub fn contains(&self, key: &K) -> bool {
        let above = match &self.lower {
            Bound::Included(lower) => key >= lower,
            Bound::Excluded(lower) => key > lower,
            Bound::Unbounded => true,
        };
        let below = match &self.upper {
            Bound::Included(upper) => key <= upper,
            Bound::Excluded(upper) => key < upper,
            Bound::Unbounded => true,
        };
        above && below
    }
}

/// Arguments for [`CursorSource::open_cursor`].
///
/// [`CursorSource::open_cursor`]: crate::CursorSource::open_cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorQuery<K> {
    /// The keys the cursor ranges over.
    pub range: KeyRange<K>,
    /// The traversal direction.
    pub direction: Direction,
}

impl<K> Default for CursorQuery<K> {
    fn default() -> Self {
        Self { range: KeyRange::all(), direction: Direction::Next }
    }
}

impl<K> CursorQuery<K> {
    /// A query over every key, ascending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key range.
    pub fn with_range(mut self, range: KeyRange<K>) -> Self {
        self.range = range;
        self
    }

    /// Set the direction.
    pub const fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

impl<K> From<KeyRange<K>> for CursorQuery<K> {
    fn from(range: KeyRange<K>) -> Self {
        Self { range, direction: Direction::Next }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_round_trips_through_str() {
        for direction in
            [Direction::Next, Direction::NextUnique, Direction::Prev, Direction::PrevUnique]
        {
            assert_eq!(direction.to_string().parse::<Direction>().unwrap(), direction);
        }
    }

    #[test]
    fn direction_rejects_unknown() {
        let err = "sideways".parse::<Direction>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDirection(s) if s == "sideways"));
    }

    #[test]
    fn range_contains() {
        let range = KeyRange::bound(2, 4, false, true);
        assert!(!range.contains(&1));
        assert!(range.contains(&2));
        assert!(range.contains(&3));
        assert!(!range.contains(&4));

        assert!(KeyRange::only(7).contains(&7));
        assert!(!KeyRange::only(7).contains(&8));
        assert!(KeyRange::lower_bound(3, true).contains(&4));
        assert!(!KeyRange::lower_bound(3, true).contains(&3));
        assert!(KeyRange::upper_bound(3, false).contains(&3));
        assert!(KeyRange::<u64>::all().contains(&u64::MAX));
    }
}
