//! Environment-driven cursor configuration.
//!
//! # Environment Variables
//!
//! | Variable | Description | Values |
//! |----------|-------------|--------|
//! | `CURSOR_DIRECTION` | Direction for queries built from the environment | `next`, `nextunique`, `prev`, `prevunique` |
//!
//! # Example
//!
//! ```rust
//! use cursor_stream::{CursorQuery, Direction};
//! use std::env;
//!
//! let direction: Direction = "prevunique".parse().unwrap();
//! assert_eq!(direction, Direction::PrevUnique);
//!
//! unsafe {
//!     env::set_var("CURSOR_DIRECTION", "prev");
//! }
//! let query = CursorQuery::<u64>::from_env().unwrap();
//! assert_eq!(query.direction, Direction::Prev);
//! # unsafe { env::remove_var("CURSOR_DIRECTION"); }
//! ```

use crate::query::{CursorQuery, Direction};
use std::env;
use thiserror::Error;

/// Environment variable name for the cursor direction.
pub const ENV_CURSOR_DIRECTION: &str = "CURSOR_DIRECTION";

impl Direction {
    /// Load the direction from the `CURSOR_DIRECTION` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] if the variable is not set, or
    /// [`ConfigError::InvalidDirection`] if the value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let value = env::var(ENV_CURSOR_DIRECTION)
            .map_err(|_| ConfigError::MissingEnvVar(ENV_CURSOR_DIRECTION))?;
        value.parse()
    }
}

impl<K> CursorQuery<K> {
    /// Build a query over every key in the direction configured by the
    /// environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Direction::from_env().map(|direction| Self::new().with_direction(direction))
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Invalid direction string.
    #[error("invalid cursor direction: {0} (expected: next, nextunique, prev, prevunique)")]
    InvalidDirection(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_direction() {
        assert_eq!("next".parse::<Direction>().unwrap(), Direction::Next);
        assert_eq!("nextunique".parse::<Direction>().unwrap(), Direction::NextUnique);
        assert_eq!("prev".parse::<Direction>().unwrap(), Direction::Prev);
        assert_eq!("prevunique".parse::<Direction>().unwrap(), Direction::PrevUnique);
        assert!("".parse::<Direction>().is_err());
        assert!("next_unique".parse::<Direction>().is_err());
    }

    // All environment mutation lives in one test so parallel tests never
    // observe each other's values.
    #[test]
    fn from_env() {
        // SAFETY: Test environment, no other test touches this variable
        unsafe {
            env::remove_var(ENV_CURSOR_DIRECTION);
        }
        assert!(matches!(Direction::from_env(), Err(ConfigError::MissingEnvVar(_))));

        // SAFETY: Test environment, no other test touches this variable
        unsafe {
            env::set_var(ENV_CURSOR_DIRECTION, "prevunique");
        }
        assert_eq!(Direction::from_env().unwrap(), Direction::PrevUnique);
        let query = CursorQuery::<u64>::from_env().unwrap();
        assert_eq!(query.direction, Direction::PrevUnique);

        // SAFETY: Test environment, no other test touches this variable
        unsafe {
            env::set_var(ENV_CURSOR_DIRECTION, "backwards");
        }
        assert!(matches!(Direction::from_env(), Err(ConfigError::InvalidDirection(_))));

        // SAFETY: Test environment, no other test touches this variable
        unsafe {
            env::remove_var(ENV_CURSOR_DIRECTION);
        }
    }
}
