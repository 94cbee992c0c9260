//! Stream identification and versioning types.
//!
//! A stream is the ordered event history of one aggregate instance. It is
//! addressed by a [`StreamId`] and its length is its [`Version`], which doubles
//! as the optimistic-concurrency token carried from read to append.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `StreamId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid stream ID: {0}")]
pub struct ParseStreamIdError(String);

/// Unique identifier of an event stream.
///
/// Stream IDs are opaque to the store. Aggregates derive theirs from their kind
/// and identity, e.g. `"shopping_cart-5f0c…"`.
///
/// - `FromStr::from_str()` validates input (rejects empty strings)
/// - `From::from()` and `new()` do not validate (trusted, application-built IDs)
///
/// # Examples
///
/// ```
/// use composable_es_core::stream::StreamId;
///
/// let stream_id = StreamId::for_aggregate("shopping_cart", "42");
/// assert_eq!(stream_id.as_str(), "shopping_cart-42");
///
/// let parsed: StreamId = "shopping_cart-42".parse().unwrap();
/// assert_eq!(parsed, stream_id);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamId(String);

impl StreamId {
    /// Create a new `StreamId` from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the stream ID owned by one aggregate instance: `{kind}-{id}`.
    #[must_use]
    pub fn for_aggregate(kind: &str, id: impl fmt::Display) -> Self {
        Self(format!("{kind}-{id}"))
    }

    /// Get the stream ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the `StreamId` into its inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StreamId {
    type Err = ParseStreamIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ParseStreamIdError("Stream ID cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for StreamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Number of events successfully appended to a stream.
///
/// `Version(0)` means the stream is empty or does not exist. Appending `n`
/// events to a stream at version `v` moves it to `v + n`; the event appended
/// at version `v + 1` is the stream's `(v + 1)`-th event.
///
/// # Examples
///
/// ```
/// use composable_es_core::stream::Version;
///
/// let v0 = Version::INITIAL;
/// assert!(v0.is_initial());
/// assert_eq!(v0.next(), Version::new(1));
/// assert_eq!(Version::new(2) + 3, Version::new(5));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Version of a stream that has never been appended to.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Check if this is the initial version (0).
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }

    /// Version reached after appending `count` events on top of `self`.
    #[must_use]
    pub const fn advanced_by(self, count: usize) -> Self {
        Self(self.0 + count as u64)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

impl std::ops::Add<u64> for Version {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}
