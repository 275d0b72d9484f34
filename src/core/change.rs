//! Change-log records and replica cursors.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Namespace;

/// Milliseconds since the epoch, as stamped by the change log.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn new(ms: u64) -> Self {
        Self(ms)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Watermark up to which a replica has confirmed delivery.
///
/// Only ever advances; `ZERO` means the replica has never synced.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cursor(Timestamp);

impl Cursor {
    pub const ZERO: Cursor = Cursor(Timestamp::ZERO);

    pub fn at(ts: Timestamp) -> Self {
        Self(ts)
    }

    pub fn timestamp(self) -> Timestamp {
        self.0
    }

    /// Advance to `ts`; never moves backwards.
    pub fn advance_to(&mut self, ts: Timestamp) {
        if ts > self.0 {
            self.0 = ts;
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One logged mutation. Appended synchronously with every write to the
/// archive; never edited or deleted afterwards.
///
/// Ordering key is `timestamp`; the log breaks ties by insertion order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub timestamp: Timestamp,
    pub namespace: Namespace,
    pub record_id: String,
    #[serde(default)]
    pub deleted: bool,
}
