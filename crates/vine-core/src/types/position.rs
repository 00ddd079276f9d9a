//! Feed positions.
//!
//! A position is the monotonically increasing marker the feed assigns to each
//! change. It doubles as the resume cursor persisted by the checkpoint store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Totally ordered marker of a change's place in the feed
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Position(u64);

impl Position {
    /// Position before the first change of the feed
    pub const ZERO: Position = Position(0);

    /// Create a position from its raw value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw value of this position
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Read a position from a feed `seq` value.
    ///
    /// Accepts JSON numbers and strings holding a decimal integer. Zero is
    /// rejected because the feed never assigns it to a change.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let raw = match value {
            serde_json::Value::Number(n) => n.as_u64()?,
            serde_json::Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };

        (raw > 0).then_some(Self(raw))
    }
}

impl From<u64> for Position {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for Position {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
