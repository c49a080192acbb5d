//! Time periods covered by a single candle or snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimePeriod {
    pub fn new(start: DateTime<Utc>, length: Duration) -> Self {
        TimePeriod {
            start,
            end: start + length,
        }
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    /// Shift the period by `n` of its own lengths. Negative values move it back in time.
    pub fn advance(&self, n: i32) -> Self {
        let offset = self.length() * n;
        TimePeriod {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.start.format("%Y-%m-%dT%H:%M:%S"),
            self.end.format("%Y-%m-%dT%H:%M:%S")
        )
    }
}
