//! Time intervals, detector streams, and the search for times when every stream is usable.
mod intersect;
pub mod query;

pub use intersect::intersect;
pub use query::{SegmentProvider, SegmentSource, StreamFlag};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of one detector data stream, e.g. `H1`.
pub type StreamId = String;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid interval [{start}, {end}): start must be before end")]
pub struct InvalidInterval {
    pub start: i64,
    pub end: i64,
}

/// A half-open GPS time interval `[start, end)` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "(i64, i64)", into = "(i64, i64)")]
pub struct Interval {
    start: i64,
    end: i64,
}

impl Interval {
    pub fn new(start: i64, end: i64) -> Result<Self, InvalidInterval> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(InvalidInterval { start, end })
        }
    }

    /// Like [`Interval::new`] but discards degenerate input instead of reporting it.
    pub fn try_from_pair(start: i64, end: i64) -> Option<Self> {
        Self::new(start, end).ok()
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The part of `self` that lies inside `bounds`, if any.
    pub fn clip(&self, bounds: &Interval) -> Option<Interval> {
        Self::try_from_pair(self.start.max(bounds.start), self.end.min(bounds.end))
    }
}

impl TryFrom<(i64, i64)> for Interval {
    type Error = InvalidInterval;

    fn try_from((start, end): (i64, i64)) -> Result<Self, Self::Error> {
        Self::new(start, end)
    }
}

impl From<Interval> for (i64, i64) {
    fn from(interval: Interval) -> Self {
        (interval.start, interval.end)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// An interval during which every configured stream reported valid data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoincidentSegment(Interval);

impl CoincidentSegment {
    pub(crate) fn new(interval: Interval) -> Self {
        Self(interval)
    }

    pub fn interval(&self) -> Interval {
        self.0
    }

    pub fn start(&self) -> i64 {
        self.0.start
    }

    pub fn end(&self) -> i64 {
        self.0.end
    }

    pub fn duration(&self) -> i64 {
        self.0.duration()
    }
}

impl fmt::Display for CoincidentSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
