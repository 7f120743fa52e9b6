// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

/// Requested window in naive wall-clock time; `end > start` always holds.
///
/// Two interval conventions meet here. Index candidacy treats the window as
/// half-open `[start, end)`, while record selection uses the open interval
/// `(start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError("end must be after start".to_string()));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Strictly inside `(start, end)`.
    #[must_use]
    pub fn contains_open(&self, ts: &NaiveDateTime) -> bool {
        *ts > self.start && *ts < self.end
    }

    /// File interval `[file_start, file_end]` intersects the window.
    #[must_use]
    pub fn overlaps_file(&self, file_start: &NaiveDateTime, file_end: &NaiveDateTime) -> bool {
        !(*file_end <= self.start || *file_start >= self.end)
    }
}
