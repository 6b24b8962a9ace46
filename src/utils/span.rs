//! Source location tracking

use serde::Serialize;
use std::fmt;

/// An inclusive range of source lines covered by a token or node.
///
/// Line numbers start at 1; a zero in either position means the span has not
/// been resolved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    /// First line
    pub start: u32,
    /// Last line (inclusive)
    pub end: u32,
}

impl Span {
    /// Create a new span
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A span covering a single line
    pub fn line(line: u32) -> Self {
        Self { start: line, end: line }
    }

    /// An unresolved span
    pub fn unset() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Both ends are set and ordered
    pub fn is_valid(&self) -> bool {
        self.start > 0 && self.end > 0 && self.start <= self.end
    }

    pub fn is_unset(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// Merge two spans, ignoring whichever side is unresolved
    pub fn merge(&self, other: &Span) -> Span {
        match (self.is_valid(), other.is_valid()) {
            (true, true) => Span {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            },
            (true, false) => *self,
            (false, true) => *other,
            (false, false) => Span::unset(),
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::unset()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "line {}", self.start)
        } else {
            write!(f, "lines {}-{}", self.start, self.end)
        }
    }
}
