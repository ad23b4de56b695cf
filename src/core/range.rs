//! Position and Range - exact source locations
//!
//! Every location produced by the reconciler is a half-open [`Range`] between
//! two [`Position`]s. Lines are 1-based, columns are 0-based and count
//! Unicode scalar values, offsets are UTF-8 byte offsets into the decoded
//! source so a range can slice the text it came from.

use std::fmt;

/// A point in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// 1-based line number
    pub line: usize,
    /// 0-based column, in characters
    pub column: usize,
    /// Byte offset into the decoded source
    pub offset: usize,
}

impl Position {
    /// Create a new position
    #[inline]
    pub const fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Start of a document
    #[inline]
    pub const fn start() -> Self {
        Self { line: 1, column: 0, offset: 0 }
    }

    /// Column as shown to users (1-based)
    #[inline]
    pub const fn external_column(&self) -> usize {
        self.column + 1
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.line, self.column, self.offset).cmp(&(other.line, other.column, other.offset))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open span of source text (end is exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Create a new range. `start` must not be after `end`.
    #[inline]
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start <= end, "range start {start} after end {end}");
        Self { start, end }
    }

    /// Range covering `first.start` to `last.end`
    #[inline]
    pub fn spanning(first: Range, last: Range) -> Self {
        Self::new(first.start, last.end)
    }

    /// Zero-length range at a position
    #[inline]
    pub const fn empty_at(pos: Position) -> Self {
        Self { start: pos, end: pos }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Length in bytes
    #[inline]
    pub const fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    /// True if this range lies entirely on one line
    #[inline]
    pub const fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }

    /// True if `other` is contained within this range
    pub fn contains(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True if the two ranges share at least one character
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start.offset < other.end.offset && other.start.offset < self.end.offset
    }

    /// Extract the covered text from the source this range was produced from
    #[inline]
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start.offset..self.end.offset).unwrap_or("")
    }

    /// Lines touched by this range, in order
    pub fn lines(&self) -> impl Iterator<Item = usize> {
        self.start.line..=self.end.line
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Which part of a construct a range describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocationKind {
    /// Full extent of the construct
    Node,
    /// Opening tag (elements only)
    Start,
    /// Closing tag (elements only; equals `Start` when self-closing)
    End,
    /// Element or attribute name
    Name,
    /// Attribute value, without quotes
    Value,
}

impl LocationKind {
    pub const ALL: [LocationKind; 5] = [
        LocationKind::Node,
        LocationKind::Start,
        LocationKind::End,
        LocationKind::Name,
        LocationKind::Value,
    ];
}
