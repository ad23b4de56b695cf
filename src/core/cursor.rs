//! Text Cursor - position-tracking navigation over source text
//!
//! A [`Cursor`] is a small `Copy` value: every operation returns a new
//! cursor rather than mutating in place, so the reconciler can probe ahead
//! and simply drop the probe when a token is absent. Failures are explicit
//! [`CursorError`] values, since probing for missing tokens is routine.
//!
//! Substring search uses `memchr::memmem` (SIMD when available).

use super::range::{Position, Range};
use memchr::memmem;
use thiserror::Error;

/// Why a cursor move could not be performed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("cannot shift {requested} characters at offset {offset}: end of text")]
    OutOfBounds { offset: usize, requested: usize },
    #[error("'{needle}' not found after offset {offset}")]
    NotFound { offset: usize, needle: String },
    #[error("cannot move backward from the start of line {line}")]
    AtLineStart { line: usize },
}

/// Immutable cursor over a source text
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    text: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor at the start of `text`
    pub fn new(text: &'a str) -> Self {
        Cursor { text, offset: 0, line: 1, column: 0 }
    }

    /// The full text this cursor navigates
    #[inline]
    pub fn text(&self) -> &'a str {
        self.text
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column, self.offset)
    }

    /// Text from the cursor to the end of input
    #[inline]
    pub fn remaining(&self) -> &'a str {
        self.text.get(self.offset..).unwrap_or("")
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.offset >= self.text.len()
    }

    /// Character under the cursor
    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Range from this cursor to `other`
    #[inline]
    pub fn range_to(&self, other: &Cursor<'_>) -> Range {
        Range::new(self.position(), other.position())
    }

    /// Advance `n` characters
    pub fn shift(self, n: usize) -> Result<Self, CursorError> {
        let mut next = self;
        let mut chars = self.remaining().chars();
        for _ in 0..n {
            match chars.next() {
                Some(c) => next.step(c),
                None => {
                    return Err(CursorError::OutOfBounds {
                        offset: self.offset,
                        requested: n,
                    })
                }
            }
        }
        Ok(next)
    }

    /// Move to just before the next occurrence of `needle`
    pub fn move_before(self, needle: &str) -> Result<Self, CursorError> {
        match memmem::find(self.remaining().as_bytes(), needle.as_bytes()) {
            Some(found) => Ok(self.advance_bytes(found)),
            None => Err(CursorError::NotFound {
                offset: self.offset,
                needle: needle.to_string(),
            }),
        }
    }

    /// Move to just after the next occurrence of `needle`
    pub fn move_after(self, needle: &str) -> Result<Self, CursorError> {
        Ok(self.move_before(needle)?.advance_bytes(needle.len()))
    }

    /// Skip contiguous XML whitespace (space, tab, CR, LF)
    pub fn move_after_whitespaces(self) -> Self {
        self.move_while(is_xml_whitespace)
    }

    /// Advance while `pred` holds for the character under the cursor
    pub fn move_while(self, pred: impl Fn(char) -> bool) -> Self {
        let mut next = self;
        for c in self.remaining().chars() {
            if !pred(c) {
                break;
            }
            next.step(c);
        }
        next
    }

    /// Step back one character. Never crosses a line boundary.
    pub fn move_backward(self) -> Result<Self, CursorError> {
        if self.column == 0 {
            return Err(CursorError::AtLineStart { line: self.line });
        }
        let prev = self.text.get(..self.offset).and_then(|s| s.chars().next_back());
        match prev {
            Some(c) => Ok(Cursor {
                offset: self.offset - c.len_utf8(),
                column: self.column - 1,
                ..self
            }),
            None => Err(CursorError::AtLineStart { line: self.line }),
        }
    }

    /// Re-anchor on a byte offset at or after the current one.
    ///
    /// Coarse event offsets only ever move forward, so the reconciler keeps one
    /// running cursor and advances it; the whole document is walked once.
    pub fn advance_to(self, offset: usize) -> Result<Self, CursorError> {
        if offset < self.offset || offset > self.text.len() || !self.text.is_char_boundary(offset) {
            return Err(CursorError::OutOfBounds {
                offset: self.offset,
                requested: offset.saturating_sub(self.offset),
            });
        }
        Ok(self.advance_bytes(offset - self.offset))
    }

    /// Does the remaining text start with `prefix`?
    #[inline]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.remaining().starts_with(prefix)
    }

    /// Does `needle` occur entirely between this cursor and `until`?
    pub fn has(&self, needle: &str, until: &Cursor<'_>) -> bool {
        if until.offset <= self.offset {
            return false;
        }
        self.text
            .get(self.offset..until.offset)
            .is_some_and(|window| memmem::find(window.as_bytes(), needle.as_bytes()).is_some())
    }

    /// Text between this cursor and `other`
    pub fn slice_to(&self, other: &Cursor<'_>) -> &'a str {
        self.text.get(self.offset..other.offset).unwrap_or("")
    }

    /// Advance over `len` bytes, which must end on a char boundary
    fn advance_bytes(self, len: usize) -> Self {
        let mut next = self;
        let end = self.offset + len;
        let Some(segment) = self.text.get(self.offset..end) else {
            return self;
        };
        let mut newlines = memchr::memchr_iter(b'\n', segment.as_bytes()).peekable();
        if newlines.peek().is_none() {
            next.column += segment.chars().count();
        } else {
            let last = newlines.fold(0, |_, idx| {
                next.line += 1;
                idx
            });
            next.column = segment.get(last + 1..).map_or(0, |tail| tail.chars().count());
        }
        next.offset = end;
        next
    }

    #[inline]
    fn step(&mut self, c: char) {
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }
}

/// XML whitespace per the `S` production
#[inline]
pub fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// First character of an XML name
#[inline]
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | '_' | 'A'..='Z' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

/// Subsequent character of an XML name
#[inline]
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c, '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_tracks_lines() {
        let cursor = Cursor::new("ab\ncd").shift(4).unwrap();
        assert_eq!(cursor.position(), Position::new(2, 1, 4));
        assert_eq!(cursor.peek(), Some('d'));
    }

    #[test]
    fn test_shift_out_of_bounds() {
        let err = Cursor::new("abc").shift(4).unwrap_err();
        assert!(matches!(err, CursorError::OutOfBounds { requested: 4, .. }));
        assert!(Cursor::new("abc").shift(3).unwrap().is_at_end());
    }

    #[test]
    fn test_shift_multibyte() {
        let cursor = Cursor::new("é😀x").shift(2).unwrap();
        assert_eq!(cursor.position(), Position::new(1, 2, 6));
        assert_eq!(cursor.peek(), Some('x'));
    }

    #[test]
    fn test_move_before_and_after() {
        let cursor = Cursor::new("<a>\n <b/>");
        let before = cursor.move_before("<b").unwrap();
        assert_eq!(before.position(), Position::new(2, 1, 5));
        let after = cursor.move_after("<b").unwrap();
        assert_eq!(after.position(), Position::new(2, 3, 7));
    }

    #[test]
    fn test_move_across_several_lines() {
        let cursor = Cursor::new("x\n\nyé\nzz>").move_after(">").unwrap();
        assert_eq!(cursor.position(), Position::new(4, 3, 10));
    }

    #[test]
    fn test_move_before_not_found() {
        let err = Cursor::new("<a>").move_before("]]>").unwrap_err();
        assert!(matches!(err, CursorError::NotFound { .. }));
    }

    #[test]
    fn test_move_backward_stops_at_line_start() {
        let cursor = Cursor::new("a\nbc").shift(3).unwrap();
        let back = cursor.move_backward().unwrap();
        assert_eq!(back.position(), Position::new(2, 0, 2));
        assert!(matches!(back.move_backward(), Err(CursorError::AtLineStart { line: 2 })));
    }

    #[test]
    fn test_move_backward_multibyte() {
        let cursor = Cursor::new("aé").shift(2).unwrap();
        let back = cursor.move_backward().unwrap();
        assert_eq!(back.offset(), 1);
        assert_eq!(back.peek(), Some('é'));
    }

    #[test]
    fn test_whitespace_and_names() {
        let cursor = Cursor::new("  \n\tns:foo-bar.1 rest").move_after_whitespaces();
        assert_eq!(cursor.position(), Position::new(2, 1, 4));
        let end = cursor.move_while(is_name_char);
        assert_eq!(cursor.slice_to(&end), "ns:foo-bar.1");
    }

    #[test]
    fn test_has_is_bounded() {
        let start = Cursor::new("<a x='1'/><b>");
        let close = start.move_after(">").unwrap();
        assert!(start.has("/>", &close));
        let second = close.move_after(">").unwrap();
        assert!(!close.has("/>", &second));
    }

    #[test]
    fn test_advance_to_is_monotonic() {
        let cursor = Cursor::new("ab\ncd").advance_to(4).unwrap();
        assert_eq!(cursor.position(), Position::new(2, 1, 4));
        assert!(cursor.advance_to(2).is_err());
    }
}
