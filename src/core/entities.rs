//! XML Entity Decoding
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Any other named reference is an error: there is no DTD processing, so
//! the reference can never be expanded. Uses Cow for zero-copy when no
//! entities are present.

use memchr::memchr;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

static STANDARD: LazyLock<Arc<EntityTable>> = LazyLock::new(|| {
    Arc::new(EntityTable {
        named: [("lt", "<"), ("gt", ">"), ("amp", "&"), ("quot", "\""), ("apos", "'")]
            .into_iter()
            .map(|(name, text)| (name.to_string(), text.to_string()))
            .collect(),
    })
});

/// Entity decoding failure. `offset` is the byte offset of the `&` in the
/// decoded input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    #[error("undeclared entity reference '&{name};'")]
    Unknown { name: String, offset: usize },
    #[error("invalid character reference '&{reference};'")]
    InvalidCharRef { reference: String, offset: usize },
    #[error("'&' does not start an entity reference")]
    Malformed { offset: usize },
}

impl EntityError {
    pub fn offset(&self) -> usize {
        match self {
            EntityError::Unknown { offset, .. }
            | EntityError::InvalidCharRef { offset, .. }
            | EntityError::Malformed { offset } => *offset,
        }
    }
}

/// Named entities known to the decoder. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTable {
    named: HashMap<String, String>,
}

impl EntityTable {
    /// The five predefined XML entities, shared process-wide
    pub fn standard() -> Arc<EntityTable> {
        Arc::clone(&STANDARD)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    /// Decode text content, handling entity references
    ///
    /// Returns Borrowed if no entities present (zero-copy),
    /// returns Owned if entities were decoded.
    pub fn decode<'a>(&self, input: &'a str) -> Result<Cow<'a, str>, EntityError> {
        // Fast path: check if there are any entities using SIMD
        if memchr(b'&', input.as_bytes()).is_none() {
            return Ok(Cow::Borrowed(input));
        }
        self.decode_entities(input).map(Cow::Owned)
    }

    fn decode_entities(&self, input: &str) -> Result<String, EntityError> {
        let bytes = input.as_bytes();
        let mut result = String::with_capacity(input.len());
        let mut pos = 0;

        while let Some(amp_pos) = memchr(b'&', &bytes[pos..]) {
            let amp = pos + amp_pos;
            result.push_str(&input[pos..amp]);

            let Some(semi_offset) = memchr(b';', &bytes[amp..]) else {
                return Err(EntityError::Malformed { offset: amp });
            };
            let entity = &input[amp + 1..amp + semi_offset];
            result.push_str(&self.decode_entity(entity, amp)?);
            pos = amp + semi_offset + 1;
        }
        result.push_str(&input[pos..]);
        Ok(result)
    }

    /// Decode a single entity (without & and ;)
    fn decode_entity<'t>(&'t self, entity: &str, offset: usize) -> Result<Cow<'t, str>, EntityError> {
        if let Some(numeric) = entity.strip_prefix('#') {
            return decode_numeric_entity(numeric)
                .map(|c| Cow::Owned(c.to_string()))
                .ok_or_else(|| EntityError::InvalidCharRef {
                    reference: entity.to_string(),
                    offset,
                });
        }
        if !is_entity_name(entity) {
            return Err(EntityError::Malformed { offset });
        }
        self.get(entity)
            .map(Cow::Borrowed)
            .ok_or_else(|| EntityError::Unknown {
                name: entity.to_string(),
                offset,
            })
    }
}

impl Default for EntityTable {
    fn default() -> Self {
        EntityTable::standard().as_ref().clone()
    }
}

fn is_entity_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(super::cursor::is_name_start_char)
        && chars.all(super::cursor::is_name_char)
}

/// Decode a numeric character reference, validated against the XML Char production
fn decode_numeric_entity(entity: &str) -> Option<char> {
    let codepoint = if let Some(hex) = entity.strip_prefix('x') {
        // Hexadecimal: &#xHHHH;
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(hex, 16).ok()?
    } else {
        // Decimal: &#DDDD;
        if entity.is_empty() || !entity.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        entity.parse::<u32>().ok()?
    };

    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &str) -> Result<Cow<'_, str>, EntityError> {
        EntityTable::standard().decode(input).map(|c| Cow::Owned(c.into_owned()))
    }

    #[test]
    fn test_no_entities() {
        let table = EntityTable::standard();
        let result = table.decode("Hello, World!").unwrap();
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "Hello, World!");
    }

    #[test]
    fn test_basic_entities() {
        let result = decode("&lt;hello&gt; &amp; &quot;world&quot;&apos;").unwrap();
        assert_eq!(result, "<hello> & \"world\"'");
    }

    #[test]
    fn test_numeric_decimal() {
        assert_eq!(decode("&#65;&#66;&#67;").unwrap(), "ABC");
    }

    #[test]
    fn test_numeric_hex() {
        assert_eq!(decode("&#x41;&#x42;&#x43;").unwrap(), "ABC");
    }

    #[test]
    fn test_unicode_entity() {
        assert_eq!(decode("a&#x1F600;").unwrap(), "a😀");
    }

    #[test]
    fn test_unknown_entity() {
        let err = decode("ab&ouml;").unwrap_err();
        assert_eq!(
            err,
            EntityError::Unknown { name: "ouml".to_string(), offset: 2 }
        );
    }

    #[test]
    fn test_invalid_char_ref() {
        assert!(matches!(decode("&#0;"), Err(EntityError::InvalidCharRef { .. })));
        assert!(matches!(decode("&#xZZ;"), Err(EntityError::InvalidCharRef { .. })));
    }

    #[test]
    fn test_bare_ampersand() {
        assert_eq!(decode("a & b").unwrap_err().offset(), 2);
        assert!(matches!(decode("a &b"), Err(EntityError::Malformed { offset: 2 })));
    }

    #[test]
    fn test_standard_is_shared() {
        let a = EntityTable::standard();
        let b = EntityTable::standard();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 5);
    }
}
