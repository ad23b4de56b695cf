//! XML Encoding Detection and Conversion
//!
//! The encoding is taken from, in order: the byte order mark (or the UTF-16
//! `<\0` / `\0<` pattern), the `encoding` pseudo-attribute of the XML
//! declaration, and finally the caller's default. Input is converted to a
//! UTF-8 `String` with any BOM removed, so every offset handed out later is
//! relative to the decoded text.

use crate::error::EncodingError;
use memchr::memmem;

/// Supported source encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
    Ascii,
}

impl Encoding {
    /// Map an encoding label (case-insensitive) to an encoding
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Encoding::Utf8),
            "utf-16le" => Some(Encoding::Utf16Le),
            // Without a BOM, UTF-16 is big-endian
            "utf-16" | "utf-16be" => Some(Encoding::Utf16Be),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "l1" => Some(Encoding::Latin1),
            "us-ascii" | "ascii" => Some(Encoding::Ascii),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Ascii => "US-ASCII",
        }
    }

    #[inline]
    pub fn is_utf16(&self) -> bool {
        matches!(self, Encoding::Utf16Le | Encoding::Utf16Be)
    }

    /// Detect the encoding from a byte order mark or the initial bytes.
    ///
    /// Returns the encoding and the BOM length to skip.
    pub fn detect(input: &[u8]) -> Option<(Self, usize)> {
        match input {
            [0xEF, 0xBB, 0xBF, ..] => Some((Encoding::Utf8, 3)),
            [0xFF, 0xFE, ..] => Some((Encoding::Utf16Le, 2)),
            [0xFE, 0xFF, ..] => Some((Encoding::Utf16Be, 2)),
            // No BOM - check for UTF-16 pattern (< followed by null or null followed by <)
            [b'<', 0x00, ..] => Some((Encoding::Utf16Le, 0)),
            [0x00, b'<', ..] => Some((Encoding::Utf16Be, 0)),
            _ => None,
        }
    }
}

/// Decode raw file bytes into source text
pub fn decode(input: &[u8], default: Option<Encoding>) -> Result<String, EncodingError> {
    match Encoding::detect(input) {
        Some((detected, bom)) if detected.is_utf16() => {
            let text = decode_utf16(&input[bom..], detected)?;
            if let Some(label) = declared_encoding(&text) {
                let declared = Encoding::from_label(label)
                    .ok_or_else(|| EncodingError::Unsupported(label.to_string()))?;
                if !declared.is_utf16() {
                    return Err(EncodingError::Inconsistent {
                        declared: label.to_string(),
                        detected: detected.name(),
                    });
                }
            }
            Ok(text)
        }
        detected => {
            let bom = detected.map_or(0, |(_, len)| len);
            let body = &input[bom..];
            let declared = match declaration_prefix(body).and_then(declared_encoding) {
                Some(label) => Some(
                    Encoding::from_label(label)
                        .ok_or_else(|| EncodingError::Unsupported(label.to_string()))
                        .and_then(|declared| {
                            if declared.is_utf16() || (bom > 0 && declared == Encoding::Latin1) {
                                Err(EncodingError::Inconsistent {
                                    declared: label.to_string(),
                                    detected: if bom > 0 { "UTF-8 byte order mark" } else { "single-byte text" },
                                })
                            } else {
                                Ok(declared)
                            }
                        })?,
                ),
                None => None,
            };
            let encoding = match (bom, declared) {
                (0, Some(declared)) => declared,
                (0, None) => default.unwrap_or_default(),
                _ => Encoding::Utf8,
            };
            decode_single_byte_family(body, encoding)
        }
    }
}

/// The XML declaration as text, when the input starts with one.
///
/// The declaration is plain ASCII in every ASCII-compatible encoding.
fn declaration_prefix(body: &[u8]) -> Option<&str> {
    if !body.starts_with(b"<?xml") {
        return None;
    }
    let end = memmem::find(body, b"?>")?;
    std::str::from_utf8(&body[..end]).ok()
}

/// The `encoding` pseudo-attribute of a leading XML declaration
fn declared_encoding(text: &str) -> Option<&str> {
    let decl = text.strip_prefix("<?xml")?;
    let decl = &decl[..decl.find("?>").unwrap_or(decl.len())];
    let at = decl.find("encoding")?;
    let rest = decl[at + "encoding".len()..].trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    value.find(quote).map(|end| &value[..end])
}

fn decode_single_byte_family(body: &[u8], encoding: Encoding) -> Result<String, EncodingError> {
    match encoding {
        Encoding::Latin1 => Ok(body.iter().map(|&b| b as char).collect()),
        Encoding::Ascii => match body.iter().position(|b| !b.is_ascii()) {
            Some(offset) => Err(EncodingError::Undecodable {
                encoding: encoding.name(),
                offset,
            }),
            None => Ok(String::from_utf8_lossy(body).into_owned()),
        },
        Encoding::Utf16Le | Encoding::Utf16Be => decode_utf16(body, encoding),
        Encoding::Utf8 => String::from_utf8(body.to_vec()).map_err(|e| EncodingError::Undecodable {
            encoding: encoding.name(),
            offset: e.utf8_error().valid_up_to(),
        }),
    }
}

/// Convert UTF-16 bytes (without BOM) to a String
fn decode_utf16(bytes: &[u8], encoding: Encoding) -> Result<String, EncodingError> {
    // Ensure even number of bytes
    if bytes.len() % 2 != 0 {
        return Err(EncodingError::Undecodable {
            encoding: encoding.name(),
            offset: bytes.len() - 1,
        });
    }

    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| match encoding {
            Encoding::Utf16Le => u16::from_le_bytes([chunk[0], chunk[1]]),
            _ => u16::from_be_bytes([chunk[0], chunk[1]]),
        })
        .collect();

    let mut text = String::with_capacity(code_units.len());
    for (index, decoded) in char::decode_utf16(code_units.iter().copied()).enumerate() {
        match decoded {
            Ok(c) => text.push(c),
            Err(_) => {
                return Err(EncodingError::Undecodable {
                    encoding: encoding.name(),
                    offset: index * 2,
                })
            }
        }
    }
    Ok(text)
}
