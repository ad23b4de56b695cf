//! Core text primitives
//!
//! This module contains the building blocks the reconciler works with:
//! - Range: positions and half-open source ranges
//! - Cursor: immutable navigation over the source text (memchr search)
//! - Entities: XML entity decoding with Cow (zero-copy when possible)
//! - Encoding: BOM / declaration detection and conversion to UTF-8

pub mod cursor;
pub mod encoding;
pub mod entities;
pub mod range;

pub use cursor::{Cursor, CursorError};
pub use encoding::Encoding;
pub use entities::{EntityError, EntityTable};
pub use range::{LocationKind, Position, Range};
