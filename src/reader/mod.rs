//! Coarse Reader Module
//!
//! - Events: coarse event types with approximate byte spans
//! - Coarse: quick-xml backed pull reader producing those events

pub mod coarse;
pub mod events;

pub use coarse::{CoarseError, CoarseReader};
pub use events::{split_name, CoarseEvent, CoarseKind, CoarseTag};
