//! LSP-shaped wire types: 0-indexed line, UTF-16 column (`SPEC_FULL.md` §6).
//!
//! These are the only position types the external boundary exchanges with the client.
//! Every other component in the engine works in [`crate::ByteSpan`] and converts at the
//! edge through [`crate::LineIndex`], per the "centralise position conversion" design
//! note.

use serde::{Deserialize, Serialize};

/// A 0-indexed `(line, UTF-16 column)` position, as used on the LSP wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WirePosition {
    /// 0-indexed line number.
    pub line: u32,
    /// 0-indexed UTF-16 code-unit column within the line.
    pub character: u32,
}

impl WirePosition {
    /// Creates a new wire position.
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open range between two [`WirePosition`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WireRange {
    /// Inclusive start position.
    pub start: WirePosition,
    /// Exclusive end position.
    pub end: WirePosition,
}

impl WireRange {
    /// Creates a new wire range.
    pub fn new(start: WirePosition, end: WirePosition) -> Self {
        Self { start, end }
    }

    /// A zero-width range at `pos`.
    pub fn empty(pos: WirePosition) -> Self {
        Self { start: pos, end: pos }
    }
}

/// A location: a URI paired with a [`WireRange`] within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireLocation {
    /// The document URI.
    pub uri: String,
    /// The range within that document.
    pub range: WireRange,
}

impl WireLocation {
    /// Creates a new wire location.
    pub fn new(uri: impl Into<String>, range: WireRange) -> Self {
        Self { uri: uri.into(), range }
    }
}
