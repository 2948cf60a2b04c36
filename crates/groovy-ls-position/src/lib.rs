//! Byte-offset source spans and 0-indexed/UTF-16 "wire" position conversion.
//!
//! The engine stores every range as a byte-offset [`ByteSpan`] internally — cheap,
//! `Copy`, and what the parser naturally produces. The external boundary (`SPEC_FULL.md`
//! §4.12/§6) is the only place positions are converted to the LSP-visible 0-indexed
//! `(line, UTF-16 column)` form via [`LineIndex`] and [`WirePosition`]/[`WireRange`].
//! Centralising the math here means no feature module reimplements it (§9).

mod line_index;
mod span;
mod wire;

pub use line_index::LineIndex;
pub use span::ByteSpan;
pub use wire::{WireLocation, WirePosition, WireRange};

/// Converts a [`ByteSpan`] within `text` directly to a [`WireRange`].
pub fn span_to_wire_range(index: &LineIndex, text: &str, span: ByteSpan) -> WireRange {
    let (start, end) = index.span_to_positions(text, span);
    WireRange::new(WirePosition::new(start.0, start.1), WirePosition::new(end.0, end.1))
}

/// Converts a [`WireRange`] back to a [`ByteSpan`] within `text`.
pub fn wire_range_to_span(index: &LineIndex, text: &str, range: WireRange) -> ByteSpan {
    let start = index.position_to_offset(text, range.start.line, range.start.character);
    let end = index.position_to_offset(text, range.end.line, range.end.character);
    ByteSpan::new(start.min(end), start.max(end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_and_wire_range_round_trip() {
        let text = "class A {\n  void m() {}\n}\n";
        let index = LineIndex::new(text);
        let span = ByteSpan::new(text.find("void").unwrap(), text.find("void").unwrap() + 4);
        let wire = span_to_wire_range(&index, text, span);
        assert_eq!(wire.start, WirePosition::new(1, 2));
        let back = wire_range_to_span(&index, text, wire);
        assert_eq!(back, span);
    }
}
