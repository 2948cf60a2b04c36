//! Line index for byte-offset <-> (0-indexed line, UTF-16 column) conversion.
//!
//! Built once per text and reused for every position lookup against that text, so a
//! single document read never re-scans the whole source to answer a hover or
//! definition query.

use crate::ByteSpan;

/// Maps byte offsets to `(line, UTF-16 column)` pairs and back for one snapshot of text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Scans `text` once, recording the byte offset of the start of every line.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Converts a byte offset into `text` to a 0-indexed `(line, utf16_column)` pair.
    ///
    /// Offsets past the end of `text` clamp to the last valid position.
    pub fn offset_to_position(&self, text: &str, offset: usize) -> (u32, u32) {
        let offset = offset.min(text.len());
        let line = self.line_starts.binary_search(&offset).unwrap_or_else(|i| i.saturating_sub(1));
        let line_start = self.line_starts[line];
        let column = text[line_start..offset].chars().map(char::len_utf16).sum::<usize>() as u32;
        (line as u32, column)
    }

    /// Converts a 0-indexed `(line, utf16_column)` pair back to a byte offset into `text`.
    ///
    /// Out-of-range lines clamp to the end of `text`; out-of-range columns clamp to the
    /// end of the requested line.
    pub fn position_to_offset(&self, text: &str, line: u32, character: u32) -> usize {
        let line = line as usize;
        if line >= self.line_starts.len() {
            return text.len();
        }
        let line_start = self.line_starts[line];
        let line_end = if line + 1 < self.line_starts.len() {
            let next_start = self.line_starts[line + 1];
            let bytes = text.as_bytes();
            let mut end = next_start.saturating_sub(1);
            while end > line_start && (bytes[end] == b'\n' || bytes.get(end) == Some(&b'\r')) {
                end -= 1;
            }
            end + 1
        } else {
            text.len()
        };

        let mut utf16_count = 0usize;
        let mut byte_offset = line_end - line_start;
        for (i, ch) in text[line_start..line_end].char_indices() {
            if utf16_count >= character as usize {
                byte_offset = i;
                break;
            }
            utf16_count += ch.len_utf16();
        }
        line_start + byte_offset
    }

    /// Converts a [`ByteSpan`] into a pair of `(line, column)` positions.
    pub fn span_to_positions(&self, text: &str, span: ByteSpan) -> ((u32, u32), (u32, u32)) {
        (self.offset_to_position(text, span.start), self.offset_to_position(text, span.end))
    }
}
