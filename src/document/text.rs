//! Text snapshots and position conversion.
//!
//! `Snapshot` is the immutable text handed between the editor, the language
//! modules and the host service. `LineIndex` converts byte offsets into LSP
//! line/UTF-16 column positions and back.

use std::ops::Range;
use std::sync::Arc;

use tower_lsp::lsp_types::Position;

/// Immutable, cheaply clonable document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    text: Arc<str>,
}

/// The edited region between two snapshots.
///
/// `span` is expressed in the old text; `new_length` is the length of the
/// replacement in the new text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChangeRange {
    pub span: Range<usize>,
    pub new_length: usize,
}

impl Snapshot {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Compute the single edit turning `old` into `self`, trimming the common
    /// prefix and suffix. Returns `None` when the texts are identical.
    pub fn change_range(&self, old: &Snapshot) -> Option<TextChangeRange> {
        let old_text = old.text();
        let new_text = self.text();
        if old_text == new_text {
            return None;
        }

        let mut prefix = old_text
            .bytes()
            .zip(new_text.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        while !old_text.is_char_boundary(prefix) || !new_text.is_char_boundary(prefix) {
            prefix -= 1;
        }

        let max_suffix = old_text.len().min(new_text.len()) - prefix;
        let mut suffix = old_text
            .bytes()
            .rev()
            .zip(new_text.bytes().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();
        while !old_text.is_char_boundary(old_text.len() - suffix)
            || !new_text.is_char_boundary(new_text.len() - suffix)
        {
            suffix -= 1;
        }

        Some(TextChangeRange {
            span: prefix..old_text.len() - suffix,
            new_length: new_text.len() - suffix - prefix,
        })
    }
}

impl From<&str> for Snapshot {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Snapshot {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Pre-computed line starts for a piece of text.
///
/// LSP columns are counted in UTF-16 code units, so column math walks the
/// characters of a single line; finding the line is a binary search.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    text: Arc<str>,
}

impl LineIndex {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { line_starts, text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Convert a byte offset to a position. Offsets past the end, or inside a
    /// multi-byte character, are clamped backwards.
    pub fn offset_to_position(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }

        let line = self.line_starts.partition_point(|&s| s <= offset) - 1;
        let line_start = self.line_starts[line];
        let character: usize = self.text[line_start..offset]
            .chars()
            .map(char::len_utf16)
            .sum();

        Position::new(line as u32, character as u32)
    }

    /// Convert a position to a byte offset.
    ///
    /// Returns `None` for lines past the end; columns past the end of a line
    /// clamp to the line end.
    pub fn position_to_offset(&self, position: Position) -> Option<usize> {
        let line = position.line as usize;
        let line_start = *self.line_starts.get(line)?;
        let line_end = self
            .line_starts
            .get(line + 1)
            .map(|&next| next - 1)
            .unwrap_or(self.text.len());

        let mut column = 0u32;
        for (i, c) in self.text[line_start..line_end].char_indices() {
            if column >= position.character {
                return Some(line_start + i);
            }
            column += c.len_utf16() as u32;
        }
        Some(line_end)
    }

    pub fn span_to_range(&self, span: &Range<usize>) -> tower_lsp::lsp_types::Range {
        tower_lsp::lsp_types::Range::new(
            self.offset_to_position(span.start),
            self.offset_to_position(span.end),
        )
    }

    pub fn range_to_span(&self, range: tower_lsp::lsp_types::Range) -> Option<Range<usize>> {
        let start = self.position_to_offset(range.start)?;
        let end = self.position_to_offset(range.end)?;
        Some(start..end.max(start))
    }
}
