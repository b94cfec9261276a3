// Byte offset -> 1-based line/column mapping for reporting where annotations landed

use serde::{Deserialize, Serialize};

/// 1-based line and column; columns count Unicode scalar values
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: Position,
    /// Position of the exclusive end offset
    pub end: Position,
}

/// Line-start table for one source text
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// `None` when `offset` is past the end or inside a multi-byte character
    pub fn position(&self, offset: usize) -> Option<Position> {
        if offset > self.text.len() || !self.text.is_char_boundary(offset) {
            return None;
        }

        // line_starts[0] == 0, so Err(i) always has i >= 1
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_idx];
        let column = self.text[line_start..offset].chars().count() + 1;

        Some(Position {
            line: line_idx + 1,
            column,
        })
    }

    pub fn span(&self, start: usize, end: usize) -> Option<LineSpan> {
        if start > end {
            return None;
        }
        Some(LineSpan {
            start: self.position(start)?,
            end: self.position(end)?,
        })
    }
}
