// Lossless partition of a snippet into plain and annotated runs for the viewer

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ResolvedAnnotation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentAnnotation {
    pub order: usize,
    pub explanation: String,
}

/// One contiguous piece of the source text.
///
/// Concatenating `text` over a whole segment list reproduces the source exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSegment {
    pub text: String,
    pub annotation: Option<SegmentAnnotation>,
}

impl RenderSegment {
    pub fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            annotation: None,
        }
    }

    pub fn annotated(text: &str, span: &ResolvedAnnotation) -> Self {
        Self {
            text: text.to_string(),
            annotation: Some(SegmentAnnotation {
                order: span.order,
                explanation: span.explanation.clone(),
            }),
        }
    }

    pub fn is_annotated(&self) -> bool {
        self.annotation.is_some()
    }
}

pub struct SpanBuilder<'a> {
    source_text: &'a str,
}

impl<'a> SpanBuilder<'a> {
    pub fn new(source_text: &'a str) -> Self {
        Self { source_text }
    }

    /// Walk the text with a cursor, emitting a plain segment for every non-empty gap.
    ///
    /// Expects spans sorted ascending and non-overlapping, which the resolver
    /// guarantees. A span that breaks that contract (behind the cursor, past
    /// the end, or off a char boundary) is skipped so the partition stays lossless.
    pub fn build(&self, spans: &[ResolvedAnnotation]) -> Vec<RenderSegment> {
        let text = self.source_text;
        let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
        let mut cursor = 0;

        for span in spans {
            let (Some(gap), Some(highlight)) = (text.get(cursor..span.start), text.get(span.start..span.end)) else {
                warn!(start = span.start, end = span.end, cursor, "Skipping span outside the unconsumed text");
                continue;
            };
            if highlight.is_empty() {
                warn!(start = span.start, end = span.end, "Skipping empty span");
                continue;
            }

            if !gap.is_empty() {
                segments.push(RenderSegment::plain(gap));
            }
            segments.push(RenderSegment::annotated(highlight, span));
            cursor = span.end;
        }

        if cursor < text.len() {
            segments.push(RenderSegment::plain(&text[cursor..]));
        }

        segments
    }
}
