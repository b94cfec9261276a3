// Annotation resolution core: literal-match rules -> non-overlapping spans -> render segments
// Everything in this module is synchronous and pure; tooling lives in discovery/reader/lint.

use serde::{Deserialize, Serialize};

pub mod diagnostics;
pub mod position;
pub mod resolver;
pub mod segments;

pub use diagnostics::{Diagnostic, DiagnosticReason, DiagnosticsCollector};
pub use position::{LineIndex, LineSpan, Position};
pub use resolver::{occurrences, AnnotationResolver, Resolution};
pub use segments::{RenderSegment, SegmentAnnotation, SpanBuilder};

/// Immutable source text shown in a lecture snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub id: String,
    pub language: String,
    /// Exact text to annotate, whitespace and line breaks included
    pub source_text: String,
}

impl CodeBlock {
    pub fn new(id: impl Into<String>, language: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            language: language.into(),
            source_text: source_text.into(),
        }
    }
}

/// An authored `(pattern, explanation)` pair.
///
/// `order` is the authoring position and doubles as matching priority:
/// lower orders claim text first. `pattern` is always a literal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationRule {
    pub order: usize,
    pub pattern: String,
    pub explanation: String,
}

impl AnnotationRule {
    pub fn new(order: usize, pattern: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            order,
            pattern: pattern.into(),
            explanation: explanation.into(),
        }
    }
}

/// Concrete half-open byte range `[start, end)` claimed by one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAnnotation {
    pub start: usize,
    pub end: usize,
    pub explanation: String,
    pub order: usize,
}

impl ResolvedAnnotation {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether two half-open ranges share at least one byte
    pub fn overlaps(&self, other: &ResolvedAnnotation) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Full derived output for one code block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotated {
    /// Sorted ascending by start offset
    pub resolved: Vec<ResolvedAnnotation>,
    /// In rule processing order
    pub diagnostics: Vec<Diagnostic>,
    pub segments: Vec<RenderSegment>,
}

/// Resolve `rules` against `source_text` and partition the text for rendering
pub fn annotate(source_text: &str, rules: &[AnnotationRule]) -> Annotated {
    let Resolution { resolved, diagnostics } = AnnotationResolver::new(source_text).resolve(rules);
    let segments = SpanBuilder::new(source_text).build(&resolved);

    Annotated {
        resolved,
        diagnostics: diagnostics.into_vec(),
        segments,
    }
}
