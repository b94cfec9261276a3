pub mod annotation;
pub mod cache;
pub mod content;
pub mod discovery;
pub mod lint;
pub mod reader;

// Re-export the core resolution API
pub use annotation::{
    annotate, Annotated, AnnotationResolver, AnnotationRule, CodeBlock, Diagnostic, DiagnosticReason,
    DiagnosticsCollector, RenderSegment, ResolvedAnnotation, SpanBuilder,
};

pub use cache::{render_block, ContentKey, RenderCache, RenderedBlock};
pub use content::{CodeExample, Lecture, Section, SectionKind};
pub use lint::{lint_files_parallel, lint_lecture, write_stats, FileStats, LintConfig, RunStats};
