// Non-fatal reports for rules that could not be resolved against their snippet

use serde::{Deserialize, Serialize};
use std::fmt;

use super::AnnotationRule;

/// Why a rule produced no annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticReason {
    /// Pattern does not occur in the source text
    NotFound,
    /// Pattern occurs, but every occurrence intersects an earlier claim
    ExhaustedByOverlap,
    /// Pattern is empty and was rejected before searching
    EmptyPattern,
}

impl DiagnosticReason {
    pub const ALL: [DiagnosticReason; 3] = [
        DiagnosticReason::NotFound,
        DiagnosticReason::ExhaustedByOverlap,
        DiagnosticReason::EmptyPattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticReason::NotFound => "not_found",
            DiagnosticReason::ExhaustedByOverlap => "exhausted_by_overlap",
            DiagnosticReason::EmptyPattern => "empty_pattern",
        }
    }
}

impl fmt::Display for DiagnosticReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule: AnnotationRule,
    pub reason: DiagnosticReason,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = self.rule.order;
        match self.reason {
            DiagnosticReason::NotFound => {
                write!(f, "annotation #{order} pattern {:?} not found in snippet", self.rule.pattern)
            }
            DiagnosticReason::ExhaustedByOverlap => write!(
                f,
                "annotation #{order} pattern {:?} only occurs inside text claimed by earlier annotations",
                self.rule.pattern
            ),
            DiagnosticReason::EmptyPattern => write!(f, "annotation #{order} has an empty pattern"),
        }
    }
}

/// Append-only list of diagnostics for one code block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiagnosticsCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, rule: &AnnotationRule, reason: DiagnosticReason) {
        self.diagnostics.push(Diagnostic {
            rule: rule.clone(),
            reason,
        });
    }

    /// Reject rules that can never match. Returns false (and records) for an empty pattern.
    pub fn check_pattern(&mut self, rule: &AnnotationRule) -> bool {
        if rule.pattern.is_empty() {
            self.record(rule, DiagnosticReason::EmptyPattern);
            return false;
        }
        true
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn count(&self, reason: DiagnosticReason) -> usize {
        self.diagnostics.iter().filter(|d| d.reason == reason).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl<'a> IntoIterator for &'a DiagnosticsCollector {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}
