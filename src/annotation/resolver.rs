// Literal-match resolver: each rule, in authoring order, claims the first
// occurrence of its pattern that does not intersect an earlier claim.

use std::collections::BTreeMap;
use tracing::debug;

use super::{AnnotationRule, DiagnosticReason, DiagnosticsCollector, ResolvedAnnotation};

/// Every start offset of `needle` in `haystack`, left to right, overlapping occurrences included.
///
/// Unlike `str::match_indices`, searching resumes one character after each hit,
/// so `"AA"` occurs at 0, 1 and 2 in `"AAAA"`. An empty needle yields nothing.
pub fn occurrences<'h>(haystack: &'h str, needle: &'h str) -> impl Iterator<Item = usize> + 'h {
    let mut from = 0;
    std::iter::from_fn(move || {
        if needle.is_empty() || from > haystack.len() {
            return None;
        }
        let start = from + haystack[from..].find(needle)?;
        // needle is non-empty, so a char always follows `start`
        from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
        Some(start)
    })
}

/// Outcome of resolving one block's rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Sorted ascending by start offset, pairwise non-overlapping
    pub resolved: Vec<ResolvedAnnotation>,
    pub diagnostics: DiagnosticsCollector,
}

/// Claimed ranges keyed by start offset. Entries never overlap.
#[derive(Debug, Default)]
struct Claims {
    by_start: BTreeMap<usize, ResolvedAnnotation>,
}

impl Claims {
    /// Only the claim with the greatest start below `end` can intersect `[start, end)`
    fn intersects(&self, start: usize, end: usize) -> bool {
        self.by_start
            .range(..end)
            .next_back()
            .is_some_and(|(_, claimed)| claimed.end > start)
    }

    fn claim(&mut self, annotation: ResolvedAnnotation) {
        self.by_start.insert(annotation.start, annotation);
    }

    fn into_sorted(self) -> Vec<ResolvedAnnotation> {
        self.by_start.into_values().collect()
    }
}

/// Maps an ordered rule list onto non-overlapping ranges of one source text
pub struct AnnotationResolver<'a> {
    source_text: &'a str,
}

impl<'a> AnnotationResolver<'a> {
    pub fn new(source_text: &'a str) -> Self {
        Self { source_text }
    }

    pub fn source_text(&self) -> &'a str {
        self.source_text
    }

    /// Resolve all rules. Never fails: unresolvable rules become diagnostics.
    ///
    /// Rules are processed by ascending `order`; rules sharing an order keep
    /// their slice position.
    pub fn resolve(&self, rules: &[AnnotationRule]) -> Resolution {
        let mut ordered: Vec<&AnnotationRule> = rules.iter().collect();
        ordered.sort_by_key(|rule| rule.order);

        let mut claims = Claims::default();
        let mut diagnostics = DiagnosticsCollector::new();

        for rule in ordered {
            if !diagnostics.check_pattern(rule) {
                continue;
            }

            match self.first_unclaimed(&rule.pattern, &claims) {
                Ok(start) => {
                    let end = start + rule.pattern.len();
                    debug!(order = rule.order, start, end, "Resolved annotation rule");
                    claims.claim(ResolvedAnnotation {
                        start,
                        end,
                        explanation: rule.explanation.clone(),
                        order: rule.order,
                    });
                }
                Err(reason) => {
                    debug!(order = rule.order, ?reason, "Annotation rule left unresolved");
                    diagnostics.record(rule, reason);
                }
            }
        }

        Resolution {
            resolved: claims.into_sorted(),
            diagnostics,
        }
    }

    fn first_unclaimed(&self, pattern: &str, claims: &Claims) -> Result<usize, DiagnosticReason> {
        let mut seen = false;
        for start in occurrences(self.source_text, pattern) {
            seen = true;
            if !claims.intersects(start, start + pattern.len()) {
                return Ok(start);
            }
        }

        if seen {
            Err(DiagnosticReason::ExhaustedByOverlap)
        } else {
            Err(DiagnosticReason::NotFound)
        }
    }
}
