// Resolution scenarios taken from the shape of the lecture dataset

use gloss::{annotate, AnnotationRule, DiagnosticReason};

#[path = "integration/mod.rs"]
mod test_utils;
use test_utils::{assert_golden_file, format_segments};

fn rules(pairs: &[(&str, &str)]) -> Vec<AnnotationRule> {
    pairs
        .iter()
        .enumerate()
        .map(|(order, (pattern, explanation))| AnnotationRule::new(order, *pattern, *explanation))
        .collect()
}

const PROLOGUE: &str = "pushq %rbp\npushq %rbx\npushq %r12\npushq %r13\npushq %r14\npushq %r15\n";

#[test]
fn test_callee_saved_pushes() {
    let result = annotate(
        PROLOGUE,
        &rules(&[("pushq %rbp", "save frame pointer"), ("pushq %r15", "last callee-saved register")]),
    );

    assert!(result.diagnostics.is_empty());
    let starts: Vec<usize> = result.resolved.iter().map(|r| r.start).collect();
    assert_eq!(starts, vec![0, 55]);

    let expected = r#"[save frame pointer] "pushq %rbp"
"\npushq %rbx\npushq %r12\npushq %r13\npushq %r14\n"
[last callee-saved register] "pushq %r15"
"\n""#;
    assert_golden_file(&format_segments(&result.segments), expected, "Callee-saved prologue");
}

#[test]
fn test_repeated_register_claims_next_occurrence() {
    // each "pushq" rule explains the next unexplained push
    let result = annotate(
        PROLOGUE,
        &rules(&[("pushq", "first"), ("pushq", "second"), ("pushq", "third")]),
    );

    let starts: Vec<usize> = result.resolved.iter().map(|r| r.start).collect();
    assert_eq!(starts, vec![0, 11, 22]);
}

#[test]
fn test_pointer_syntax_is_literal() {
    let source = "int *p = &x;\n*p = 5;\nint **pp = &p;";
    let result = annotate(source, &rules(&[("*p", "deref"), ("**pp", "double pointer"), ("(*p)", "parenthesized")]));

    let ranges: Vec<(usize, usize, usize)> = result.resolved.iter().map(|r| (r.order, r.start, r.end)).collect();
    assert_eq!(ranges, vec![(0, 4, 6), (1, 25, 29)]);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].reason, DiagnosticReason::NotFound);
    assert_eq!(result.diagnostics[0].rule.pattern, "(*p)");
}

#[test]
fn test_overlap_exhaustion() {
    let result = annotate("AAAA", &rules(&[("AA", "a"), ("AA", "b"), ("AA", "c")]));

    let ranges: Vec<(usize, usize)> = result.resolved.iter().map(|r| (r.start, r.end)).collect();
    assert_eq!(ranges, vec![(0, 2), (2, 4)]);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].reason, DiagnosticReason::ExhaustedByOverlap);
}

#[test]
fn test_stale_annotations_after_edit() {
    // the snippet was edited from fork() to vfork() after annotating
    let source = "pid_t pid = vfork();\nif (pid == 0) {\n    execve(path, argv, envp);\n}";
    let result = annotate(
        source,
        &rules(&[("fork()", "create child"), ("pid = fork();", "stale"), ("", "empty"), ("execve", "replace image")]),
    );

    let reasons: Vec<DiagnosticReason> = result.diagnostics.iter().map(|d| d.reason).collect();
    assert_eq!(reasons, vec![DiagnosticReason::NotFound, DiagnosticReason::EmptyPattern]);
    // "fork()" matches inside "vfork()"
    assert_eq!(&source[result.resolved[0].start..result.resolved[0].end], "fork()");

    let rebuilt: String = result.segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(rebuilt, source);
}

#[test]
fn test_multiline_snippet_with_crlf() {
    let source = "mov eax, 1\r\nint 0x80\r\n";
    let result = annotate(source, &rules(&[("1\r\nint", "spans the line break"), ("0x80", "syscall gate")]));

    assert!(result.diagnostics.is_empty());
    assert_eq!(result.segments.len(), 5);
    let rebuilt: String = result.segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(rebuilt, source);
}
