// Integration test utilities shared by the tests/ binaries
#![allow(dead_code)]

use gloss::RenderSegment;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary content directory populated with lecture JSON files
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root_path: PathBuf,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path().to_path_buf();

        Self { temp_dir, root_path }
    }

    /// Write `content` verbatim at `relative_path`, creating parent directories
    pub fn create_file<P: AsRef<Path>>(&self, relative_path: P, content: &str) -> PathBuf {
        let file_path = self.root_path.join(relative_path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    /// Write a lecture with a single code section built from `(match, explanation)` pairs
    pub fn create_code_lecture<P: AsRef<Path>>(
        &self,
        relative_path: P,
        id: &str,
        code: &str,
        annotations: &[(&str, &str)],
    ) -> PathBuf {
        let json = code_lecture_json(id, code, annotations);
        self.create_file(relative_path, &json)
    }
}

pub fn code_lecture_json(id: &str, code: &str, annotations: &[(&str, &str)]) -> String {
    let annotations: Vec<_> = annotations
        .iter()
        .map(|(pattern, explanation)| json!({ "match": pattern, "explanation": explanation }))
        .collect();

    json!({
        "id": id,
        "title": format!("Lecture {id}"),
        "sections": [
            { "title": "Overview", "content": "Prose only.", "keyPoints": ["one", "two"] },
            {
                "title": "Example",
                "codeExample": {
                    "title": "Snippet",
                    "language": "c",
                    "code": code,
                    "annotations": annotations
                }
            },
            { "title": "Picture", "diagram": "+--+\n|  |\n+--+" }
        ]
    })
    .to_string()
}

/// One line per segment: `[explanation] "text"` for highlights, `"text"` for plain runs
pub fn format_segments(segments: &[RenderSegment]) -> String {
    segments
        .iter()
        .map(|segment| match &segment.annotation {
            Some(annotation) => format!("[{}] {:?}", annotation.explanation, segment.text),
            None => format!("{:?}", segment.text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compare two strings line by line, providing detailed diff on mismatch
pub fn assert_golden_file(actual: &str, expected: &str, context: &str) {
    let actual_lines: Vec<&str> = actual.lines().collect();
    let expected_lines: Vec<&str> = expected.lines().collect();

    if actual_lines.len() != expected_lines.len() {
        panic!(
            "{}: Line count mismatch. Expected {} lines, got {} lines\nActual:\n{}",
            context,
            expected_lines.len(),
            actual_lines.len(),
            actual
        );
    }

    for (i, (actual_line, expected_line)) in actual_lines.iter().zip(expected_lines.iter()).enumerate() {
        if actual_line != expected_line {
            panic!(
                "{}: Line {} mismatch\nExpected: {}\nActual:   {}",
                context,
                i + 1,
                expected_line,
                actual_line
            );
        }
    }
}
