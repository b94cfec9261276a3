// End-to-end runs of the gloss binary

use serde_json::Value;
use std::fs;
use std::process::Command;

#[path = "integration/mod.rs"]
mod test_utils;
use test_utils::TestFixture;

fn gloss() -> Command {
    Command::new(env!("CARGO_BIN_EXE_gloss"))
}

#[test]
fn test_lint_writes_stats_json() {
    let fixture = TestFixture::new();
    fixture.create_code_lecture("lec.json", "lec", "movq %rsp, %rbp", &[("%rbp", "frame"), ("%rax", "missing")]);
    let stats_file = fixture.root_path.join("stats.json");

    let output = gloss()
        .arg("lint")
        .arg(&fixture.root_path)
        .arg("--no-progress")
        .arg("--stats-out")
        .arg(&stats_file)
        .output()
        .expect("Failed to run gloss");

    assert!(output.status.success(), "gloss lint failed: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Annotations resolved: 1/2"), "unexpected stdout: {stdout}");
    assert!(stdout.contains("pattern \"%rax\" not found in snippet"));

    let stats: Value = serde_json::from_str(&fs::read_to_string(&stats_file).expect("Failed to read stats file"))
        .expect("Failed to parse JSON");
    let obj = stats.as_object().expect("Stats should be a JSON object");
    for key in ["run_start", "total_processing_time_ms", "files_processed", "files_failed", "total_rules",
                "total_resolved", "total_diagnostics", "diagnostics_by_reason", "file_stats"] {
        assert!(obj.contains_key(key), "Missing {key} field");
    }
    assert_eq!(obj["files_processed"], 1);
    assert_eq!(obj["file_stats"][0]["status"], "success");
    assert!(obj["file_stats"][0]["error"].is_null());

    // the stats file now lives inside the content tree and must not be linted as a lecture
    let rerun = gloss()
        .arg("lint")
        .arg(&fixture.root_path)
        .arg("--no-progress")
        .arg("--stats-out")
        .arg(&stats_file)
        .output()
        .expect("Failed to run gloss");
    assert!(rerun.status.success());
    let stats: Value = serde_json::from_str(&fs::read_to_string(&stats_file).unwrap()).unwrap();
    assert_eq!(stats["files_failed"], 0);
}

#[test]
fn test_lint_deny_warnings_fails() {
    let fixture = TestFixture::new();
    fixture.create_code_lecture("lec.json", "lec", "AAAA", &[("AA", "a"), ("AA", "b"), ("AA", "c")]);
    let stats_dir = tempfile::TempDir::new().unwrap();

    let output = gloss()
        .arg("lint")
        .arg(&fixture.root_path)
        .arg("--no-progress")
        .arg("--deny-warnings")
        .arg("--stats-out")
        .arg(stats_dir.path().join("stats.json"))
        .output()
        .expect("Failed to run gloss");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("only occurs inside text claimed by earlier annotations"));
}

#[cfg(unix)]
#[test]
fn test_lint_reports_dangling_symlink() {
    let fixture = TestFixture::new();
    fixture.create_code_lecture("good.json", "good", "ret", &[("ret", "return")]);
    std::os::unix::fs::symlink(fixture.root_path.join("gone.json"), fixture.root_path.join("dangling.json"))
        .expect("Failed to create symlink");
    let stats_dir = tempfile::TempDir::new().unwrap();
    let stats_file = stats_dir.path().join("stats.json");

    let output = gloss()
        .arg("lint")
        .arg(&fixture.root_path)
        .arg("--no-progress")
        .arg("--deny-warnings")
        .arg("--stats-out")
        .arg(&stats_file)
        .output()
        .expect("Failed to run gloss");

    assert!(!output.status.success(), "a dangling lecture file must fail --deny-warnings");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dangling.json: error:"), "unexpected stdout: {stdout}");

    let stats: Value = serde_json::from_str(&fs::read_to_string(&stats_file).expect("Failed to read stats file"))
        .expect("Failed to parse JSON");
    assert_eq!(stats["files_processed"], 1);
    assert_eq!(stats["files_failed"], 1);
    let files = stats["file_stats"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    let dangling = files
        .iter()
        .find(|f| f["path"].as_str().is_some_and(|p| p.ends_with("dangling.json")))
        .expect("dangling.json should be reported");
    assert_eq!(dangling["status"], "failed");
    assert!(dangling["error"].is_string());
}

#[test]
fn test_lint_missing_root() {
    let fixture = TestFixture::new();
    let output = gloss()
        .arg("lint")
        .arg(fixture.root_path.join("does-not-exist"))
        .output()
        .expect("Failed to run gloss");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Root directory does not exist"));
}

#[test]
fn test_render_prints_segments() {
    let fixture = TestFixture::new();
    let path = fixture.create_code_lecture("lec.json", "lec", "x a+b*(c) y", &[("a+b*(c)", "literal")]);

    let output = gloss().arg("render").arg(&path).output().expect("Failed to run gloss");
    assert!(output.status.success(), "gloss render failed: {}", String::from_utf8_lossy(&output.stderr));

    let rendered: Value = serde_json::from_slice(&output.stdout).expect("render output should be JSON");
    let block = &rendered[0];
    assert_eq!(block["block_id"], "lec#1");
    assert_eq!(block["key"].as_str().map(str::len), Some(64));
    assert_eq!(block["resolved"][0]["start"], 2);
    assert_eq!(block["resolved"][0]["end"], 9);

    let texts: Vec<&str> = block["segments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["x ", "a+b*(c)", " y"]);
    assert!(block["segments"][0]["annotation"].is_null());
    assert_eq!(block["segments"][1]["annotation"]["explanation"], "literal");
}

#[test]
fn test_render_selects_section_by_index() {
    let fixture = TestFixture::new();
    let path = fixture.create_code_lecture("lec.json", "lec", "nop", &[("nop", "idle")]);

    let output = gloss().arg("render").arg(&path).arg("--section").arg("1").output().expect("Failed to run gloss");
    assert!(output.status.success(), "gloss render failed: {}", String::from_utf8_lossy(&output.stderr));

    let rendered: Value = serde_json::from_slice(&output.stdout).expect("render output should be JSON");
    assert_eq!(rendered.as_array().map(Vec::len), Some(1));
    assert_eq!(rendered[0]["block_id"], "lec#1");

    // section 2 is a diagram
    let output = gloss().arg("render").arg(&path).arg("--section").arg("2").output().expect("Failed to run gloss");
    assert!(!output.status.success());
}

#[test]
fn test_render_unknown_section() {
    let fixture = TestFixture::new();
    let path = fixture.create_code_lecture("lec.json", "lec", "nop", &[]);

    let output = gloss()
        .arg("render")
        .arg(&path)
        .arg("--section")
        .arg("0")
        .output()
        .expect("Failed to run gloss");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("has no code example"));
}
