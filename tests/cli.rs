use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;

const DIFF: &str = "\
diff --git a/src/main.rs b/src/main.rs
index 1234567..abcdefg 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,2 +1,3 @@
 fn main() {
+    println!(\"Hello\");
 }
diff --git a/notes.txt b/notes.txt
new file mode 100644
--- /dev/null
+++ b/notes.txt
@@ -0,0 +1,2 @@
+one
+two
";

fn lpmp() -> Command {
    let mut cmd = Command::cargo_bin("lpmp").unwrap();
    // keep user config and cache out of the tests
    cmd.env("XDG_CONFIG_HOME", "/nonexistent")
        .env("XDG_CACHE_HOME", "/nonexistent")
        .env_remove("RUST_LOG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn stats_reports_every_file() {
    let dir = tempfile::tempdir().unwrap();
    let diff = dir.path().join("preview.diff");
    fs::write(&diff, DIFF).unwrap();

    let stats = json_stdout(lpmp().arg("stats").arg("--diff").arg(&diff));
    assert_eq!(
        stats,
        serde_json::json!([
            {"file": "src/main.rs", "lines_added": 1, "lines_deleted": 0, "status": "modified"},
            {"file": "notes.txt", "lines_added": 2, "lines_deleted": 0, "status": "new"},
        ])
    );
}

#[test]
fn resolve_maps_comments_onto_files() {
    let dir = tempfile::tempdir().unwrap();
    let diff = dir.path().join("preview.diff");
    let comments = dir.path().join("comments.json");
    fs::write(&diff, DIFF).unwrap();
    fs::write(
        &comments,
        r#"[
            {"diff_line": 15, "author_username": "bob", "author_display_name": "Bob",
             "message": "why two?", "date": "2024-05-02T10:00:00Z"},
            {"diff_line": 7, "author_username": "alice", "author_display_name": "Alice",
             "message": "drop this", "date": "2024-05-02T11:00:00Z"},
            {"diff_line": 15, "author_username": "carol", "author_display_name": "Carol",
             "message": "agreed", "date": "2024-05-02T12:00:00Z"}
        ]"#,
    )
    .unwrap();

    let resolved = json_stdout(
        lpmp()
            .arg("resolve")
            .arg("--diff")
            .arg(&diff)
            .arg("--comments")
            .arg(&comments),
    );
    let resolved = resolved.as_array().unwrap();
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0]["file"], "notes.txt");
    assert_eq!(resolved[0]["line_no"], 2);
    assert_eq!(resolved[0]["line_text"], "+two");
    assert_eq!(resolved[0]["messages"].as_array().unwrap().len(), 2);
    assert_eq!(resolved[1]["file"], "src/main.rs");
    assert_eq!(resolved[1]["line_no"], 2);
}

#[test]
fn malformed_hunk_header_fails() {
    let dir = tempfile::tempdir().unwrap();
    let diff = dir.path().join("bad.diff");
    fs::write(&diff, "diff --git a/x b/x\n@@ -a,b +c,d @@\n").unwrap();

    lpmp()
        .arg("stats")
        .arg("--diff")
        .arg(&diff)
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed hunk header at diff line 2"));
}

#[test]
fn mps_requires_a_source() {
    lpmp()
        .arg("mps")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user"));
}

#[test]
fn missing_diff_file_is_reported() {
    lpmp()
        .args(["stats", "--diff", "/nonexistent/preview.diff"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read /nonexistent/preview.diff"));
}
