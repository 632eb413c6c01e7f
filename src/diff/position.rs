//! Absolute diff line → (file, post-change line, raw text).

use std::collections::{HashMap, HashSet};

use super::{scan, DiffLine};
use crate::error::DiffError;

/// Where an absolute diff line lands.
///
/// `path` and `line` are `None` for header lines (`diff --git`, `---`, `+++`,
/// `@@`, mode lines) and for indices past the end of the diff; `text` is `None`
/// only in the latter case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinePosition<'a> {
    pub path: Option<&'a str>,
    pub line: Option<u32>,
    pub text: Option<&'a str>,
}

impl<'a> LinePosition<'a> {
    fn of(line: &DiffLine<'a>) -> Self {
        if line.kind.is_content() {
            Self {
                path: line.path,
                line: line.file_line,
                text: Some(line.text),
            }
        } else {
            Self {
                path: None,
                line: None,
                text: Some(line.text),
            }
        }
    }

    /// Whether the position points into a file.
    pub fn is_anchored(&self) -> bool {
        self.line.is_some()
    }
}

/// Resolve a single 1-based absolute diff line.
///
/// The whole diff is scanned, so a malformed hunk header anywhere fails the
/// call even when it sits after `diff_line`.
pub fn resolve(diff: &str, diff_line: usize) -> Result<LinePosition<'_>, DiffError> {
    let mut found = resolve_many(diff, &[diff_line])?;
    Ok(found.remove(&diff_line).unwrap_or_default())
}

/// Resolve many 1-based absolute diff lines in a single pass.
///
/// Indices that do not exist in the diff (0, or past the last line) are absent
/// from the returned map.
pub fn resolve_many<'a>(
    diff: &'a str,
    diff_lines: &[usize],
) -> Result<HashMap<usize, LinePosition<'a>>, DiffError> {
    let wanted: HashSet<usize> = diff_lines.iter().copied().collect();
    let mut found = HashMap::with_capacity(wanted.len());

    for line in scan(diff) {
        let line = line?;
        let number = line.index + 1;
        if wanted.contains(&number) {
            found.insert(number, LinePosition::of(&line));
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::LineKind;

    const TWO_FILES: &str = "diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,2 +1,3 @@
 pub mod app;
+pub mod config;
 pub mod ui;
diff --git a/src/app.rs b/src/app.rs
index 3333333..4444444 100644
--- a/src/app.rs
+++ b/src/app.rs
@@ -10,6 +10,5 @@
 struct App {
-    name: String,
-    title: String,
+    label: String,
     version: String,
 }

";

    fn line_of(diff: &str, index: usize) -> Option<u32> {
        resolve(diff, index).unwrap().line
    }

    #[test]
    fn test_added_line_is_hunk_start_plus_one() {
        let diff = "--- a/f.txt\n+++ b/f.txt\n@@ -1,3 +1,4 @@\n one\n+two\n three";
        let position = resolve(diff, 5).unwrap();
        assert_eq!(position.path, Some("f.txt"));
        assert_eq!(position.line, Some(2));
        assert_eq!(position.text, Some("+two"));
    }

    #[test]
    fn test_git_header_line_is_unanchored() {
        let position = resolve(TWO_FILES, 9).unwrap();
        assert_eq!(
            position,
            LinePosition {
                path: None,
                line: None,
                text: Some("diff --git a/src/app.rs b/src/app.rs"),
            }
        );
    }

    #[test]
    fn test_file_and_hunk_headers_are_unanchored() {
        for index in [2, 3, 4, 5, 12, 13] {
            let position = resolve(TWO_FILES, index).unwrap();
            assert!(!position.is_anchored(), "line {index} should be a header");
            assert!(position.text.is_some());
        }
    }

    #[test]
    fn test_out_of_range_is_null_triple() {
        let lines = TWO_FILES.split('\n').count();
        assert_eq!(resolve(TWO_FILES, lines + 1).unwrap(), LinePosition::default());
        assert_eq!(resolve(TWO_FILES, 0).unwrap(), LinePosition::default());
        assert_eq!(resolve("", 1).unwrap(), LinePosition::default());
    }

    #[test]
    fn test_second_file_lines() {
        assert_eq!(resolve(TWO_FILES, 14).unwrap().path, Some("src/app.rs"));
        assert_eq!(line_of(TWO_FILES, 14), Some(10));
        // removed lines point at the next surviving post-change line
        assert_eq!(line_of(TWO_FILES, 15), Some(11));
        assert_eq!(line_of(TWO_FILES, 16), Some(11));
        assert_eq!(line_of(TWO_FILES, 17), Some(11));
        assert_eq!(line_of(TWO_FILES, 18), Some(12));
        assert_eq!(line_of(TWO_FILES, 19), Some(13));
        // an empty line inside an open hunk counts as context
        assert_eq!(line_of(TWO_FILES, 20), Some(14));
    }

    #[test]
    fn test_context_lines_increase_monotonically() {
        let diff = "--- a/m.rs
+++ b/m.rs
@@ -3,8 +3,6 @@
 a
-b
-c
 d
+e
 f
-g
 h
 i";
        let context: Vec<u32> = scan(diff)
            .map(Result::unwrap)
            .filter(|line| line.kind == LineKind::Context)
            .map(|line| resolve(diff, line.index + 1).unwrap().line.unwrap())
            .collect();
        assert_eq!(context, vec![3, 4, 6, 7, 8]);
        assert!(context.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_removed_lines_advance_the_file_line() {
        let diff = "--- a/m.rs
+++ b/m.rs
@@ -10,4 +10,3 @@
-x
-y
+z
 w
 v";
        // removals take the post-change line of what follows them
        assert_eq!(line_of(diff, 4), Some(10));
        assert_eq!(line_of(diff, 5), Some(10));
        assert_eq!(line_of(diff, 6), Some(10));
        assert_eq!(line_of(diff, 7), Some(11));
        assert_eq!(line_of(diff, 8), Some(12));
    }

    #[test]
    fn test_new_file_starts_at_line_one() {
        let diff = "diff --git a/new.txt b/new.txt
new file mode 100644
--- /dev/null
+++ b/new.txt
@@ -0,0 +0,5 @@
+1
+2
+3
+4
+5";
        let position = resolve(diff, 6).unwrap();
        assert_eq!(position.path, Some("new.txt"));
        assert_eq!(position.line, Some(1));
        assert_eq!(line_of(diff, 10), Some(5));
    }

    #[test]
    fn test_resolve_many_matches_single_resolution() {
        let indices: Vec<usize> = (0..=25).collect();
        let batch = resolve_many(TWO_FILES, &indices).unwrap();
        for index in indices {
            let single = resolve(TWO_FILES, index).unwrap();
            assert_eq!(batch.get(&index).copied().unwrap_or_default(), single);
        }
    }

    #[test]
    fn test_malformed_header_after_target_still_fails() {
        let diff = "--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n@@ -9,1 +x,1 @@\n c";
        let err = resolve(diff, 5).unwrap_err();
        assert_eq!(
            err,
            DiffError::MalformedHunkHeader {
                line: 6,
                text: "@@ -9,1 +x,1 @@".to_string(),
            }
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        assert_eq!(resolve(TWO_FILES, 7).unwrap(), resolve(TWO_FILES, 7).unwrap());
    }
}
