//! Unified diff scanning.
//!
//! This module turns a raw unified diff (as returned for a preview diff) into a
//! lazy sequence of classified lines. Both the comment position resolver and the
//! per-file stat aggregator are built on the same scanner:
//! - Line classification (section start, headers, hunk header, added, removed, context)
//! - Hunk header parsing with `new_start == 0` normalized to line 1
//! - File-relative (post-change) line numbers for every content line
//! - `diff --git` path extraction, including renames and mnemonic prefixes

mod position;
mod stats;

pub use position::{resolve, resolve_many, LinePosition};
pub use stats::{aggregate_file_stats, files_needing_base_contents, FileDiffStat, FileStatus};

use std::iter::Enumerate;
use std::str::Split;

use crate::error::DiffError;

/// Represents the kind of a single line in a unified diff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `diff --git a/... b/...`, opens a new file section
    SectionStart,
    /// `index`, mode, rename and similarity lines, and anything else outside a hunk
    Meta,
    /// `--- a/path`
    FileHeaderOld,
    /// `+++ b/path`
    FileHeaderNew,
    /// `@@ -old +new @@`
    HunkHeader(HunkHeader),
    /// Line added in the new version (starts with +)
    Added,
    /// Line removed from the old version (starts with -)
    Removed,
    /// Unchanged line inside a hunk
    Context,
    /// `\ No newline at end of file`
    NoNewline,
}

impl LineKind {
    /// Added, removed and context lines are the only ones anchored to a file line.
    pub fn is_content(self) -> bool {
        matches!(self, LineKind::Added | LineKind::Removed | LineKind::Context)
    }
}

/// Ranges parsed from a `@@ -old_start,old_len +new_start,new_len @@` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_len: u32,
    pub new_start: u32,
    pub new_len: u32,
}

impl HunkHeader {
    /// First post-change line covered by the hunk. Brand-new files report
    /// `+0,N`; their first line is still line 1.
    pub fn first_line(&self) -> u32 {
        self.new_start.max(1)
    }
}

/// One classified line of diff text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffLine<'a> {
    /// Zero-based index within the whole diff text
    pub index: usize,
    /// Raw line text, prefix included
    pub text: &'a str,
    pub kind: LineKind,
    /// Post-change path of the file section the line belongs to
    pub path: Option<&'a str>,
    /// Post-change line number; `Some` only for content lines
    pub file_line: Option<u32>,
}

/// Running state of the hunk currently being scanned.
///
/// `file_line` advances on every line that exists on the old side (context and
/// removed), so `file_line + added - removed` is the post-change line number.
#[derive(Debug, Clone, Copy)]
struct HunkCursor {
    file_line: u32,
    added: u32,
    removed: u32,
    old_remaining: u32,
    new_remaining: u32,
}

impl HunkCursor {
    fn new(header: HunkHeader) -> Self {
        Self {
            file_line: header.first_line(),
            added: 0,
            removed: 0,
            old_remaining: header.old_len,
            new_remaining: header.new_len,
        }
    }

    fn is_open(&self) -> bool {
        self.old_remaining > 0 || self.new_remaining > 0
    }

    fn position(&self) -> u32 {
        // file_line >= first_line + removed, and the header check keeps the
        // result within first_line + new_len
        self.file_line - self.removed + self.added
    }
}

/// Lazy, restartable scanner over unified diff text.
///
/// Cloning the scanner (or calling [`scan`] again) restarts from the current
/// position with independent state; nothing is shared between scans.
#[derive(Debug, Clone)]
pub struct DiffScanner<'a> {
    lines: Enumerate<Split<'a, char>>,
    path: Option<&'a str>,
    old_path: Option<&'a str>,
    hunk: Option<HunkCursor>,
    done: bool,
}

/// Start scanning `diff`. Empty text yields no lines.
pub fn scan(diff: &str) -> DiffScanner<'_> {
    DiffScanner {
        lines: diff.split('\n').enumerate(),
        path: None,
        old_path: None,
        hunk: None,
        done: diff.is_empty(),
    }
}

impl<'a> DiffScanner<'a> {
    fn step(&mut self, index: usize, raw: &'a str) -> Result<DiffLine<'a>, DiffError> {
        // CRLF diffs: classify and extract paths without the `\r`
        let text = raw.strip_suffix('\r').unwrap_or(raw);
        let mut line = DiffLine {
            index,
            text: raw,
            kind: LineKind::Meta,
            path: None,
            file_line: None,
        };

        if text.starts_with("diff --git ") {
            // Provisional path until the +++ header shows up
            self.path = split_git_header(text).map(|(_, new)| new);
            self.old_path = None;
            self.hunk = None;
            line.kind = LineKind::SectionStart;
            return Ok(line);
        }

        if text.starts_with("@@") {
            let header =
                parse_hunk_header(text).ok_or_else(|| DiffError::MalformedHunkHeader {
                    line: index + 1,
                    text: text.to_string(),
                })?;
            self.hunk = Some(HunkCursor::new(header));
            line.kind = LineKind::HunkHeader(header);
            line.path = self.path;
            return Ok(line);
        }

        line.path = self.path;

        if let Some(cursor) = self.hunk.as_mut().filter(|cursor| cursor.is_open()) {
            let position = cursor.position();
            line.kind = match text.as_bytes().first() {
                Some(b'+') => {
                    cursor.added += 1;
                    cursor.new_remaining = cursor.new_remaining.saturating_sub(1);
                    LineKind::Added
                }
                Some(b'-') => {
                    cursor.removed += 1;
                    cursor.file_line += 1;
                    cursor.old_remaining = cursor.old_remaining.saturating_sub(1);
                    LineKind::Removed
                }
                Some(b'\\') => return Ok(DiffLine {
                    kind: LineKind::NoNewline,
                    ..line
                }),
                _ => {
                    cursor.file_line += 1;
                    cursor.old_remaining = cursor.old_remaining.saturating_sub(1);
                    cursor.new_remaining = cursor.new_remaining.saturating_sub(1);
                    LineKind::Context
                }
            };
            line.file_line = Some(position);
            return Ok(line);
        }

        if let Some(rest) = text.strip_prefix("--- ") {
            self.old_path = header_path(rest);
            line.kind = LineKind::FileHeaderOld;
        } else if let Some(rest) = text.strip_prefix("+++ ") {
            // Deleted files have `+++ /dev/null`; keep the old-side name
            self.path = header_path(rest).or(self.old_path).or(self.path);
            line.path = self.path;
            line.kind = LineKind::FileHeaderNew;
        } else if text.starts_with('\\') {
            line.kind = LineKind::NoNewline;
        }

        Ok(line)
    }
}

impl<'a> Iterator for DiffScanner<'a> {
    type Item = Result<DiffLine<'a>, DiffError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (index, text) = self.lines.next()?;
        let result = self.step(index, text);
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

/// Parse a hunk header.
/// Format: `@@ -old_start[,old_len] +new_start[,new_len] @@ [section]`
///
/// Omitted lengths default to 1. Returns `None` when either range is missing,
/// not numeric, or runs past `u32::MAX`.
pub fn parse_hunk_header(line: &str) -> Option<HunkHeader> {
    let rest = line.strip_prefix("@@")?;
    let mut tokens = rest.split_whitespace();
    let old = tokens.next()?.strip_prefix('-')?;
    let new = tokens.next()?.strip_prefix('+')?.trim_end_matches('@');

    let (old_start, old_len) = parse_range(old)?;
    let (new_start, new_len) = parse_range(new)?;

    // Line counters run up to start + len on either side
    old_start.checked_add(old_len)?;
    let first_line = new_start.max(1);
    first_line.checked_add(new_len)?;
    first_line.checked_add(old_len)?;

    Some(HunkHeader {
        old_start,
        old_len,
        new_start,
        new_len,
    })
}

/// Parse a range like "start,len" or "start" (len defaults to 1).
fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Path named by a `---` / `+++` header, without its `x/` prefix.
/// `None` for `/dev/null`.
fn header_path(rest: &str) -> Option<&str> {
    // git appends a tab when the path contains spaces; bzr appends a timestamp
    let path = rest.split('\t').next().unwrap_or(rest).trim_end();
    if path == "/dev/null" || path.is_empty() {
        return None;
    }
    Some(strip_diff_prefix(path))
}

/// Strip the single-char diff prefix (a/, b/, w/, etc.) from a path.
fn strip_diff_prefix(path: &str) -> &str {
    if path.len() >= 2 && path.as_bytes()[1] == b'/' {
        &path[2..]
    } else {
        path
    }
}

/// Split a `diff --git` line into its old-side and new-side paths.
///
/// Handles various formats:
/// - `diff --git a/src/foo.rs b/src/foo.rs` -> (`src/foo.rs`, `src/foo.rs`)
/// - `diff --git a/old.rs b/new.rs` -> (`old.rs`, `new.rs`) (rename)
/// - `diff --git c/src/foo.rs w/src/foo.rs` -> mnemonic prefixes
/// - `diff --git a/file with spaces.rs b/file with spaces.rs`
///
/// Returns `None` for ambiguous lines (paths with spaces that also contain
/// the second prefix).
pub fn split_git_header(git_diff_line: &str) -> Option<(&str, &str)> {
    let content = git_diff_line.strip_prefix("diff --git ")?;

    if content.len() < 2 || content.as_bytes()[1] != b'/' {
        return None;
    }

    let first_prefix = content.as_bytes()[0];
    let first_path = &content[2..];

    // Non-rename: "path Y/path" with both halves equal
    let total_len = first_path.len();
    if total_len >= 3 && (total_len - 3) % 2 == 0 {
        let path_len = (total_len - 3) / 2;
        if path_len > 0 {
            let bytes = first_path.as_bytes();
            if bytes[path_len] == b' ' && bytes[path_len + 2] == b'/' {
                let old = &first_path[..path_len];
                let new = &first_path[path_len + 3..];
                if old == new {
                    return Some((old, new));
                }
            }
        }
    }

    // Renames: look for the one separator using the paired prefix.
    // Known prefix pairs: a→b, c→w, i→w, o→w.
    let second_prefix = match first_prefix {
        b'a' => b'b',
        b'c' | b'i' | b'o' => b'w',
        _ => return None,
    };

    let bytes = first_path.as_bytes();
    let mut separators = (0..bytes.len().saturating_sub(2))
        .filter(|&i| bytes[i] == b' ' && bytes[i + 1] == second_prefix && bytes[i + 2] == b'/');

    match (separators.next(), separators.next()) {
        (Some(sep), None) => {
            let old = &first_path[..sep];
            let new = &first_path[sep + 3..];
            (!old.is_empty() && !new.is_empty()).then_some((old, new))
        }
        _ => None,
    }
}
