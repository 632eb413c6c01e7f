//! Inline review comments: grouping by diff line and anchoring to files.
//!
//! The review service reports every inline comment against an absolute line of
//! the preview diff. Comments on the same line are folded into one thread, then
//! each thread is resolved to a file and post-change line number.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{resolve_many, LinePosition};
use crate::error::DiffError;

/// One message of an inline comment thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineCommentMessage {
    pub author_username: String,
    pub author_display_name: String,
    pub message: String,
    pub date: DateTime<Utc>,
}

/// An inline comment as extracted from the service response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInlineComment {
    /// 1-based line of the whole diff text
    pub diff_line: usize,
    #[serde(flatten)]
    pub message: InlineCommentMessage,
}

/// Every message placed on one absolute diff line, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentGroup {
    pub diff_line: usize,
    pub messages: Vec<InlineCommentMessage>,
}

/// A comment thread anchored (when possible) to a file line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedComment {
    pub file: Option<String>,
    pub line_no: Option<u32>,
    pub diff_line: usize,
    pub line_text: Option<String>,
    pub messages: Vec<InlineCommentMessage>,
}

/// How the review service numbers diff lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceLineBase {
    #[default]
    ZeroBased,
    OneBased,
}

impl ServiceLineBase {
    /// Convert a service `line_number` into the 1-based absolute diff line
    /// used by [`resolve_comments`].
    pub fn to_diff_line(self, line_number: u64) -> usize {
        let line_number = usize::try_from(line_number).unwrap_or(usize::MAX);
        match self {
            ServiceLineBase::ZeroBased => line_number.saturating_add(1),
            ServiceLineBase::OneBased => line_number,
        }
    }
}

/// Group comments by diff line.
///
/// Groups come out in the order their line was first seen (not sorted by line),
/// and messages keep input order inside each group.
pub fn consolidate(comments: impl IntoIterator<Item = RawInlineComment>) -> Vec<CommentGroup> {
    let mut groups: Vec<CommentGroup> = Vec::new();
    let mut slot_by_line: HashMap<usize, usize> = HashMap::new();

    for RawInlineComment { diff_line, message } in comments {
        match slot_by_line.get(&diff_line) {
            Some(&slot) => groups[slot].messages.push(message),
            None => {
                slot_by_line.insert(diff_line, groups.len());
                groups.push(CommentGroup {
                    diff_line,
                    messages: vec![message],
                });
            }
        }
    }

    groups
}

/// Group `comments` and anchor every group inside `diff`.
///
/// Groups that land on header lines or outside the diff are kept with
/// `file`/`line_no` set to `None`.
pub fn resolve_comments(
    comments: impl IntoIterator<Item = RawInlineComment>,
    diff: &str,
) -> Result<Vec<ResolvedComment>, DiffError> {
    let groups = consolidate(comments);
    let lines: Vec<usize> = groups.iter().map(|group| group.diff_line).collect();
    let positions = resolve_many(diff, &lines)?;

    Ok(groups
        .into_iter()
        .map(|group| {
            let position = positions.get(&group.diff_line).copied().unwrap_or_default();
            anchor(group, position)
        })
        .collect())
}

fn anchor(group: CommentGroup, position: LinePosition<'_>) -> ResolvedComment {
    ResolvedComment {
        file: position.path.map(str::to_string),
        line_no: position.line,
        diff_line: group.diff_line,
        line_text: position.text.map(str::to_string),
        messages: group.messages,
    }
}
