//! Per-file added/deleted counts and status, one entry per `diff --git` section.

use serde::{Deserialize, Serialize};

use super::{scan, split_git_header, strip_diff_prefix, DiffLine, LineKind};
use crate::error::DiffError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    New,
    Deleted,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiffStat {
    /// Old-side path from `diff --git a/<file> b/...`
    pub file: String,
    /// New-side path, only present when it differs from `file` (renames).
    /// Resolved comments carry the new-side path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_to: Option<String>,
    pub lines_added: u32,
    pub lines_deleted: u32,
    pub status: FileStatus,
}

/// Walk `diff` and produce one [`FileDiffStat`] per file section, in order.
pub fn aggregate_file_stats(diff: &str) -> Result<Vec<FileDiffStat>, DiffError> {
    let mut stats = Vec::new();
    let mut current: Option<SectionTally> = None;

    for line in scan(diff) {
        let line = line?;
        if line.kind == LineKind::SectionStart {
            if let Some(done) = current.take() {
                stats.push(done.finish());
            }
            let header = line.text.strip_suffix('\r').unwrap_or(line.text);
            current = Some(SectionTally::start(header));
        } else if let Some(tally) = current.as_mut() {
            tally.observe(&line);
        }
    }

    if let Some(done) = current {
        stats.push(done.finish());
    }

    Ok(stats)
}

/// Files whose pre-change contents exist (everything except new files).
pub fn files_needing_base_contents(stats: &[FileDiffStat]) -> impl Iterator<Item = &FileDiffStat> {
    stats.iter().filter(|stat| stat.status != FileStatus::New)
}

struct SectionTally {
    file: String,
    new_file: Option<String>,
    status: FileStatus,
    counting: bool,
    seen_hunk: bool,
    added: u32,
    deleted: u32,
}

impl SectionTally {
    fn start(header: &str) -> Self {
        let (file, new_file) = match split_git_header(header) {
            Some((old, new)) => (old.to_string(), (old != new).then(|| new.to_string())),
            None => {
                // Ambiguous header: fall back to the first token
                let token = header
                    .strip_prefix("diff --git ")
                    .and_then(|rest| rest.split_whitespace().next())
                    .unwrap_or_default();
                (strip_diff_prefix(token).to_string(), None)
            }
        };

        Self {
            file,
            new_file,
            status: FileStatus::Modified,
            counting: false,
            seen_hunk: false,
            added: 0,
            deleted: 0,
        }
    }

    fn observe(&mut self, line: &DiffLine<'_>) {
        match line.kind {
            LineKind::Meta if !self.seen_hunk => {
                if line.text.starts_with("new file") {
                    self.status = FileStatus::New;
                } else if line.text.starts_with("deleted file") {
                    self.status = FileStatus::Deleted;
                }
            }
            LineKind::FileHeaderOld | LineKind::FileHeaderNew => self.counting = true,
            LineKind::HunkHeader(_) => self.seen_hunk = true,
            LineKind::Added if self.counting => self.added += 1,
            LineKind::Removed if self.counting => self.deleted += 1,
            _ => {}
        }
    }

    fn finish(self) -> FileDiffStat {
        FileDiffStat {
            file: self.file,
            renamed_to: self.new_file,
            lines_added: self.added,
            lines_deleted: self.deleted,
            status: self.status,
        }
    }
}
