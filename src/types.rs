use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::comments::ResolvedComment;
use crate::diff::FileDiffStat;

/// A merge proposal as rendered for consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeProposal {
    pub id: String,
    pub self_link: String,
    pub repo_name: String,
    pub url: String,
    pub source_git_url: String,
    pub target_git_url: String,
    pub source_branch: String,
    pub target_branch: String,
    pub source_owner: String,
    pub target_owner: String,
    pub review_state: String,
    #[serde(default)]
    pub diffs: Vec<PreviewDiff>,
    #[serde(default)]
    pub reviewers: Vec<String>,
    pub description: Option<String>,
    pub commit_message: Option<String>,
    #[serde(default)]
    pub ci_cd_status: CiStatus,
    #[serde(default)]
    pub jira_tickets: Vec<String>,
    #[serde(default)]
    pub comments: Vec<MergeProposalComment>,
    #[serde(default)]
    pub review_votes: Vec<ReviewVote>,
}

/// One preview diff of a merge proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewDiff {
    pub id: u64,
    pub self_link: String,
    /// Per-file counts as reported by the review service
    #[serde(default)]
    pub diff_stats: Vec<DiffStat>,
    /// Per-file counts and status recomputed from `diff_text`
    #[serde(default)]
    pub file_stats: Vec<FileDiffStat>,
    #[serde(default)]
    pub inline_comments: Vec<ResolvedComment>,
    pub diff_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStat {
    pub file: String,
    pub additions: u32,
    pub deletions: u32,
}

/// A general (non-inline) merge proposal comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeProposalComment {
    pub id: u64,
    pub self_link: String,
    pub author_username: String,
    pub message: String,
    pub date_created: DateTime<Utc>,
    pub date_last_edited: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CiStatus {
    Passing,
    Failing,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Vote {
    Approve,
    NeedsFixing,
    NeedsInfo,
    Abstain,
    Disapprove,
    NeedsResubmitting,
}

impl Vote {
    /// Parse the service's display form ("Approve", "Needs Fixing", ...).
    pub fn from_service(vote: &str) -> Option<Self> {
        match vote.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "APPROVE" => Some(Vote::Approve),
            "NEEDS_FIXING" => Some(Vote::NeedsFixing),
            "NEEDS_INFO" | "NEEDS_INFORMATION" => Some(Vote::NeedsInfo),
            "ABSTAIN" => Some(Vote::Abstain),
            "DISAPPROVE" => Some(Vote::Disapprove),
            "NEEDS_RESUBMITTING" => Some(Vote::NeedsResubmitting),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewVote {
    pub reviewer_username: String,
    pub reviewer_display_name: String,
    pub vote: Option<Vote>,
    #[serde(default)]
    pub needs_reviewer: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_from_service() {
        assert_eq!(Vote::from_service("Approve"), Some(Vote::Approve));
        assert_eq!(Vote::from_service("Needs Fixing"), Some(Vote::NeedsFixing));
        assert_eq!(Vote::from_service("Needs Information"), Some(Vote::NeedsInfo));
        assert_eq!(Vote::from_service("Needs Resubmitting"), Some(Vote::NeedsResubmitting));
        assert_eq!(Vote::from_service("Resubmit please"), None);
    }

    #[test]
    fn test_vote_and_ci_serialize_upper_snake() {
        assert_eq!(serde_json::to_string(&Vote::NeedsFixing).unwrap(), "\"NEEDS_FIXING\"");
        assert_eq!(serde_json::to_string(&CiStatus::Unknown).unwrap(), "\"UNKNOWN\"");
    }
}
