use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::client::{api_url, fetch_as, fetch_entries, ReviewService};
use super::url;

/// Merge proposal resource as returned by the web service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeProposalEntry {
    pub self_link: String,
    pub web_link: String,
    pub queue_status: String,
    pub description: Option<String>,
    pub commit_message: Option<String>,
    pub source_git_path: Option<String>,
    pub target_git_path: Option<String>,
    pub source_git_repository_link: Option<String>,
    pub target_git_repository_link: Option<String>,
    pub all_comments_collection_link: Option<String>,
    pub votes_collection_link: Option<String>,
    pub preview_diffs_collection_link: Option<String>,
}

impl MergeProposalEntry {
    fn collection_link(&self, link: &Option<String>, name: &str) -> String {
        link.clone()
            .unwrap_or_else(|| format!("{}/{}", self.self_link, name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentEntry {
    pub id: u64,
    pub self_link: String,
    #[serde(default)]
    pub message_body: String,
    pub author_link: String,
    pub date_created: DateTime<Utc>,
    pub date_last_edited: Option<DateTime<Utc>>,
    #[serde(default)]
    pub vote: Option<String>,
    #[serde(default)]
    pub vote_tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteEntry {
    pub self_link: String,
    pub reviewer_link: String,
    pub comment_link: Option<String>,
    #[serde(default)]
    pub is_pending: bool,
}

/// A vote with its reviewer and comment loaded.
#[derive(Debug, Clone)]
pub struct LoadedVote {
    pub reviewer: Person,
    pub comment: Option<CommentEntry>,
    pub is_pending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewDiffEntry {
    pub id: u64,
    pub self_link: String,
    pub diff_text_link: Option<String>,
    /// `{"path": [added, removed]}`
    #[serde(default)]
    pub diffstat: Option<BTreeMap<String, (u32, u32)>>,
}

/// One entry of `getInlineComments`.
#[derive(Debug, Clone, Deserialize)]
pub struct InlineCommentEntry {
    /// Reported either as a number or as a numeric string
    pub line_number: Value,
    pub person: Person,
    pub text: String,
    pub date: DateTime<Utc>,
}

impl InlineCommentEntry {
    pub fn line_number(&self) -> Result<u64> {
        match &self.line_number {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .with_context(|| format!("Invalid inline comment line_number: {}", self.line_number))
    }
}

fn parse_entries<T: serde::de::DeserializeOwned>(
    entries: Vec<Value>,
    error_context: &'static str,
) -> Result<Vec<T>> {
    entries
        .into_iter()
        .map(|entry| serde_json::from_value(entry).context(error_context))
        .collect()
}

/// Name of the authenticated user.
pub async fn fetch_me(service: &dyn ReviewService) -> Result<Person> {
    fetch_as(service, "people/+me", "Failed to parse people/+me response").await
}

/// Merge proposals owned by a person.
pub async fn fetch_person_merge_proposals(
    service: &dyn ReviewService,
    username: &str,
) -> Result<Vec<MergeProposalEntry>> {
    let entries = fetch_entries(service, &format!("~{username}?ws.op=getMergeProposals")).await?;
    parse_entries(entries, "Failed to parse merge proposal entry")
}

/// Merge proposals targeting a project.
pub async fn fetch_project_merge_proposals(
    service: &dyn ReviewService,
    project: &str,
) -> Result<Vec<MergeProposalEntry>> {
    let entries = fetch_entries(service, &format!("{project}?ws.op=getMergeProposals")).await?;
    parse_entries(entries, "Failed to parse merge proposal entry")
}

/// Load a merge proposal from its web link.
///
/// The API resource normally lives at the web link's path; when that lookup
/// fails the project's proposals are searched for a matching `web_link`.
pub async fn fetch_merge_proposal(
    service: &dyn ReviewService,
    web_link: &str,
) -> Result<MergeProposalEntry> {
    let path = url::api_path(web_link)?;
    match fetch_as(service, &path, "Failed to parse merge proposal").await {
        Ok(entry) => return Ok(entry),
        Err(e) => warn!("Direct merge proposal lookup failed, searching project: {:#}", e),
    }

    let project = url::project_name(web_link)?;
    let listed = fetch_project_merge_proposals(service, &project).await?;
    let found = listed
        .into_iter()
        .find(|mp| mp.web_link == web_link)
        .with_context(|| format!("Merge proposal not found: {web_link}"))?;
    fetch_as(service, &found.self_link, "Failed to parse merge proposal").await
}

pub async fn fetch_comments(
    service: &dyn ReviewService,
    mp: &MergeProposalEntry,
) -> Result<Vec<CommentEntry>> {
    let link = mp.collection_link(&mp.all_comments_collection_link, "all_comments");
    let entries = fetch_entries(service, &link).await?;
    parse_entries(entries, "Failed to parse merge proposal comment")
}

/// Votes with their reviewer and (if any) comment resolved.
pub async fn fetch_votes(
    service: &dyn ReviewService,
    mp: &MergeProposalEntry,
) -> Result<Vec<LoadedVote>> {
    let link = mp.collection_link(&mp.votes_collection_link, "votes");
    let votes: Vec<VoteEntry> =
        parse_entries(fetch_entries(service, &link).await?, "Failed to parse vote")?;

    let mut loaded = Vec::with_capacity(votes.len());
    for vote in votes {
        let reviewer: Person =
            fetch_as(service, &vote.reviewer_link, "Failed to parse reviewer").await?;
        let comment = match &vote.comment_link {
            Some(link) => Some(fetch_as(service, link, "Failed to parse vote comment").await?),
            None => None,
        };
        loaded.push(LoadedVote {
            reviewer,
            comment,
            is_pending: vote.is_pending,
        });
    }
    Ok(loaded)
}

pub async fn fetch_preview_diffs(
    service: &dyn ReviewService,
    mp: &MergeProposalEntry,
) -> Result<Vec<PreviewDiffEntry>> {
    let link = mp.collection_link(&mp.preview_diffs_collection_link, "preview_diffs");
    let entries = fetch_entries(service, &link).await?;
    parse_entries(entries, "Failed to parse preview diff")
}

/// Raw unified diff text of a preview diff.
pub async fn fetch_diff_text(service: &dyn ReviewService, diff: &PreviewDiffEntry) -> Result<String> {
    let link = diff
        .diff_text_link
        .clone()
        .unwrap_or_else(|| format!("{}/diff_text", diff.self_link));
    debug!(diff_id = diff.id, "fetching diff text");
    service.get_text(&api_url(service, &link)).await
}

/// Inline comments placed on one preview diff.
pub async fn fetch_inline_comments(
    service: &dyn ReviewService,
    mp: &MergeProposalEntry,
    diff_id: u64,
) -> Result<Vec<InlineCommentEntry>> {
    let path = format!(
        "{}?ws.op=getInlineComments&previewdiff_id={}",
        mp.self_link, diff_id
    );
    let entries = fetch_entries(service, &path).await?;
    parse_entries(entries, "Failed to parse inline comment")
}
