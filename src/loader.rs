use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cache::{Cache, CacheResult};
use crate::comments::{resolve_comments, InlineCommentMessage, RawInlineComment, ServiceLineBase};
use crate::config::ReviewConfig;
use crate::diff::aggregate_file_stats;
use crate::git::{self, BaseFile};
use crate::launchpad::{
    self, url, CommentEntry, LoadedVote, MergeProposalEntry, PreviewDiffEntry, ReviewService,
};
use crate::review;
use crate::types::{
    DiffStat, MergeProposal, MergeProposalComment, PreviewDiff, ReviewVote, Vote,
};

/// Whose merge proposals to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalSource {
    User(String),
    /// The authenticated user (`people/+me`)
    Me,
    Project(String),
}

impl ProposalSource {
    fn cache_key(&self, fetch_diffs: bool) -> String {
        let key = match self {
            ProposalSource::User(name) => format!("user_{name}"),
            ProposalSource::Me => "me".to_string(),
            ProposalSource::Project(name) => format!("project_{name}"),
        };
        if fetch_diffs {
            format!("{key}_diffs")
        } else {
            key
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Also load preview diffs, their text and inline comments
    pub fetch_diffs: bool,
    pub review: ReviewConfig,
    pub line_base: ServiceLineBase,
    pub cache: Option<Cache>,
    /// Ignore cached listings
    pub refresh: bool,
    pub cache_ttl: u64,
}

/// List merge proposals, served from the listing cache while it is fresh.
pub async fn merge_proposals(
    service: &dyn ReviewService,
    source: &ProposalSource,
    options: &LoadOptions,
) -> Result<Vec<MergeProposal>> {
    let key = source.cache_key(options.fetch_diffs);

    if let (Some(cache), true) = (&options.cache, options.refresh) {
        // a refresh that fails must not leave the old listing to be served later
        if let Err(e) = cache.invalidate_listing(&key) {
            warn!(%key, "failed to drop cached listing: {:#}", e);
        }
    } else if let Some(cache) = &options.cache {
        match cache.read_listing(&key, options.cache_ttl) {
            Ok(CacheResult::Hit(mps)) => {
                debug!(%key, "listing cache hit");
                return Ok(mps);
            }
            Ok(CacheResult::Stale(_)) => debug!(%key, "listing cache stale"),
            Ok(CacheResult::Miss) => {}
            Err(e) => warn!(%key, "ignoring unreadable listing cache: {:#}", e),
        }
    }

    let entries = match source {
        ProposalSource::User(name) => launchpad::fetch_person_merge_proposals(service, name).await?,
        ProposalSource::Me => {
            let me = launchpad::fetch_me(service).await?;
            info!(user = %me.name, "listing merge proposals of the authenticated user");
            launchpad::fetch_person_merge_proposals(service, &me.name).await?
        }
        ProposalSource::Project(name) => {
            launchpad::fetch_project_merge_proposals(service, name).await?
        }
    };

    let mut mps = Vec::with_capacity(entries.len());
    for entry in &entries {
        if let Some(mp) = convert(service, entry, options).await? {
            mps.push(mp);
        }
    }

    if let Some(cache) = &options.cache {
        if let Err(e) = cache.write_listing(&key, &mps) {
            warn!(%key, "failed to write listing cache: {:#}", e);
        }
    }
    Ok(mps)
}

/// Load one merge proposal from its web link.
pub async fn merge_proposal_from_url(
    service: &dyn ReviewService,
    web_link: &str,
    options: &LoadOptions,
) -> Result<MergeProposal> {
    let entry = launchpad::fetch_merge_proposal(service, web_link).await?;
    convert(service, &entry, options)
        .await?
        .with_context(|| format!("{web_link} is not a git merge proposal"))
}

/// Comment on `web_link` created last on `date` (`MM/DD/YYYY`).
pub async fn latest_comment(
    service: &dyn ReviewService,
    web_link: &str,
    date: &str,
) -> Result<Option<MergeProposalComment>> {
    let entry = launchpad::fetch_merge_proposal(service, web_link).await?;
    let comments = convert_comments(launchpad::fetch_comments(service, &entry).await?);
    Ok(review::latest_comment_on(&comments, date)?.cloned())
}

/// Pre-change contents of the files touched by a preview diff (the newest one
/// unless `diff_id` is given), read from a checkout of the target branch.
pub async fn base_files(
    service: &dyn ReviewService,
    web_link: &str,
    diff_id: Option<u64>,
    cache: &Cache,
) -> Result<Vec<BaseFile>> {
    let entry = launchpad::fetch_merge_proposal(service, web_link).await?;
    let diffs = launchpad::fetch_preview_diffs(service, &entry).await?;
    let diff = match diff_id {
        Some(id) => diffs
            .iter()
            .find(|d| d.id == id)
            .with_context(|| format!("Preview diff {id} not found on {web_link}"))?,
        None => diffs
            .last()
            .with_context(|| format!("{web_link} has no preview diffs"))?,
    };

    let text = diff_text(service, diff, Some(cache)).await?;
    let stats = aggregate_file_stats(&text)?;

    let (Some(repository), Some(git_path)) =
        (&entry.target_git_repository_link, &entry.target_git_path)
    else {
        anyhow::bail!("{web_link} has no target git repository");
    };
    let branch = review::branch_name(git_path);
    let checkout = cache.repo_dir(
        &format!(
            "{}_{}_{}",
            url::repo_owner(repository)?,
            url::project_name(repository)?,
            url::repo_name(repository)?
        ),
        &branch,
    )?;

    git::sync_clone(&url::git_clone_url(repository)?, &branch, &checkout).await?;
    git::base_file_contents(&checkout, &stats).await
}

struct GitRefs<'a> {
    source_path: &'a str,
    target_path: &'a str,
    source_repository: &'a str,
    target_repository: &'a str,
}

fn git_refs(entry: &MergeProposalEntry) -> Option<GitRefs<'_>> {
    Some(GitRefs {
        source_path: entry.source_git_path.as_deref()?,
        target_path: entry.target_git_path.as_deref()?,
        source_repository: entry.source_git_repository_link.as_deref()?,
        target_repository: entry.target_git_repository_link.as_deref()?,
    })
}

/// `None` for proposals between non-git (bzr) branches.
async fn convert(
    service: &dyn ReviewService,
    entry: &MergeProposalEntry,
    options: &LoadOptions,
) -> Result<Option<MergeProposal>> {
    let Some(refs) = git_refs(entry) else {
        warn!(mp = %entry.web_link, "skipping merge proposal without git branches");
        return Ok(None);
    };

    let (comments, votes) = tokio::try_join!(
        launchpad::fetch_comments(service, entry),
        launchpad::fetch_votes(service, entry),
    )?;
    let comments = convert_comments(comments);
    let review_votes = convert_votes(votes, &options.review.ci_vote_tag);

    let source_branch = review::branch_name(refs.source_path);
    let jira_tickets = review::jira_tickets(
        &[
            entry.description.as_deref(),
            entry.commit_message.as_deref(),
            Some(source_branch.as_str()),
        ],
        &options.review.jira_prefixes,
    )?;

    let diffs = if options.fetch_diffs {
        let mut diffs = Vec::new();
        for diff in launchpad::fetch_preview_diffs(service, entry).await? {
            // one unreadable diff must not hide the proposal or the other diffs
            match preview_diff(service, entry, &diff, options).await {
                Ok(loaded) => diffs.push(loaded),
                Err(e) => warn!(
                    mp = %entry.web_link,
                    diff_id = diff.id,
                    "skipping preview diff: {:#}",
                    e
                ),
            }
        }
        diffs
    } else {
        Vec::new()
    };

    Ok(Some(MergeProposal {
        id: url::merge_proposal_id(&entry.web_link)?,
        self_link: entry.self_link.clone(),
        repo_name: url::repo_name(&entry.web_link)?,
        url: entry.web_link.clone(),
        source_git_url: url::git_clone_url(refs.source_repository)?,
        target_git_url: url::git_clone_url(refs.target_repository)?,
        source_branch,
        target_branch: review::branch_name(refs.target_path),
        source_owner: url::repo_owner(refs.source_repository)?,
        target_owner: url::repo_owner(refs.target_repository)?,
        review_state: entry.queue_status.clone(),
        diffs,
        reviewers: review_votes
            .iter()
            .map(|vote| vote.reviewer_username.clone())
            .collect(),
        description: entry.description.clone(),
        commit_message: entry.commit_message.clone(),
        ci_cd_status: review::ci_status(
            &comments,
            &options.review.ci_passed_marker,
            &options.review.ci_failed_marker,
        ),
        jira_tickets,
        comments,
        review_votes,
    }))
}

fn convert_comments(comments: Vec<CommentEntry>) -> Vec<MergeProposalComment> {
    comments
        .into_iter()
        .map(|comment| MergeProposalComment {
            id: comment.id,
            author_username: url::person_name(&comment.author_link),
            self_link: comment.self_link,
            message: comment.message_body,
            date_created: comment.date_created,
            date_last_edited: comment.date_last_edited,
        })
        .collect()
}

fn convert_votes(votes: Vec<LoadedVote>, ci_vote_tag: &str) -> Vec<ReviewVote> {
    votes
        .into_iter()
        .filter(|vote| {
            vote.comment
                .as_ref()
                .and_then(|comment| comment.vote_tag.as_deref())
                != Some(ci_vote_tag)
        })
        .map(|vote| ReviewVote {
            reviewer_username: vote.reviewer.name,
            reviewer_display_name: vote.reviewer.display_name,
            vote: vote
                .comment
                .as_ref()
                .and_then(|comment| comment.vote.as_deref())
                .and_then(Vote::from_service),
            needs_reviewer: vote.is_pending,
        })
        .collect()
}

async fn diff_text(
    service: &dyn ReviewService,
    diff: &PreviewDiffEntry,
    cache: Option<&Cache>,
) -> Result<String> {
    if let Some(cache) = cache {
        match cache.read_diff_text(diff.id) {
            Ok(Some(text)) => return Ok(text),
            Ok(None) => {}
            Err(e) => warn!(diff_id = diff.id, "ignoring unreadable diff cache: {:#}", e),
        }
    }

    let text = launchpad::fetch_diff_text(service, diff).await?;
    if let Some(cache) = cache {
        if let Err(e) = cache.write_diff_text(diff.id, &text) {
            warn!(diff_id = diff.id, "failed to write diff cache: {:#}", e);
        }
    }
    Ok(text)
}

async fn preview_diff(
    service: &dyn ReviewService,
    entry: &MergeProposalEntry,
    diff: &PreviewDiffEntry,
    options: &LoadOptions,
) -> Result<PreviewDiff> {
    let (text, inline) = tokio::try_join!(
        diff_text(service, diff, options.cache.as_ref()),
        launchpad::fetch_inline_comments(service, entry, diff.id),
    )?;

    let raw = inline
        .into_iter()
        .map(|comment| {
            Ok(RawInlineComment {
                diff_line: options.line_base.to_diff_line(comment.line_number()?),
                message: InlineCommentMessage {
                    author_username: comment.person.name,
                    author_display_name: comment.person.display_name,
                    message: comment.text,
                    date: comment.date,
                },
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let inline_comments = resolve_comments(raw, &text)
        .with_context(|| format!("Failed to map inline comments of preview diff {}", diff.id))?;
    let file_stats = aggregate_file_stats(&text)?;
    debug!(
        diff_id = diff.id,
        comments = inline_comments.len(),
        files = file_stats.len(),
        "preview diff loaded"
    );

    Ok(PreviewDiff {
        id: diff.id,
        self_link: diff.self_link.clone(),
        diff_stats: diff
            .diffstat
            .iter()
            .flatten()
            .map(|(file, &(additions, deletions))| DiffStat {
                file: file.clone(),
                additions,
                deletions,
            })
            .collect(),
        file_stats,
        inline_comments,
        diff_text: Some(text),
    })
}
