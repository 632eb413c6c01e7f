mod client;
mod merge_proposal;
pub mod url;

pub use client::{
    api_url, fetch_as, fetch_entries, Credentials, LaunchpadSession, ReviewService,
    DEFAULT_API_ROOT,
};
pub use merge_proposal::{
    fetch_comments, fetch_diff_text, fetch_inline_comments, fetch_me, fetch_merge_proposal,
    fetch_person_merge_proposals, fetch_preview_diffs, fetch_project_merge_proposals,
    fetch_votes, CommentEntry, InlineCommentEntry, LoadedVote, MergeProposalEntry, Person,
    PreviewDiffEntry,
};

#[cfg(test)]
pub(crate) use client::testing;
