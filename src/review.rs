//! Review-level facts derived from already-fetched merge proposal data.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;

use crate::types::{CiStatus, MergeProposalComment};

/// CI verdict from the most recent comment mentioning one.
pub fn ci_status(comments: &[MergeProposalComment], passed: &str, failed: &str) -> CiStatus {
    for comment in comments.iter().rev() {
        if comment.message.contains(passed) {
            return CiStatus::Passing;
        } else if comment.message.contains(failed) {
            return CiStatus::Failing;
        }
    }
    CiStatus::Unknown
}

/// Jira ticket mentions (`<PREFIX>-<digits>`), upper-cased, first mention order,
/// without duplicates.
pub fn jira_tickets(texts: &[Option<&str>], prefixes: &[String]) -> Result<Vec<String>> {
    let patterns = prefixes
        .iter()
        .filter(|prefix| !prefix.trim().is_empty())
        .map(|prefix| {
            let pattern = format!(r"{}-\d+", regex::escape(&prefix.trim().to_uppercase()));
            Regex::new(&pattern).with_context(|| format!("Invalid Jira prefix: {prefix}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut tickets: Vec<String> = Vec::new();
    for text in texts.iter().flatten() {
        let text = text.to_uppercase();
        for pattern in &patterns {
            for found in pattern.find_iter(&text) {
                if !tickets.iter().any(|t| t == found.as_str()) {
                    tickets.push(found.as_str().to_string());
                }
            }
        }
    }
    Ok(tickets)
}

/// Latest comment created on `date` (`MM/DD/YYYY`, compared in UTC).
pub fn latest_comment_on<'a>(
    comments: &'a [MergeProposalComment],
    date: &str,
) -> Result<Option<&'a MergeProposalComment>> {
    let target = NaiveDate::parse_from_str(date, "%m/%d/%Y")
        .with_context(|| format!("Invalid date {date:?}, expected MM/DD/YYYY"))?;

    Ok(comments
        .iter()
        .filter(|comment| comment.date_created.date_naive() == target)
        .max_by_key(|comment| comment.date_created))
}

/// Branch name from a git ref path (`refs/heads/feature/x` → `feature/x`).
pub fn branch_name(git_path: &str) -> String {
    git_path
        .strip_prefix("refs/heads/")
        .or_else(|| git_path.rsplit('/').next())
        .unwrap_or(git_path)
        .to_string()
}
