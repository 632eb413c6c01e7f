//! Pieces of information encoded in Launchpad links.
//!
//! Git merge proposal web links look like
//! `https://code.launchpad.net/~owner/project/+git/repo/+merge/123456` and the
//! matching API resource lives at the same path below the API root.

use anyhow::{Context, Result};
use url::Url;

/// `launchpad.net` or one of its subdomains. Unit tests also use `launchpad.test`.
fn is_launchpad_host(host: &str) -> bool {
    let under = |domain: &str| {
        host == domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    };
    under("launchpad.net") || (cfg!(test) && under("launchpad.test"))
}

fn segments(link: &str) -> Result<Vec<String>> {
    let url = Url::parse(link).with_context(|| format!("Invalid URL: {link}"))?;
    if !url.host_str().is_some_and(is_launchpad_host) {
        anyhow::bail!("Not a Launchpad URL: {link}");
    }
    Ok(url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

/// `~owner` segment of a person-owned link, without the tilde.
pub fn repo_owner(link: &str) -> Result<String> {
    segments(link)?
        .iter()
        .rev()
        .find_map(|s| s.strip_prefix('~').map(str::to_string))
        .filter(|owner| !owner.is_empty())
        .with_context(|| format!("No ~owner in {link}"))
}

/// Project following the `~owner` segment.
pub fn project_name(link: &str) -> Result<String> {
    let segments = segments(link)?;
    segments
        .iter()
        .rposition(|s| s.starts_with('~'))
        .and_then(|owner| segments.get(owner + 1))
        .filter(|project| !project.starts_with('+'))
        .cloned()
        .with_context(|| format!("No project in {link}"))
}

/// Repository name following `+git`.
pub fn repo_name(link: &str) -> Result<String> {
    let segments = segments(link)?;
    segments
        .iter()
        .position(|s| s == "+git")
        .and_then(|git| segments.get(git + 1))
        .cloned()
        .with_context(|| format!("No +git repository in {link}"))
}

/// Merge proposal id, the last path segment of its web link.
pub fn merge_proposal_id(link: &str) -> Result<String> {
    segments(link)?
        .pop()
        .with_context(|| format!("No merge proposal id in {link}"))
}

/// Resource path (relative to the API root) of an object's web link.
pub fn api_path(link: &str) -> Result<String> {
    Ok(segments(link)?.join("/"))
}

/// Anonymous git clone URL for an API repository link
/// (`.../devel/~owner/project/+git/repo` → `https://git.launchpad.net/~owner/project/+git/repo`).
pub fn git_clone_url(repository_link: &str) -> Result<String> {
    let segments = segments(repository_link)?;
    let start = segments
        .iter()
        .position(|s| s.starts_with('~'))
        .with_context(|| format!("No ~owner in {repository_link}"))?;
    Ok(format!("https://git.launchpad.net/{}", segments[start..].join("/")))
}

/// Username from a person link (`.../~alice` → `alice`).
pub fn person_name(person_link: &str) -> String {
    person_link
        .rsplit("/~")
        .next()
        .unwrap_or(person_link)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MP: &str = "https://code.launchpad.net/~alice/widgets/+git/widgets-core/+merge/461234";
    const REPO: &str = "https://api.launchpad.net/devel/~alice/widgets/+git/widgets-core";

    #[test]
    fn test_parse_merge_proposal_link() {
        assert_eq!(repo_owner(MP).unwrap(), "alice");
        assert_eq!(project_name(MP).unwrap(), "widgets");
        assert_eq!(repo_name(MP).unwrap(), "widgets-core");
        assert_eq!(merge_proposal_id(MP).unwrap(), "461234");
        assert_eq!(
            api_path(MP).unwrap(),
            "~alice/widgets/+git/widgets-core/+merge/461234"
        );
    }

    #[test]
    fn test_git_clone_url() {
        assert_eq!(
            git_clone_url(REPO).unwrap(),
            "https://git.launchpad.net/~alice/widgets/+git/widgets-core"
        );
        assert_eq!(repo_owner(REPO).unwrap(), "alice");
    }

    #[test]
    fn test_rejects_foreign_or_incomplete_links() {
        assert!(repo_owner("https://github.com/~alice/x").is_err());
        assert!(repo_name("https://code.launchpad.net/~alice/widgets").is_err());
        assert!(project_name("https://code.launchpad.net/~alice/+git/x").is_err());
        assert!(merge_proposal_id("not a url").is_err());
    }

    #[test]
    fn test_launchpad_host_must_match_whole_labels() {
        assert!(is_launchpad_host("launchpad.net"));
        assert!(is_launchpad_host("code.launchpad.net"));
        assert!(is_launchpad_host("api.staging.launchpad.net"));
        assert!(!is_launchpad_host("evillaunchpad.net"));
        assert!(!is_launchpad_host("launchpad.net.example.com"));
        assert!(repo_owner("https://evillaunchpad.net/~alice/widgets").is_err());
        assert!(
            api_path("https://code.evillaunchpad.net/~alice/widgets/+git/x/+merge/1").is_err()
        );
    }

    #[test]
    fn test_person_name() {
        assert_eq!(person_name("https://api.launchpad.net/devel/~bob"), "bob");
        assert_eq!(person_name("bob"), "bob");
    }
}
