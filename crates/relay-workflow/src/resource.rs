//! GitHub issue identifiers and the helpers that canonicalize them.

use std::fmt;

use serde::{Deserialize, Serialize};

const WEB_BASE: &str = "https://github.com/";
const API_REPOS_BASE: &str = "https://api.github.com/repos/";
const ISSUES_SEGMENT: &str = "/issues/";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Canonical user-facing issue URL, `https://github.com/{org}/{repo}/issues/{n}`.
///
/// API-shaped URLs (`https://api.github.com/repos/...`) are rewritten to the
/// user-facing shape on parse so both producers compare equal.
pub struct IssueUrl(String);

impl IssueUrl {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_end_matches('/');
        let path = trimmed
            .strip_prefix(API_REPOS_BASE)
            .or_else(|| trimmed.strip_prefix(WEB_BASE))?;
        if !path.contains(ISSUES_SEGMENT) {
            return None;
        }
        Some(Self(format!("{WEB_BASE}{path}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn number(&self) -> u64 {
        issue_number_from_url(&self.0)
    }

    /// Returns `org/repo` taken from the URL path.
    pub fn repo_full_name(&self) -> Option<String> {
        let mut segments = self.0.split('/').skip(3);
        let org = segments.next().filter(|value| !value.is_empty())?;
        let repo = segments.next().filter(|value| !value.is_empty())?;
        Some(format!("{org}/{repo}"))
    }
}

impl fmt::Display for IssueUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses the issue number from the seventh `/`-separated segment.
///
/// Leading digits are honoured (`42abc` is 42); anything else, including a
/// URL that is too short, yields 0.
pub fn issue_number_from_url(url: &str) -> u64 {
    url.split('/')
        .nth(6)
        .map(|segment| {
            segment
                .chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
        })
        .and_then(|digits| digits.parse::<u64>().ok())
        .unwrap_or(0)
}

/// Finds the first issue URL printed on its own line by `gh issue create`.
pub fn extract_issue_url(output: &str) -> Option<IssueUrl> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(WEB_BASE) && line.contains(ISSUES_SEGMENT))
        .find_map(IssueUrl::parse)
}

/// Qualifies a bare repository name with the default organization.
pub fn qualify_repo_name(repo: &str, default_org: &str) -> String {
    let repo = repo.trim();
    if repo.contains('/') {
        repo.to_string()
    } else {
        format!("{}/{repo}", default_org.trim())
    }
}
