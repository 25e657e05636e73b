//! GitHub collector
//!
//! Lists the repository root through the contents API and fetches each
//! selected file from the URL the listing reports. File bodies arrive
//! base64-encoded.

use crate::collectors::{CollectContext, Collector};
use crate::error::FairError;
use crate::types::{FileCandidate, Platform, RepositoryReference};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use url::Url;

/// Media type requested from the GitHub API
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Paths on github.com that are not repositories
const RESERVED_OWNERS: &[&str] = &[
    "settings",
    "explore",
    "trending",
    "collections",
    "events",
    "sponsors",
    "notifications",
    "marketplace",
    "pulls",
    "issues",
    "codespaces",
    "features",
    "enterprise",
    "organizations",
    "pricing",
    "about",
    "team",
    "security",
    "login",
    "join",
];

/// GitHub repository collector
///
/// Matches any `github.com` URL; the first two path segments name the
/// repository (`https://github.com/{owner}/{repo}[/...]`).
pub struct GitHubCollector;

impl GitHubCollector {
    /// Create a new GitHub collector
    pub fn new() -> Self {
        Self
    }

    /// Extract owner and repo from a GitHub URL
    fn parse_github_url(url: &Url) -> Option<(String, String)> {
        let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
        if segments.len() < 2 {
            return None;
        }

        let owner = segments[0];
        let repo = segments[1].strip_suffix(".git").unwrap_or(segments[1]);

        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        if RESERVED_OWNERS.contains(&owner) {
            return None;
        }

        Some((owner.to_string(), repo.to_string()))
    }

    fn authorize(
        request: reqwest::RequestBuilder,
        ctx: &CollectContext<'_>,
    ) -> reqwest::RequestBuilder {
        let request = request.header(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        match ctx.options.token_for(Platform::GitHub) {
            Some(token) => request.header(AUTHORIZATION, format!("token {}", token)),
            None => request,
        }
    }
}

impl Default for GitHubCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry of the contents API listing (partial)
#[derive(Debug, Deserialize)]
struct GitHubContentEntry {
    name: String,
    url: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Contents API file response (partial)
#[derive(Debug, Deserialize)]
struct GitHubFile {
    content: String,
    encoding: String,
}

#[async_trait]
impl Collector for GitHubCollector {
    fn name(&self) -> &'static str {
        "github"
    }

    fn matches(&self, url: &Url) -> bool {
        matches!(url.host_str(), Some("github.com") | Some("www.github.com"))
    }

    async fn resolve(
        &self,
        url: &Url,
        _ctx: &CollectContext<'_>,
    ) -> Result<RepositoryReference, FairError> {
        let (owner, repo) = Self::parse_github_url(url)
            .ok_or_else(|| FairError::InvalidRepositoryUrl(url.to_string()))?;

        Ok(RepositoryReference::new(
            Platform::GitHub,
            url.origin().ascii_serialization(),
            vec![owner, repo],
        ))
    }

    async fn list_files(
        &self,
        repo: &RepositoryReference,
        ctx: &CollectContext<'_>,
    ) -> Result<Vec<FileCandidate>, FairError> {
        let listing_url = format!(
            "{}/repos/{}/contents",
            ctx.options.github_api_base().trim_end_matches('/'),
            repo.path()
        );
        let listing_error = |reason: String| FairError::ListingFetch {
            repository: repo.path(),
            reason,
        };

        let response = Self::authorize(ctx.http.get(&listing_url), ctx)
            .send()
            .await
            .map_err(|e| listing_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = match status.as_u16() {
                404 => "repository not found (HTTP 404)".to_string(),
                403 => "GitHub API rate limit exceeded (HTTP 403)".to_string(),
                code => format!("HTTP {}", code),
            };
            return Err(listing_error(reason));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| listing_error(format!("invalid listing payload: {}", e)))?;

        let Value::Array(entries) = payload else {
            warn!(repository = %repo, "Contents listing is not an array, treating as empty");
            return Ok(Vec::new());
        };

        Ok(entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<GitHubContentEntry>(entry).ok())
            .filter(|entry| entry.kind.as_deref() != Some("dir"))
            .map(|entry| FileCandidate::new(entry.name, entry.url))
            .collect())
    }

    async fn fetch_file(
        &self,
        _repo: &RepositoryReference,
        file: &FileCandidate,
        ctx: &CollectContext<'_>,
    ) -> Result<String, FairError> {
        let response = Self::authorize(ctx.http.get(&file.locator), ctx)
            .send()
            .await
            .map_err(FairError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(FairError::RequestError(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: GitHubFile = response
            .json()
            .await
            .map_err(|e| FairError::RequestError(format!("invalid file payload: {}", e)))?;

        if body.encoding != "base64" {
            return Err(FairError::RequestError(format!(
                "unsupported encoding: {}",
                body.encoding
            )));
        }

        decode_base64_content(&body.content)
            .ok_or_else(|| FairError::RequestError("invalid base64 content".to_string()))
    }
}

/// Decode base64-encoded content (GitHub wraps it at 60 columns)
fn decode_base64_content(encoded: &str) -> Option<String> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = general_purpose::STANDARD.decode(cleaned).ok()?;
    Some(String::from_utf8_lossy(&decoded).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_github_url_valid() {
        let url = Url::parse("https://github.com/owner/repo").unwrap();
        assert_eq!(
            GitHubCollector::parse_github_url(&url),
            Some(("owner".to_string(), "repo".to_string()))
        );
    }

    #[test]
    fn test_parse_github_url_with_trailing_slash() {
        let url = Url::parse("https://github.com/owner/repo/").unwrap();
        assert_eq!(
            GitHubCollector::parse_github_url(&url),
            Some(("owner".to_string(), "repo".to_string()))
        );
    }

    #[test]
    fn test_parse_github_url_strips_git_suffix() {
        let url = Url::parse("https://github.com/owner/repo.git").unwrap();
        assert_eq!(
            GitHubCollector::parse_github_url(&url),
            Some(("owner".to_string(), "repo".to_string()))
        );
    }

    #[test]
    fn test_parse_github_url_deep_link() {
        let url = Url::parse("https://github.com/owner/repo/blob/main/README.md").unwrap();
        assert_eq!(
            GitHubCollector::parse_github_url(&url),
            Some(("owner".to_string(), "repo".to_string()))
        );
    }

    #[test]
    fn test_parse_github_url_too_few_segments() {
        let url = Url::parse("https://github.com/owner").unwrap();
        assert_eq!(GitHubCollector::parse_github_url(&url), None);

        let url = Url::parse("https://github.com/").unwrap();
        assert_eq!(GitHubCollector::parse_github_url(&url), None);
    }

    #[test]
    fn test_parse_github_url_reserved_paths() {
        let url = Url::parse("https://github.com/settings/profile").unwrap();
        assert_eq!(GitHubCollector::parse_github_url(&url), None);

        let url = Url::parse("https://github.com/explore/topics").unwrap();
        assert_eq!(GitHubCollector::parse_github_url(&url), None);
    }

    #[test]
    fn test_collector_matches() {
        let collector = GitHubCollector::new();

        let url = Url::parse("https://github.com/rust-lang/rust").unwrap();
        assert!(collector.matches(&url));

        let url = Url::parse("https://gitlab.com/owner/repo").unwrap();
        assert!(!collector.matches(&url));

        let url = Url::parse("https://example.com/foo/bar").unwrap();
        assert!(!collector.matches(&url));
    }

    #[test]
    fn test_decode_base64_content() {
        // "Hello, World!" wrapped across lines the way the API returns it
        assert_eq!(
            decode_base64_content("SGVsbG8s\nIFdvcmxkIQ==\n"),
            Some("Hello, World!".to_string())
        );
        assert_eq!(decode_base64_content(""), Some(String::new()));
        assert_eq!(decode_base64_content("abc"), None);
    }
}
