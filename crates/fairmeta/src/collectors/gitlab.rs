//! GitLab collector
//!
//! Works against gitlab.com and self-hosted instances: the API base is the
//! repository URL's origin plus `/api/v4`. The project is addressed by its
//! numeric id when the project lookup succeeds, otherwise by its URL-encoded
//! path, which the API accepts as well.

use crate::collectors::{encode_path_component, CollectContext, Collector};
use crate::error::FairError;
use crate::types::{FileCandidate, Platform, RepositoryReference};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Page size requested for the root tree listing
const TREE_PAGE_SIZE: u32 = 100;

/// GitLab repository collector
///
/// Matches any non-GitHub `http(s)` URL with at least a namespace and a
/// project name in its path.
pub struct GitLabCollector;

impl GitLabCollector {
    /// Create a new GitLab collector
    pub fn new() -> Self {
        Self
    }

    /// Extract the project path (`group/sub/project`) from a URL
    fn project_path(url: &Url) -> Option<String> {
        let path = url.path().trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path).trim_end_matches('/');

        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(path.to_string())
    }

    fn api_base(repo: &RepositoryReference) -> String {
        format!("{}/api/v4", repo.origin())
    }

    /// Project identifier as used in API paths
    fn project_ref(repo: &RepositoryReference) -> String {
        repo.project_id()
            .map(str::to_string)
            .unwrap_or_else(|| encode_path_component(&repo.path()))
    }

    fn authorize(
        request: reqwest::RequestBuilder,
        ctx: &CollectContext<'_>,
    ) -> reqwest::RequestBuilder {
        match ctx.options.token_for(Platform::GitLab) {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Look up the numeric project id
    async fn lookup_project_id(
        api_base: &str,
        encoded_path: &str,
        ctx: &CollectContext<'_>,
    ) -> Result<String, FairError> {
        let lookup_url = format!("{}/projects/{}", api_base, encoded_path);
        let response = Self::authorize(ctx.http.get(&lookup_url), ctx)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(FairError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(FairError::RequestError(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let project: GitLabProject = response
            .json()
            .await
            .map_err(|e| FairError::RequestError(format!("invalid project payload: {}", e)))?;
        Ok(project.id.to_string())
    }
}

impl Default for GitLabCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Project lookup response (partial)
#[derive(Debug, Deserialize)]
struct GitLabProject {
    id: u64,
}

/// Repository tree entry (partial)
#[derive(Debug, Deserialize)]
struct GitLabTreeEntry {
    name: String,
    path: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[async_trait]
impl Collector for GitLabCollector {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    fn matches(&self, url: &Url) -> bool {
        let is_github = matches!(url.host_str(), Some("github.com") | Some("www.github.com"));
        url.host_str().is_some() && !is_github && Self::project_path(url).is_some()
    }

    async fn resolve(
        &self,
        url: &Url,
        ctx: &CollectContext<'_>,
    ) -> Result<RepositoryReference, FairError> {
        let path = Self::project_path(url)
            .ok_or_else(|| FairError::InvalidRepositoryUrl(url.to_string()))?;
        let segments = path.split('/').map(str::to_string).collect();
        let repo = RepositoryReference::new(
            Platform::GitLab,
            url.origin().ascii_serialization(),
            segments,
        );

        let encoded_path = encode_path_component(&path);
        let project_id =
            match Self::lookup_project_id(&Self::api_base(&repo), &encoded_path, ctx).await {
                Ok(id) => {
                    debug!(project = %path, id = %id, "Resolved GitLab project id");
                    id
                }
                Err(e) => {
                    warn!(project = %path, error = %e, "Project lookup failed, using encoded path");
                    encoded_path
                }
            };

        Ok(repo.with_project_id(project_id))
    }

    async fn list_files(
        &self,
        repo: &RepositoryReference,
        ctx: &CollectContext<'_>,
    ) -> Result<Vec<FileCandidate>, FairError> {
        let api_base = Self::api_base(repo);
        let project = Self::project_ref(repo);
        let tree_url = format!(
            "{}/projects/{}/repository/tree?per_page={}",
            api_base, project, TREE_PAGE_SIZE
        );
        let listing_error = |reason: String| FairError::ListingFetch {
            repository: repo.path(),
            reason,
        };

        let response = Self::authorize(ctx.http.get(&tree_url), ctx)
            .send()
            .await
            .map_err(|e| listing_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(listing_error(format!(
                "failed to fetch GitLab repo tree (HTTP {})",
                response.status().as_u16()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| listing_error(format!("invalid tree payload: {}", e)))?;

        let Value::Array(entries) = payload else {
            warn!(project = %repo.path(), "Tree listing is not an array, treating as empty");
            return Ok(Vec::new());
        };

        Ok(entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<GitLabTreeEntry>(entry).ok())
            .filter(|entry| entry.kind.as_deref() != Some("tree"))
            .map(|entry| {
                let raw_url = format!(
                    "{}/projects/{}/repository/files/{}/raw",
                    api_base,
                    project,
                    encode_path_component(&entry.path)
                );
                FileCandidate::new(entry.name, raw_url)
            })
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

        response.text().await.map_err(FairError::from_reqwest)
    }
}
