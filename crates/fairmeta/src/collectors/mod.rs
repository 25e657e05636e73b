//! Repository content collection
//!
//! Design: each collector knows one hosting platform's API (how to resolve a
//! repository, list its root and fetch a file). The selection of files is
//! shared: [`CollectorRegistry`] classifies listed files by name, fills one
//! bucket of at most two formatted files per category in listing order, and
//! stops scanning as soon as every bucket is full.

mod github;
mod gitlab;

pub use github::GitHubCollector;
pub use gitlab::GitLabCollector;

use crate::client::AnalyzeOptions;
use crate::error::FairError;
use crate::format::format_file_content;
use crate::types::{CategoryBuckets, FileCandidate, FileCategory, PromptContent, RepositoryReference};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Timeout for repository API requests
const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-request state shared by collector calls
pub struct CollectContext<'a> {
    /// HTTP client with timeouts and User-Agent applied
    pub http: reqwest::Client,
    /// Caller options (credentials, API base overrides)
    pub options: &'a AnalyzeOptions,
}

impl<'a> CollectContext<'a> {
    /// Build a context with a fresh HTTP client
    pub fn new(options: &'a AnalyzeOptions) -> Result<Self, FairError> {
        let user_agent = options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(API_TIMEOUT)
            .timeout(API_TIMEOUT)
            .build()
            .map_err(FairError::ClientBuildError)?;

        Ok(Self { http, options })
    }
}

/// Trait for platform-specific repository collectors
#[async_trait]
pub trait Collector: Send + Sync {
    /// Unique identifier for this collector (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Returns true if this collector handles the given repository URL
    fn matches(&self, url: &Url) -> bool;

    /// Resolve the repository the URL points at
    ///
    /// Fails only when the URL does not name a repository.
    async fn resolve(
        &self,
        url: &Url,
        ctx: &CollectContext<'_>,
    ) -> Result<RepositoryReference, FairError>;

    /// List the files at the repository root, in API order
    ///
    /// A failure here aborts the whole collection.
    async fn list_files(
        &self,
        repo: &RepositoryReference,
        ctx: &CollectContext<'_>,
    ) -> Result<Vec<FileCandidate>, FairError>;

    /// Fetch the decoded text of one file
    ///
    /// Errors are treated by the caller as the file being absent.
    async fn fetch_file(
        &self,
        repo: &RepositoryReference,
        file: &FileCandidate,
        ctx: &CollectContext<'_>,
    ) -> Result<String, FairError>;
}

/// Registry of collectors that dispatches on the repository URL
pub struct CollectorRegistry {
    collectors: Vec<Box<dyn Collector>>,
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            collectors: Vec::new(),
        }
    }

    /// Create a registry with GitHub and GitLab collectors
    ///
    /// GitHub is registered first; GitLab accepts any other host.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(GitHubCollector::new()));
        registry.register(Box::new(GitLabCollector::new()));
        registry
    }

    /// Register a collector; earlier registrations take priority
    pub fn register(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    /// Find the collector for a URL, validating it first
    ///
    /// Runs before any network call so malformed URLs are rejected cheaply.
    pub fn dispatch(&self, repository_url: &str) -> Result<(&dyn Collector, Url), FairError> {
        let trimmed = repository_url.trim();
        if trimmed.is_empty() {
            return Err(FairError::MissingUrl);
        }

        let url = Url::parse(trimmed)
            .map_err(|_| FairError::InvalidRepositoryUrl(trimmed.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(FairError::InvalidRepositoryUrl(trimmed.to_string()));
        }

        self.collectors
            .iter()
            .find(|collector| collector.matches(&url))
            .map(|collector| (collector.as_ref(), url))
            .ok_or_else(|| FairError::InvalidRepositoryUrl(trimmed.to_string()))
    }

    /// Collect the prompt content for a repository
    pub async fn collect(
        &self,
        repository_url: &str,
        options: &AnalyzeOptions,
    ) -> Result<PromptContent, FairError> {
        let (collector, url) = self.dispatch(repository_url)?;
        debug!(collector = collector.name(), url = %url, "Using collector");

        let ctx = CollectContext::new(options)?;
        let repo = collector.resolve(&url, &ctx).await?;
        let files = collector.list_files(&repo, &ctx).await?;
        debug!(repository = %repo, files = files.len(), "Fetched root listing");

        let content = scan_files(collector, &repo, &files, &ctx).await;
        info!(
            repository = %repo,
            platform = %repo.platform(),
            scanned = content.files_scanned(),
            readme = content.bucket(FileCategory::Readme).len(),
            dependency = content.bucket(FileCategory::Dependency).len(),
            license = content.bucket(FileCategory::License).len(),
            citation = content.bucket(FileCategory::Citation).len(),
            "Collected repository content"
        );
        Ok(content)
    }
}

/// Fill the category buckets from a listing, in listing order
pub async fn scan_files(
    collector: &dyn Collector,
    repo: &RepositoryReference,
    files: &[FileCandidate],
    ctx: &CollectContext<'_>,
) -> PromptContent {
    let mut buckets = CategoryBuckets::new();
    let mut scanned = 0;

    for file in files {
        if buckets.all_full() {
            debug!(repository = %repo, scanned, "All buckets full, stopping scan");
            break;
        }
        scanned += 1;

        let Some(category) = file.category else {
            continue;
        };
        if buckets.get(category).is_full() {
            continue;
        }

        match collector.fetch_file(repo, file, ctx).await {
            Ok(raw) => {
                let formatted = format_file_content(&file.name, &raw);
                if formatted.is_empty() {
                    debug!(file = %file.name, "Skipping empty file");
                } else {
                    debug!(file = %file.name, %category, "Added file to bucket");
                    buckets.get_mut(category).push(formatted);
                }
            }
            Err(e) => {
                warn!(file = %file.name, error = %e, "File fetch failed, treating as absent");
            }
        }
    }

    PromptContent::new(buckets, scanned)
}

/// Percent-encode a value for use as a single URL path segment
pub(crate) fn encode_path_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
