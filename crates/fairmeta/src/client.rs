//! Analysis entry points
//!
//! [`analyze`] runs the whole pipeline for one repository: collect the
//! prompt content, call the model once, repair its reply and normalize the
//! result. Platform logic lives in the [`collectors`](crate::collectors)
//! module.

use crate::collectors::CollectorRegistry;
use crate::error::FairError;
use crate::llm::LlmClient;
use crate::normalize::normalize;
use crate::repair::RepairPipeline;
use crate::types::{AnalysisResponse, ParseOutcome, Platform, PromptContent, RawModelReply};
use crate::{DEFAULT_GITHUB_API_BASE, DEFAULT_LLM_ENDPOINT, DEFAULT_LLM_MODEL};
use tracing::{info, warn};

/// Analysis options that can be configured via tool builder
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Custom User-Agent
    pub user_agent: Option<String>,
    /// GitHub token, sent as `Authorization: token <t>`
    pub github_token: Option<String>,
    /// GitLab token, sent as `Authorization: Bearer <t>`
    pub gitlab_token: Option<String>,
    /// GitHub API base URL (GitHub Enterprise, tests)
    pub github_api_base: Option<String>,
    /// Inference endpoint URL
    pub llm_endpoint: Option<String>,
    /// Model name sent with every prompt
    pub llm_model: Option<String>,
}

impl AnalyzeOptions {
    /// Credential for a platform, if one was configured
    pub fn token_for(&self, platform: Platform) -> Option<&str> {
        let token = match platform {
            Platform::GitHub => self.github_token.as_deref(),
            Platform::GitLab => self.gitlab_token.as_deref(),
        };
        token.filter(|t| !t.trim().is_empty())
    }

    pub fn github_api_base(&self) -> &str {
        self.github_api_base
            .as_deref()
            .unwrap_or(DEFAULT_GITHUB_API_BASE)
    }

    pub fn llm_endpoint(&self) -> &str {
        self.llm_endpoint.as_deref().unwrap_or(DEFAULT_LLM_ENDPOINT)
    }

    pub fn llm_model(&self) -> &str {
        self.llm_model.as_deref().unwrap_or(DEFAULT_LLM_MODEL)
    }
}

/// Collect the prompt content for a repository without calling the model
pub async fn collect(
    repository_url: &str,
    options: &AnalyzeOptions,
) -> Result<PromptContent, FairError> {
    CollectorRegistry::with_defaults()
        .collect(repository_url, options)
        .await
}

/// Analyze a repository with default options
///
/// The model endpoint and name fall back to [`DEFAULT_LLM_ENDPOINT`] and
/// [`DEFAULT_LLM_MODEL`]. For credentials or overrides, use
/// [`analyze_with_options`].
pub async fn analyze(repository_url: &str) -> Result<AnalysisResponse, FairError> {
    analyze_with_options(repository_url, &AnalyzeOptions::default()).await
}

/// Analyze a repository with custom options
///
/// Errors are limited to URL validation, the root listing and the model
/// call. A reply that cannot be parsed is not an error: it comes back as a
/// response with `success: false` carrying the raw reply.
pub async fn analyze_with_options(
    repository_url: &str,
    options: &AnalyzeOptions,
) -> Result<AnalysisResponse, FairError> {
    let content = collect(repository_url, options).await?;
    let reply = infer_reply(repository_url, &content, options).await?;
    Ok(response_from_reply(&reply))
}

/// Send the collected content to the model, even when nothing was recognized
pub(crate) async fn infer_reply(
    repository_url: &str,
    content: &PromptContent,
    options: &AnalyzeOptions,
) -> Result<RawModelReply, FairError> {
    if content.is_empty() {
        warn!(url = repository_url, "No recognized files found, prompting with empty content");
    }

    let llm = LlmClient::from_options(options)?;
    llm.infer(&content.text()).await
}

/// Repair and normalize a model reply into the presentation contract
pub fn response_from_reply(reply: &RawModelReply) -> AnalysisResponse {
    match RepairPipeline::with_defaults().repair(reply) {
        ParseOutcome::Success(parsed) => {
            let record = normalize(parsed.as_map());
            info!(fields = record.len(), "Extracted metadata");
            AnalysisResponse::metadata(record)
        }
        ParseOutcome::Failure {
            message,
            raw_response,
        } => AnalysisResponse::parsing_error(message, raw_response),
    }
}
