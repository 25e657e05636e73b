//! Tool builder and contract for FairMeta

use crate::client::{
    analyze_with_options, collect, infer_reply, response_from_reply, AnalyzeOptions,
};
use crate::collectors::CollectorRegistry;
use crate::error::FairError;
use crate::types::{AnalysisResponse, AnalyzeRequest};
use crate::{TOOL_DESCRIPTION, TOOL_LLMTXT};
use schemars::schema_for;
use serde::{Deserialize, Serialize};

/// Status update during tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStatus {
    /// Current phase ("validate", "collect", "infer", "repair", "complete")
    pub phase: String,
    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Estimated completion percentage (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_complete: Option<f32>,
}

impl ToolStatus {
    /// Create a new status with phase
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            message: None,
            percent_complete: None,
        }
    }

    /// Set message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set completion percentage
    pub fn with_percent(mut self, percent: f32) -> Self {
        self.percent_complete = Some(percent);
        self
    }
}

/// Builder for configuring the FairMeta tool
#[derive(Debug, Clone, Default)]
pub struct ToolBuilder {
    options: AnalyzeOptions,
}

impl ToolBuilder {
    /// Create a new tool builder with default endpoints and no credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.options.user_agent = Some(ua.into());
        self
    }

    /// Set GitHub token
    pub fn github_token(mut self, token: impl Into<String>) -> Self {
        self.options.github_token = Some(token.into());
        self
    }

    /// Set GitLab token
    pub fn gitlab_token(mut self, token: impl Into<String>) -> Self {
        self.options.gitlab_token = Some(token.into());
        self
    }

    /// Override the GitHub API base URL
    pub fn github_api_base(mut self, base: impl Into<String>) -> Self {
        self.options.github_api_base = Some(base.into());
        self
    }

    /// Set the inference endpoint
    pub fn llm_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.options.llm_endpoint = Some(endpoint.into());
        self
    }

    /// Set the model name
    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.options.llm_model = Some(model.into());
        self
    }

    /// Build the tool
    pub fn build(self) -> Tool {
        Tool {
            options: self.options,
        }
    }
}

/// Configured FairMeta tool
#[derive(Debug, Clone, Default)]
pub struct Tool {
    options: AnalyzeOptions,
}

impl Tool {
    /// Create a new tool builder
    pub fn builder() -> ToolBuilder {
        ToolBuilder::new()
    }

    /// Options every request is run with
    pub fn options(&self) -> &AnalyzeOptions {
        &self.options
    }

    /// Get tool description
    pub fn description(&self) -> &'static str {
        TOOL_DESCRIPTION
    }

    /// Get full documentation (llmtxt)
    pub fn llmtxt(&self) -> &'static str {
        TOOL_LLMTXT
    }

    /// Get input schema as JSON
    pub fn input_schema(&self) -> serde_json::Value {
        let schema = schema_for!(AnalyzeRequest);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Get output schema as JSON
    pub fn output_schema(&self) -> serde_json::Value {
        let schema = schema_for!(AnalysisResponse);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Execute the tool with the given request
    pub async fn execute(&self, req: AnalyzeRequest) -> Result<AnalysisResponse, FairError> {
        analyze_with_options(&req.url, &self.options).await
    }

    /// Execute the tool with status updates
    pub async fn execute_with_status<F>(
        &self,
        req: AnalyzeRequest,
        mut status_callback: F,
    ) -> Result<AnalysisResponse, FairError>
    where
        F: FnMut(ToolStatus),
    {
        status_callback(ToolStatus::new("validate").with_percent(0.0));

        let registry = CollectorRegistry::with_defaults();
        let (collector, _) = registry.dispatch(&req.url)?;

        status_callback(
            ToolStatus::new("collect")
                .with_message(format!("Reading {} repository", collector.name()))
                .with_percent(10.0),
        );

        let content = collect(&req.url, &self.options).await?;

        status_callback(
            ToolStatus::new("infer")
                .with_message(format!("{} files scanned", content.files_scanned()))
                .with_percent(40.0),
        );

        let reply = infer_reply(&req.url, &content, &self.options).await?;

        status_callback(ToolStatus::new("repair").with_percent(90.0));

        let response = response_from_reply(&reply);

        status_callback(ToolStatus::new("complete").with_percent(100.0));

        Ok(response)
    }
}
