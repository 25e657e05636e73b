//! FairMeta - research software metadata extraction
//!
//! This crate turns a GitHub or GitLab repository URL into a normalized
//! metadata record (authors, license, DOI, dependencies, ...) by feeding a
//! bounded selection of the repository's files to a language model.
//!
//! ## Pipeline
//!
//! 1. A [`Collector`] lists the repository root and fills four category
//!    buckets (readme, dependency, license, citation), each capped at two
//!    files, formatted into one prompt ([`PromptContent`]).
//! 2. [`LlmClient`] sends the prompt to the inference endpoint.
//! 3. [`RepairPipeline`] recovers a JSON object from the reply, tier by
//!    tier, or gives up with the raw text.
//! 4. [`normalize`] maps the object to a canonical [`MetadataRecord`].
//!
//! Built-in collectors:
//! - [`GitHubCollector`] - github.com via the contents API
//! - [`GitLabCollector`] - gitlab.com and self-hosted instances
//!
//! ## Example
//!
//! ```no_run
//! # async fn run() -> Result<(), fairmeta::FairError> {
//! let response = fairmeta::analyze("https://github.com/owner/repo").await?;
//! if let Some(record) = response.record() {
//!     println!("{:?}", record.list("Authors"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod collectors;
mod error;
pub mod format;
pub mod llm;
pub mod normalize;
pub mod repair;
mod tool;
mod types;
pub mod vocab;

pub use client::{analyze, analyze_with_options, collect, response_from_reply, AnalyzeOptions};
pub use collectors::{
    CollectContext, Collector, CollectorRegistry, GitHubCollector, GitLabCollector,
};
pub use error::FairError;
pub use format::format_file_content;
pub use llm::{interpret_reply, LlmClient};
pub use normalize::{coerce_array, normalize};
pub use repair::{repair, RepairError, RepairPipeline, RepairStrategy};
pub use tool::{Tool, ToolBuilder, ToolStatus};
pub use types::{
    AnalysisData, AnalysisResponse, AnalyzeRequest, CategoryBucket, CategoryBuckets,
    FileCandidate, FileCategory, MetadataRecord, ParseOutcome, ParsingErrorData, Platform,
    PromptContent, RawModelReply, RepositoryReference, BUCKET_CAPACITY,
};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "FairMeta/1.0";

/// Default inference endpoint
pub const DEFAULT_LLM_ENDPOINT: &str = "http://127.0.0.1:8000/generate_ollama_response";

/// Default model name sent with every prompt
pub const DEFAULT_LLM_MODEL: &str = "metadata-extractor";

/// Default GitHub REST API base
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

/// Tool description for LLM consumption
pub const TOOL_DESCRIPTION: &str = r#"Extracts research software metadata from a GitHub or GitLab repository.

- Reads README, dependency manifests, license and citation files
- Asks a language model for structured metadata
- Repairs malformed model output and normalizes list fields
- Returns the raw model reply when it cannot be parsed"#;

/// Extended documentation for LLM consumption (llmtxt)
pub const TOOL_LLMTXT: &str = r#"# FairMeta Tool

Extracts research software metadata from a public GitHub or GitLab repository.

## Capabilities
- GitHub (github.com) and GitLab (gitlab.com or self-hosted) repositories
- Reads up to two files each of: README, dependency manifest, license, citation
- Single language model call per repository
- Tolerant parsing of malformed JSON replies (trailing commas, unquoted DOI, prose around JSON)
- List fields normalized to arrays of strings

## Input Parameters
- `url` (required): Repository URL (must be http:// or https://)

## Output Fields
- `success`: true when metadata was extracted
- `data`: on success, the metadata record:
  - `Authors`, `Contributors`, `Keywords`, `Dependencies`, `Funding`, `DOI`,
    `InstallationInstructions`: arrays of strings
  - other fields as returned by the model
  - missing values read "No <field> information available"
- `data`: on failure, `{"parsingError": true, "message": ..., "rawResponse": ...}`

## Examples

### Analyze a GitHub repository
```json
{"url": "https://github.com/owner/repo"}
```

### Analyze a self-hosted GitLab project
```json
{"url": "https://gitlab.example.org/group/subgroup/project"}
```

## Error Handling
- Invalid or unsupported URLs return an error before any request is made
- A repository whose file listing cannot be fetched returns an error
- Files that cannot be fetched are skipped
- Model endpoint errors are returned with their HTTP status
"#;
