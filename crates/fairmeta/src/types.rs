//! Core types for FairMeta

use crate::vocab;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Maximum number of files kept per category
pub const BUCKET_CAPACITY: usize = 2;

/// Repository hosting platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// github.com
    GitHub,
    /// Any GitLab instance (gitlab.com or self-hosted)
    GitLab,
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(Platform::GitHub),
            "gitlab" => Ok(Platform::GitLab),
            _ => Err("Invalid platform: must be github or gitlab".to_string()),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::GitHub => write!(f, "github"),
            Platform::GitLab => write!(f, "gitlab"),
        }
    }
}

/// A resolved repository
///
/// Built once by a collector from the repository URL and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryReference {
    platform: Platform,
    origin: String,
    segments: Vec<String>,
    project_id: Option<String>,
}

impl RepositoryReference {
    /// Create a reference from the URL origin and path segments
    pub fn new(platform: Platform, origin: impl Into<String>, segments: Vec<String>) -> Self {
        Self {
            platform,
            origin: origin.into(),
            segments,
            project_id: None,
        }
    }

    /// Attach the GitLab project identifier (numeric id or encoded path)
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Scheme and host of the repository URL, e.g. `https://gitlab.com`
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Slash-joined repository path, e.g. `owner/repo` or `group/sub/project`
    pub fn path(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Semantic role of a candidate file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Readme,
    License,
    Dependency,
    Citation,
}

impl FileCategory {
    /// Categories in the order their contents appear in the prompt
    pub const PROMPT_ORDER: [FileCategory; 4] = [
        FileCategory::Readme,
        FileCategory::Dependency,
        FileCategory::License,
        FileCategory::Citation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Readme => "readme",
            FileCategory::License => "license",
            FileCategory::Dependency => "dependency",
            FileCategory::Citation => "citation",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file from the repository root listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    /// File name as listed
    pub name: String,
    /// URL the content is fetched from
    pub locator: String,
    /// Category inferred from the name, if any
    pub category: Option<FileCategory>,
}

impl FileCandidate {
    /// Create a candidate, classifying it by name
    pub fn new(name: impl Into<String>, locator: impl Into<String>) -> Self {
        let name = name.into();
        let category = vocab::classify(&name);
        Self {
            name,
            locator: locator.into(),
            category,
        }
    }
}

/// Formatted file contents of one category, in listing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryBucket {
    entries: Vec<String>,
}

impl CategoryBucket {
    /// Append content unless the bucket is full; returns whether it was kept
    pub fn push(&mut self, content: String) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push(content);
        true
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= BUCKET_CAPACITY
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// One bucket per category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryBuckets {
    readme: CategoryBucket,
    license: CategoryBucket,
    dependency: CategoryBucket,
    citation: CategoryBucket,
}

impl CategoryBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: FileCategory) -> &CategoryBucket {
        match category {
            FileCategory::Readme => &self.readme,
            FileCategory::License => &self.license,
            FileCategory::Dependency => &self.dependency,
            FileCategory::Citation => &self.citation,
        }
    }

    pub fn get_mut(&mut self, category: FileCategory) -> &mut CategoryBucket {
        match category {
            FileCategory::Readme => &mut self.readme,
            FileCategory::License => &mut self.license,
            FileCategory::Dependency => &mut self.dependency,
            FileCategory::Citation => &mut self.citation,
        }
    }

    /// True once every category holds [`BUCKET_CAPACITY`] entries
    pub fn all_full(&self) -> bool {
        FileCategory::PROMPT_ORDER
            .iter()
            .all(|category| self.get(*category).is_full())
    }
}

/// Text handed to the language model, with the buckets it was built from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContent {
    buckets: CategoryBuckets,
    files_scanned: usize,
}

impl PromptContent {
    pub fn new(buckets: CategoryBuckets, files_scanned: usize) -> Self {
        Self {
            buckets,
            files_scanned,
        }
    }

    /// Non-empty bucket entries in prompt order, joined by a single space
    pub fn text(&self) -> String {
        FileCategory::PROMPT_ORDER
            .iter()
            .flat_map(|category| self.buckets.get(*category).entries())
            .filter(|entry| !entry.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn bucket(&self, category: FileCategory) -> &CategoryBucket {
        self.buckets.get(category)
    }

    /// Number of listing entries examined before scanning stopped
    pub fn files_scanned(&self) -> usize {
        self.files_scanned
    }

    pub fn is_empty(&self) -> bool {
        FileCategory::PROMPT_ORDER
            .iter()
            .all(|category| self.buckets.get(*category).is_empty())
    }
}

impl fmt::Display for PromptContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Reply payload returned by the inference service
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelReply {
    /// No usable payload
    Absent,
    /// Free text that is expected, but not guaranteed, to be JSON
    Text(String),
    /// Already-structured payload
    Structured(Value),
}

impl RawModelReply {
    /// The reply as text, for repair tiers and error display
    pub fn raw_text(&self) -> String {
        match self {
            RawModelReply::Absent => String::new(),
            RawModelReply::Text(text) => text.clone(),
            RawModelReply::Structured(value) => value.to_string(),
        }
    }
}

impl From<&str> for RawModelReply {
    fn from(text: &str) -> Self {
        RawModelReply::Text(text.to_string())
    }
}

impl From<String> for RawModelReply {
    fn from(text: String) -> Self {
        RawModelReply::Text(text)
    }
}

/// Field name to value mapping produced by repair and normalization
///
/// After normalization every recognized field holds either a sequence of
/// non-empty strings or a "No ... information available" sentinel string.
/// Key order follows the model's reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MetadataRecord(Map<String, Value>);

impl MetadataRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Sequence value of a field, if it holds one
    pub fn list(&self, field: &str) -> Option<Vec<&str>> {
        self.0
            .get(field)?
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_str).collect())
    }

    /// String value of a field, if it holds one
    pub fn text(&self, field: &str) -> Option<&str> {
        self.0.get(field)?.as_str()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for MetadataRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Result of running the repair pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A parsed object, not yet normalized
    Success(MetadataRecord),
    /// Every tier failed; the raw reply is kept for display
    Failure {
        message: String,
        raw_response: String,
    },
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ParseOutcome::Success(_))
    }
}

/// Request to analyze a repository
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeRequest {
    /// GitHub or GitLab repository URL (required)
    pub url: String,
}

impl AnalyzeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Payload shown when the model reply could not be parsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsingErrorData {
    /// Always true
    pub parsing_error: bool,
    /// User-facing explanation
    pub message: String,
    /// Model reply as received, with line endings tidied for display
    pub raw_response: String,
}

/// Data member of an [`AnalysisResponse`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AnalysisData {
    ParsingError(ParsingErrorData),
    Metadata(MetadataRecord),
}

/// Response handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResponse {
    /// True when metadata was extracted
    pub success: bool,
    /// Normalized metadata, or the parsing error details
    pub data: AnalysisData,
}

impl AnalysisResponse {
    pub fn metadata(record: MetadataRecord) -> Self {
        Self {
            success: true,
            data: AnalysisData::Metadata(record),
        }
    }

    pub fn parsing_error(message: impl Into<String>, raw_response: impl Into<String>) -> Self {
        Self {
            success: false,
            data: AnalysisData::ParsingError(ParsingErrorData {
                parsing_error: true,
                message: message.into(),
                raw_response: raw_response.into(),
            }),
        }
    }

    /// The normalized record, if extraction succeeded
    pub fn record(&self) -> Option<&MetadataRecord> {
        match &self.data {
            AnalysisData::Metadata(record) => Some(record),
            AnalysisData::ParsingError(_) => None,
        }
    }
}
