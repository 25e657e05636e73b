//! Error types for FairMeta

use thiserror::Error;

/// Errors that abort an analysis request
///
/// Per-file fetch failures and malformed model replies are not represented
/// here: the former are treated as absent files, the latter end up as a
/// [`ParseOutcome::Failure`](crate::ParseOutcome::Failure) value.
#[derive(Debug, Error)]
pub enum FairError {
    /// Repository URL is missing
    #[error("Repository URL is required")]
    MissingUrl,

    /// Repository URL could not be resolved to a GitHub or GitLab project
    #[error("Invalid repository URL: {0}")]
    InvalidRepositoryUrl(String),

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Repository root listing could not be fetched
    #[error("Failed to fetch contents for {repository}: {reason}")]
    ListingFetch { repository: String, reason: String },

    /// LLM endpoint answered with a non-success status
    #[error("LLM API request failed with status {status}: {body}")]
    LlmTransport { status: u16, body: String },

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),
}

impl FairError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FairError::Timeout
        } else {
            FairError::RequestError(err.to_string())
        }
    }

    /// HTTP-style status to report for this error at a request boundary
    pub fn http_status(&self) -> u16 {
        match self {
            FairError::MissingUrl | FairError::InvalidRepositoryUrl(_) => 400,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FairError::MissingUrl.to_string(),
            "Repository URL is required"
        );
        assert_eq!(
            FairError::InvalidRepositoryUrl("ftp://x".to_string()).to_string(),
            "Invalid repository URL: ftp://x"
        );
        assert_eq!(
            FairError::ListingFetch {
                repository: "owner/repo".to_string(),
                reason: "HTTP 404".to_string(),
            }
            .to_string(),
            "Failed to fetch contents for owner/repo: HTTP 404"
        );
        assert_eq!(
            FairError::LlmTransport {
                status: 503,
                body: "overloaded".to_string(),
            }
            .to_string(),
            "LLM API request failed with status 503: overloaded"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(FairError::MissingUrl.http_status(), 400);
        assert_eq!(
            FairError::InvalidRepositoryUrl(String::new()).http_status(),
            400
        );
        assert_eq!(FairError::Timeout.http_status(), 500);
        assert_eq!(
            FairError::LlmTransport {
                status: 502,
                body: String::new(),
            }
            .http_status(),
            500
        );
    }
}
