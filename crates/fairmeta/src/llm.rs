//! Inference service client
//!
//! The service takes `{"prompt": ..., "model": ...}` and answers either
//! `{"response": "<text>"}` or `{"data": {...}}`.

use crate::client::AnalyzeOptions;
use crate::error::FairError;
use crate::types::RawModelReply;
use crate::DEFAULT_USER_AGENT;
use reqwest::header::{HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Total timeout for one inference call
const LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// Connect timeout for the inference endpoint
const LLM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    prompt: &'a str,
    model: &'a str,
}

/// Client for the metadata extraction model
#[derive(Debug, Clone)]
pub struct LlmClient {
    endpoint: String,
    model: String,
    user_agent: String,
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a client for the given endpoint and model
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, FairError> {
        let http = reqwest::Client::builder()
            .connect_timeout(LLM_CONNECT_TIMEOUT)
            .timeout(LLM_TIMEOUT)
            .build()
            .map_err(FairError::ClientBuildError)?;

        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http,
        })
    }

    /// Create a client from analysis options, falling back to defaults
    pub fn from_options(options: &AnalyzeOptions) -> Result<Self, FairError> {
        let mut client = Self::new(options.llm_endpoint(), options.llm_model())?;
        if let Some(ua) = &options.user_agent {
            client.user_agent = ua.clone();
        }
        Ok(client)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send the prompt and return the model's reply
    ///
    /// A non-success status is fatal and carries the response body.
    pub async fn infer(&self, prompt: &str) -> Result<RawModelReply, FairError> {
        debug!(endpoint = %self.endpoint, model = %self.model, prompt_len = prompt.len(), "Calling LLM");

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(
                USER_AGENT,
                HeaderValue::from_str(&self.user_agent)
                    .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
            )
            .json(&InferenceRequest {
                prompt,
                model: &self.model,
            })
            .send()
            .await
            .map_err(FairError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(FairError::from_reqwest)?;

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "LLM API error");
            return Err(FairError::LlmTransport {
                status: status.as_u16(),
                body,
            });
        }

        debug!(body_len = body.len(), "LLM API response received");
        Ok(interpret_reply(&body))
    }
}

/// Interpret the service's response body
///
/// - `{"response": "<text>"}` yields the text
/// - `{"data": {...}}` yields the object
/// - any other JSON object is itself the reply
/// - a body that is not JSON is passed on as text
pub fn interpret_reply(body: &str) -> RawModelReply {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(mut envelope)) => {
            if let Some(Value::String(text)) = envelope.get("response") {
                return RawModelReply::Text(text.clone());
            }
            if matches!(envelope.get("data"), Some(Value::Object(_))) {
                if let Some(data) = envelope.remove("data") {
                    return RawModelReply::Structured(data);
                }
            }
            RawModelReply::Structured(Value::Object(envelope))
        }
        Ok(Value::Null) => RawModelReply::Absent,
        Ok(Value::String(text)) => RawModelReply::Text(text),
        Ok(other) => RawModelReply::Structured(other),
        Err(_) if body.trim().is_empty() => RawModelReply::Absent,
        Err(_) => RawModelReply::Text(body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpret_text_reply() {
        let body = json!({"response": "{\"Authors\": \"A\"}"}).to_string();
        assert_eq!(
            interpret_reply(&body),
            RawModelReply::Text("{\"Authors\": \"A\"}".to_string())
        );
    }

    #[test]
    fn test_interpret_data_reply() {
        let body = json!({"data": {"License": "MIT"}}).to_string();
        assert_eq!(
            interpret_reply(&body),
            RawModelReply::Structured(json!({"License": "MIT"}))
        );
    }

    #[test]
    fn test_interpret_bare_object() {
        let body = json!({"Authors": ["A"]}).to_string();
        assert_eq!(
            interpret_reply(&body),
            RawModelReply::Structured(json!({"Authors": ["A"]}))
        );
    }

    #[test]
    fn test_interpret_non_json_body() {
        assert_eq!(
            interpret_reply("Sorry, I cannot help."),
            RawModelReply::Text("Sorry, I cannot help.".to_string())
        );
        assert_eq!(interpret_reply("   "), RawModelReply::Absent);
        assert_eq!(interpret_reply("null"), RawModelReply::Absent);
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(InferenceRequest {
            prompt: "text",
            model: "metadata-extractor",
        })
        .unwrap();
        assert_eq!(body, json!({"prompt": "text", "model": "metadata-extractor"}));
    }

    #[test]
    fn test_client_from_options() {
        let options = AnalyzeOptions {
            llm_endpoint: Some("http://localhost:9000/generate".to_string()),
            ..Default::default()
        };
        let client = LlmClient::from_options(&options).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9000/generate");
        assert_eq!(client.model(), crate::DEFAULT_LLM_MODEL);
    }
}
