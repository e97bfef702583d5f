//! Optional AI summary of note content.
//!
//! The provider is any endpoint accepting `{"inputs": "..."}` and answering
//! with `[{"summary_text": "..."}]`. Failures here never touch the note store.

use reqwest::{header, Client, Request, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ClientConfig;
use crate::util::{compact_text, normalize_base_url, normalize_text_option};

#[derive(Clone, Debug, PartialEq, Eq)]
enum SummaryMode {
    Disabled,
    Remote {
        endpoint: String,
        api_key: Option<String>,
    },
}

/// Errors from summary configuration and requests.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Summaries are not configured. Set NOTEIFY_SUMMARY_URL to enable them.")]
    NotConfigured,
    #[error("Invalid summary request: {0}")]
    InvalidInput(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Summary API error: {0}")]
    Api(String),
    #[error("Unexpected summary response: {0}")]
    InvalidPayload(String),
}

type SummaryResult<T> = Result<T, SummaryError>;

#[derive(Clone)]
pub struct SummaryClient {
    client: Client,
    mode: SummaryMode,
}

impl std::fmt::Debug for SummaryClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let endpoint = match &self.mode {
            SummaryMode::Disabled => None,
            SummaryMode::Remote { endpoint, .. } => Some(endpoint.as_str()),
        };
        formatter
            .debug_struct("SummaryClient")
            .field("endpoint", &endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct SummaryRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize)]
struct SummaryItem {
    summary_text: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SummaryResponse {
    Items(Vec<SummaryItem>),
    Failure { error: serde_json::Value },
}

impl SummaryClient {
    /// Build a client for `endpoint`, authenticating with `api_key` when given.
    pub fn new(endpoint: &str, api_key: Option<String>) -> SummaryResult<Self> {
        let endpoint = normalize_base_url(endpoint).ok_or(SummaryError::InvalidInput(
            "summary endpoint must start with http:// or https://",
        ))?;
        Ok(Self {
            client: Client::builder().build()?,
            mode: SummaryMode::Remote {
                endpoint,
                api_key: normalize_text_option(api_key),
            },
        })
    }

    /// A client that reports [`SummaryError::NotConfigured`] for every call.
    pub fn disabled() -> SummaryResult<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            mode: SummaryMode::Disabled,
        })
    }

    pub fn from_config(config: &ClientConfig) -> SummaryResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let mode = match &config.summary_url {
            Some(endpoint) => SummaryMode::Remote {
                endpoint: endpoint.clone(),
                api_key: config.summary_api_key.clone(),
            },
            None => SummaryMode::Disabled,
        };
        Ok(Self { client, mode })
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.mode != SummaryMode::Disabled
    }

    /// Summarize note content.
    pub async fn summarize(&self, content: &str) -> SummaryResult<String> {
        let request = self.build_summary_request(content)?;
        let response = self.client.execute(request).await?;
        let status = response.status();
        tracing::debug!(%status, "Summary response");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SummaryError::Api(
                "Unauthorized summary request (check NOTEIFY_SUMMARY_API_KEY)".to_string(),
            ));
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(SummaryError::Api(format!(
                "Summary request failed with {status}: {}",
                compact_text(&body)
            )));
        }
        parse_summary_body(&body)
    }

    fn build_summary_request(&self, content: &str) -> SummaryResult<Request> {
        let (endpoint, api_key) = match &self.mode {
            SummaryMode::Disabled => return Err(SummaryError::NotConfigured),
            SummaryMode::Remote { endpoint, api_key } => (endpoint, api_key),
        };
        if content.trim().is_empty() {
            return Err(SummaryError::InvalidInput("note content must not be empty"));
        }

        let mut builder = self
            .client
            .post(endpoint)
            .header(header::ACCEPT, "application/json")
            .json(&SummaryRequest { inputs: content });
        if let Some(api_key) = api_key {
            builder = builder.bearer_auth(api_key);
        }
        Ok(builder.build()?)
    }
}

fn parse_summary_body(body: &str) -> SummaryResult<String> {
    let response: SummaryResponse = serde_json::from_str(body)
        .map_err(|error| SummaryError::InvalidPayload(error.to_string()))?;
    match response {
        SummaryResponse::Failure { error } => {
            let message = error
                .as_str()
                .map_or_else(|| error.to_string(), ToString::to_string);
            Err(SummaryError::Api(message))
        }
        SummaryResponse::Items(items) => items
            .into_iter()
            .next()
            .and_then(|item| item.summary_text)
            .map(|summary| summary.trim().to_string())
            .filter(|summary| !summary.is_empty())
            .ok_or_else(|| SummaryError::InvalidPayload("missing summary_text".to_string())),
    }
}
