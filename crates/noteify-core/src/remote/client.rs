//! HTTP client for the REST notes API.

use std::sync::Arc;

use reqwest::{header, Method, Request, Response};
use serde::Serialize;

use super::error::{ApiError, ApiResult};
use super::{NotesApi, TokenProvider};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{NewNote, Note, NoteId, NotePatch};
use crate::util::{normalize_base_url, normalize_text_option};

/// Authenticated adapter for `GET/POST /notes` and `PUT/DELETE /notes/{id}`.
#[derive(Clone)]
pub struct RemoteNotesClient {
    base_url: String,
    client: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for RemoteNotesClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RemoteNotesClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RemoteNotesClient {
    /// Builds a client for an explicit API base URL.
    pub fn new(base_url: impl AsRef<str>, tokens: impl TokenProvider + 'static) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(ApiError::from)?;
        Self::with_http_client(base_url, client, tokens)
    }

    /// Builds a client from runtime configuration, applying its request timeout.
    pub fn from_config(
        config: &ClientConfig,
        tokens: impl TokenProvider + 'static,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ApiError::from)?;
        Self::with_http_client(&config.api_base_url, client, tokens)
    }

    fn with_http_client(
        base_url: impl AsRef<str>,
        client: reqwest::Client,
        tokens: impl TokenProvider + 'static,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url.as_ref()).ok_or_else(|| {
            Error::InvalidInput("API base URL must include http:// or https://".to_string())
        })?;
        Ok(Self {
            base_url,
            client,
            tokens: Arc::new(tokens),
        })
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn notes_url(&self) -> String {
        format!("{}/notes", self.base_url)
    }

    fn note_url(&self, id: &NoteId) -> String {
        format!("{}/notes/{}", self.base_url, urlencoding::encode(id.as_str()))
    }

    fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: String,
        body: Option<&B>,
    ) -> ApiResult<Request> {
        let token = normalize_text_option(self.tokens.token()).ok_or_else(|| {
            ApiError::unauthorized("No access token available; sign in again")
        })?;

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        request.build().map_err(ApiError::from)
    }

    async fn execute(&self, request: Request) -> ApiResult<Response> {
        let method = request.method().clone();
        let url = request.url().path().to_string();
        tracing::debug!(%method, %url, "Sending notes API request");

        let response = self.client.execute(request).await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = ApiError::from_response(status, &body);
            tracing::debug!(%method, %url, kind = %error.kind, "Notes API request failed");
            return Err(error);
        }
        Ok(response)
    }
}

impl NotesApi for RemoteNotesClient {
    async fn list(&self) -> ApiResult<Vec<Note>> {
        let request = self.build_request(Method::GET, self.notes_url(), None::<&()>)?;
        let notes = self.execute(request).await?.json::<Vec<Note>>().await?;
        tracing::debug!(count = notes.len(), "Fetched notes");
        Ok(notes)
    }

    async fn create(&self, note: &NewNote) -> ApiResult<Note> {
        let request = self.build_request(Method::POST, self.notes_url(), Some(note))?;
        Ok(self.execute(request).await?.json::<Note>().await?)
    }

    async fn update(&self, id: &NoteId, patch: &NotePatch) -> ApiResult<Note> {
        let request = self.build_request(Method::PUT, self.note_url(id), Some(patch))?;
        Ok(self.execute(request).await?.json::<Note>().await?)
    }

    async fn delete(&self, id: &NoteId) -> ApiResult<()> {
        let request = self.build_request(Method::DELETE, self.note_url(id), None::<&()>)?;
        self.execute(request).await?;
        Ok(())
    }
}
