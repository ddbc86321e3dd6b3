//! HTTP/JSON transport for the remote note collection.
//!
//! # Responsibility
//! - Map the four client operations onto REST verbs under one endpoint.
//! - Classify reqwest failures into transport/status/decode errors.
//!
//! # Invariants
//! - Item URLs are `{endpoint}/{id}` with the id as one escaped path segment.
//! - Every request carries the configured timeout.

use crate::config::SyncConfig;
use crate::model::note::{Draft, Note, NoteId};
use crate::remote::client::{FetchError, RemoteNoteClient, RemoteWriteError};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, Url};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// HTTP client construction failure.
#[derive(Debug)]
pub enum HttpClientError {
    /// Endpoint is not an absolute http(s) URL with a path.
    InvalidEndpoint(String),
    Build(reqwest::Error),
}

impl Display for HttpClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEndpoint(message) => write!(f, "invalid endpoint: {message}"),
            Self::Build(err) => write!(f, "failed to build http client: {err}"),
        }
    }
}

impl Error for HttpClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEndpoint(_) => None,
            Self::Build(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for HttpClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Build(value)
    }
}

/// `reqwest`-backed implementation of `RemoteNoteClient`.
#[derive(Debug, Clone)]
pub struct HttpNoteClient {
    http: Client,
    endpoint: Url,
}

impl HttpNoteClient {
    /// Builds a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl AsRef<str>, timeout: Duration) -> Result<Self, HttpClientError> {
        let raw = endpoint.as_ref().trim_end_matches('/');
        let endpoint = Url::parse(raw)
            .map_err(|err| HttpClientError::InvalidEndpoint(format!("`{raw}`: {err}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.cannot_be_a_base() {
            return Err(HttpClientError::InvalidEndpoint(format!(
                "`{raw}` must be an http(s) URL"
            )));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    /// Builds a client from validated configuration.
    pub fn from_config(config: &SyncConfig) -> Result<Self, HttpClientError> {
        Self::new(
            config.endpoint.as_str(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Returns the item URL for one note id.
    pub fn note_url(&self, id: &NoteId) -> Url {
        let mut url = self.endpoint.clone();
        // Base-ness is checked in `new`.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&id.to_string());
        }
        url
    }
}

#[async_trait]
impl RemoteNoteClient for HttpNoteClient {
    async fn list(&self) -> Result<Vec<Note>, FetchError> {
        debug!("event=remote_list module=remote status=start url={}", self.endpoint);
        let response = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        response
            .json::<Vec<Note>>()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))
    }

    async fn create(&self, draft: &Draft) -> Result<Note, RemoteWriteError> {
        debug!("event=remote_create module=remote status=start url={}", self.endpoint);
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(draft)
            .send()
            .await
            .map_err(write_transport_error)?;
        let response = ensure_write_success(response)?;
        response
            .json::<Note>()
            .await
            .map_err(|err| RemoteWriteError::Decode(err.to_string()))
    }

    async fn update(&self, note: &Note) -> Result<(), RemoteWriteError> {
        let url = self.note_url(&note.id);
        debug!("event=remote_update module=remote status=start url={url}");
        let response = self
            .http
            .put(url)
            .json(note)
            .send()
            .await
            .map_err(write_transport_error)?;
        ensure_write_success(response).map(|_| ())
    }

    async fn delete(&self, id: &NoteId) -> Result<(), RemoteWriteError> {
        let url = self.note_url(id);
        debug!("event=remote_delete module=remote status=start url={url}");
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(write_transport_error)?;
        ensure_write_success(response).map(|_| ())
    }
}

fn write_transport_error(err: reqwest::Error) -> RemoteWriteError {
    RemoteWriteError::Transport(err.to_string())
}

fn ensure_write_success(response: Response) -> Result<Response, RemoteWriteError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RemoteWriteError::Rejected {
            status: status.as_u16(),
        })
    }
}
