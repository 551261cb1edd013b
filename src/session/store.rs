// src/session/store.rs

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use crate::models::{quiz::QuizDetail, submission::NewSubmission};

/// The two store operations a session needs.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Loads a quiz with its questions already in display order.
    async fn fetch_quiz(&self, quiz_id: i64) -> Result<QuizDetail, StoreError>;

    /// Records a finished attempt. No response body is expected.
    async fn submit_result(&self, record: &NewSubmission) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub enum StoreError {
    /// The base URL or an endpoint could not be built.
    InvalidUrl(String),

    /// The request never produced a response.
    Transport(String),

    /// The store answered with a non-success status.
    Status { status: u16, message: String },

    /// The response body was not what we expected.
    Decode(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidUrl(msg) => write!(f, "invalid store url: {}", msg),
            StoreError::Transport(msg) => write!(f, "store unreachable: {}", msg),
            StoreError::Status { status, message } => {
                write!(f, "store returned {}: {}", status, message)
            }
            StoreError::Decode(msg) => write!(f, "unexpected store response: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for StoreError {
    fn from(err: url::ParseError) -> Self {
        StoreError::InvalidUrl(err.to_string())
    }
}

/// `QuizStore` backed by the Quiz Store HTTP API.
#[derive(Debug, Clone)]
pub struct HttpQuizStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpQuizStore {
    /// `base_url` is the service root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let mut base_url = Url::parse(base_url)?;
        // `Url::join` drops the last path segment unless it ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl QuizStore for HttpQuizStore {
    async fn fetch_quiz(&self, quiz_id: i64) -> Result<QuizDetail, StoreError> {
        let url = self.endpoint(&format!("api/quizzes/{}", quiz_id))?;
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(response.json::<QuizDetail>().await?)
    }

    async fn submit_result(&self, record: &NewSubmission) -> Result<(), StoreError> {
        let url = self.endpoint("api/submissions")?;
        let response = self.client.post(url).json(record).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }
}

/// Pulls the `{"error": ...}` message out of a failed response when there is one.
async fn status_error(response: reqwest::Response) -> StoreError {
    let status = response.status();
    let message = match response.json::<serde_json::Value>().await {
        Ok(body) => body["error"]
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| default_message(status)),
        Err(_) => default_message(status),
    };
    StoreError::Status {
        status: status.as_u16(),
        message,
    }
}

fn default_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("unknown status")
        .to_string()
}
