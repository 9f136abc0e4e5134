//! drift_client
//!
//! Consumer library for a Drift pub/sub server: create, delete, and
//! probe topics, publish messages, and hold a streaming subscription.
//!
//! Messages are opaque bytes. On the wire one message is one body
//! frame, so each item yielded by `Subscription::next` corresponds to
//! one published message.

use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;
use thiserror::Error;

const V1_TOPICS: &str = "/v1/t";

const X_HISTORY_SINCE: &str = "x-history-since";
const X_HISTORY_LENGTH: &str = "x-history-length";
const X_HISTORY_ENABLED: &str = "x-history-enabled";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with {0}")]
    UnexpectedStatus(StatusCode),

    #[error("topic name must not be empty")]
    EmptyTopic,

    #[error("cannot publish an empty message")]
    EmptyMessage,
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Replay options for `subscribe`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HistoryOptions {
    /// Replay entries stamped strictly after this unix time.
    pub since: Option<i64>,
    /// Cap the replay; combined with `since`, the newest entries win.
    pub len: Option<usize>,
}

/// Client for one Drift server.
pub struct Client {
    base: String,
    http: reqwest::Client,
}

impl Client {
    /// `base_url` is scheme://host:port, e.g. `http://127.0.0.1:5500`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().build()?;
        Ok(Self { base, http })
    }

    /// Create `topic` on the server. Idempotent.
    pub async fn create(&self, topic: &str) -> Result<()> {
        let resp = self.http.put(self.topic_url(topic)?).send().await?;
        expect_success(resp.status())
    }

    /// Delete `topic`, ending all of its subscriptions.
    pub async fn delete(&self, topic: &str) -> Result<()> {
        let resp = self.http.delete(self.topic_url(topic)?).send().await?;
        expect_success(resp.status())
    }

    /// Whether the server currently has `topic`.
    pub async fn exists(&self, topic: &str) -> Result<bool> {
        let resp = self.http.head(self.topic_url(topic)?).send().await?;
        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(ClientError::UnexpectedStatus(status)),
        }
    }

    /// Publish one message to `topic`, creating the topic if needed.
    pub async fn publish(&self, topic: &str, message: impl Into<Bytes>) -> Result<()> {
        let message = message.into();
        if message.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        let resp = self
            .http
            .post(self.topic_url(topic)?)
            .body(message)
            .send()
            .await?;
        expect_success(resp.status())
    }

    /// Open a long-lived subscription to `topic`, optionally replaying
    /// history first.
    pub async fn subscribe(&self, topic: &str, history: HistoryOptions) -> Result<Subscription> {
        let mut req = self.http.get(self.topic_url(topic)?);
        if let Some(since) = history.since {
            req = req.header(X_HISTORY_SINCE, since.to_string());
        }
        if let Some(len) = history.len {
            req = req.header(X_HISTORY_LENGTH, len.to_string());
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::UnexpectedStatus(resp.status()));
        }
        let history_enabled = resp
            .headers()
            .get(X_HISTORY_ENABLED)
            .is_some_and(|v| v == "true");

        Ok(Subscription {
            history_enabled,
            stream: Box::pin(resp.bytes_stream()),
        })
    }

    fn topic_url(&self, topic: &str) -> Result<String> {
        if topic.is_empty() {
            return Err(ClientError::EmptyTopic);
        }
        Ok(format!("{}{}/{}", self.base, V1_TOPICS, topic))
    }
}

fn expect_success(status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ClientError::UnexpectedStatus(status))
    }
}

/// A held subscription stream.
///
/// Each item is one published message; the stream ends when the topic
/// is deleted or the connection drops.
pub struct Subscription {
    history_enabled: bool,
    stream: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
}

impl Subscription {
    /// Whether the topic tracks history (`x-history-enabled`).
    pub fn history_enabled(&self) -> bool {
        self.history_enabled
    }

    /// The next message, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Result<Bytes>> {
        self.stream
            .next()
            .await
            .map(|item| item.map_err(ClientError::from))
    }
}
