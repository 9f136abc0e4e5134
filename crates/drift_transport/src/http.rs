//! The axum router and handlers that translate HTTP requests into
//! broker operations.
//!
//! Routes, all under `/v1/t/:topic`:
//! - `PUT` create (idempotent), `HEAD` exists, `POST` publish the
//!   request body as one message, `GET` subscribe to a long-lived
//!   stream, `DELETE` close and remove.
//!
//! A request that leaves the topic segment off entirely (`/v1/t`,
//! `/v1/t/`) is an empty topic name and is rejected with 400.
//!
//! Plus `GET /ping` for probes and `GET /v1/time` so subscribers can
//! build `x-history-since` values against the server's clock.
//!
//! The `Medium` is injected at router construction; handlers carry no
//! global state.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, put};
use axum::Router;
use chrono::Utc;
use drift_broker::{BrokerError, Medium, Subscription, QUEUE_DEPTH};
use drift_config::Settings;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::replay;
use crate::sink::ChannelSink;

/// Handler dependencies, injected at router construction.
#[derive(Clone)]
pub struct AppState {
    medium: Arc<Medium>,
    history_len: usize,
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Broker(err) = &self;
        let status = match err {
            BrokerError::EmptyTopicName => StatusCode::BAD_REQUEST,
            BrokerError::TopicNotFound(_) => StatusCode::NOT_FOUND,
            BrokerError::TopicClosed(_) => StatusCode::GONE,
            BrokerError::StreamWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Build the Drift router over an existing medium.
pub fn router(medium: Arc<Medium>, history_len: usize) -> Router {
    let state = AppState {
        medium,
        history_len,
    };
    Router::new()
        .route("/ping", get(ping))
        .route("/v1/time", get(server_time))
        .route(
            "/v1/t/:topic",
            put(create_topic)
                .head(topic_exists)
                .post(publish_message)
                .get(subscribe)
                .delete(delete_topic),
        )
        // A dynamic segment never matches an empty string, so the
        // empty-topic case needs its own routes to reach the 400 path.
        .route("/v1/t", any(empty_topic))
        .route("/v1/t/", any(empty_topic))
        .with_state(state)
}

/// Bind `addr` and serve the pub/sub API until the listener fails or
/// the task is dropped. HTTP/1.1 and HTTP/2 are both accepted; TLS is
/// expected to be terminated in front of this listener.
pub async fn start_http_server(
    addr: String,
    medium: Arc<Medium>,
    settings: Settings,
) -> std::io::Result<()> {
    let app = router(medium, settings.broker.history_len);
    let listener = TcpListener::bind(&addr).await?;
    info!("pub/sub server listening on http://{addr}");
    axum::serve(listener, app).await
}

async fn ping() -> &'static str {
    "pong"
}

/// `/v1/t` with no topic segment: every method is an empty topic name.
async fn empty_topic() -> ApiError {
    BrokerError::EmptyTopicName.into()
}

/// Current server time in unix seconds.
async fn server_time() -> String {
    Utc::now().timestamp().to_string()
}

async fn create_topic(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> Result<StatusCode, ApiError> {
    let name = topic_name(&topic)?;
    state.medium.fetch_or_create(name, true, state.history_len);
    Ok(StatusCode::OK)
}

async fn topic_exists(State(state): State<AppState>, Path(topic): Path<String>) -> StatusCode {
    match state.medium.topic(&topic) {
        Some(_) => StatusCode::OK,
        None => StatusCode::NOT_FOUND,
    }
}

async fn publish_message(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let name = topic_name(&topic)?;
    debug!(topic = name, bytes = body.len(), "publish");
    let topic = state.medium.fetch_or_create(name, true, state.history_len);
    topic.publish(body)?;
    Ok(StatusCode::OK)
}

async fn delete_topic(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> Result<StatusCode, ApiError> {
    let name = topic_name(&topic)?;
    state.medium.delete(name)?;
    Ok(StatusCode::OK)
}

/// Subscribe: replay any requested history into the response, then hold
/// the stream open, forwarding every message published to the topic
/// until the client disconnects or the topic is deleted.
async fn subscribe(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let name = topic_name(&topic)?;
    let topic = state.medium.fetch_or_create(name, true, state.history_len);

    let replayed = replay::collect(&topic, &headers);
    let history_enabled = replayed.enabled;
    let entries = replayed.entries;

    let (body_tx, body_rx) = mpsc::channel::<Bytes>(QUEUE_DEPTH);

    // One-shot disconnect signal: fires when hyper drops the body.
    let stop = CancellationToken::new();
    let watcher = tokio::spawn({
        let body_tx = body_tx.clone();
        let stop = stop.clone();
        async move {
            body_tx.closed().await;
            stop.cancel();
        }
    });

    let (sub, queue) = Subscription::new();
    let sub = Arc::new(sub);
    let mut sink = ChannelSink::new(body_tx);

    tokio::spawn({
        let topic = topic.clone();
        let sub = sub.clone();
        let stop = stop.clone();
        async move {
            match replay::send(&mut sink, entries).await {
                Ok(sent) if sent > 0 => {
                    debug!(topic = %topic.name(), subscriber = sub.id(), sent, "history replayed");
                }
                Ok(_) => {}
                Err(err) => {
                    debug!(
                        topic = %topic.name(),
                        subscriber = sub.id(),
                        %err,
                        "subscriber left during history replay"
                    );
                    watcher.abort();
                    return;
                }
            }

            topic.subscribe(sub.clone());
            sub.listen(queue, &mut sink, &stop).await;
            topic.unsubscribe(sub.id());
            sub.close();
            // Dropping the sink ends the response stream for the client.
            watcher.abort();
        }
    });

    let stream = ReceiverStream::new(body_rx).map(Ok::<_, Infallible>);
    let mut response = Body::from_stream(stream).into_response();
    response.headers_mut().insert(
        replay::X_HISTORY_ENABLED,
        HeaderValue::from_static(if history_enabled { "true" } else { "false" }),
    );
    Ok(response)
}

fn topic_name(raw: &str) -> Result<&str, ApiError> {
    if raw.is_empty() {
        return Err(BrokerError::EmptyTopicName.into());
    }
    Ok(raw)
}
