//! drift_transport
//!
//! HTTP adapters for the Drift broker: the axum router and handlers,
//! the history replay step that runs before a subscription attaches,
//! and the channel-backed sink that turns broker messages into response
//! body frames.

pub mod http;
pub mod replay;
pub mod sink;

pub use http::{router, start_http_server, ApiError};
