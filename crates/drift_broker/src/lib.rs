//! drift_broker
//!
//! The broker crate contains the in-memory fan-out engine: the topic
//! registry, the publish/subscribe primitive with per-subscriber delivery
//! queues, the bounded history ring, and the subscription stream loop.
//!
//! Public types:
//! - `Medium`: process-wide registry of named topics.
//! - `Topic`: one named channel; broadcasts published messages to every
//!   attached subscription.
//! - `Subscription`: one subscriber's bounded delivery queue plus the
//!   stream loop that couples it to an output stream.
//! - `History`: time-stamped ring of recent messages for one topic.
//!
//! This crate is transport-agnostic. Higher-level crates (the HTTP
//! server, binaries) provide the output streams via the `MessageSink`
//! trait and wire everything together.

pub mod error;
pub mod history;
pub mod medium;
pub mod subscription;
pub mod topic;

pub use error::{BrokerError, Result};
pub use history::{History, DEFAULT_MAX_HISTORY};
pub use medium::Medium;
pub use subscription::{MessageSink, Subscription, QUEUE_DEPTH};
pub use topic::Topic;

#[cfg(test)]
mod tests;
