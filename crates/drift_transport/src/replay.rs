//! History replay for new subscribers.
//!
//! Runs before a subscription attaches to its topic: parses the history
//! request headers, pulls the matching entries from the topic's ring,
//! and writes them to the response stream one message at a time.

use axum::http::HeaderMap;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use drift_broker::{MessageSink, Topic};
use tracing::warn;

/// Request header: replay entries stamped strictly after this unix time.
pub const X_HISTORY_SINCE: &str = "x-history-since";
/// Request header: cap the replay to this many entries.
pub const X_HISTORY_LENGTH: &str = "x-history-length";
/// Response header: whether the topic tracks history at all.
pub const X_HISTORY_ENABLED: &str = "x-history-enabled";

/// What a subscriber gets before live traffic starts.
pub struct Replay {
    /// Value for the `x-history-enabled` response header.
    pub enabled: bool,
    /// Entries to write to the stream, in order.
    pub entries: Vec<Bytes>,
}

/// Select the history entries a new subscriber should see.
///
/// With `x-history-since`, entries strictly newer than the timestamp; if
/// `x-history-length` is also present, trimmed to the newest that many.
/// With only `x-history-length`, the oldest retained entries up to that
/// count. With neither, nothing. Malformed header values are logged and
/// treated as absent.
pub fn collect(topic: &Topic, headers: &HeaderMap) -> Replay {
    let Some(history) = topic.history() else {
        return Replay {
            enabled: false,
            entries: Vec::new(),
        };
    };

    let since = parse_since(headers);
    let max = parse_length(headers);

    let entries = match (since, max) {
        (Some(t), max) => {
            let mut entries = history.since(t);
            if let Some(max) = max {
                if entries.len() > max {
                    let cut = entries.len() - max;
                    entries.drain(..cut);
                }
            }
            entries
        }
        (None, Some(max)) => history.last(max),
        (None, None) => Vec::new(),
    };

    Replay {
        enabled: true,
        entries,
    }
}

/// Write each entry to the sink, flushing between messages. Returns how
/// many entries went out; an error means the subscriber is gone.
pub async fn send<S: MessageSink>(
    sink: &mut S,
    entries: Vec<Bytes>,
) -> drift_broker::Result<usize> {
    let mut sent = 0;
    for entry in entries {
        sink.write(entry).await?;
        sink.flush().await?;
        sent += 1;
    }
    Ok(sent)
}

fn parse_since(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let value = headers.get(X_HISTORY_SINCE)?;
    let parsed = value
        .to_str()
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0));
    if parsed.is_none() {
        warn!(header = X_HISTORY_SINCE, ?value, "unparseable header value, ignoring");
    }
    parsed
}

fn parse_length(headers: &HeaderMap) -> Option<usize> {
    let value = headers.get(X_HISTORY_LENGTH)?;
    let parsed = value.to_str().ok().and_then(|s| s.parse::<usize>().ok());
    if parsed.is_none() {
        warn!(header = X_HISTORY_LENGTH, ?value, "unparseable header value, ignoring");
    }
    // A zero cap replays nothing, same as leaving the header off.
    parsed.filter(|len| *len > 0)
}
