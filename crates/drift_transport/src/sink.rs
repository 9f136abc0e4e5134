//! Bridges the broker's `MessageSink` to a streaming HTTP response body.

use async_trait::async_trait;
use bytes::Bytes;
use drift_broker::{BrokerError, MessageSink};
use tokio::sync::mpsc;

/// Sends messages into the bounded channel backing a streaming response
/// body. Each message becomes one body frame, which preserves the
/// one-message-one-write framing on the wire.
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl MessageSink for ChannelSink {
    /// Fails once the response body has been dropped, i.e. the remote
    /// client is gone.
    async fn write(&mut self, msg: Bytes) -> drift_broker::Result<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| BrokerError::StreamWrite("response stream closed".to_string()))
    }

    /// Frames are flushed as they are produced; nothing is buffered here.
    async fn flush(&mut self) -> drift_broker::Result<()> {
        Ok(())
    }
}
