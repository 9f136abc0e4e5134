//! A single subscriber: its delivery queue and the stream loop that
//! couples the queue to a long-held output stream.
//!
//! Concurrency note: the queue has exactly one consumer (the stream
//! loop) and any number of producers (publishers holding the topic's
//! attached set). Producers never block; see `deliver`.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Result;

/// Per-subscription delivery queue depth. Once this many messages are
/// backed up for a subscriber, further messages are dropped for that
/// subscriber only.
pub const QUEUE_DEPTH: usize = 10;

static NEXT_SUB_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a process-unique subscription id.
///
/// The counter wraps to zero after `u64::MAX`; uniqueness across process
/// restarts is not relied upon.
fn next_sub_id() -> u64 {
    NEXT_SUB_ID.fetch_add(1, Ordering::SeqCst)
}

/// Output half of a subscriber's response stream.
///
/// One message is one `write` followed by one `flush`; no framing is
/// added. Implementations report a failed write so the stream loop can
/// treat the remote side as gone.
#[async_trait]
pub trait MessageSink: Send {
    async fn write(&mut self, msg: Bytes) -> Result<()>;
    async fn flush(&mut self) -> Result<()>;
}

/// One subscriber's attachment to one topic.
pub struct Subscription {
    id: u64,
    queue: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Create a subscription and hand back the consuming end of its
    /// delivery queue for the stream loop.
    pub fn new() -> (Self, mpsc::Receiver<Bytes>) {
        let (queue, rx) = mpsc::channel(QUEUE_DEPTH);
        let sub = Self {
            id: next_sub_id(),
            queue,
            cancel: CancellationToken::new(),
        };
        (sub, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Enqueue a message without blocking.
    ///
    /// Returns false when the message was dropped: the queue is full or
    /// the subscription has been closed. A slow subscriber never stalls
    /// the publisher.
    pub fn deliver(&self, msg: Bytes) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        match self.queue.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(subscriber = self.id, "delivery queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// The stream loop: copy messages from the delivery queue into
    /// `sink`, flushing after every message.
    ///
    /// Runs until the stop signal fires, the subscription is closed, or
    /// a write fails (a failed write means the remote client is gone).
    /// Messages already queued when the subscription closes are drained
    /// first.
    pub async fn listen<S: MessageSink>(
        &self,
        mut queue: mpsc::Receiver<Bytes>,
        sink: &mut S,
        stop: &CancellationToken,
    ) {
        loop {
            tokio::select! {
                // Poll the queue first so buffered messages drain ahead
                // of a close.
                biased;
                msg = queue.recv() => {
                    let Some(msg) = msg else { return };
                    if let Err(err) = sink.write(msg).await {
                        debug!(subscriber = self.id, %err, "write failed, ending stream");
                        return;
                    }
                    if let Err(err) = sink.flush().await {
                        debug!(subscriber = self.id, %err, "flush failed, ending stream");
                        return;
                    }
                }
                _ = self.cancel.cancelled() => return,
                _ = stop.cancelled() => return,
            }
        }
    }

    /// Close the delivery queue. Idempotent; no sends occur afterwards,
    /// and a running stream loop exits once pending messages drain.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
