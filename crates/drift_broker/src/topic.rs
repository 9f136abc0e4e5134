//! Topic: the named channel that fans published messages out to every
//! attached subscription.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{BrokerError, Result};
use crate::history::History;
use crate::subscription::Subscription;

/// Attached subscriptions plus the closed flag, guarded together so a
/// publish never races a close.
struct Attached {
    subscribers: HashMap<u64, Arc<Subscription>>,
    closed: bool,
}

/// A named publish/subscribe channel.
///
/// The lifecycle is open -> closed, with no reopening. History, when
/// tracked, is consulted by new subscribers before they attach.
pub struct Topic {
    name: String,
    history: Option<History>,
    inner: RwLock<Attached>,
}

impl Topic {
    /// Create a topic with no history tracking.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            history: None,
            inner: RwLock::new(Attached {
                subscribers: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Create a topic that retains the last `max` published messages.
    pub fn with_history(name: impl Into<String>, max: usize) -> Self {
        let mut topic = Self::new(name);
        topic.history = Some(History::new(max));
        topic
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The history ring, if this topic tracks one.
    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    /// Send `msg` to every attached subscription.
    ///
    /// The message lands in the history ring (when tracked) before any
    /// fan-out, so a subscriber that replays history and then attaches
    /// sees neither a duplicate nor a gap. Fan-out never blocks: a
    /// subscriber whose queue is full has this message dropped, and the
    /// publish as a whole still succeeds.
    pub fn publish(&self, msg: Bytes) -> Result<()> {
        let inner = self.inner.write();
        if inner.closed {
            return Err(BrokerError::TopicClosed(self.name.clone()));
        }
        if let Some(history) = &self.history {
            history.append(msg.clone());
        }
        for sub in inner.subscribers.values() {
            if !sub.deliver(msg.clone()) {
                debug!(
                    topic = %self.name,
                    subscriber = sub.id(),
                    "message not delivered"
                );
            }
        }
        Ok(())
    }

    /// Attach a subscription. No-op once the topic is closed.
    pub fn subscribe(&self, sub: Arc<Subscription>) {
        let mut inner = self.inner.write();
        if inner.closed {
            return;
        }
        if inner.subscribers.contains_key(&sub.id()) {
            warn!(
                topic = %self.name,
                subscriber = sub.id(),
                "duplicate subscription id, replacing"
            );
        }
        inner.subscribers.insert(sub.id(), sub);
    }

    /// Detach a subscription by id. No-op if the topic is closed or the
    /// subscription is not attached.
    pub fn unsubscribe(&self, id: u64) {
        let mut inner = self.inner.write();
        if inner.closed {
            return;
        }
        inner.subscribers.remove(&id);
    }

    /// A point-in-time snapshot of the attached subscriptions.
    pub fn subscribers(&self) -> Vec<Arc<Subscription>> {
        self.inner.read().subscribers.values().cloned().collect()
    }

    /// Close the topic: no further publishes or subscribes succeed, and
    /// every attached subscription's queue is closed.
    pub fn close(&self) {
        let mut inner = self.inner.write();
        inner.closed = true;
        for sub in inner.subscribers.values() {
            sub.close();
        }
        inner.subscribers.clear();
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }
}
