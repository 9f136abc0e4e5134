//! Medium: the process-wide registry of topics.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{BrokerError, Result};
use crate::topic::Topic;

/// Registry of named topics.
///
/// Names are unique. Lookups take a shared lock; mutations take the
/// exclusive lock. The registry never blocks on I/O.
pub struct Medium {
    topics: RwLock<HashMap<String, Arc<Topic>>>,
}

impl Medium {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Register a topic under its name. Last writer wins; callers that
    /// must not clobber an existing topic use `fetch_or_create`.
    pub fn add(&self, topic: Arc<Topic>) {
        self.topics.write().insert(topic.name().to_string(), topic);
    }

    /// Look up a topic by name.
    pub fn topic(&self, name: &str) -> Option<Arc<Topic>> {
        self.topics.read().get(name).cloned()
    }

    /// Close a topic and remove it from the registry.
    ///
    /// The topic is closed before removal so that in-flight publishes
    /// holding a reference observe the closed flag.
    pub fn delete(&self, name: &str) -> Result<()> {
        let mut topics = self.topics.write();
        let Some(topic) = topics.get(name) else {
            return Err(BrokerError::TopicNotFound(name.to_string()));
        };
        topic.close();
        topics.remove(name);
        Ok(())
    }

    /// Fetch the topic under `name`, creating it if absent.
    ///
    /// Get-or-insert is atomic: two racing callers observe the same
    /// topic. A newly created topic tracks history iff `with_history`
    /// and `history_len > 0`.
    pub fn fetch_or_create(
        &self,
        name: &str,
        with_history: bool,
        history_len: usize,
    ) -> Arc<Topic> {
        let mut topics = self.topics.write();
        topics
            .entry(name.to_string())
            .or_insert_with(|| {
                let topic = if with_history && history_len > 0 {
                    Topic::with_history(name, history_len)
                } else {
                    Topic::new(name)
                };
                Arc::new(topic)
            })
            .clone()
    }

    /// Number of registered topics.
    pub fn len(&self) -> usize {
        self.topics.read().len()
    }

    /// True when no topics are registered.
    pub fn is_empty(&self) -> bool {
        self.topics.read().is_empty()
    }
}

impl Default for Medium {
    fn default() -> Self {
        Self::new()
    }
}
