use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration as TimeDelta, Utc};
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;

use crate::error::{BrokerError, Result};
use crate::history::History;
use crate::medium::Medium;
use crate::subscription::{MessageSink, Subscription, QUEUE_DEPTH};
use crate::topic::Topic;

fn msg(s: &str) -> Bytes {
    Bytes::from(s.to_string())
}

/// Sink that records everything written to it.
#[derive(Default)]
struct VecSink {
    written: Vec<Bytes>,
    flushes: usize,
}

#[async_trait]
impl MessageSink for VecSink {
    async fn write(&mut self, msg: Bytes) -> Result<()> {
        self.written.push(msg);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Sink whose peer is gone: every write fails.
struct FailingSink;

#[async_trait]
impl MessageSink for FailingSink {
    async fn write(&mut self, _msg: Bytes) -> Result<()> {
        Err(BrokerError::StreamWrite("peer went away".to_string()))
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn history_evicts_oldest_beyond_capacity() {
    let history = History::new(5);
    for s in ["a", "b", "c", "d", "e", "f"] {
        history.append(msg(s));
    }
    assert_eq!(history.len(), 5);
    assert_eq!(
        history.last(6),
        vec![msg("b"), msg("c"), msg("d"), msg("e"), msg("f")]
    );
}

#[test]
fn history_last_returns_oldest_retained_first() {
    let history = History::new(10);
    for s in ["a", "b", "c"] {
        history.append(msg(s));
    }
    assert_eq!(history.last(2), vec![msg("a"), msg("b")]);
    assert_eq!(history.last(99), vec![msg("a"), msg("b"), msg("c")]);
    assert!(History::new(10).last(5).is_empty());
}

#[test]
fn history_since_returns_entries_strictly_after() {
    let history = History::new(10);
    let past = Utc::now() - TimeDelta::hours(1);
    history.append(msg("a"));
    history.append(msg("b"));
    let future = Utc::now() + TimeDelta::hours(1);

    assert_eq!(history.since(past), vec![msg("a"), msg("b")]);
    assert!(history.since(future).is_empty());
}

#[test]
fn subscription_ids_are_unique() {
    let mut seen = HashSet::new();
    for _ in 0..1000 {
        let (sub, _queue) = Subscription::new();
        assert!(seen.insert(sub.id()));
    }
}

#[test]
fn closed_subscription_drops_sends() {
    let (sub, mut queue) = Subscription::new();
    sub.close();
    assert!(sub.is_closed());
    assert!(!sub.deliver(msg("x")));
    assert!(matches!(queue.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn fanout_preserves_publish_order_per_subscriber() {
    let topic = Topic::new("t");
    let (s1, mut rx1) = Subscription::new();
    let (s2, mut rx2) = Subscription::new();
    topic.subscribe(Arc::new(s1));
    topic.subscribe(Arc::new(s2));

    topic.publish(msg("a")).unwrap();
    topic.publish(msg("b")).unwrap();

    for rx in [&mut rx1, &mut rx2] {
        assert_eq!(rx.try_recv().unwrap(), msg("a"));
        assert_eq!(rx.try_recv().unwrap(), msg("b"));
        assert!(rx.try_recv().is_err());
    }
}

#[test]
fn publish_without_subscribers_succeeds() {
    let topic = Topic::new("t");
    topic.publish(msg("nobody home")).unwrap();
}

#[test]
fn slow_subscriber_drops_overflow_only() {
    let topic = Topic::new("burst");
    let (slow, mut slow_rx) = Subscription::new();
    let (fast, mut fast_rx) = Subscription::new();
    topic.subscribe(Arc::new(slow));
    topic.subscribe(Arc::new(fast));

    // The fast subscriber drains during the burst, the slow one never.
    let total = QUEUE_DEPTH + 5;
    let mut fast_got = 0;
    for i in 0..total {
        topic.publish(msg(&format!("m{i}"))).unwrap();
        while fast_rx.try_recv().is_ok() {
            fast_got += 1;
        }
    }
    assert_eq!(fast_got, total);

    let mut slow_got = 0;
    while slow_rx.try_recv().is_ok() {
        slow_got += 1;
    }
    assert_eq!(slow_got, QUEUE_DEPTH);
}

#[test]
fn publish_to_closed_topic_fails() {
    let topic = Topic::new("t");
    topic.close();
    assert!(matches!(
        topic.publish(msg("x")),
        Err(BrokerError::TopicClosed(_))
    ));
}

#[test]
fn close_closes_attached_subscriptions() {
    let topic = Topic::new("t");
    let (sub, _queue) = Subscription::new();
    let sub = Arc::new(sub);
    topic.subscribe(sub.clone());

    topic.close();
    assert!(topic.is_closed());
    assert!(sub.is_closed());
    assert!(topic.subscribers().is_empty());
}

#[test]
fn subscribe_after_close_is_ignored() {
    let topic = Topic::new("t");
    topic.close();
    let (sub, _queue) = Subscription::new();
    topic.subscribe(Arc::new(sub));
    assert!(topic.subscribers().is_empty());
}

#[test]
fn unsubscribe_detaches() {
    let topic = Topic::new("t");
    let (sub, mut queue) = Subscription::new();
    let id = sub.id();
    topic.subscribe(Arc::new(sub));
    assert_eq!(topic.subscribers().len(), 1);

    topic.unsubscribe(id);
    topic.publish(msg("x")).unwrap();
    assert!(queue.try_recv().is_err());
    assert!(topic.subscribers().is_empty());
}

#[test]
fn historied_topic_records_published_messages() {
    let topic = Topic::with_history("h", 5);
    let (sub, mut queue) = Subscription::new();
    topic.subscribe(Arc::new(sub));

    topic.publish(msg("x")).unwrap();
    assert_eq!(topic.history().unwrap().last(1), vec![msg("x")]);
    assert_eq!(queue.try_recv().unwrap(), msg("x"));
}

#[test]
fn medium_add_and_lookup() {
    let medium = Medium::new();
    assert!(medium.is_empty());
    medium.add(Arc::new(Topic::new("t")));
    assert_eq!(medium.len(), 1);
    assert_eq!(medium.topic("t").unwrap().name(), "t");
    assert!(medium.topic("missing").is_none());
}

#[test]
fn medium_add_overwrites_existing_name() {
    let medium = Medium::new();
    let second = Arc::new(Topic::with_history("t", 5));
    medium.add(Arc::new(Topic::new("t")));
    medium.add(second.clone());
    assert!(Arc::ptr_eq(&medium.topic("t").unwrap(), &second));
}

#[test]
fn delete_unknown_topic_is_not_found() {
    let medium = Medium::new();
    assert!(matches!(
        medium.delete("nope"),
        Err(BrokerError::TopicNotFound(_))
    ));
}

#[test]
fn delete_closes_topic_for_in_flight_publishers() {
    let medium = Medium::new();
    let topic = medium.fetch_or_create("t", false, 0);
    medium.delete("t").unwrap();

    assert!(medium.topic("t").is_none());
    assert!(matches!(
        topic.publish(msg("x")),
        Err(BrokerError::TopicClosed(_))
    ));
}

#[test]
fn fetch_or_create_returns_same_topic() {
    let medium = Medium::new();
    let a = medium.fetch_or_create("t", true, 5);
    let b = medium.fetch_or_create("t", true, 5);
    assert!(Arc::ptr_eq(&a, &b));
    assert!(a.history().is_some());
}

#[test]
fn fetch_or_create_without_history() {
    let medium = Medium::new();
    assert!(medium.fetch_or_create("plain", false, 100).history().is_none());
    assert!(medium.fetch_or_create("zero", true, 0).history().is_none());
}

#[tokio::test]
async fn listen_writes_queued_messages_then_stops() {
    let (sub, queue) = Subscription::new();
    assert!(sub.deliver(msg("a")));
    assert!(sub.deliver(msg("b")));
    // Messages queued ahead of the close drain before the loop exits.
    sub.close();

    let mut sink = VecSink::default();
    let stop = CancellationToken::new();
    sub.listen(queue, &mut sink, &stop).await;

    assert_eq!(sink.written, vec![msg("a"), msg("b")]);
    assert_eq!(sink.flushes, 2);
}

#[tokio::test]
async fn listen_exits_on_stop_signal() {
    let (sub, queue) = Subscription::new();
    let stop = CancellationToken::new();
    stop.cancel();

    let mut sink = VecSink::default();
    sub.listen(queue, &mut sink, &stop).await;
    assert!(sink.written.is_empty());
}

#[tokio::test]
async fn listen_exits_on_write_error() {
    let (sub, queue) = Subscription::new();
    sub.deliver(msg("a"));

    let stop = CancellationToken::new();
    let mut sink = FailingSink;
    // Completes only if the loop treats the failed write as a disconnect.
    sub.listen(queue, &mut sink, &stop).await;
}

#[tokio::test]
async fn listen_forwards_live_messages() {
    let (sub, queue) = Subscription::new();
    let sub = Arc::new(sub);
    let stop = CancellationToken::new();

    let handle = {
        let sub = sub.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            let mut sink = VecSink::default();
            sub.listen(queue, &mut sink, &stop).await;
            sink
        })
    };

    sub.deliver(msg("m1"));
    sub.deliver(msg("m2"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    stop.cancel();

    let sink = handle.await.unwrap();
    assert_eq!(sink.written, vec![msg("m1"), msg("m2")]);
}
