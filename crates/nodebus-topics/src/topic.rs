//! # Topic
//!
//! A thread-safe channel holding the most recent publishes of one payload
//! type, each tagged with a strictly increasing sequence number.

use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::DEFAULT_QUEUE_SIZE;

/// Per-topic publish counter. The first publish is sequence 1.
pub type Seq = u64;

/// Mutable topic state, only ever touched under the topic lock.
struct TopicState<T> {
    /// Buffered publishes, oldest first. Shared so consumers can read them
    /// after the lock is released.
    queue: VecDeque<(Seq, Arc<T>)>,
    /// Retention bound applied on publish.
    queue_size: usize,
    /// Sequence number of the newest publish (0 = never published).
    newest: Seq,
}

/// Bounded-history pub/sub channel.
///
/// Producers call [`Topic::publish`]; consumers poll with [`Topic::update`]
/// (latest value) or [`Topic::drain`] (every buffered value) while keeping
/// their own cursor. There are no condition variables: consumers are never
/// woken, they poll on their own schedule.
pub struct Topic<T> {
    name: Arc<str>,
    state: Mutex<TopicState<T>>,
}

impl<T> Topic<T> {
    /// Create an empty topic with the default retention bound.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_queue_size(name, DEFAULT_QUEUE_SIZE)
    }

    /// Create an empty topic with a custom retention bound.
    #[must_use]
    pub fn with_queue_size(name: impl Into<Arc<str>>, queue_size: usize) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(TopicState {
                queue: VecDeque::with_capacity(queue_size),
                queue_size,
                newest: 0,
            }),
        }
    }

    /// Topic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a value and trim the queue to the retention bound.
    ///
    /// Returns the sequence number assigned to `value`.
    pub fn publish(&self, value: T) -> Seq {
        let mut state = self.state.lock();
        state.newest += 1;
        let seq = state.newest;
        state.queue.push_back((seq, Arc::new(value)));

        while state.queue.len() > state.queue_size {
            state.queue.pop_front();
        }

        trace!(topic = %self.name, seq, "Published");
        seq
    }

    /// Queue semantics: invoke `callback` for every buffered value newer than
    /// `cursor`, oldest first, then advance `cursor` to the newest sequence.
    ///
    /// Values that were evicted before this call are skipped. The lock is
    /// only held to snapshot the pending values; `callback` runs after it is
    /// released and may publish to any topic, this one included.
    ///
    /// Returns the number of values delivered.
    pub fn drain<F>(&self, cursor: &mut Seq, mut callback: F) -> usize
    where
        F: FnMut(&T),
    {
        let pending: Vec<Arc<T>> = {
            let state = self.state.lock();
            if *cursor >= state.newest {
                return 0;
            }

            let start = state.queue.partition_point(|(seq, _)| *seq <= *cursor);
            *cursor = state.newest;
            state
                .queue
                .range(start..)
                .map(|(_, value)| Arc::clone(value))
                .collect()
        };

        for value in pending.iter().map(Arc::as_ref) {
            callback(value);
        }
        pending.len()
    }

    /// Change the retention bound.
    ///
    /// Shrinking does not trim immediately; the excess is dropped on the next
    /// publish.
    pub fn set_queue_size(&self, queue_size: usize) {
        self.state.lock().queue_size = queue_size;
    }

    /// Current retention bound.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.state.lock().queue_size
    }

    /// Sequence number of the newest publish, 0 if nothing was published.
    #[must_use]
    pub fn sequence(&self) -> Seq {
        self.state.lock().newest
    }

    /// Number of values currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Whether no value is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }
}

impl<T: Clone> Topic<T> {
    /// Value semantics: if the newest buffered value is newer than `cursor`,
    /// clone it into `slot` and advance `cursor`.
    ///
    /// Intermediate publishes between two polls are never replayed. Returns
    /// `true` when `slot` was written.
    pub fn update(&self, slot: &mut Option<T>, cursor: &mut Seq) -> bool {
        let state = self.state.lock();
        let Some((seq, value)) = state.queue.back() else {
            return false;
        };
        if *seq <= *cursor {
            return false;
        }

        *slot = Some(T::clone(value));
        *cursor = *seq;
        true
    }

    /// Clone of the newest buffered value, without touching any cursor.
    #[must_use]
    pub fn latest(&self) -> Option<T> {
        self.state.lock().queue.back().map(|(_, value)| T::clone(value))
    }
}

/// Type-erased view of a [`Topic`] as stored by the registry.
///
/// Recovering the typed topic goes through [`ErasedTopic::into_any`] and a
/// checked `Arc::downcast`, never an unchecked cast.
pub trait ErasedTopic: Send + Sync {
    /// Topic name.
    fn name(&self) -> &str;

    /// Payload type name, for diagnostics.
    fn type_name(&self) -> &'static str;

    /// Payload type identity, for the registry's type check.
    fn payload_type(&self) -> TypeId;

    /// Sequence number of the newest publish.
    fn sequence(&self) -> Seq;

    /// Number of values currently buffered.
    fn buffered(&self) -> usize;

    /// Current retention bound.
    fn queue_size(&self) -> usize;

    /// Change the retention bound without knowing the payload type.
    fn set_queue_size(&self, queue_size: usize);

    /// Upcast for downcasting back to `Topic<T>`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Send + Sync + 'static> ErasedTopic for Topic<T> {
    fn name(&self) -> &str {
        Topic::name(self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn payload_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn sequence(&self) -> Seq {
        Topic::sequence(self)
    }

    fn buffered(&self) -> usize {
        Topic::len(self)
    }

    fn queue_size(&self) -> usize {
        Topic::queue_size(self)
    }

    fn set_queue_size(&self, queue_size: usize) {
        Topic::set_queue_size(self, queue_size);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{mpsc, Barrier};
    use std::thread;
    use std::time::{Duration, Instant};

    fn collect(topic: &Topic<i32>, cursor: &mut Seq) -> Vec<i32> {
        let mut out = Vec::new();
        topic.drain(cursor, |v| out.push(*v));
        out
    }

    #[test]
    fn test_sequence_increments_by_one() {
        let topic = Topic::new("seq");
        assert_eq!(topic.sequence(), 0);

        for expected in 1..=10 {
            assert_eq!(topic.publish(expected as i32), expected);
            assert_eq!(topic.sequence(), expected);
        }
    }

    #[test]
    fn test_retention_keeps_last_k_in_order() {
        let topic = Topic::with_queue_size("retention", 3);
        for v in 0..10 {
            topic.publish(v);
        }

        let mut cursor = 0;
        assert_eq!(collect(&topic, &mut cursor), vec![7, 8, 9]);
        assert_eq!(cursor, 10);
    }

    #[test]
    fn test_drain_delivers_each_value_once() {
        let topic = Topic::new("once");
        let mut cursor = 0;

        topic.publish(1);
        topic.publish(2);
        assert_eq!(collect(&topic, &mut cursor), vec![1, 2]);
        assert!(collect(&topic, &mut cursor).is_empty());

        topic.publish(3);
        assert_eq!(collect(&topic, &mut cursor), vec![3]);
    }

    #[test]
    fn test_drain_skips_evicted_values() {
        let topic = Topic::with_queue_size("evict", 2);
        let mut cursor = 0;

        topic.publish(1);
        assert_eq!(collect(&topic, &mut cursor), vec![1]);

        // 2 and 3 are evicted before the next poll
        for v in 2..=5 {
            topic.publish(v);
        }
        assert_eq!(collect(&topic, &mut cursor), vec![4, 5]);
        assert_eq!(cursor, 5);
    }

    #[test]
    fn test_update_returns_latest_only() {
        let topic = Topic::new("latest");
        let mut slot = None;
        let mut cursor = 0;

        assert!(!topic.update(&mut slot, &mut cursor));
        assert_eq!(slot, None);

        topic.publish(10);
        topic.publish(20);
        topic.publish(30);
        assert!(topic.update(&mut slot, &mut cursor));
        assert_eq!(slot, Some(30));
        assert_eq!(cursor, 3);
    }

    #[test]
    fn test_update_is_idempotent_without_publish() {
        let topic = Topic::new("idem");
        let mut slot = None;
        let mut cursor = 0;

        topic.publish(7);
        assert!(topic.update(&mut slot, &mut cursor));

        slot = Some(99);
        assert!(!topic.update(&mut slot, &mut cursor));
        assert_eq!(slot, Some(99));
        assert_eq!(cursor, 1);
    }

    #[test]
    fn test_shrinking_queue_is_lazy() {
        let topic = Topic::new("shrink");
        for v in 0..4 {
            topic.publish(v);
        }
        assert_eq!(topic.len(), 4);

        topic.set_queue_size(1);
        assert_eq!(topic.len(), 4);
        assert_eq!(topic.queue_size(), 1);

        topic.publish(4);
        assert_eq!(topic.len(), 1);
        assert_eq!(topic.latest(), Some(4));
    }

    #[test]
    fn test_zero_queue_size_still_advances_sequence() {
        let topic = Topic::with_queue_size("zero", 0);
        topic.publish(1);
        assert!(topic.is_empty());
        assert_eq!(topic.sequence(), 1);

        let mut cursor = 0;
        assert!(collect(&topic, &mut cursor).is_empty());
        assert_eq!(cursor, 1);
    }

    #[test]
    fn test_erased_view() {
        let topic: Arc<Topic<String>> = Arc::new(Topic::new("erased"));
        topic.publish("a".to_string());

        let erased: Arc<dyn ErasedTopic> = topic.clone();
        assert_eq!(erased.name(), "erased");
        assert_eq!(erased.payload_type(), TypeId::of::<String>());
        assert_eq!(erased.sequence(), 1);
        assert_eq!(erased.buffered(), 1);

        let back = erased.into_any().downcast::<Topic<String>>().unwrap();
        assert!(Arc::ptr_eq(&back, &topic));
    }

    #[test]
    fn test_slow_drain_does_not_block_publisher() {
        let topic = Arc::new(Topic::new("slow"));
        topic.publish(1);

        let (started_tx, started_rx) = mpsc::channel();
        let consumer = {
            let topic = Arc::clone(&topic);
            thread::spawn(move || {
                let mut cursor = 0;
                topic.drain(&mut cursor, |_| {
                    started_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(300));
                })
            })
        };

        started_rx.recv().unwrap();
        let before = Instant::now();
        topic.publish(2);
        assert!(before.elapsed() < Duration::from_millis(100));

        assert_eq!(consumer.join().unwrap(), 1);
        assert_eq!(topic.sequence(), 2);
    }

    #[test]
    fn test_callback_may_publish_to_own_topic() {
        let topic = Topic::with_queue_size("echo", 8);
        topic.publish(1);

        let mut cursor = 0;
        topic.drain(&mut cursor, |v| {
            topic.publish(v + 10);
        });
        assert_eq!(cursor, 1);
        assert_eq!(collect(&topic, &mut cursor), vec![11]);
    }

    #[test]
    fn test_cross_forwarding_between_topics_completes() {
        let a = Arc::new(Topic::with_queue_size("a", 64));
        let b = Arc::new(Topic::with_queue_size("b", 64));
        for v in 0..10 {
            a.publish(v);
            b.publish(v);
        }

        let barrier = Arc::new(Barrier::new(2));
        let (done_tx, done_rx) = mpsc::channel();
        for (from, to) in [(Arc::clone(&a), Arc::clone(&b)), (Arc::clone(&b), Arc::clone(&a))] {
            let barrier = Arc::clone(&barrier);
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                let mut cursor = 0;
                barrier.wait();
                from.drain(&mut cursor, |v| {
                    thread::sleep(Duration::from_millis(5));
                    to.publish(*v);
                });
                done_tx.send(()).unwrap();
            });
        }

        for _ in 0..2 {
            done_rx
                .recv_timeout(Duration::from_secs(2))
                .expect("forwarding threads deadlocked");
        }
        // Each side forwarded at least the ten values it started with
        assert!(a.sequence() >= 20);
        assert!(b.sequence() >= 20);
    }

    #[test]
    fn test_concurrent_publishers_never_repeat_sequence() {
        let topic = Arc::new(Topic::with_queue_size("contended", 1000));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let topic = Arc::clone(&topic);
                thread::spawn(move || {
                    (0..250)
                        .map(|i| topic.publish(t * 1000 + i))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seqs: Vec<Seq> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        seqs.sort_unstable();
        seqs.dedup();

        assert_eq!(seqs.len(), 1000);
        assert_eq!(topic.sequence(), 1000);
    }
}
