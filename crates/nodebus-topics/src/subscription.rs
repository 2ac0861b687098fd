//! # Subscriptions
//!
//! Per-consumer cursors into a [`Topic`]. Each subscription is bound to one
//! topic for its whole life and only ever moves its cursor forward.

use std::sync::Arc;

use crate::error::TopicError;
use crate::registry::TopicRegistry;
use crate::topic::{Seq, Topic};
use crate::NEVER_SEEN;

/// "Current state" consumer: always the newest value, possibly skipping
/// history.
///
/// `value()` stays `None` until the first delivery; callers should treat that
/// as a normal startup transient, not an error.
pub struct ValueSubscription<T> {
    topic: Arc<Topic<T>>,
    cursor: Seq,
    value: Option<T>,
}

impl<T> ValueSubscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Subscribe to `name`, creating the topic if nobody has yet.
    pub fn new(registry: &TopicRegistry, name: &str) -> Result<Self, TopicError> {
        Ok(Self::from_topic(registry.find_or_create(name)?))
    }

    /// Subscribe to an already resolved topic.
    #[must_use]
    pub fn from_topic(topic: Arc<Topic<T>>) -> Self {
        Self {
            topic,
            cursor: NEVER_SEEN,
            value: None,
        }
    }

    /// Pull the newest value if one arrived since the last poll.
    ///
    /// Returns `true` when the stored value changed.
    pub fn update(&mut self) -> bool {
        self.topic.update(&mut self.value, &mut self.cursor)
    }

    /// Most recently delivered value.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Whether any value was ever delivered.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Sequence number of the last delivered value.
    #[must_use]
    pub fn cursor(&self) -> Seq {
        self.cursor
    }

    /// Topic this subscription reads from.
    #[must_use]
    pub fn topic(&self) -> &Arc<Topic<T>> {
        &self.topic
    }
}

/// "Event stream" consumer: every buffered value exactly once, in publish
/// order.
///
/// A consumer that polls less often than the topic's retention window loses
/// the evicted values silently; producers are never stalled.
pub struct QueueSubscription<T> {
    topic: Arc<Topic<T>>,
    cursor: Seq,
}

impl<T> QueueSubscription<T>
where
    T: Send + Sync + 'static,
{
    /// Subscribe to `name`, creating the topic if nobody has yet.
    pub fn new(registry: &TopicRegistry, name: &str) -> Result<Self, TopicError> {
        Ok(Self::from_topic(registry.find_or_create(name)?))
    }

    /// Subscribe to an already resolved topic.
    #[must_use]
    pub fn from_topic(topic: Arc<Topic<T>>) -> Self {
        Self {
            topic,
            cursor: NEVER_SEEN,
        }
    }

    /// Invoke `callback` for each unseen buffered value, oldest first.
    ///
    /// Returns the number of values delivered.
    pub fn update<F>(&mut self, callback: F) -> usize
    where
        F: FnMut(&T),
    {
        self.topic.drain(&mut self.cursor, callback)
    }

    /// Sequence number of the newest value processed.
    #[must_use]
    pub fn cursor(&self) -> Seq {
        self.cursor
    }

    /// Topic this subscription reads from.
    #[must_use]
    pub fn topic(&self) -> &Arc<Topic<T>> {
        &self.topic
    }
}
