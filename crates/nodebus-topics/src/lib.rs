//! # nodebus Topics - Named, Typed, Bounded-History Channels
//!
//! Nodes never talk to each other directly. Every interaction goes through a
//! [`Topic`] looked up by name in a [`TopicRegistry`].
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────┐                       ┌──────────────┐
//! │   Node A     │                       │   Node B     │
//! │              │  publish()            │              │
//! │              │ ──────┐               │              │
//! └──────────────┘       │               └──────────────┘
//!                        ▼                       ↑
//!              ┌───────────────────┐             │ update() / drain()
//!              │  Topic<T> "name"  │ ────────────┘
//!              │  [seq 5][6][7][8] │
//!              └───────────────────┘
//! ```
//!
//! ## Consumption Disciplines
//!
//! - [`ValueSubscription`]: latest value only, may skip history
//! - [`QueueSubscription`]: every buffered value exactly once, in order;
//!   values evicted by the retention bound are lost to slow consumers
//!
//! ## Locking
//!
//! One registry lock for lookup/creation, one lock per topic for
//! publish/consume. Neither is held across a sleep or a subscriber callback.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod registry;
pub mod subscription;
pub mod topic;

// Re-export main types
pub use error::TopicError;
pub use registry::{TopicInfo, TopicRegistry};
pub use subscription::{QueueSubscription, ValueSubscription};
pub use topic::{ErasedTopic, Seq, Topic};

/// Retention bound of a freshly created topic.
pub const DEFAULT_QUEUE_SIZE: usize = 4;

/// Cursor value of a subscription that has never observed a publish.
pub const NEVER_SEEN: Seq = 0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_queue_size() {
        assert_eq!(DEFAULT_QUEUE_SIZE, 4);
    }

    #[test]
    fn test_never_seen_is_zero() {
        assert_eq!(NEVER_SEEN, 0);
    }
}
