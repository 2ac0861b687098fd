//! # Runtime Context
//!
//! Everything nodes share at runtime: the topic registry and the shutdown
//! signal. It is built explicitly and passed to nodes at launch, so two
//! contexts never see each other's topics.

use std::sync::Arc;

use nodebus_topics::TopicRegistry;

use crate::shutdown::ShutdownSignal;

/// Shared state handed to every node thread.
#[derive(Clone, Default)]
pub struct RuntimeContext {
    registry: Arc<TopicRegistry>,
    shutdown: ShutdownSignal,
}

impl RuntimeContext {
    /// Create a context with an empty registry and an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Topic registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// Shutdown signal.
    #[must_use]
    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_are_isolated() {
        let a = RuntimeContext::new();
        let b = RuntimeContext::new();

        a.registry().find_or_create::<u8>("x").unwrap();
        a.shutdown().trigger();

        assert!(!b.registry().contains("x"));
        assert!(!b.shutdown().is_triggered());
    }

    #[test]
    fn test_clones_share_state() {
        let a = RuntimeContext::new();
        let b = a.clone();

        a.registry().find_or_create::<u8>("x").unwrap();
        a.shutdown().trigger();

        assert!(b.registry().contains("x"));
        assert!(b.shutdown().is_triggered());
    }
}
