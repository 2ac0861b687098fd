//! # Topic Registry
//!
//! Name → topic lookup with a checked payload type.
//!
//! There is no process-wide registry. Each runtime context owns one and hands
//! it to every node it launches.

use std::any::TypeId;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::TopicError;
use crate::topic::{ErasedTopic, Seq, Topic};

/// Snapshot of one registered topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicInfo {
    /// Topic name.
    pub name: String,
    /// Payload type name.
    pub type_name: &'static str,
    /// Newest sequence number.
    pub sequence: Seq,
    /// Values currently buffered.
    pub buffered: usize,
    /// Retention bound.
    pub queue_size: usize,
}

#[derive(Default)]
struct RegistryState {
    topics: HashMap<String, Arc<dyn ErasedTopic>>,
    tags: HashMap<String, BTreeSet<String>>,
}

/// Registry of every topic in one runtime context.
///
/// Topics are never removed: once a name is bound to a payload type it stays
/// bound for the registry's lifetime.
#[derive(Default)]
pub struct TopicRegistry {
    state: Mutex<RegistryState>,
}

impl TopicRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the topic bound to `name`, creating it if it does not exist yet.
    ///
    /// # Errors
    ///
    /// - [`TopicError::TypeMismatch`] if `name` is bound to another payload type
    /// - [`TopicError::InvalidName`] if `name` is empty
    pub fn find_or_create<T>(&self, name: &str) -> Result<Arc<Topic<T>>, TopicError>
    where
        T: Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        Self::find_or_create_locked(&mut state, name, None)
    }

    /// Like [`find_or_create`](Self::find_or_create), but a newly created
    /// topic immediately publishes `initial`, so subscribers created later see
    /// a value before any real publish. An existing topic is left untouched.
    pub fn find_or_create_with<T>(&self, name: &str, initial: T) -> Result<Arc<Topic<T>>, TopicError>
    where
        T: Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        Self::find_or_create_locked(&mut state, name, Some(initial))
    }

    /// Like [`find_or_create`](Self::find_or_create), and records `name`
    /// under `tag` for [`topics_by_tag`](Self::topics_by_tag).
    pub fn find_or_create_tagged<T>(&self, name: &str, tag: &str) -> Result<Arc<Topic<T>>, TopicError>
    where
        T: Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        let topic = Self::find_or_create_locked(&mut state, name, None)?;
        state
            .tags
            .entry(tag.to_string())
            .or_default()
            .insert(name.to_string());
        Ok(topic)
    }

    /// Names of every topic registered under `tag`.
    ///
    /// A node can use this to see which topics something has asked for before
    /// spending time producing them.
    #[must_use]
    pub fn topics_by_tag(&self, tag: &str) -> BTreeSet<String> {
        self.state
            .lock()
            .tags
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether a topic is bound to `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().topics.contains_key(name)
    }

    /// Number of registered topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().topics.len()
    }

    /// Whether no topic is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().topics.is_empty()
    }

    /// Snapshot of every registered topic, sorted by name.
    #[must_use]
    pub fn topics(&self) -> Vec<TopicInfo> {
        let handles: Vec<Arc<dyn ErasedTopic>> =
            self.state.lock().topics.values().cloned().collect();

        // Per-topic locks are taken after the registry lock is released.
        let mut infos: Vec<TopicInfo> = handles
            .iter()
            .map(|topic| TopicInfo {
                name: topic.name().to_string(),
                type_name: topic.type_name(),
                sequence: topic.sequence(),
                buffered: topic.buffered(),
                queue_size: topic.queue_size(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    fn find_or_create_locked<T>(
        state: &mut RegistryState,
        name: &str,
        initial: Option<T>,
    ) -> Result<Arc<Topic<T>>, TopicError>
    where
        T: Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(TopicError::InvalidName(name.to_string()));
        }

        if let Some(existing) = state.topics.get(name) {
            return Self::downcast(name, Arc::clone(existing));
        }

        let topic = Arc::new(Topic::<T>::new(name));
        if let Some(initial) = initial {
            topic.publish(initial);
        }
        state
            .topics
            .insert(name.to_string(), Arc::clone(&topic) as Arc<dyn ErasedTopic>);

        debug!(
            topic = name,
            payload = std::any::type_name::<T>(),
            "Topic created"
        );
        Ok(topic)
    }

    fn downcast<T>(name: &str, erased: Arc<dyn ErasedTopic>) -> Result<Arc<Topic<T>>, TopicError>
    where
        T: Send + Sync + 'static,
    {
        let mismatch = || TopicError::TypeMismatch {
            topic: name.to_string(),
            expected: std::any::type_name::<T>(),
            found: erased.type_name(),
        };

        if erased.payload_type() != TypeId::of::<T>() {
            return Err(mismatch());
        }
        let err = mismatch();
        erased.into_any().downcast::<Topic<T>>().map_err(|_| err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_same_name_returns_same_topic() {
        let registry = TopicRegistry::new();
        let a = registry.find_or_create::<i32>("numbers").unwrap();
        let b = registry.find_or_create::<i32>("numbers").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        a.publish(1);
        assert_eq!(b.sequence(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let registry = TopicRegistry::new();
        registry.find_or_create::<i32>("numbers").unwrap();

        let err = registry.find_or_create::<f32>("numbers").err().unwrap();
        assert_eq!(
            err,
            TopicError::TypeMismatch {
                topic: "numbers".to_string(),
                expected: "f32",
                found: "i32",
            }
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let registry = TopicRegistry::new();
        assert!(matches!(
            registry.find_or_create::<i32>(""),
            Err(TopicError::InvalidName(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_initial_value_only_on_creation() {
        let registry = TopicRegistry::new();
        let topic = registry.find_or_create_with("flag", false).unwrap();
        assert_eq!(topic.sequence(), 1);
        assert_eq!(topic.latest(), Some(false));

        let again = registry.find_or_create_with("flag", true).unwrap();
        assert_eq!(again.sequence(), 1);
        assert_eq!(again.latest(), Some(false));
    }

    #[test]
    fn test_tags() {
        let registry = TopicRegistry::new();
        registry.find_or_create_tagged::<u8>("camera/left", "images").unwrap();
        registry.find_or_create_tagged::<u8>("camera/right", "images").unwrap();
        registry.find_or_create::<u8>("imu").unwrap();

        let tagged = registry.topics_by_tag("images");
        assert_eq!(
            tagged.into_iter().collect::<Vec<_>>(),
            vec!["camera/left".to_string(), "camera/right".to_string()]
        );
        assert!(registry.topics_by_tag("missing").is_empty());
    }

    #[test]
    fn test_topic_listing_sorted() {
        let registry = TopicRegistry::new();
        registry.find_or_create::<String>("b").unwrap().publish("x".into());
        registry.find_or_create::<u64>("a").unwrap();

        let infos = registry.topics();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].name, "a");
        assert_eq!(infos[0].sequence, 0);
        assert_eq!(infos[1].name, "b");
        assert_eq!(infos[1].buffered, 1);
        assert_eq!(infos[1].type_name, std::any::type_name::<String>());
    }

    #[test]
    fn test_concurrent_find_or_create_yields_one_topic() {
        let registry = Arc::new(TopicRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.find_or_create::<u32>("shared").unwrap())
            })
            .collect();

        let topics: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(topics.iter().all(|t| Arc::ptr_eq(t, &topics[0])));
        assert_eq!(registry.len(), 1);
    }
}
