//! # Node Context
//!
//! Per-node handle created on the node's own thread. It owns the node's
//! subscriptions and pacing state, and implements the loop check:
//!
//! 1. shutdown requested → return `false`
//! 2. dispatch every pending subscription delivery
//! 3. sleep for what is left of the period, or log an overrun
//! 4. record the timestamp → return `true`
//!
//! The context holds closures that are not `Send`, which pins it (and every
//! [`Latest`] it hands out) to the node thread.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nodebus_params::namespaced;
use nodebus_telemetry::metrics::{LOOP_ITERATIONS, LOOP_OVERRUNS, LOOP_SLEEP};
use nodebus_topics::{QueueSubscription, Topic, TopicError, TopicRegistry, ValueSubscription};
use tracing::{debug, warn};

use crate::clock::{self, Pacing, Time};
use crate::context::RuntimeContext;
use crate::shutdown::ShutdownSignal;

/// Reader for the newest value delivered to a value subscription.
///
/// Shares the subscription with the node's callback dispatch, which is the
/// only place it advances, so a node reads a stable value for the whole
/// iteration.
pub struct Latest<T> {
    subscription: Rc<RefCell<ValueSubscription<T>>>,
}

impl<T> Latest<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Whether any value was ever delivered.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.subscription.borrow().is_set()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.subscription.borrow().value())
    }

    /// Clone of the current value, `None` until the first delivery.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.subscription.borrow().value().cloned()
    }
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            subscription: Rc::clone(&self.subscription),
        }
    }
}

/// Consumption discipline of a registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionKind {
    /// Latest value only.
    Value,
    /// Every buffered value, in order.
    Queue,
}

struct SubscriptionEntry {
    kind: SubscriptionKind,
    deliver: Box<dyn FnMut()>,
}

/// Runtime handle of one node, used from inside its run body.
pub struct NodeContext {
    name: String,
    runtime: RuntimeContext,
    period: Duration,
    last_check: Time,
    subscriptions: BTreeMap<String, SubscriptionEntry>,
    iterations: u64,
}

impl NodeContext {
    /// Create a context for `name`. The first loop check measures elapsed
    /// time from this call.
    #[must_use]
    pub fn new(name: impl Into<String>, runtime: RuntimeContext, period: Duration) -> Self {
        Self {
            name: name.into(),
            runtime,
            period,
            last_check: clock::now(),
            subscriptions: BTreeMap::new(),
            iterations: 0,
        }
    }

    /// Node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current loop period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Change the loop period; takes effect at the next loop check.
    pub fn set_period(&mut self, period: Duration) {
        debug!(node = %self.name, period_ms = period.as_secs_f64() * 1e3, "Period changed");
        self.period = period;
    }

    /// Number of loop checks that returned `true`.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Topic registry shared with every other node.
    #[must_use]
    pub fn registry(&self) -> &Arc<TopicRegistry> {
        self.runtime.registry()
    }

    /// Shutdown signal shared with every other node.
    #[must_use]
    pub fn shutdown(&self) -> &ShutdownSignal {
        self.runtime.shutdown()
    }

    /// Expand the `~` placeholder in a parameter key to this node's name.
    #[must_use]
    pub fn param_key(&self, key: &str) -> String {
        namespaced(key, &self.name)
    }

    /// Topic to publish on. Several producers may share one topic.
    pub fn publisher<T>(&self, topic: &str) -> Result<Arc<Topic<T>>, TopicError>
    where
        T: Send + Sync + 'static,
    {
        self.registry().find_or_create(topic)
    }

    /// Topic to publish on, seeded with `initial` if this call creates it.
    pub fn publisher_with<T>(&self, topic: &str, initial: T) -> Result<Arc<Topic<T>>, TopicError>
    where
        T: Send + Sync + 'static,
    {
        self.registry().find_or_create_with(topic, initial)
    }

    /// Keep a [`Latest`] up to date with the newest value on `topic`.
    ///
    /// The value is refreshed during every loop check.
    pub fn subscribe_value<T>(&mut self, topic: &str) -> Result<Latest<T>, TopicError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let subscription = ValueSubscription::<T>::new(self.registry(), topic)?;
        let latest = Latest {
            subscription: Rc::new(RefCell::new(subscription)),
        };
        let shared = Rc::clone(&latest.subscription);

        self.register(
            topic,
            SubscriptionKind::Value,
            Box::new(move || {
                shared.borrow_mut().update();
            }),
        );
        Ok(latest)
    }

    /// Run `callback` for every value on `topic`, in publish order, during
    /// each loop check.
    ///
    /// The callback runs after the topic lock is released, so it may publish
    /// to any topic, this one included.
    pub fn subscribe_queue<T, F>(&mut self, topic: &str, mut callback: F) -> Result<(), TopicError>
    where
        T: Send + Sync + 'static,
        F: FnMut(&T) + 'static,
    {
        let mut subscription = QueueSubscription::<T>::new(self.registry(), topic)?;

        self.register(
            topic,
            SubscriptionKind::Queue,
            Box::new(move || {
                subscription.update(&mut callback);
            }),
        );
        Ok(())
    }

    /// Topics this node subscribes to, with their discipline.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<(String, SubscriptionKind)> {
        self.subscriptions
            .iter()
            .map(|(topic, entry)| (topic.clone(), entry.kind))
            .collect()
    }

    /// Deliver pending values to every subscription, one after another.
    pub fn handle_callbacks(&mut self) {
        for entry in self.subscriptions.values_mut() {
            (entry.deliver)();
        }
    }

    /// Per-iteration check: dispatch callbacks, pace to the period, and
    /// report whether the node should keep running.
    pub fn loop_check(&mut self) -> bool {
        if self.shutdown().is_triggered() {
            debug!(node = %self.name, "Shutdown observed");
            return false;
        }

        self.handle_callbacks();

        let elapsed = clock::now().duration_since(self.last_check);
        match clock::pacing(self.period, elapsed) {
            Pacing::Sleep(remaining) => {
                debug!(
                    node = %self.name,
                    sleep_ms = remaining.as_secs_f64() * 1e3,
                    "Sleeping for rest of period"
                );
                LOOP_SLEEP.observe(remaining.as_secs_f64());
                thread::sleep(remaining);
            }
            Pacing::Overrun(excess) => {
                warn!(
                    node = %self.name,
                    period_ms = self.period.as_secs_f64() * 1e3,
                    overrun_ms = excess.as_secs_f64() * 1e3,
                    "Loop overran its period"
                );
                LOOP_OVERRUNS.with_label_values(&[&self.name]).inc();
            }
        }

        self.last_check = clock::now();
        self.iterations += 1;
        LOOP_ITERATIONS.with_label_values(&[&self.name]).inc();
        true
    }

    fn register(&mut self, topic: &str, kind: SubscriptionKind, deliver: Box<dyn FnMut()>) {
        let previous = self
            .subscriptions
            .insert(topic.to_string(), SubscriptionEntry { kind, deliver });

        if previous.is_some() {
            warn!(node = %self.name, topic, "Replaced existing subscription");
        } else {
            debug!(node = %self.name, topic, ?kind, "Subscribed");
        }
    }
}
