//! Demo nodes run by the `nodebus` binary.
//!
//! `talker` publishes a counter and a greeting; `listener` logs every
//! counter value and the newest greeting.

use std::time::Duration;

use nodebus_params::{ParamDefaults, ParamError, Params};
use serde_json::json;
use tracing::info;

use crate::node::Node;
use crate::node_context::NodeContext;

/// Topic carrying the talker's counter.
pub const COUNTER_TOPIC: &str = "chatter/count";
/// Topic carrying the talker's greeting.
pub const GREETING_TOPIC: &str = "chatter/greeting";

/// Publishes an incrementing counter every period.
#[derive(Debug, Default)]
pub struct Talker {
    count: u64,
}

impl Talker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Node for Talker {
    fn name(&self) -> &str {
        "talker"
    }

    fn declare_defaults(&self, defaults: &mut ParamDefaults<'_>) -> Result<(), ParamError> {
        defaults.merge(
            "~",
            json!({
                "greeting": "hello",
                "step": 1,
                "queue_size": 8
            }),
        )
    }

    fn period(&self) -> Option<Duration> {
        Some(Duration::from_millis(500))
    }

    fn run(&mut self, ctx: &mut NodeContext, params: &Params) -> anyhow::Result<()> {
        let greeting: String = params.node_get_as(ctx.name(), "~/greeting")?;
        let step: u64 = params.node_get_as(ctx.name(), "~/step")?;
        let queue_size: usize = params.node_get_as(ctx.name(), "~/queue_size")?;

        let counter = ctx.publisher::<u64>(COUNTER_TOPIC)?;
        counter.set_queue_size(queue_size);
        let greetings = ctx.publisher_with::<String>(GREETING_TOPIC, greeting.clone())?;

        while ctx.loop_check() {
            self.count += step;
            let seq = counter.publish(self.count);
            if self.count % 10 == 0 {
                greetings.publish(format!("{greeting} #{}", self.count));
            }
            info!(node = %ctx.name(), count = self.count, seq, "Published");
        }
        Ok(())
    }
}

/// Logs everything the talker publishes.
#[derive(Debug, Default)]
pub struct Listener;

impl Node for Listener {
    fn name(&self) -> &str {
        "listener"
    }

    fn run(&mut self, ctx: &mut NodeContext, _params: &Params) -> anyhow::Result<()> {
        let name = ctx.name().to_string();
        ctx.subscribe_queue::<u64, _>(COUNTER_TOPIC, move |count| {
            info!(node = %name, count, "Heard");
        })?;
        let greeting = ctx.subscribe_value::<String>(GREETING_TOPIC)?;

        let mut last_greeting = None;
        while ctx.loop_check() {
            let current = greeting.get();
            if current != last_greeting {
                if let Some(text) = &current {
                    info!(node = %ctx.name(), greeting = %text, "New greeting");
                }
                last_greeting = current;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RuntimeContext;
    use nodebus_params::ParameterStore;
    use std::thread;

    fn frozen_params(node: &dyn Node) -> Params {
        let mut store = ParameterStore::new();
        store
            .declare_defaults(node.name(), |d| node.declare_defaults(d))
            .unwrap();
        store.finalize()
    }

    #[test]
    fn test_talker_defaults() {
        let params = frozen_params(&Talker::new());
        assert_eq!(params.get_as::<String>("talker/greeting").unwrap(), "hello");
        assert_eq!(params.get_as::<usize>("talker/queue_size").unwrap(), 8);
    }

    #[test]
    fn test_talker_publishes_until_shutdown() {
        let runtime = RuntimeContext::new();
        let params = frozen_params(&Talker::new());
        let counter = runtime.registry().find_or_create::<u64>(COUNTER_TOPIC).unwrap();

        let worker_ctx = runtime.clone();
        let handle = thread::spawn(move || {
            let mut talker = Talker::new();
            let mut ctx = NodeContext::new("talker", worker_ctx, Duration::from_millis(1));
            talker.run(&mut ctx, &params)
        });

        while counter.sequence() < 3 {
            thread::sleep(Duration::from_millis(1));
        }
        runtime.shutdown().trigger();
        handle.join().unwrap().unwrap();

        assert_eq!(counter.queue_size(), 8);
        assert_eq!(counter.latest(), Some(counter.sequence()));
    }
}
