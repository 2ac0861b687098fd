//! # Node Contract
//!
//! A node is a name, an optional defaults hook and a run body. The runtime
//! holds launched nodes as `Box<dyn Node>` and drives each one through the
//! same lifecycle:
//!
//! ```text
//!  Init ──declare_defaults──► (params frozen) ──spawn──► Running ──► Stopped
//!                                                            │
//!                                                            └─────► Failed
//! ```

use std::fmt;
use std::time::Duration;

use nodebus_params::{ParamDefaults, ParamError, Params};

use crate::node_context::NodeContext;

/// Lifecycle state of a launched node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Launched, defaults not yet frozen.
    Init,
    /// Thread started, run body executing.
    Running,
    /// Run body returned `Ok`.
    Stopped,
    /// Run body returned an error or panicked.
    Failed,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Trait that every node implements to be launched by the runtime.
pub trait Node: Send + 'static {
    /// Unique node name; also used as the thread name and the `~` parameter
    /// namespace.
    fn name(&self) -> &str;

    /// Declare default parameters. Runs on the launching thread before any
    /// node thread exists.
    fn declare_defaults(&self, _defaults: &mut ParamDefaults<'_>) -> Result<(), ParamError> {
        Ok(())
    }

    /// Loop period this node asks for.
    ///
    /// `<name>/period_s` in the parameters wins over it; `None` falls back to
    /// the runtime's default period.
    fn period(&self) -> Option<Duration> {
        None
    }

    /// Node body, run on a dedicated thread.
    ///
    /// The body must call [`NodeContext::loop_check`] once per iteration and
    /// return when it yields `false`; a body that never does so is never
    /// stopped.
    fn run(&mut self, ctx: &mut NodeContext, params: &Params) -> anyhow::Result<()>;
}

type DefaultsHook = Box<dyn Fn(&mut ParamDefaults<'_>) -> Result<(), ParamError> + Send>;
type RunBody = Box<dyn FnMut(&mut NodeContext, &Params) -> anyhow::Result<()> + Send>;

/// A node assembled from closures.
pub struct FnNode {
    name: String,
    period: Option<Duration>,
    defaults: Option<DefaultsHook>,
    body: RunBody,
}

impl FnNode {
    /// Create a node from its run body.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnMut(&mut NodeContext, &Params) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            period: None,
            defaults: None,
            body: Box::new(body),
        }
    }

    /// Attach a defaults hook.
    #[must_use]
    pub fn with_defaults<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ParamDefaults<'_>) -> Result<(), ParamError> + Send + 'static,
    {
        self.defaults = Some(Box::new(hook));
        self
    }

    /// Override the default loop period.
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }
}

impl Node for FnNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare_defaults(&self, defaults: &mut ParamDefaults<'_>) -> Result<(), ParamError> {
        match &self.defaults {
            Some(hook) => hook(defaults),
            None => Ok(()),
        }
    }

    fn period(&self) -> Option<Duration> {
        self.period
    }

    fn run(&mut self, ctx: &mut NodeContext, params: &Params) -> anyhow::Result<()> {
        (self.body)(ctx, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodebus_params::ParameterStore;
    use serde_json::json;

    #[test]
    fn test_fn_node_capabilities() {
        let node = FnNode::new("worker", |_, _| Ok(()))
            .with_period(Duration::from_millis(5))
            .with_defaults(|d| d.set("~/gain", 2));

        assert_eq!(node.name(), "worker");
        assert_eq!(node.period(), Some(Duration::from_millis(5)));
        assert_eq!(FnNode::new("idle", |_, _| Ok(())).period(), None);

        let mut store = ParameterStore::new();
        store
            .declare_defaults(node.name(), |d| node.declare_defaults(d))
            .unwrap();
        assert_eq!(store.finalize().document(), &json!({"worker": {"gain": 2}}));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(NodeStatus::Running.to_string(), "running");
        assert_eq!(NodeStatus::Failed.to_string(), "failed");
    }
}
