//! # Runtime Orchestrator
//!
//! Owns the launched nodes until [`Runtime::start`], which:
//!
//! 1. collects every node's defaults into one [`ParameterStore`]
//! 2. applies the patch file and freezes the store
//! 3. spawns one named OS thread per node
//! 4. joins every thread and reports each node's final status
//!
//! A configuration error in steps 1-2 returns before any thread exists.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nodebus_params::{ParamSource, ParameterStore, Params};
use nodebus_telemetry::metrics::NODES_RUNNING;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::clock::{period_from_secs, DEFAULT_PERIOD};
use crate::context::RuntimeContext;
use crate::error::RuntimeError;
use crate::node::{Node, NodeStatus};
use crate::node_context::NodeContext;
use crate::shutdown::ShutdownSignal;

/// Parameter key, relative to the node name, that overrides its period.
pub const PERIOD_KEY: &str = "period_s";

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Where the parameter patch comes from.
    pub param_source: ParamSource,
    /// Period of nodes that configure none.
    pub default_period: Duration,
}

impl RuntimeConfig {
    /// Configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            param_source: ParamSource::from_env(),
            default_period: DEFAULT_PERIOD,
        }
    }

    /// Use an explicit parameter file.
    #[must_use]
    pub fn with_params_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.param_source = ParamSource::Explicit(path.into());
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            param_source: ParamSource::default(),
            default_period: DEFAULT_PERIOD,
        }
    }
}

/// Shared view of every node's lifecycle status.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<BTreeMap<String, NodeStatus>>>,
}

impl StatusBoard {
    fn set(&self, node: &str, status: NodeStatus) {
        self.inner.write().insert(node.to_string(), status);
    }

    fn contains(&self, node: &str) -> bool {
        self.inner.read().contains_key(node)
    }

    /// Current status of `node`, if it was launched.
    #[must_use]
    pub fn get(&self, node: &str) -> Option<NodeStatus> {
        self.inner.read().get(node).copied()
    }

    /// Number of nodes in `status`.
    #[must_use]
    pub fn count(&self, status: NodeStatus) -> usize {
        self.inner.read().values().filter(|s| **s == status).count()
    }

    /// Copy of every node's status, ordered by name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, NodeStatus> {
        self.inner.read().clone()
    }
}

/// Final status of every node after [`Runtime::start`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    statuses: BTreeMap<String, NodeStatus>,
}

impl RunReport {
    /// Final status of `node`.
    #[must_use]
    pub fn status(&self, node: &str) -> Option<NodeStatus> {
        self.statuses.get(node).copied()
    }

    /// Every node's final status, ordered by name.
    #[must_use]
    pub fn statuses(&self) -> &BTreeMap<String, NodeStatus> {
        &self.statuses
    }

    /// Names of nodes that failed.
    #[must_use]
    pub fn failed(&self) -> Vec<&str> {
        self.statuses
            .iter()
            .filter(|(_, status)| **status == NodeStatus::Failed)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Whether every node stopped cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.statuses.values().all(|s| *s == NodeStatus::Stopped)
    }
}

/// Launches nodes and runs each on its own thread.
pub struct Runtime {
    config: RuntimeConfig,
    context: RuntimeContext,
    nodes: Vec<Box<dyn Node>>,
    board: StatusBoard,
}

impl Runtime {
    /// Create a runtime with a fresh context.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_context(config, RuntimeContext::new())
    }

    /// Create a runtime whose nodes share an existing context.
    #[must_use]
    pub fn with_context(config: RuntimeConfig, context: RuntimeContext) -> Self {
        Self {
            config,
            context,
            nodes: Vec::new(),
            board: StatusBoard::default(),
        }
    }

    /// Shared registry and shutdown signal.
    #[must_use]
    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    /// Handle to request shutdown, usable from any thread.
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.context.shutdown().clone()
    }

    /// Handle to watch node statuses while [`start`](Self::start) blocks.
    #[must_use]
    pub fn status_board(&self) -> StatusBoard {
        self.board.clone()
    }

    /// Register a node. It does not run until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// [`RuntimeError::DuplicateNode`] if a node with the same name exists.
    pub fn launch<N: Node>(&mut self, node: N) -> Result<(), RuntimeError> {
        self.launch_boxed(Box::new(node))
    }

    /// [`launch`](Self::launch) for an already boxed node.
    pub fn launch_boxed(&mut self, node: Box<dyn Node>) -> Result<(), RuntimeError> {
        let name = node.name().to_string();
        if self.board.contains(&name) {
            return Err(RuntimeError::DuplicateNode(name));
        }

        debug!(node = %name, "Node launched");
        self.board.set(&name, NodeStatus::Init);
        self.nodes.push(node);
        Ok(())
    }

    /// Freeze parameters, run every node on its own thread and block until
    /// all of them returned.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Params`] if defaults or the patch file cannot be
    ///   applied; no thread is started
    /// - [`RuntimeError::Spawn`] if a thread cannot be created; shutdown is
    ///   triggered and already started nodes are joined first
    pub fn start(self) -> Result<RunReport, RuntimeError> {
        let Self {
            config,
            context,
            nodes,
            board,
        } = self;

        let params = freeze_params(&config.param_source, &nodes)?;
        info!(nodes = nodes.len(), "Parameters frozen, starting node threads");

        let mut handles = Vec::with_capacity(nodes.len());
        for node in nodes {
            let name = node.name().to_string();
            let period = resolve_period(&params, node.as_ref(), config.default_period);
            let spawned = spawn_node(node, period, context.clone(), params.clone(), board.clone());

            match spawned {
                Ok(handle) => handles.push((name, handle)),
                Err(source) => {
                    error!(node = %name, error = %source, "Failed to spawn node thread");
                    board.set(&name, NodeStatus::Failed);
                    context.shutdown().trigger();
                    join_nodes(handles, &board);
                    return Err(RuntimeError::Spawn { node: name, source });
                }
            }
        }

        join_nodes(handles, &board);
        let report = RunReport {
            statuses: board.snapshot(),
        };
        info!(failed = report.failed().len(), "All nodes joined");
        Ok(report)
    }
}

fn freeze_params(source: &ParamSource, nodes: &[Box<dyn Node>]) -> Result<Params, RuntimeError> {
    let mut store = ParameterStore::new();
    for node in nodes {
        store.declare_defaults(node.name(), |defaults| node.declare_defaults(defaults))?;
    }

    if !store.load_patch(source)? {
        debug!(path = %source.path().display(), "Running on node defaults only");
    }
    Ok(store.finalize())
}

fn resolve_period(params: &Params, node: &dyn Node, fallback: Duration) -> Duration {
    let key = format!("{}/{}", node.name(), PERIOD_KEY);
    let requested = node.period().unwrap_or(fallback);

    match params.value(&key) {
        None => requested,
        Some(value) => match value.as_f64().and_then(period_from_secs) {
            Some(period) => period,
            None => {
                warn!(node = %node.name(), %value, "Ignoring invalid period parameter");
                requested
            }
        },
    }
}

fn spawn_node(
    node: Box<dyn Node>,
    period: Duration,
    context: RuntimeContext,
    params: Params,
    board: StatusBoard,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(node.name().to_string())
        .spawn(move || run_node(node, period, context, &params, &board))
}

fn run_node(
    mut node: Box<dyn Node>,
    period: Duration,
    context: RuntimeContext,
    params: &Params,
    board: &StatusBoard,
) {
    let name = node.name().to_string();
    let mut ctx = NodeContext::new(name.as_str(), context, period);

    board.set(&name, NodeStatus::Running);
    NODES_RUNNING.inc();
    info!(node = %name, period_ms = period.as_secs_f64() * 1e3, "Node running");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| node.run(&mut ctx, params)));
    NODES_RUNNING.dec();

    let status = match outcome {
        Ok(Ok(())) => {
            info!(node = %name, iterations = ctx.iterations(), "Node stopped");
            NodeStatus::Stopped
        }
        Ok(Err(err)) => {
            let chain = format!("{err:#}");
            error!(node = %name, error = %chain, "Node failed");
            NodeStatus::Failed
        }
        Err(payload) => {
            error!(node = %name, panic = panic_message(payload.as_ref()), "Node panicked");
            NodeStatus::Failed
        }
    };
    board.set(&name, status);
}

fn join_nodes(handles: Vec<(String, JoinHandle<()>)>, board: &StatusBoard) {
    for (name, handle) in handles {
        if handle.join().is_err() {
            // Only reachable if unwinding escaped the node's own catch
            board.set(&name, NodeStatus::Failed);
        }
        debug!(node = %name, "Node thread joined");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}
