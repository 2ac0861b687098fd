//! # nodebus Runtime
//!
//! Runs nodes: named units of work, one OS thread each, that talk only
//! through typed topics and read their configuration from a frozen
//! parameter document.
//!
//! ## Lifecycle
//!
//! ```text
//!  Runtime::launch(node) ...            Runtime::start()
//!  ┌──────────────────────┐   ┌─────────────────────────────────────────┐
//!  │ nodes registered     │──►│ defaults → patch file → freeze          │
//!  │ (status: init)       │   │ spawn thread per node (status: running) │
//!  └──────────────────────┘   │ join all → RunReport (stopped / failed) │
//!                             └─────────────────────────────────────────┘
//! ```
//!
//! ## Node Loop
//!
//! ```rust,ignore
//! fn run(&mut self, ctx: &mut NodeContext, params: &Params) -> anyhow::Result<()> {
//!     let speed = ctx.subscribe_value::<f64>("speed")?;
//!     let out = ctx.publisher::<f64>("speed_doubled")?;
//!     while ctx.loop_check() {
//!         if let Some(v) = speed.get() {
//!             out.publish(v * 2.0);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Shutdown is cooperative: the signal is observed by the next
//! [`NodeContext::loop_check`] of every node.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod context;
pub mod demo;
pub mod error;
pub mod node;
pub mod node_context;
pub mod runtime;
pub mod shutdown;
pub mod signal;

pub use context::RuntimeContext;
pub use error::RuntimeError;
pub use node::{FnNode, Node, NodeStatus};
pub use node_context::{Latest, NodeContext, SubscriptionKind};
pub use runtime::{RunReport, Runtime, RuntimeConfig, StatusBoard};
pub use shutdown::ShutdownSignal;
pub use signal::{capture_interrupt, run_until_interrupt};

pub use nodebus_params::{ParamDefaults, ParamError, ParamSource, Params};
pub use nodebus_topics::{Topic, TopicError, TopicRegistry};
