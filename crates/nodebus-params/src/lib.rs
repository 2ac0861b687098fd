//! # nodebus Params - Frozen Shared Configuration
//!
//! Parameters are writable only while the runtime is being set up, and
//! read-only once any node starts running. That gives every node thread
//! lock-free access to one consistent document.
//!
//! ## Phases
//!
//! ```text
//!   OPEN                                             FROZEN
//! ┌────────────────────────────────────────────┐   ┌──────────────────┐
//! │ declare_defaults(node A) ─┐                │   │                  │
//! │ declare_defaults(node B) ─┼─► merge-patch ─┼──►│  Arc<Value>      │
//! │ patch file (RFC 7386) ────┘                │   │  shared by nodes │
//! └────────────────────────────────────────────┘   └──────────────────┘
//!                                        finalize()
//! ```
//!
//! ## Key Namespacing
//!
//! Keys are `/`-separated paths. A leading `~` stands for the node's own
//! name, so `"~/rate"` declared by `talker` lands at `talker/rate`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod params;
pub mod patch;
pub mod source;
pub mod store;

pub use error::ParamError;
pub use params::Params;
pub use patch::{merge_patch, namespaced};
pub use source::ParamSource;
pub use store::{ParamDefaults, ParameterStore};

/// Environment variable naming an explicit parameter file.
pub const PARAMS_FILE_ENV: &str = "NODEBUS_PARAMS_FILE";

/// Parameter file read when [`PARAMS_FILE_ENV`] is unset.
pub const DEFAULT_PARAMS_FILE: &str = "/etc/nodebus/params.json";

/// Placeholder replaced by the requesting node's name.
pub const NODE_PLACEHOLDER: &str = "~";
