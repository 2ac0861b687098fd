//! # Runtime Errors

use nodebus_params::ParamError;
use thiserror::Error;

/// Errors that stop the runtime from starting.
///
/// Failures inside a node body are not listed here: they are logged and
/// recorded in the run report, and the other nodes keep running.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Parameters could not be assembled; no node thread was started.
    #[error("Parameter setup failed: {0}")]
    Params(#[from] ParamError),

    /// Two launched nodes share a name.
    #[error("A node named '{0}' is already launched")]
    DuplicateNode(String),

    /// The OS refused to spawn a node thread.
    #[error("Failed to spawn thread for node '{node}': {source}")]
    Spawn {
        node: String,
        #[source]
        source: std::io::Error,
    },

    /// The Ctrl-C listener could not be installed.
    #[error("Failed to install interrupt handler: {0}")]
    Interrupt(#[source] std::io::Error),
}
