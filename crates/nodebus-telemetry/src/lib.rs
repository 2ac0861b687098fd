//! # nodebus Telemetry
//!
//! Observability for the node runtime.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an `EnvFilter`, plain or JSON
//! - **Metrics**: Prometheus counters for loop iterations and overruns
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nodebus_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     // launch nodes...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NODEBUS_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `NODEBUS_JSON_LOGS` | `false` | Emit JSON lines |
//! | `NODEBUS_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `NODEBUS_SERVICE_NAME` | `nodebus` | Name in the startup line |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{encode_metrics, register_metrics};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Register metrics and install the global log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
