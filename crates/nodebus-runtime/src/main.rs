//! # nodebus
//!
//! Runs the demo `talker` and `listener` nodes until Ctrl-C.
//!
//! Parameters come from `$NODEBUS_PARAMS_FILE`, or `/etc/nodebus/params.json`
//! when that variable is unset. Logging is configured through the
//! `NODEBUS_*` variables described in `nodebus-telemetry`.

use anyhow::{Context, Result};
use nodebus_runtime::demo::{Listener, Talker};
use nodebus_runtime::{run_until_interrupt, Runtime, RuntimeConfig};
use nodebus_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_telemetry(&telemetry).context("Failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env();
    info!(
        service = %telemetry.service_name,
        params = %config.param_source.path().display(),
        "Starting nodebus runtime"
    );

    let mut runtime = Runtime::new(config);
    runtime.launch(Talker::new())?;
    runtime.launch(Listener)?;

    info!("Nodes launched. Press Ctrl+C to stop.");

    let report = match run_until_interrupt(runtime) {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "Runtime failed to start");
            return Err(err.into());
        }
    };

    match encode_metrics() {
        Ok(text) => debug!(metrics = %text, "Final metrics"),
        Err(err) => warn!(error = %err, "Failed to encode metrics"),
    }

    for (node, status) in report.statuses() {
        info!(node = %node, %status, "Final node status");
    }
    if !report.is_clean() {
        anyhow::bail!("Nodes failed: {}", report.failed().join(", "));
    }

    info!("Shutdown complete");
    Ok(())
}
