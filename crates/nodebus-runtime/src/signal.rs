//! # Interrupt Capture
//!
//! Turns Ctrl-C into a shutdown request. The listener runs on its own thread
//! with a single-threaded tokio runtime, so the node threads never touch
//! async code.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::RuntimeError;
use crate::runtime::{RunReport, Runtime};
use crate::shutdown::ShutdownSignal;

/// How often the listener notices a shutdown requested by someone else.
const WATCH_INTERVAL: Duration = Duration::from_millis(50);

/// Spawn a thread that triggers `shutdown` on the first Ctrl-C.
///
/// The thread ends after the interrupt, or once `shutdown` was triggered
/// some other way.
///
/// # Errors
///
/// Fails if the tokio runtime or the thread cannot be created.
pub fn capture_interrupt(shutdown: ShutdownSignal) -> io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("nodebus-signal".to_string())
        .spawn(move || runtime.block_on(wait_for_interrupt(shutdown)))
}

/// Run `runtime` until every node returned, stopping all of them on the
/// first Ctrl-C.
///
/// The interrupt listener is always joined before returning, also when the
/// nodes finished on their own or startup failed.
///
/// # Errors
///
/// [`RuntimeError::Interrupt`] if the listener cannot be installed, otherwise
/// whatever [`Runtime::start`] returns.
pub fn run_until_interrupt(runtime: Runtime) -> Result<RunReport, RuntimeError> {
    let shutdown = runtime.shutdown_signal();
    let listener = capture_interrupt(shutdown.clone()).map_err(RuntimeError::Interrupt)?;

    let result = runtime.start();

    // Releases the listener when no one requested shutdown
    shutdown.trigger();
    if listener.join().is_err() {
        warn!("Interrupt listener thread panicked");
    }
    result
}

async fn wait_for_interrupt(shutdown: ShutdownSignal) {
    let mut watch = tokio::time::interval(WATCH_INTERVAL);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            received = &mut interrupt => {
                match received {
                    Ok(()) => {
                        if shutdown.trigger() {
                            info!("Interrupt received, shutting down nodes");
                        }
                    }
                    Err(err) => error!(error = %err, "Failed to listen for Ctrl-C"),
                }
                return;
            }
            _ = watch.tick() => {
                if shutdown.is_triggered() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FnNode;
    use crate::runtime::RuntimeConfig;
    use nodebus_params::ParamSource;
    use std::sync::mpsc;

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            param_source: ParamSource::Default("/nonexistent/nodebus/params.json".into()),
            default_period: Duration::from_millis(1),
        }
    }

    fn run_in_background(runtime: Runtime) -> mpsc::Receiver<Result<RunReport, RuntimeError>> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(run_until_interrupt(runtime));
        });
        rx
    }

    #[test]
    fn test_listener_exits_on_programmatic_shutdown() {
        let shutdown = ShutdownSignal::new();
        let handle = capture_interrupt(shutdown.clone()).unwrap();

        shutdown.trigger();
        handle.join().unwrap();
    }

    #[test]
    fn test_run_returns_when_nodes_finish_on_their_own() {
        let mut runtime = Runtime::new(config());
        runtime.launch(FnNode::new("one-shot", |_, _| Ok(()))).unwrap();
        let shutdown = runtime.shutdown_signal();

        let report = run_in_background(runtime)
            .recv_timeout(Duration::from_secs(2))
            .expect("interrupt listener was never released")
            .unwrap();

        assert!(report.is_clean());
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_run_releases_listener_when_startup_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = Runtime::new(config().with_params_file(dir.path().join("missing.json")));
        runtime.launch(FnNode::new("never", |_, _| Ok(()))).unwrap();

        let result = run_in_background(runtime)
            .recv_timeout(Duration::from_secs(2))
            .expect("interrupt listener was never released");

        assert!(matches!(result, Err(RuntimeError::Params(_))));
    }
}
