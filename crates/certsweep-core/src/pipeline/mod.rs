//! The scanning pipeline
//!
//! ```text
//!                      ┌─> discovery ─> probe ─┐
//! context source ──────┼─> discovery ─> probe ─┼──> fan-in ──> collector
//!  (shared stream)     └─> discovery ─> probe ─┘
//! ```
//!
//! One discovery/probe chain per scannable context. All chains pull from the
//! same context stream, so a context goes to whichever discovery worker is
//! free. Every stage closes its output when its input is exhausted or the
//! shared cancellation token fires, and closure flows downstream until the
//! collector returns.
//!
//! All workers are spawned into a single [`JoinSet`] that [`run_scan`] drains
//! before returning, so no worker outlives the scan.

mod collector;
mod discovery;
mod fan_in;
mod probe;
mod source;
mod stream;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backend::ScanBackends;
use crate::model::{Context, ScanReport};
use crate::progress::ProgressTracker;

pub use collector::collect_results;
pub use discovery::spawn_service_discovery;
pub use fan_in::spawn_fan_in;
pub use probe::{spawn_probe_stage, Prober};
pub use source::spawn_context_source;
pub use stream::{recv_or_cancel, send_or_cancel, SharedReceiver, STAGE_CAPACITY};

/// Default host tunnels listen on.
pub const DEFAULT_TUNNEL_HOST: &str = "localhost";

/// Tuning for a scan run.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Host the tunnels' local ports are reached on
    pub tunnel_host: String,
    /// Maximum tunnels open at once across all contexts
    pub max_tunnels: usize,
    /// How long to wait for the tunnel's first line of output
    pub ready_timeout: Duration,
    /// How long to wait for the tunnel's local port to accept connections
    pub port_timeout: Duration,
    /// Delay between port checks
    pub port_poll_interval: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            tunnel_host: DEFAULT_TUNNEL_HOST.to_string(),
            max_tunnels: 8,
            ready_timeout: Duration::from_secs(30),
            port_timeout: Duration::from_secs(30),
            port_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Scan every scannable context and return one row per probed service.
///
/// Never fails: per-context and per-service failures are folded into the
/// report (or the progress counters). If `cancel` fires, the report holds
/// whatever finished before every worker unwound.
pub async fn run_scan(
    contexts: Vec<Context>,
    backends: ScanBackends,
    options: ScanOptions,
    progress: ProgressTracker,
    cancel: CancellationToken,
) -> ScanReport {
    let chains = contexts.iter().filter(|c| c.is_scannable()).count();
    if chains == 0 {
        info!("No scannable contexts");
        return ScanReport::default();
    }

    info!(
        contexts = chains,
        max_tunnels = options.max_tunnels,
        "Starting scan"
    );

    let mut tasks = JoinSet::new();
    let context_stream = spawn_context_source(&mut tasks, contexts, cancel.clone());
    let prober = Arc::new(Prober::new(backends.clone(), options));

    let probe_outputs: Vec<_> = (0..chains)
        .map(|_| {
            let services = spawn_service_discovery(
                &mut tasks,
                context_stream.clone(),
                Arc::clone(&backends.services),
                progress.clone(),
                cancel.clone(),
            );
            spawn_probe_stage(
                &mut tasks,
                services,
                Arc::clone(&prober),
                progress.clone(),
                cancel.clone(),
            )
        })
        .collect();

    let merged = spawn_fan_in(&mut tasks, probe_outputs, cancel.clone());
    let report = collect_results(merged).await;

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Scan worker failed");
        }
    }

    let snap = progress.snapshot();
    if cancel.is_cancelled() {
        warn!(
            collected = report.len(),
            discovered = snap.discovered,
            "Scan cancelled, report is partial"
        );
    } else {
        info!(
            results = report.len(),
            failed_contexts = snap.failed_contexts,
            "Scan complete"
        );
    }

    report
}
