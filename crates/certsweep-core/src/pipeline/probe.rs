//! Probe stage: tunnel to each service and read its certificate issuer
//!
//! Services in one context are probed strictly one after another by that
//! context's worker. Across contexts the number of open tunnels is capped by a
//! shared semaphore.
//!
//! Per service, the first matching outcome wins:
//!
//! | condition                                       | status | error                      |
//! |-------------------------------------------------|--------|----------------------------|
//! | service is `docker-desktop`                     | 200    | `docker-desktop service`   |
//! | tunnel fails to start, or first line has "error"| 210    | tunnel output / error      |
//! | tunnel output ends or stays silent              | 220    | `output returned !OK`      |
//! | local port never accepts connections            | 240    | `port never opened`        |
//! | TLS handshake or issuer extraction fails        | 230    | underlying error           |
//! | otherwise                                       | 0      | empty, issuer recorded     |
//!
//! The tunnel is stopped before the row is emitted on every path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::stream::{recv_or_cancel, send_or_cancel, STAGE_CAPACITY};
use super::ScanOptions;
use crate::backend::{ScanBackends, Tunnel};
use crate::model::{ProbeStatus, ServiceProbeResult, DOCKER_DESKTOP_SERVICE};
use crate::progress::ProgressTracker;

pub(crate) const DOCKER_DESKTOP_ERROR: &str = "docker-desktop service";
pub(crate) const TUNNEL_CLOSED_ERROR: &str = "output returned !OK";
pub(crate) const PORT_NEVER_OPENED_ERROR: &str = "port never opened";

/// Why a probe ended without an issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProbeFailure {
    status: ProbeStatus,
    message: String,
}

impl ProbeFailure {
    fn new(status: ProbeStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Probes single services. Shared by every probe worker of a scan.
pub struct Prober {
    backends: ScanBackends,
    options: ScanOptions,
    tunnel_slots: Arc<Semaphore>,
}

impl Prober {
    pub fn new(backends: ScanBackends, options: ScanOptions) -> Self {
        let tunnel_slots = Arc::new(Semaphore::new(options.max_tunnels.max(1)));
        Self {
            backends,
            options,
            tunnel_slots,
        }
    }

    /// Probe one unprobed row and return it in its terminal state.
    ///
    /// Returns `None` if cancellation fired mid-probe; any tunnel that was
    /// opened has been stopped by then.
    pub async fn probe(
        &self,
        mut row: ServiceProbeResult,
        cancel: &CancellationToken,
    ) -> Option<ServiceProbeResult> {
        if row.name == DOCKER_DESKTOP_SERVICE {
            row.fail(ProbeStatus::Exempt, DOCKER_DESKTOP_ERROR);
            return Some(row);
        }

        let _slot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            slot = self.tunnel_slots.acquire() => slot.ok()?,
        };

        let started = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            started = self.backends.tunnels.start(&row.context, &row.namespace, &row.name) => {
                started
            }
        };

        let mut tunnel = match started {
            Ok(tunnel) => tunnel,
            Err(e) => {
                row.fail(ProbeStatus::TunnelError, e.to_string());
                return Some(row);
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = self.drive(tunnel.as_mut()) => Some(outcome),
        };
        tunnel.stop().await;

        match outcome? {
            Ok(issuer) => {
                debug!(
                    service = %row.name,
                    context = %row.context,
                    issuer = %issuer,
                    "Probe succeeded"
                );
                row.succeed(issuer);
            }
            Err(failure) => {
                debug!(
                    service = %row.name,
                    context = %row.context,
                    status = failure.status.code(),
                    error = %failure.message,
                    "Probe failed"
                );
                row.fail(failure.status, failure.message);
            }
        }
        Some(row)
    }

    /// Wait for tunnel readiness, then handshake through it.
    async fn drive(&self, tunnel: &mut dyn Tunnel) -> Result<String, ProbeFailure> {
        let first_line = tokio::time::timeout(self.options.ready_timeout, tunnel.next_line())
            .await
            .map_err(|_| {
                warn!(
                    local_port = tunnel.local_port(),
                    timeout = ?self.options.ready_timeout,
                    "No tunnel output"
                );
                ProbeFailure::new(ProbeStatus::TunnelClosed, TUNNEL_CLOSED_ERROR)
            })?;

        let line = first_line
            .ok_or_else(|| ProbeFailure::new(ProbeStatus::TunnelClosed, TUNNEL_CLOSED_ERROR))?;
        if is_tunnel_error(&line) {
            return Err(ProbeFailure::new(
                ProbeStatus::TunnelError,
                line.trim_end().to_string(),
            ));
        }

        let port = tunnel.local_port();
        if !self.wait_for_port(port).await {
            return Err(ProbeFailure::new(
                ProbeStatus::PortNeverOpened,
                PORT_NEVER_OPENED_ERROR,
            ));
        }

        self.backends
            .issuer
            .probe_issuer(&self.options.tunnel_host, port)
            .await
            .map_err(|e| ProbeFailure::new(ProbeStatus::HandshakeFailed, e.to_string()))
    }

    /// Poll the local port until it opens or the port timeout passes.
    async fn wait_for_port(&self, port: u16) -> bool {
        let host = &self.options.tunnel_host;
        let start = Instant::now();

        loop {
            if self.backends.ports.is_open(host, port).await {
                return true;
            }
            if start.elapsed() >= self.options.port_timeout {
                warn!(
                    host = %host,
                    port,
                    timeout = ?self.options.port_timeout,
                    "Tunnel port never opened"
                );
                return false;
            }
            debug!(host = %host, port, "Waiting for tunnel port...");
            tokio::time::sleep(poll_interval(self.options.port_poll_interval)).await;
        }
    }
}

fn poll_interval(configured: Duration) -> Duration {
    configured.max(Duration::from_millis(1))
}

/// A first tunnel line mentioning "error" in any case is a tunnel failure.
fn is_tunnel_error(line: &str) -> bool {
    line.trim().to_lowercase().contains("error")
}

/// Spawn one probe worker chained after `services`.
///
/// Rows that already carry a non-zero status are passed through untouched.
pub fn spawn_probe_stage(
    tasks: &mut JoinSet<()>,
    mut services: mpsc::Receiver<ServiceProbeResult>,
    prober: Arc<Prober>,
    progress: ProgressTracker,
    cancel: CancellationToken,
) -> mpsc::Receiver<ServiceProbeResult> {
    let (tx, rx) = mpsc::channel(STAGE_CAPACITY);

    tasks.spawn(async move {
        while let Some(row) = recv_or_cancel(&mut services, &cancel).await {
            let row = if row.status.is_terminal() {
                row
            } else {
                let Some(probed) = prober.probe(row, &cancel).await else {
                    debug!("Probe stage cancelled mid-probe");
                    return;
                };
                progress.service_probed();
                let snap = progress.snapshot();
                info!(
                    service = %probed.name,
                    context = %probed.context,
                    status = probed.status_code(),
                    "{} of {} services processed",
                    snap.processed(),
                    snap.discovered
                );
                probed
            };

            if !send_or_cancel(&tx, row, &cancel).await {
                return;
            }
        }
    });

    rx
}
