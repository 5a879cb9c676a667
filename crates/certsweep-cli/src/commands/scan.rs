//! `certsweep scan` - report the certificate issuer of every service
//!
//! # Usage
//!
//! ```bash
//! # Every context in the kubeconfig, CSV to stdout
//! certsweep scan
//!
//! # Two contexts, JSON to a file, at most four tunnels at once
//! certsweep scan --context prod --context staging --format json -o issuers.json --max-tunnels 4
//!
//! # Give up after ten minutes and keep whatever finished
//! certsweep scan --timeout 10m
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use certsweep_core::{run_scan, ProgressTracker, ScanOptions};

use crate::backend::contexts::{discover_contexts, ContextSelection};
use crate::backend::{kube_backends, BackendSettings};
use crate::commands::load_kubeconfig;
use crate::config::{load_defaults, parse_duration, pick_duration, ScanDefaults};
use crate::progress::ProgressDisplay;
use crate::report::{render, write_output, OutputFormat};
use crate::{Error, Result};

const DEFAULT_REMOTE_PORT: u16 = 443;
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Scan every context's services and report who issued their certificates
#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// Path to kubeconfig
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// Only scan these contexts (repeatable)
    #[arg(long = "context")]
    pub contexts: Vec<String>,

    /// Namespace to scan in every context (default: each context's own)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Report format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum port-forward tunnels open at once
    #[arg(long)]
    pub max_tunnels: Option<usize>,

    /// Service port the tunnels forward to
    #[arg(long)]
    pub remote_port: Option<u16>,

    /// Wait for a tunnel's first line of output (e.g. 30s)
    #[arg(long)]
    pub ready_timeout: Option<String>,

    /// Wait for a tunnel's local port to open (e.g. 30s)
    #[arg(long)]
    pub port_timeout: Option<String>,

    /// TLS connect + handshake timeout (e.g. 10s)
    #[arg(long)]
    pub handshake_timeout: Option<String>,

    /// Stop the whole scan after this long and report what finished (e.g. 15m)
    #[arg(long)]
    pub timeout: Option<String>,

    /// Don't draw the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Everything a scan run needs, after flags and the defaults file are merged.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub format: OutputFormat,
    pub namespace: Option<String>,
    pub options: ScanOptions,
    pub backend: BackendSettings,
    pub deadline: Option<Duration>,
}

impl ScanSettings {
    /// Flag, then defaults file, then built-in default.
    pub fn resolve(args: &ScanArgs, defaults: &ScanDefaults) -> Result<Self> {
        let builtin = ScanOptions::default();

        let max_tunnels = args
            .max_tunnels
            .or(defaults.max_tunnels)
            .unwrap_or(builtin.max_tunnels);
        if max_tunnels == 0 {
            return Err(Error::validation("--max-tunnels must be at least 1"));
        }

        let options = ScanOptions {
            max_tunnels,
            ready_timeout: pick_duration(
                args.ready_timeout.as_deref(),
                defaults.ready_timeout.as_deref(),
                builtin.ready_timeout,
            )?,
            port_timeout: pick_duration(
                args.port_timeout.as_deref(),
                defaults.port_timeout.as_deref(),
                builtin.port_timeout,
            )?,
            ..builtin
        };

        let backend = BackendSettings {
            kubeconfig: args.kubeconfig.clone(),
            remote_port: args
                .remote_port
                .or(defaults.remote_port)
                .unwrap_or(DEFAULT_REMOTE_PORT),
            handshake_timeout: pick_duration(
                args.handshake_timeout.as_deref(),
                defaults.handshake_timeout.as_deref(),
                DEFAULT_HANDSHAKE_TIMEOUT,
            )?,
        };

        let deadline = match args.timeout.as_deref().or(defaults.timeout.as_deref()) {
            Some(raw) => Some(parse_duration(raw)?),
            None => None,
        };

        Ok(Self {
            format: args.format.or(defaults.format).unwrap_or_default(),
            namespace: args.namespace.clone().or_else(|| defaults.namespace.clone()),
            options,
            backend,
            deadline,
        })
    }
}

/// Run the scan command
pub async fn run(args: ScanArgs) -> Result<()> {
    let defaults = load_defaults()?;
    let settings = ScanSettings::resolve(&args, &defaults)?;

    let kubeconfig = load_kubeconfig(args.kubeconfig.as_deref())?;
    let selection = ContextSelection {
        only: args.contexts.clone(),
        namespace: settings.namespace.clone(),
    };
    let contexts = discover_contexts(&kubeconfig, &selection)?;
    let skipped = contexts.iter().filter(|c| !c.is_scannable()).count();
    if skipped > 0 {
        warn!(skipped, "Skipping contexts without a namespace (use --namespace)");
    }

    let backends = kube_backends(kubeconfig, &settings.backend)?;

    let progress = ProgressTracker::new();
    let display = ProgressDisplay::spawn(progress.subscribe(), !args.no_progress);

    let cancel = CancellationToken::new();
    let watcher = spawn_shutdown_watcher(cancel.clone(), settings.deadline);

    let report = run_scan(
        contexts,
        backends,
        settings.options.clone(),
        progress.clone(),
        cancel.clone(),
    )
    .await;

    watcher.abort();
    let last = progress.snapshot();
    display.finish(&last);

    let rendered = render(&report, settings.format)?;
    let written = write_output(args.output.as_deref(), &rendered)?;
    if let (Some(path), Some(bytes)) = (args.output.as_deref(), written) {
        info!(
            bytes,
            path = %path.display(),
            format = settings.format.label(),
            "Report written"
        );
        eprintln!("Wrote {} bytes to {}", bytes, path.display());
    }

    let failures = report.failures().count();
    if failures > 0 || last.failed_contexts > 0 {
        warn!(
            services = report.len(),
            failed_services = failures,
            failed_contexts = last.failed_contexts,
            "Scan finished with failures"
        );
    }
    if cancel.is_cancelled() {
        return Err(Error::command_failed(format!(
            "scan interrupted, report holds {} of {} discovered services",
            report.len(),
            last.discovered
        )));
    }
    Ok(())
}

/// Fire `cancel` on Ctrl-C or once `deadline` elapses.
fn spawn_shutdown_watcher(cancel: CancellationToken, deadline: Option<Duration>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let expired = async {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {}
            res = tokio::signal::ctrl_c() => {
                match res {
                    Ok(()) => warn!("Interrupted, stopping scan"),
                    Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, stopping scan"),
                }
                cancel.cancel();
            }
            _ = expired => {
                warn!(timeout = ?deadline, "Scan deadline reached, stopping scan");
                cancel.cancel();
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults_apply_without_flags_or_file() {
        let settings =
            ScanSettings::resolve(&ScanArgs::default(), &ScanDefaults::default()).unwrap();

        assert_eq!(settings.format, OutputFormat::Csv);
        assert_eq!(settings.options.max_tunnels, ScanOptions::default().max_tunnels);
        assert_eq!(settings.backend.remote_port, 443);
        assert_eq!(settings.backend.handshake_timeout, Duration::from_secs(10));
        assert!(settings.deadline.is_none());
        assert!(settings.namespace.is_none());
    }

    #[test]
    fn flags_override_defaults_file() {
        let args = ScanArgs {
            format: Some(OutputFormat::Json),
            max_tunnels: Some(2),
            ready_timeout: Some("5s".to_string()),
            timeout: Some("1m".to_string()),
            ..Default::default()
        };
        let defaults = ScanDefaults {
            format: Some(OutputFormat::Csv),
            max_tunnels: Some(16),
            remote_port: Some(8443),
            ready_timeout: Some("45s".to_string()),
            namespace: Some("web".to_string()),
            ..Default::default()
        };

        let settings = ScanSettings::resolve(&args, &defaults).unwrap();
        assert_eq!(settings.format, OutputFormat::Json);
        assert_eq!(settings.options.max_tunnels, 2);
        assert_eq!(settings.options.ready_timeout, Duration::from_secs(5));
        assert_eq!(settings.backend.remote_port, 8443);
        assert_eq!(settings.deadline, Some(Duration::from_secs(60)));
        assert_eq!(settings.namespace.as_deref(), Some("web"));
    }

    #[test]
    fn zero_tunnels_is_rejected() {
        let args = ScanArgs {
            max_tunnels: Some(0),
            ..Default::default()
        };
        assert!(ScanSettings::resolve(&args, &ScanDefaults::default()).is_err());
    }

    #[test]
    fn bad_duration_is_rejected() {
        let args = ScanArgs {
            port_timeout: Some("whenever".to_string()),
            ..Default::default()
        };
        assert!(ScanSettings::resolve(&args, &ScanDefaults::default()).is_err());
    }

    #[tokio::test]
    async fn deadline_fires_cancellation() {
        let cancel = CancellationToken::new();
        let watcher = spawn_shutdown_watcher(cancel.clone(), Some(Duration::from_millis(20)));

        tokio::time::timeout(Duration::from_secs(5), cancel.cancelled())
            .await
            .unwrap();
        watcher.await.unwrap();
    }

    #[tokio::test]
    async fn watcher_exits_when_scan_cancels_first() {
        let cancel = CancellationToken::new();
        let watcher = spawn_shutdown_watcher(cancel.clone(), None);
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), watcher)
            .await
            .unwrap()
            .unwrap();
    }
}
