//! `kubectl port-forward` tunnels
//!
//! Each tunnel is a kubectl child process forwarding a pre-allocated local
//! port to the service's remote port. Stdout and stderr are merged into a
//! single line stream so the probe stage can watch for errors without caring
//! which pipe they came from.

use std::net::TcpListener;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use certsweep_core::backend::{Tunnel, TunnelProvider};
use certsweep_core::{Error as ScanError, Result as ScanResult};

const KUBECTL: &str = "kubectl";

/// Lines buffered per tunnel before the readers wait on the probe stage.
const LINE_BUFFER: usize = 1024;

/// Starts `kubectl port-forward svc/<name>` tunnels.
#[derive(Debug, Clone)]
pub struct KubectlTunnels {
    kubeconfig: Option<String>,
    remote_port: u16,
    kubectl: String,
}

impl KubectlTunnels {
    pub fn new(kubeconfig: Option<String>, remote_port: u16) -> Self {
        Self {
            kubeconfig,
            remote_port,
            kubectl: KUBECTL.to_string(),
        }
    }

    /// Use a different kubectl binary.
    pub fn with_kubectl(mut self, kubectl: impl Into<String>) -> Self {
        self.kubectl = kubectl.into();
        self
    }
}

#[async_trait]
impl TunnelProvider for KubectlTunnels {
    async fn start(
        &self,
        context: &str,
        namespace: &str,
        service: &str,
    ) -> ScanResult<Box<dyn Tunnel>> {
        let local_port = allocate_local_port()?;
        let args = port_forward_args(context, namespace, service, local_port, self.remote_port);

        let mut command = Command::new(&self.kubectl);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(kubeconfig) = &self.kubeconfig {
            command.env("KUBECONFIG", kubeconfig);
        }

        let mut child = command
            .spawn()
            .map_err(|e| ScanError::tunnel(format!("failed to spawn {}: {}", self.kubectl, e)))?;

        let (tx, lines) = mpsc::channel(LINE_BUFFER);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx));
        }

        debug!(
            context = %context,
            service = %service,
            local_port,
            "Started port-forward"
        );

        Ok(Box::new(KubectlTunnel {
            child: Some(child),
            local_port,
            lines,
        }))
    }
}

/// A running kubectl port-forward.
pub struct KubectlTunnel {
    child: Option<Child>,
    local_port: u16,
    lines: mpsc::Receiver<String>,
}

#[async_trait]
impl Tunnel for KubectlTunnel {
    fn local_port(&self) -> u16 {
        self.local_port
    }

    async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = child.start_kill() {
            debug!(local_port = self.local_port, error = %e, "kubectl already exited");
        }
        if let Err(e) = child.wait().await {
            warn!(local_port = self.local_port, error = %e, "Failed to reap kubectl");
        }
        self.lines.close();
    }
}

/// Ask the OS for a free local port.
///
/// The listener is dropped before kubectl binds, so another process could
/// take the port in between; kubectl then reports a bind error on its output.
fn allocate_local_port() -> ScanResult<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

fn port_forward_args(
    context: &str,
    namespace: &str,
    service: &str,
    local_port: u16,
    remote_port: u16,
) -> Vec<String> {
    let mut args = vec![format!("--context={}", context)];
    if !namespace.is_empty() {
        args.push(format!("--namespace={}", namespace));
    }
    args.push("port-forward".to_string());
    args.push(format!("svc/{}", service));
    args.push(format!("{}:{}", local_port, remote_port));
    args
}

async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_port_forward_command_line() {
        let args = port_forward_args("prod", "payments", "api", 40123, 443);
        assert_eq!(
            args,
            vec![
                "--context=prod",
                "--namespace=payments",
                "port-forward",
                "svc/api",
                "40123:443",
            ]
        );
    }

    #[test]
    fn empty_namespace_is_left_to_kubectl() {
        let args = port_forward_args("dev", "", "web", 5000, 8443);
        assert_eq!(args, vec!["--context=dev", "port-forward", "svc/web", "5000:8443"]);
    }

    #[test]
    fn allocated_port_is_nonzero() {
        assert_ne!(allocate_local_port().unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_binary_is_a_tunnel_error() {
        let tunnels = KubectlTunnels::new(None, 443).with_kubectl("/nonexistent/kubectl");
        let err = match tunnels.start("prod", "default", "api").await {
            Ok(_) => panic!("expected spawn failure"),
            Err(e) => e,
        };
        assert!(matches!(err, ScanError::Tunnel { .. }));
    }

    #[cfg(unix)]
    mod with_fake_kubectl {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_kubectl(dir: &std::path::Path, body: &str) -> String {
            let path = dir.join("kubectl");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        #[tokio::test]
        async fn merges_stdout_and_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let kubectl = fake_kubectl(
                dir.path(),
                "echo \"forwarding $4\"\necho 'error: lost connection' >&2",
            );
            let tunnels = KubectlTunnels::new(None, 443).with_kubectl(kubectl);
            let mut tunnel = tunnels.start("prod", "default", "api").await.unwrap();

            let mut seen = Vec::new();
            while let Some(line) = tunnel.next_line().await {
                seen.push(line);
            }
            seen.sort();

            assert_eq!(seen.len(), 2);
            assert_eq!(seen[0], "error: lost connection");
            assert_eq!(seen[1], "forwarding svc/api");
            tunnel.stop().await;
        }

        #[tokio::test]
        async fn stop_kills_and_is_idempotent() {
            let dir = tempfile::tempdir().unwrap();
            let kubectl = fake_kubectl(dir.path(), "echo ready\nexec sleep 30");
            let tunnels = KubectlTunnels::new(None, 443).with_kubectl(kubectl);
            let mut tunnel = tunnels.start("prod", "default", "api").await.unwrap();

            assert_eq!(tunnel.next_line().await.as_deref(), Some("ready"));

            let stopped = tokio::time::timeout(std::time::Duration::from_secs(5), async {
                tunnel.stop().await;
                tunnel.stop().await;
            })
            .await;
            assert!(stopped.is_ok());
        }
    }
}
