//! Real scan collaborators
//!
//! - [`contexts`] reads scan targets out of the kubeconfig
//! - [`services`] lists services through the Kubernetes API
//! - [`port_forward`] opens `kubectl port-forward` tunnels
//! - [`tls`] performs the unverified handshake and reads the issuer
//! - [`port_check`] tests whether a tunnel's local port accepts connections

pub mod contexts;
pub mod port_check;
pub mod port_forward;
pub mod services;
pub mod tls;

use std::sync::Arc;
use std::time::Duration;

use kube::config::Kubeconfig;

use certsweep_core::backend::ScanBackends;

use crate::Result;

/// Settings for the real collaborators.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// `--kubeconfig` value handed to kubectl
    pub kubeconfig: Option<String>,
    /// Port on the service the tunnel forwards to
    pub remote_port: u16,
    /// TLS connect + handshake timeout
    pub handshake_timeout: Duration,
}

/// Wire up kube-rs, kubectl and rustls behind the scan traits.
pub fn kube_backends(kubeconfig: Kubeconfig, settings: &BackendSettings) -> Result<ScanBackends> {
    Ok(ScanBackends::new(
        Arc::new(services::KubeServiceLister::new(kubeconfig)),
        Arc::new(port_forward::KubectlTunnels::new(
            settings.kubeconfig.clone(),
            settings.remote_port,
        )),
        Arc::new(tls::RustlsIssuerProbe::new(settings.handshake_timeout)?),
        Arc::new(port_check::TcpPortCheck::default()),
    ))
}
