//! Collaborator traits for the scanning pipeline
//!
//! The pipeline never talks to a cluster or the network directly. Service
//! enumeration, tunnelling, port checks and the TLS handshake are all reached
//! through these traits so the CLI can plug in kube-rs/kubectl/rustls and tests
//! can plug in fakes.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::model::ServiceRef;
use crate::Result;

/// Lists the services of one context/namespace.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ServiceLister: Send + Sync {
    /// Errors here are isolated to the context; the scan carries on.
    async fn list_services(&self, context: &str, namespace: &str) -> Result<Vec<ServiceRef>>;
}

/// A running local-to-remote forward.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Tunnel: Send {
    /// Local port the forward listens on.
    fn local_port(&self) -> u16;

    /// Next line of tunnel output, `None` once the output has closed.
    async fn next_line(&mut self) -> Option<String>;

    /// Tear the tunnel down. Safe to call more than once.
    async fn stop(&mut self);
}

/// Starts tunnels to services.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TunnelProvider: Send + Sync {
    async fn start(
        &self,
        context: &str,
        namespace: &str,
        service: &str,
    ) -> Result<Box<dyn Tunnel>>;
}

/// Performs a TLS handshake and returns the signing authority of the peer.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IssuerProbe: Send + Sync {
    /// Returns an empty string when the peer presented no certificate.
    async fn probe_issuer(&self, host: &str, port: u16) -> Result<String>;
}

/// Single, non-blocking reachability check. Callers poll.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PortCheck: Send + Sync {
    async fn is_open(&self, host: &str, port: u16) -> bool;
}

/// The full set of collaborators a scan needs.
#[derive(Clone)]
pub struct ScanBackends {
    pub services: Arc<dyn ServiceLister>,
    pub tunnels: Arc<dyn TunnelProvider>,
    pub issuer: Arc<dyn IssuerProbe>,
    pub ports: Arc<dyn PortCheck>,
}

impl ScanBackends {
    pub fn new(
        services: Arc<dyn ServiceLister>,
        tunnels: Arc<dyn TunnelProvider>,
        issuer: Arc<dyn IssuerProbe>,
        ports: Arc<dyn PortCheck>,
    ) -> Self {
        Self {
            services,
            tunnels,
            issuer,
            ports,
        }
    }
}
