//! Scan data model
//!
//! A [`Context`] names one cluster scope to scan. Each service found in it
//! becomes a [`ServiceProbeResult`], which the probe stage fills in and hands
//! downstream exactly once.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Service name that is recognised but never probed.
pub const DOCKER_DESKTOP_SERVICE: &str = "docker-desktop";

/// One cluster context to scan.
///
/// Immutable once emitted by the context source. A context whose service
/// listing fails simply produces no services.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    pub namespace: String,
}

impl Context {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Contexts missing a name or namespace are filtered out, not failed.
    pub fn is_scannable(&self) -> bool {
        !self.name.is_empty() && !self.namespace.is_empty()
    }
}

/// A service as returned by service enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRef {
    pub name: String,
    pub port: String,
}

impl ServiceRef {
    pub fn new(name: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port: port.into(),
        }
    }
}

/// Outcome classifier for a probed service.
///
/// `Ok` doubles as "not yet probed" on rows that have not reached the probe
/// stage, matching the numeric code `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProbeStatus {
    /// Not yet probed, or probed successfully (code 0)
    #[default]
    Ok,
    /// Known service intentionally skipped (code 200)
    Exempt,
    /// Tunnel could not be started or reported an error (code 210)
    TunnelError,
    /// Tunnel output ended before it reported readiness (code 220)
    TunnelClosed,
    /// TLS handshake or issuer extraction failed (code 230)
    HandshakeFailed,
    /// Local tunnel port never accepted connections (code 240)
    PortNeverOpened,
}

impl ProbeStatus {
    pub fn code(self) -> u16 {
        match self {
            ProbeStatus::Ok => 0,
            ProbeStatus::Exempt => 200,
            ProbeStatus::TunnelError => 210,
            ProbeStatus::TunnelClosed => 220,
            ProbeStatus::HandshakeFailed => 230,
            ProbeStatus::PortNeverOpened => 240,
        }
    }

    /// True for any code other than 0.
    pub fn is_terminal(self) -> bool {
        self != ProbeStatus::Ok
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One row of the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProbeResult {
    pub name: String,
    pub port: String,
    pub context: String,
    pub namespace: String,
    pub cert_issuer: String,
    pub error: String,
    #[serde(skip)]
    pub status: ProbeStatus,
}

impl ServiceProbeResult {
    /// Build an unprobed row for `service`, tagged with its owning context.
    pub fn discovered(service: ServiceRef, context: &Context) -> Self {
        Self {
            name: service.name,
            port: service.port,
            context: context.name.clone(),
            namespace: context.namespace.clone(),
            cert_issuer: String::new(),
            error: String::new(),
            status: ProbeStatus::Ok,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status.code()
    }

    /// Record a failed (or exempt) outcome.
    pub fn fail(&mut self, status: ProbeStatus, error: impl Into<String>) {
        self.status = status;
        self.error = error.into();
        self.cert_issuer.clear();
    }

    /// Record the extracted issuer on success.
    pub fn succeed(&mut self, issuer: impl Into<String>) {
        self.status = ProbeStatus::Ok;
        self.error.clear();
        self.cert_issuer = issuer.into();
    }
}

/// Final scan output, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub results: Vec<ServiceProbeResult>,
}

impl ScanReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Rows whose probe failed (exempt rows are not failures).
    pub fn failures(&self) -> impl Iterator<Item = &ServiceProbeResult> {
        self.results.iter().filter(|r| {
            r.status.is_terminal() && r.status != ProbeStatus::Exempt
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_without_namespace_is_not_scannable() {
        assert!(Context::new("prod", "default").is_scannable());
        assert!(!Context::new("prod", "").is_scannable());
        assert!(!Context::new("", "default").is_scannable());
    }

    #[test]
    fn discovered_row_inherits_context() {
        let ctx = Context::new("prod", "default");
        let row = ServiceProbeResult::discovered(ServiceRef::new("api", "443"), &ctx);
        assert_eq!(row.context, "prod");
        assert_eq!(row.namespace, "default");
        assert_eq!(row.status_code(), 0);
        assert!(row.error.is_empty());
        assert!(row.cert_issuer.is_empty());
    }

    #[test]
    fn status_codes_match_outcomes() {
        assert_eq!(ProbeStatus::Ok.code(), 0);
        assert_eq!(ProbeStatus::Exempt.code(), 200);
        assert_eq!(ProbeStatus::TunnelError.code(), 210);
        assert_eq!(ProbeStatus::TunnelClosed.code(), 220);
        assert_eq!(ProbeStatus::HandshakeFailed.code(), 230);
        assert_eq!(ProbeStatus::PortNeverOpened.code(), 240);
    }

    #[test]
    fn json_uses_snake_case_fields_and_hides_status() {
        let ctx = Context::new("prod", "default");
        let mut row = ServiceProbeResult::discovered(ServiceRef::new("api", "443"), &ctx);
        row.fail(ProbeStatus::HandshakeFailed, "handshake eof");

        let report = ScanReport { results: vec![row] };
        let value = serde_json::to_value(&report).unwrap();
        let first = &value["results"][0];

        assert_eq!(first["cert_issuer"], "");
        assert_eq!(first["error"], "handshake eof");
        assert!(first.get("status").is_none());
    }

    #[test]
    fn failures_skip_exempt_and_successful_rows() {
        let ctx = Context::new("prod", "default");
        let mut ok = ServiceProbeResult::discovered(ServiceRef::new("api", "443"), &ctx);
        ok.succeed("Let's Encrypt");
        let mut exempt =
            ServiceProbeResult::discovered(ServiceRef::new("docker-desktop", "0"), &ctx);
        exempt.fail(ProbeStatus::Exempt, "docker-desktop service");
        let mut broken = ServiceProbeResult::discovered(ServiceRef::new("db", "5432"), &ctx);
        broken.fail(ProbeStatus::TunnelClosed, "output returned !OK");

        let report = ScanReport {
            results: vec![ok, exempt, broken],
        };
        let failed: Vec<_> = report.failures().map(|r| r.name.as_str()).collect();
        assert_eq!(failed, vec!["db"]);
    }
}
