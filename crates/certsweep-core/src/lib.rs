//! certsweep core
//!
//! Fleet-wide TLS issuer scanning. Given the cluster contexts a user can reach,
//! the pipeline discovers every service per context, tunnels to each one,
//! performs a TLS handshake and records which certificate authority signed the
//! endpoint's certificate.
//!
//! The pipeline itself lives in [`pipeline`]; everything that touches a real
//! cluster or network is abstracted behind the traits in [`backend`].

pub mod backend;
pub mod error;
pub mod issuer;
pub mod model;
pub mod pipeline;
pub mod progress;

pub use error::{Error, Result};
pub use model::{Context, ProbeStatus, ScanReport, ServiceProbeResult, ServiceRef};
pub use pipeline::{run_scan, ScanOptions};
pub use progress::{ProgressSnapshot, ProgressTracker};
