//! Local port reachability

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use certsweep_core::backend::PortCheck;

/// Per-attempt connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Checks a port by opening (and immediately closing) a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpPortCheck {
    timeout: Duration,
}

impl TcpPortCheck {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpPortCheck {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl PortCheck for TcpPortCheck {
    async fn is_open(&self, host: &str, port: u16) -> bool {
        matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await,
            Ok(Ok(_))
        )
    }
}
