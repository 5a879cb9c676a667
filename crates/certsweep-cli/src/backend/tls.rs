//! Unverified TLS handshake that reports who signed the peer's certificate

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{self, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use certsweep_core::backend::IssuerProbe;
use certsweep_core::issuer::issuer_organization;
use certsweep_core::{Error as ScanError, Result as ScanResult};

/// Handshakes with verification disabled and reads the leaf's issuer.
///
/// Chain and hostname checks are skipped so that self-signed and
/// internal-CA certificates still yield an issuer.
pub struct RustlsIssuerProbe {
    connector: TlsConnector,
    timeout: Duration,
}

impl RustlsIssuerProbe {
    pub fn new(timeout: Duration) -> ScanResult<Self> {
        let provider = Arc::new(crypto::aws_lc_rs::default_provider());
        let config = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| ScanError::tls(format!("tls config: {}", e)))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            timeout,
        })
    }

    async fn handshake(&self, host: &str, port: u16) -> ScanResult<String> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| ScanError::tls(format!("invalid server name {}: {}", host, e)))?;

        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(|e| ScanError::tls(format!("dial tcp {}:{}: {}", host, port, e)))?;
        let tls = self
            .connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| ScanError::tls(format!("tls handshake with {}:{}: {}", host, port, e)))?;

        let (_, session) = tls.get_ref();
        match session.peer_certificates().and_then(|certs| certs.first()) {
            Some(leaf) => issuer_organization(leaf.as_ref()),
            None => {
                debug!(host = %host, port, "Peer presented no certificate");
                Ok(String::new())
            }
        }
    }
}

#[async_trait]
impl IssuerProbe for RustlsIssuerProbe {
    async fn probe_issuer(&self, host: &str, port: u16) -> ScanResult<String> {
        tokio::time::timeout(self.timeout, self.handshake(host, port))
            .await
            .map_err(|_| {
                ScanError::tls(format!(
                    "tls handshake with {}:{} timed out after {:?}",
                    host, port, self.timeout
                ))
            })?
    }
}

#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
