//! Live certificate retrieval
//!
//! Opens one TLS connection per call, takes whatever chain the peer
//! presents and hands it to normalization. Trust is never checked: the
//! point is to look at certificates, including self-signed or otherwise
//! untrusted ones.

use crate::certificate::normalize::normalize;
use crate::certificate::parse::build_raw_chain;
use crate::config::settings::FetchSettings;
use crate::models::NormalizedCertificate;
use crate::utils::FetchError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, Error as RustlsError, SignatureScheme};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// A certificate verifier that accepts any certificate.
#[derive(Debug)]
struct AcceptAnyCertVerifier;

impl ServerCertVerifier for AcceptAnyCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA1,
            SignatureScheme::ECDSA_SHA1_Legacy,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}

/// Per-call connection options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub port: u16,
    /// SNI name; the hostname when unset
    pub server_name: Option<String>,
    /// Covers TCP connect and TLS handshake together
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            server_name: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl FetchOptions {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&FetchSettings> for FetchOptions {
    fn from(settings: &FetchSettings) -> Self {
        Self {
            port: settings.port,
            server_name: None,
            timeout: settings.timeout(),
        }
    }
}

/// TLS certificate fetcher
#[derive(Clone)]
pub struct CertificateFetcher {
    connector: TlsConnector,
}

impl Default for CertificateFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateFetcher {
    pub fn new() -> Self {
        // Ensure a default crypto provider is installed
        let _ = rustls::crypto::ring::default_provider().install_default();

        let config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertVerifier))
            .with_no_client_auth();

        Self {
            connector: TlsConnector::from(Arc::new(config)),
        }
    }

    /// Fetch and normalize the certificate served by `hostname`
    pub async fn fetch(
        &self,
        hostname: &str,
        options: &FetchOptions,
    ) -> Result<NormalizedCertificate, FetchError> {
        let chain = self.fetch_chain(hostname, options).await?;
        let raw = build_raw_chain(&chain)?;
        let cert = normalize(&raw)?;

        tracing::info!(
            "Retrieved certificate for {} ({} domains, issuer: {})",
            hostname.trim(),
            cert.domains.len(),
            cert.issuer
        );
        Ok(cert)
    }

    /// Fetch the DER chain presented by `hostname`, leaf first
    pub async fn fetch_chain(
        &self,
        hostname: &str,
        options: &FetchOptions,
    ) -> Result<Vec<Vec<u8>>, FetchError> {
        let host = hostname.trim();
        if host.is_empty() {
            return Err(FetchError::invalid_input("Domain parameter is required"));
        }

        let sni = options
            .server_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(host);
        let server_name = ServerName::try_from(sni.to_string())
            .map_err(|_| FetchError::invalid_input(format!("Invalid server name: {}", sni)))?;

        let handshake = self.handshake(host, options.port, server_name);
        match tokio::time::timeout(options.timeout, handshake).await {
            Ok(result) => result,
            Err(_) => {
                // The handshake future, and the socket it owns, are dropped here
                tracing::warn!("Connection to {}:{} timed out", host, options.port);
                Err(FetchError::Timeout {
                    timeout_ms: options.timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn handshake(
        &self,
        host: &str,
        port: u16,
        server_name: ServerName<'static>,
    ) -> Result<Vec<Vec<u8>>, FetchError> {
        tracing::debug!("Connecting to {}:{}", host, port);
        let stream = TcpStream::connect((host, port)).await.map_err(|e| {
            tracing::warn!("TCP connection to {}:{} failed: {}", host, port, e);
            FetchError::connection(format!("Failed to connect to {}:{}: {}", host, port, e))
        })?;

        let mut tls = self
            .connector
            .connect(server_name, stream)
            .await
            .map_err(|e| {
                tracing::warn!("TLS handshake with {}:{} failed: {}", host, port, e);
                FetchError::connection(format!("TLS handshake failed: {}", e))
            })?;

        let chain: Vec<Vec<u8>> = {
            let (_, conn) = tls.get_ref();
            tracing::debug!(
                "Handshake with {} complete: {:?}, {:?}",
                host,
                conn.protocol_version(),
                conn.negotiated_cipher_suite().map(|cs| cs.suite())
            );
            conn.peer_certificates()
                .map(|certs| certs.iter().map(|c| c.as_ref().to_vec()).collect())
                .unwrap_or_default()
        };

        if let Err(e) = tls.shutdown().await {
            tracing::debug!("TLS shutdown with {} failed: {}", host, e);
        }
        drop(tls);

        if chain.is_empty() {
            tracing::warn!("{} presented no certificate", host);
        }
        Ok(chain)
    }
}

/// Fetch with a one-off fetcher
pub async fn fetch(
    hostname: &str,
    options: &FetchOptions,
) -> Result<NormalizedCertificate, FetchError> {
    CertificateFetcher::new().fetch(hostname, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ErrorKind;

    #[tokio::test]
    async fn test_empty_hostname_is_invalid_input() {
        let err = fetch("   ", &FetchOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_bad_server_name_is_invalid_input() {
        let options = FetchOptions::default().with_server_name("bad name!");
        let err = fetch("example.com", &options).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_default_options() {
        let options = FetchOptions::default();
        assert_eq!(options.port, 443);
        assert_eq!(options.timeout, Duration::from_millis(10_000));
        assert!(options.server_name.is_none());
    }

    #[test]
    fn test_options_from_settings() {
        let settings = FetchSettings {
            port: 8443,
            timeout_ms: 2500,
        };
        let options = FetchOptions::from(&settings);
        assert_eq!(options.port, 8443);
        assert_eq!(options.timeout, Duration::from_millis(2500));
    }
}
