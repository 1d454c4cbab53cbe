//! TLS configuration for PostgreSQL metadata sessions.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{info, warn};

use crate::error::{CrawlError, Result};

/// SSL modes, as in PostgreSQL's `sslmode` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Plain TCP.
    Disable,
    /// Encrypt without verifying the server certificate.
    #[default]
    Require,
    /// Verify the certificate chain.
    VerifyCa,
    /// Verify the certificate chain and host name.
    VerifyFull,
}

impl SslMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disable" | "" => Ok(SslMode::Disable),
            "require" => Ok(SslMode::Require),
            "verify-ca" | "verify_ca" => Ok(SslMode::VerifyCa),
            "verify-full" | "verify_full" => Ok(SslMode::VerifyFull),
            other => Err(CrawlError::Config(format!(
                "Invalid ssl_mode '{}'. Valid values: disable, require, verify-ca, verify-full",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }

    pub fn requires_tls(self) -> bool {
        self != SslMode::Disable
    }

    /// Whether the server certificate is checked against the web PKI roots.
    pub fn verifies_certificate(self) -> bool {
        matches!(self, SslMode::VerifyCa | SslMode::VerifyFull)
    }
}

impl FromStr for SslMode {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the rustls connector for a session.
#[derive(Debug, Clone, Copy)]
pub struct TlsBuilder {
    ssl_mode: SslMode,
}

impl TlsBuilder {
    pub fn new(ssl_mode: SslMode) -> Self {
        Self { ssl_mode }
    }

    pub fn parse(ssl_mode: &str) -> Result<Self> {
        Ok(Self::new(SslMode::parse(ssl_mode)?))
    }

    pub fn ssl_mode(&self) -> SslMode {
        self.ssl_mode
    }

    /// Connector for tokio-postgres; `None` when TLS is disabled.
    pub fn build(&self) -> Result<Option<MakeRustlsConnect>> {
        if !self.ssl_mode.requires_tls() {
            return Ok(None);
        }
        Ok(Some(MakeRustlsConnect::new(self.client_config()?)))
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        match self.ssl_mode {
            SslMode::Disable => Err(CrawlError::Config(
                "Cannot build TLS config for ssl_mode=disable".into(),
            )),
            SslMode::Require => {
                warn!(
                    "ssl_mode=require encrypts the session but does not verify the server \
                     certificate; use verify-full to protect against man-in-the-middle attacks"
                );
                Ok(ClientConfig::builder()
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
                    .with_no_client_auth())
            }
            SslMode::VerifyCa | SslMode::VerifyFull => {
                // rustls always checks the host name, so verify-ca behaves as verify-full.
                info!("ssl_mode={}: verifying the server certificate", self.ssl_mode);
                let mut roots = rustls::RootCertStore::empty();
                roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                Ok(ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth())
            }
        }
    }
}

/// Verifier for `ssl_mode=require`: accepts any server certificate.
#[derive(Debug)]
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        use SignatureScheme::*;
        vec![
            RSA_PKCS1_SHA256,
            RSA_PKCS1_SHA384,
            RSA_PKCS1_SHA512,
            ECDSA_NISTP256_SHA256,
            ECDSA_NISTP384_SHA384,
            ECDSA_NISTP521_SHA512,
            RSA_PSS_SHA256,
            RSA_PSS_SHA384,
            RSA_PSS_SHA512,
            ED25519,
        ]
    }
}
