//! TLS verification policy and the BoringSSL connector built from it.

use crate::base::neterror::NetError;
use boring::ssl::{SslConnector, SslMethod, SslVerifyMode, SslVersion};
use boring::x509::store::X509StoreBuilder;
use boring::x509::X509;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_boring::SslStream;

/// Certificate verification policy.
///
/// Converts from `bool` (enable/disable) and from a path to a PEM CA bundle,
/// which then replaces the system trust store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Verify {
    /// Verify against the system trust store.
    #[default]
    Enabled,
    /// Skip peer and hostname verification.
    Disabled,
    /// Verify against the certificates in this PEM file only.
    CaBundle(PathBuf),
}

impl Verify {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Verify::Disabled)
    }
}

impl From<bool> for Verify {
    fn from(verify: bool) -> Self {
        if verify {
            Verify::Enabled
        } else {
            Verify::Disabled
        }
    }
}

impl From<PathBuf> for Verify {
    fn from(path: PathBuf) -> Self {
        Verify::CaBundle(path)
    }
}

impl From<&Path> for Verify {
    fn from(path: &Path) -> Self {
        Verify::CaBundle(path.to_path_buf())
    }
}

impl From<&str> for Verify {
    fn from(path: &str) -> Self {
        Verify::CaBundle(PathBuf::from(path))
    }
}

impl From<String> for Verify {
    fn from(path: String) -> Self {
        Verify::CaBundle(PathBuf::from(path))
    }
}

/// Client-side TLS connector for one [`Verify`] policy.
#[derive(Clone)]
pub struct TlsConnector {
    inner: SslConnector,
    verify_hostname: bool,
}

impl fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConnector")
            .field("verify_hostname", &self.verify_hostname)
            .finish_non_exhaustive()
    }
}

impl TlsConnector {
    pub fn new(verify: &Verify) -> Result<Self, NetError> {
        let mut builder = SslConnector::builder(SslMethod::tls()).map_err(ssl_error)?;
        builder
            .set_min_proto_version(Some(SslVersion::TLS1_2))
            .map_err(ssl_error)?;
        builder
            .set_alpn_protos(b"\x08http/1.1")
            .map_err(ssl_error)?;

        match verify {
            Verify::Enabled => builder.set_verify(SslVerifyMode::PEER),
            Verify::Disabled => builder.set_verify(SslVerifyMode::NONE),
            Verify::CaBundle(path) => {
                builder.set_cert_store(load_ca_bundle(path)?);
                builder.set_verify(SslVerifyMode::PEER);
            }
        }

        Ok(Self {
            inner: builder.build(),
            verify_hostname: verify.is_enabled(),
        })
    }

    /// Run the client handshake for `host` over `stream`.
    pub async fn connect<S>(&self, host: &str, stream: S) -> Result<SslStream<S>, NetError>
    where
        S: AsyncRead + AsyncWrite + Unpin + fmt::Debug,
    {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let mut config = self.inner.configure().map_err(ssl_error)?;
        config.set_verify_hostname(self.verify_hostname);
        config.set_use_server_name_indication(should_set_sni(host));

        tracing::debug!(host = %host, verify = self.verify_hostname, "starting TLS handshake");
        tokio_boring::connect(config, host, stream)
            .await
            .map_err(|e| NetError::SslProtocolError(format!("handshake with {} failed: {}", host, e)))
    }
}

/// Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
pub fn should_set_sni(host: &str) -> bool {
    host.parse::<std::net::IpAddr>().is_err()
}

fn load_ca_bundle(path: &Path) -> Result<boring::x509::store::X509Store, NetError> {
    let invalid = |reason: String| NetError::InvalidCaBundle {
        path: path.to_path_buf(),
        reason,
    };

    let pem = std::fs::read(path).map_err(|e| invalid(e.to_string()))?;
    let certs = X509::stack_from_pem(&pem).map_err(|e| invalid(e.to_string()))?;
    if certs.is_empty() {
        return Err(invalid("no certificates found".to_string()));
    }

    let mut store = X509StoreBuilder::new().map_err(|e| invalid(e.to_string()))?;
    for cert in certs {
        store.add_cert(cert).map_err(|e| invalid(e.to_string()))?;
    }
    Ok(store.build())
}

fn ssl_error(e: boring::error::ErrorStack) -> NetError {
    NetError::SslProtocolError(e.to_string())
}
