//! `io::Error` to [`NetError`] adapters used along the connect path.
//!
//! Each step of establishing a connection (resolve, dial, tunnel) tags its
//! IO failures with what it was trying to reach, so the rendered
//! `ConnectionError` names the proxy or origin that failed.

use crate::base::neterror::NetError;
use std::io;

pub trait IoResultExt<T> {
    /// Tag a dial failure with the `host:port` being dialled.
    ///
    /// ```ignore
    /// let socket = TcpStream::connect((proxy_host, proxy_port))
    ///     .await
    ///     .connection_context(proxy_host, proxy_port)?;
    /// // "Connection to 10.0.0.5:3128 failed: Connection refused (os error 111)"
    /// ```
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError>;

    /// Tag a resolver failure with the name being looked up.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;

    /// Tag a read or write on the `CONNECT` exchange with the tunnel authority.
    fn tunnel_context(self, authority: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| NetError::connection_failed_to(host, port, e))
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::dns_failed(domain, e))
    }

    fn tunnel_context(self, authority: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::TunnelConnectionFailed(format!("{}: {}", authority, e)))
    }
}
