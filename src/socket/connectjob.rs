//! The connection process: DNS -> TCP -> (proxy TLS) -> (CONNECT) -> TLS.
//!
//! [`Connector`] is the `tower::Service<Uri>` the pooled client calls for
//! every new connection. Proxy selection happens here, per target.

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::socket::proxy::{ProxyMap, ProxySettings, ProxyType};
use crate::socket::stream::{BoxedSocket, ProxyStream};
use crate::socket::tls::{TlsConnector, Verify};
use http::Uri;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tower::Service;
use url::Url;

/// Upper bound on a proxy's CONNECT response head.
const MAX_TUNNEL_RESPONSE: usize = 8 * 1024;

/// Opens connections for one TLS verification policy and proxy map.
#[derive(Debug, Clone)]
pub struct Connector {
    proxies: Arc<ProxyMap>,
    tls: TlsConnector,
}

impl Connector {
    pub fn new(proxies: Arc<ProxyMap>, verify: &Verify) -> Result<Self, NetError> {
        Ok(Self {
            proxies,
            tls: TlsConnector::new(verify)?,
        })
    }

    /// Establish a connection to the scheme and authority of `uri`.
    pub async fn connect(&self, uri: Uri) -> Result<ProxyStream, NetError> {
        let target = Url::parse(&uri.to_string())
            .map_err(|e| NetError::InvalidUrl(format!("{}: {}", e, uri)))?;
        let host = target
            .host_str()
            .ok_or_else(|| NetError::InvalidUrl(format!("missing host: {}", uri)))?
            .to_string();
        let port = target
            .port_or_known_default()
            .ok_or_else(|| NetError::InvalidUrl(format!("missing port: {}", uri)))?;
        let is_https = target.scheme() == "https";

        let Some(proxy) = self.proxies.select(&target) else {
            tracing::debug!(host = %host, port, "connecting directly");
            let socket = BoxedSocket::tcp(tcp_connect(&host, port).await?);
            let socket = if is_https {
                self.wrap_tls(&host, socket).await?
            } else {
                socket
            };
            return Ok(ProxyStream::new(socket, false));
        };

        let proxy_type = proxy.proxy_type();
        if proxy_type == ProxyType::Socks5 {
            return Err(NetError::UnsupportedProxy(proxy.url.scheme().to_string()));
        }
        let (proxy_host, proxy_port) = proxy
            .host_port()
            .ok_or_else(|| NetError::InvalidProxy(proxy.url.to_string()))?;

        tracing::debug!(
            host = %host,
            port,
            proxy = %proxy.url,
            "connecting through proxy"
        );
        let mut socket = BoxedSocket::tcp(tcp_connect(proxy_host, proxy_port).await?);
        if proxy_type == ProxyType::Https {
            socket = self.wrap_tls(proxy_host, socket).await?;
        }

        if !is_https {
            // Plain http goes to the proxy in absolute-form.
            return Ok(ProxyStream::new(socket, true));
        }

        establish_tunnel(&mut socket, &host, port, proxy).await?;
        let socket = self.wrap_tls(&host, socket).await?;
        Ok(ProxyStream::new(socket, false))
    }

    async fn wrap_tls(&self, host: &str, socket: BoxedSocket) -> Result<BoxedSocket, NetError> {
        let stream = self.tls.connect(host, socket).await?;
        Ok(BoxedSocket::tls(stream))
    }
}

impl Service<Uri> for Connector {
    type Response = ProxyStream;
    type Error = NetError;
    type Future = Pin<Box<dyn Future<Output = Result<ProxyStream, NetError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let connector = self.clone();
        Box::pin(async move { connector.connect(uri).await })
    }
}

/// Resolve `host` and connect to the first address that accepts.
async fn tcp_connect(host: &str, port: u16) -> Result<TcpStream, NetError> {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    let addrs: Vec<_> = tokio::net::lookup_host((bare, port))
        .await
        .dns_context(host)?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(addr = %addr, error = %e, "TCP connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses resolved")))
    .connection_context(host, port)
}

/// Ask an HTTP proxy to open a tunnel to `host:port`.
async fn establish_tunnel(
    socket: &mut BoxedSocket,
    host: &str,
    port: u16,
    proxy: &ProxySettings,
) -> Result<(), NetError> {
    let authority = format!("{}:{}", host, port);
    let mut request = format!("CONNECT {0} HTTP/1.1\r\nHost: {0}\r\n", authority);
    if let Some(auth) = proxy.get_auth_header() {
        request.push_str(&format!("Proxy-Authorization: {}\r\n", auth));
    }
    request.push_str("\r\n");

    socket
        .write_all(request.as_bytes())
        .await
        .tunnel_context(&authority)?;
    socket.flush().await.tunnel_context(&authority)?;

    // Byte-at-a-time so nothing past the head is consumed before TLS starts.
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_TUNNEL_RESPONSE {
            return Err(NetError::TunnelConnectionFailed(format!(
                "{}: proxy response head too large",
                authority
            )));
        }
        let n = socket.read(&mut byte).await.tunnel_context(&authority)?;
        if n == 0 {
            return Err(NetError::TunnelConnectionFailed(format!(
                "{}: proxy closed the connection",
                authority
            )));
        }
        head.push(byte[0]);
    }

    check_tunnel_response(&head)
        .map_err(|reason| NetError::TunnelConnectionFailed(format!("{}: {}", authority, reason)))?;
    tracing::debug!(tunnel = %authority, "proxy tunnel established");
    Ok(())
}

/// Accept any `HTTP/1.x 200` status line.
fn check_tunnel_response(head: &[u8]) -> Result<(), String> {
    let text = String::from_utf8_lossy(head);
    let status_line = text.lines().next().unwrap_or_default();
    let mut parts = status_line.split_whitespace();

    match (parts.next(), parts.next()) {
        (Some(version), Some("200")) if version.starts_with("HTTP/1.") => Ok(()),
        (Some(_), Some("407")) => Err("proxy authentication required".to_string()),
        _ => Err(format!("proxy responded {:?}", status_line)),
    }
}
