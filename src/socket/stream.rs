//! Socket abstraction for plain, TLS, and TLS-in-TLS streams.
//!
//! `StreamSocket` gives uniform handling of TCP, TLS over TCP and nested TLS
//! (an https target tunnelled through an https proxy). [`ProxyStream`] is
//! what the connector hands to hyper-util's pooled client.

use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_boring::SslStream;

/// Any socket that supports async read/write and can be wrapped in TLS.
pub trait StreamSocket: AsyncRead + AsyncWrite + Unpin + Send + Sync + 'static {}

impl StreamSocket for TcpStream {}

impl<S: StreamSocket + fmt::Debug> StreamSocket for SslStream<S> {}

impl StreamSocket for BoxedSocket {}

/// Type-erased `StreamSocket`, so TLS can be layered any number of times.
pub struct BoxedSocket {
    inner: Pin<Box<dyn StreamSocket>>,
    kind: &'static str,
}

impl BoxedSocket {
    pub fn tcp(socket: TcpStream) -> Self {
        Self {
            inner: Box::pin(socket),
            kind: "tcp",
        }
    }

    pub fn tls<S: StreamSocket + fmt::Debug>(socket: SslStream<S>) -> Self {
        Self {
            inner: Box::pin(socket),
            kind: "tls",
        }
    }

    /// `"tcp"` or `"tls"`: the outermost layer.
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl fmt::Debug for BoxedSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedSocket")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for BoxedSocket {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.inner.as_mut().poll_read(cx, buf)
    }
}

impl AsyncWrite for BoxedSocket {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.inner.as_mut().poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.inner.as_mut().poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.inner.as_mut().poll_shutdown(cx)
    }
}

/// An established connection, ready for HTTP/1.1.
///
/// `proxied` marks a connection to a forward proxy carrying plain http
/// requests; the pooled client then writes absolute-form request targets.
/// Tunnelled (CONNECT) connections are not marked.
#[derive(Debug)]
pub struct ProxyStream {
    io: TokioIo<BoxedSocket>,
    proxied: bool,
}

impl ProxyStream {
    pub fn new(socket: BoxedSocket, proxied: bool) -> Self {
        Self {
            io: TokioIo::new(socket),
            proxied,
        }
    }

    pub fn is_proxied(&self) -> bool {
        self.proxied
    }
}

impl Connection for ProxyStream {
    fn connected(&self) -> Connected {
        Connected::new().proxy(self.proxied)
    }
}

impl Read for ProxyStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl Write for ProxyStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }
}
