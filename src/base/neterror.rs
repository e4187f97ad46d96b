use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Boxed error used at the boundary with hyper-util's client.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Transport-level failure causes.
///
/// These never escape the request methods of
/// [`ConnectionManager`](crate::manager::ConnectionManager) directly; they are
/// wrapped into a [`ConnectionError`] there. They are returned as-is from
/// construction (bad proxy URL) and from response decoding.
#[derive(Debug, Error)]
pub enum NetError {
    // Addressing
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Unknown URL scheme: {0}")]
    UnknownUrlScheme(String),
    #[error("Invalid proxy URL: {0}")]
    InvalidProxy(String),
    #[error("Invalid header {0}")]
    InvalidHeader(String),
    #[error("Request body encoding failed: {0}")]
    BodyEncoding(String),

    // Connection
    #[error("Name not resolved: {domain}: {source}")]
    NameNotResolved {
        domain: String,
        #[source]
        source: io::Error,
    },
    #[error("Connection to {host}:{port} failed: {source}")]
    ConnectionFailedTo {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("Connection timed out after {0:?}")]
    ConnectionTimedOut(Duration),
    #[error("Tunnel connection failed: {0}")]
    TunnelConnectionFailed(String),
    #[error("Unsupported proxy scheme: {0}")]
    UnsupportedProxy(String),

    // TLS
    #[error("SSL protocol error: {0}")]
    SslProtocolError(String),
    #[error("Invalid CA bundle {path}: {reason}")]
    InvalidCaBundle { path: PathBuf, reason: String },

    // HTTP
    #[error("Too many redirects (exceeded {0})")]
    TooManyRedirects(usize),
    #[error("Session is closed")]
    SessionClosed,
    #[error("{message}")]
    Http {
        message: String,
        #[source]
        source: BoxError,
    },
    #[error("Failed to read response body: {0}")]
    HttpBodyError(String),
    #[error("Response body is not valid UTF-8")]
    InvalidUtf8,
    #[error("JSON parse error: {0}")]
    JsonParseError(String),
}

impl NetError {
    /// Wrap an IO failure while connecting to `host:port`.
    pub fn connection_failed_to(host: &str, port: u16, source: io::Error) -> Self {
        NetError::ConnectionFailedTo {
            host: host.to_string(),
            port,
            source,
        }
    }

    /// Wrap an IO failure while resolving `domain`.
    pub fn dns_failed(domain: &str, source: io::Error) -> Self {
        NetError::NameNotResolved {
            domain: domain.to_string(),
            source,
        }
    }

    /// Wrap an error coming out of hyper or hyper-util.
    pub fn http<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source = err.into();
        NetError::Http {
            message: render_chain(source.as_ref()),
            source,
        }
    }
}

/// The single error kind returned by the request methods.
///
/// Every failure between "build the request" and "have the response body in
/// hand" ends up here. The cause is kept as the error source and rendered
/// into the message, but it is not classified further.
#[derive(Debug, Error)]
#[error("Can't connect to server ({cause})")]
pub struct ConnectionError {
    cause: String,
    #[source]
    source: BoxError,
}

impl ConnectionError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source = err.into();
        Self {
            cause: render_chain(source.as_ref()),
            source,
        }
    }

    /// The rendered description of the underlying failure.
    pub fn cause(&self) -> &str {
        &self.cause
    }

    /// The innermost [`NetError`] in the source chain.
    ///
    /// A refused connection surfaces from the pooled client as
    /// `NetError::Http` around hyper-util's error around the connector's
    /// `ConnectionFailedTo`; this returns the latter.
    pub fn net_error(&self) -> Option<&NetError> {
        let mut found = None;
        let mut current: Option<&(dyn StdError + 'static)> = Some(self.source.as_ref());
        while let Some(err) = current {
            if let Some(net) = err.downcast_ref::<NetError>() {
                found = Some(net);
            }
            current = err.source();
        }
        found
    }
}

impl From<NetError> for ConnectionError {
    fn from(err: NetError) -> Self {
        ConnectionError::new(err)
    }
}

/// Join an error and its sources with `": "`, skipping a source whose text is
/// already part of the message above it.
pub(crate) fn render_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        current = cause.source();
    }
    rendered
}
