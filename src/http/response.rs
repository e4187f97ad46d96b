//! HTTP Response with body access.

use crate::base::neterror::NetError;
use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};
use url::Url;

/// HTTP Response as returned to the caller.
///
/// The body has already been read in full. Status codes are not
/// interpreted: a 404 or 500 is a normal response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    url: Url,
    body: Bytes,
}

impl HttpResponse {
    /// Assemble from response parts and the collected body.
    pub fn new(parts: http::response::Parts, url: Url, body: Bytes) -> Self {
        Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            url,
            body,
        }
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get a reference to the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Final URL, after any redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Borrow the body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response, returning the body bytes.
    pub fn bytes(self) -> Bytes {
        self.body
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<String, NetError> {
        String::from_utf8(self.body.to_vec()).map_err(|_| NetError::InvalidUtf8)
    }

    /// Body as JSON, deserializing to type T.
    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        serde_json::from_slice(&self.body).map_err(|e| NetError::JsonParseError(e.to_string()))
    }
}
