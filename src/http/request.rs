//! A request with everything resolved, ready for the session.

use crate::base::neterror::NetError;
use crate::http::RequestBody;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, Method, Request};
use http_body_util::Full;
use std::collections::HashMap;
use url::Url;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Method, URL, headers and body of one outgoing request.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl PreparedRequest {
    /// Build a request from the manager's plain header mapping.
    ///
    /// Header names are validated here, not when they are stored.
    pub fn new(
        method: Method,
        url: Url,
        headers: &HashMap<String, String>,
        body: RequestBody,
    ) -> Result<Self, NetError> {
        let mut header_map = convert_headers(headers)?;

        if body.is_form() && !header_map.contains_key(CONTENT_TYPE) {
            header_map.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        }

        let body = body.into_bytes();
        if body.is_empty() && method != Method::GET && method != Method::HEAD {
            header_map.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        }

        Ok(Self {
            method,
            url,
            headers: header_map,
            body,
        })
    }

    /// Convert into a hyper request.
    ///
    /// Credentials embedded in the URL are dropped: they never become an
    /// `Authorization` header and never reach the wire.
    pub fn to_hyper(&self) -> Result<Request<Full<Bytes>>, NetError> {
        let mut url = self.url.clone();
        // Both setters only fail for cannot-be-a-base URLs, which http(s) never are.
        let _ = url.set_password(None);
        let _ = url.set_username("");

        let uri: http::Uri = url
            .as_str()
            .parse()
            .map_err(|e: http::uri::InvalidUri| NetError::InvalidUrl(e.to_string()))?;

        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(uri)
            .body(Full::new(self.body.clone()))
            .map_err(NetError::http)?;
        *request.headers_mut() = self.headers.clone();
        Ok(request)
    }
}

/// Validate and convert a plain string mapping into a `HeaderMap`.
///
/// Keys are visited in byte order, so when two keys differ only in case the
/// result does not depend on hash order: the key that sorts last wins.
pub fn convert_headers(headers: &HashMap<String, String>) -> Result<HeaderMap, NetError> {
    let mut entries: Vec<_> = headers.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut map = HeaderMap::with_capacity(entries.len());
    for (key, value) in entries {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| NetError::InvalidHeader(format!("name {:?}", key)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| NetError::InvalidHeader(format!("value for {:?}", key)))?;
        map.insert(name, value);
    }
    Ok(map)
}
