//! The public entry point: a base URL, default headers, a timeout, a TLS
//! policy and proxies, bound to one [`Session`].
//!
//! # Example
//!
//! ```rust,ignore
//! use sessionnet::{ConnectionManager, NO_QUERY};
//!
//! let mut manager = ConnectionManager::new("https://api.example.com/v1/");
//! manager.add_param_headers("X-Token", "abc");
//!
//! let resp = manager.raw_get("items", &[("limit", 10)]).await?;
//! println!("{}", resp.status());
//!
//! manager.raw_delete("items/7", None, NO_QUERY).await?;
//! ```

use crate::base::neterror::{ConnectionError, NetError};
use crate::http::{target, HttpResponse, PreparedRequest, RequestBody};
use crate::session::{Session, SessionConfig};
use crate::socket::proxy::ProxyMap;
use crate::socket::tls::Verify;
use http::Method;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Issues requests relative to a base URL over a shared session.
#[derive(Debug)]
pub struct ConnectionManager {
    base_url: String,
    headers: HashMap<String, String>,
    timeout: Duration,
    verify: Verify,
    session: Option<Session>,
}

impl ConnectionManager {
    /// Manager with no headers, a 60 second timeout, verification on and
    /// proxies from the environment only.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
            verify: Verify::Enabled,
            session: Some(Session::default()),
        }
    }

    pub fn builder(base_url: impl Into<String>) -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn verify(&self) -> &Verify {
        &self.verify
    }

    pub fn set_verify(&mut self, verify: impl Into<Verify>) {
        self.verify = verify.into();
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    pub fn set_headers(&mut self, headers: HashMap<String, String>) {
        self.headers = headers;
    }

    /// Value stored under `key`, compared exactly as stored.
    pub fn param_headers(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    pub fn exist_param_headers(&self, key: &str) -> bool {
        self.param_headers(key).is_some()
    }

    /// Insert or overwrite a header.
    ///
    /// Header names are case-insensitive on the wire, so an existing key that
    /// differs only in case is replaced rather than kept alongside.
    pub fn add_param_headers(&mut self, key: impl Into<String>, value: impl Into<String>) {
        insert_header(&mut self.headers, key.into(), value.into());
    }

    /// Remove a header; absent keys are ignored.
    pub fn del_param_headers(&mut self, key: &str) {
        self.headers.remove(key);
    }

    pub fn clean_headers(&mut self) {
        self.headers = HashMap::new();
    }

    /// GET `path` with `query` appended.
    pub async fn raw_get<Q>(&self, path: &str, query: &Q) -> Result<HttpResponse, ConnectionError>
    where
        Q: Serialize + ?Sized,
    {
        self.request(Method::GET, path, RequestBody::Empty, query)
            .await
    }

    /// POST `data` to `path`.
    pub async fn raw_post<Q>(
        &self,
        path: &str,
        data: impl Into<RequestBody>,
        query: &Q,
    ) -> Result<HttpResponse, ConnectionError>
    where
        Q: Serialize + ?Sized,
    {
        self.request(Method::POST, path, data.into(), query).await
    }

    /// PUT `data` to `path`.
    pub async fn raw_put<Q>(
        &self,
        path: &str,
        data: impl Into<RequestBody>,
        query: &Q,
    ) -> Result<HttpResponse, ConnectionError>
    where
        Q: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, data.into(), query).await
    }

    /// DELETE `path`; `None` sends an empty body.
    pub async fn raw_delete<Q>(
        &self,
        path: &str,
        data: Option<RequestBody>,
        query: &Q,
    ) -> Result<HttpResponse, ConnectionError>
    where
        Q: Serialize + ?Sized,
    {
        self.request(Method::DELETE, path, data.unwrap_or_default(), query)
            .await
    }

    /// Release the session. Later requests fail; closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
            tracing::debug!(base_url = %self.base_url, "connection manager closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    async fn request<Q>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        query: &Q,
    ) -> Result<HttpResponse, ConnectionError>
    where
        Q: Serialize + ?Sized,
    {
        let result = self.dispatch(method.clone(), path, body, query).await;
        if let Err(e) = &result {
            tracing::warn!(
                method = %method,
                base_url = %self.base_url,
                path = %path,
                error = %e,
                "request failed"
            );
        }
        result.map_err(ConnectionError::from)
    }

    async fn dispatch<Q>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        query: &Q,
    ) -> Result<HttpResponse, NetError>
    where
        Q: Serialize + ?Sized,
    {
        let session = self.session.as_ref().ok_or(NetError::SessionClosed)?;
        let url = target::resolve(&self.base_url, path, query)?;
        let request = PreparedRequest::new(method, url, &self.headers, body)?;
        session.send(request, &self.verify, self.timeout).await
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

fn insert_header(headers: &mut HashMap<String, String>, key: String, value: String) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&key));
    headers.insert(key, value);
}

/// Builder for a [`ConnectionManager`] with non-default settings.
#[derive(Debug, Clone)]
pub struct ConnectionManagerBuilder {
    base_url: String,
    headers: HashMap<String, String>,
    timeout: Duration,
    verify: Verify,
    proxies: Vec<(String, String)>,
    session: SessionConfig,
}

impl ConnectionManagerBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
            verify: Verify::Enabled,
            proxies: Vec::new(),
            session: SessionConfig::default(),
        }
    }

    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Add a single header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        insert_header(&mut self.headers, key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `true`/`false`, or a path to a PEM CA bundle.
    pub fn verify(mut self, verify: impl Into<Verify>) -> Self {
        self.verify = verify.into();
        self
    }

    /// Proxy URLs keyed by `http`, `https`, `all` or `scheme://host`.
    ///
    /// Parsed by [`build`](Self::build); entries override the environment's.
    pub fn proxies<I, K, V>(mut self, proxies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.proxies
            .extend(proxies.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Whether to read proxy settings from the environment (default `true`).
    pub fn trust_env(mut self, trust_env: bool) -> Self {
        self.session.trust_env = trust_env;
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.session.max_redirects = max_redirects;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.session.user_agent = user_agent.into();
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.session.pool_idle_timeout = timeout;
        self
    }

    /// Fails when a proxy URL or the user agent is invalid.
    pub fn build(self) -> Result<ConnectionManager, NetError> {
        let mut session_config = self.session;
        session_config.proxies.update(ProxyMap::parse(self.proxies)?);
        let session = Session::new(session_config)?;

        Ok(ConnectionManager {
            base_url: self.base_url,
            headers: self.headers,
            timeout: self.timeout,
            verify: self.verify,
            session: Some(session),
        })
    }
}
