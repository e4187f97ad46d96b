//! Long-lived transport shared by all requests of one manager.
//!
//! A [`Session`] owns the proxy map, default headers, the authentication
//! hook and one pooled hyper-util client per [`Verify`] policy. Connections
//! opened under one policy are never reused under another.

use crate::base::neterror::NetError;
use crate::http::redirect::{self, DEFAULT_MAX_REDIRECTS};
use crate::http::{Authenticate, HttpResponse, NoAuth, PreparedRequest};
use crate::socket::connectjob::Connector;
use crate::socket::proxy::ProxyMap;
use crate::socket::tls::Verify;
use bytes::Bytes;
use dashmap::DashMap;
use http::header::{HeaderValue, ACCEPT, PROXY_AUTHORIZATION, USER_AGENT};
use http::HeaderMap;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type HttpClient = Client<Connector, Full<Bytes>>;

/// Default `User-Agent` sent when the caller sets none.
pub const DEFAULT_USER_AGENT: &str = concat!("sessionnet/", env!("CARGO_PKG_VERSION"));

/// Session-wide settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Merged on top of the environment proxies.
    pub proxies: ProxyMap,
    /// Read `HTTP_PROXY`/`HTTPS_PROXY`/`ALL_PROXY`/`NO_PROXY`.
    pub trust_env: bool,
    pub max_redirects: usize,
    pub user_agent: String,
    /// How long an idle pooled connection is kept. `None` keeps it forever.
    pub pool_idle_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            proxies: ProxyMap::new(),
            trust_env: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            pool_idle_timeout: Some(Duration::from_secs(90)),
        }
    }
}

pub struct Session {
    proxies: Arc<ProxyMap>,
    default_headers: HeaderMap,
    auth: Arc<dyn Authenticate>,
    max_redirects: usize,
    pool_idle_timeout: Option<Duration>,
    clients: DashMap<Verify, HttpClient>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("proxies", &self.proxies)
            .field("default_headers", &self.default_headers)
            .field("auth", &self.auth)
            .field("max_redirects", &self.max_redirects)
            .field("clients", &self.clients.len())
            .finish()
    }
}

impl Session {
    /// Build a session; fails only when `config.user_agent` is not a valid
    /// header value.
    pub fn new(config: SessionConfig) -> Result<Self, NetError> {
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| NetError::InvalidHeader(format!("value for {:?}", "User-Agent")))?;
        Ok(Self::with_user_agent(config, user_agent))
    }

    fn with_user_agent(config: SessionConfig, user_agent: HeaderValue) -> Self {
        let mut proxies = if config.trust_env {
            ProxyMap::from_env()
        } else {
            ProxyMap::new()
        };
        proxies.update(config.proxies);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, user_agent);
        default_headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        Self {
            proxies: Arc::new(proxies),
            default_headers,
            auth: Arc::new(NoAuth),
            max_redirects: config.max_redirects,
            pool_idle_timeout: config.pool_idle_timeout,
            clients: DashMap::new(),
        }
    }

    /// The effective proxy map (environment plus caller entries).
    pub fn proxies(&self) -> &ProxyMap {
        &self.proxies
    }

    /// Number of pooled clients created so far.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Send `request`, following redirects, and read the whole body.
    ///
    /// `timeout` bounds the entire exchange.
    pub async fn send(
        &self,
        request: PreparedRequest,
        verify: &Verify,
        timeout: Duration,
    ) -> Result<HttpResponse, NetError> {
        let client = self.client_for(verify)?;
        match tokio::time::timeout(timeout, self.execute(&client, request)).await {
            Ok(result) => result,
            Err(_) => Err(NetError::ConnectionTimedOut(timeout)),
        }
    }

    /// Drop every pooled client and with it the idle connections.
    pub fn close(&self) {
        let count = self.clients.len();
        self.clients.clear();
        tracing::debug!(clients = count, "session closed");
    }

    fn client_for(&self, verify: &Verify) -> Result<HttpClient, NetError> {
        if let Some(client) = self.clients.get(verify) {
            return Ok(client.clone());
        }

        let connector = Connector::new(self.proxies.clone(), verify)?;
        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(self.pool_idle_timeout)
            .build(connector);
        tracing::debug!(verify = ?verify, "created pooled client");

        Ok(self
            .clients
            .entry(verify.clone())
            .or_insert(client)
            .clone())
    }

    async fn execute(
        &self,
        client: &HttpClient,
        mut request: PreparedRequest,
    ) -> Result<HttpResponse, NetError> {
        self.apply_default_headers(&mut request.headers);
        let mut redirects = 0;

        loop {
            let mut outgoing = request.to_hyper()?;
            if request.url.scheme() == "http" {
                let auth = self
                    .proxies
                    .select(&request.url)
                    .and_then(|proxy| proxy.get_auth_header())
                    .and_then(|value| HeaderValue::from_str(&value).ok());
                if let Some(auth) = auth {
                    outgoing
                        .headers_mut()
                        .entry(PROXY_AUTHORIZATION)
                        .or_insert(auth);
                }
            }
            self.auth.authenticate(&mut outgoing);

            tracing::debug!(method = %request.method, url = %request.url, "sending request");
            let response = client.request(outgoing).await.map_err(NetError::http)?;
            let status = response.status();

            let Some(next) = redirect::location(&request.url, status, response.headers()) else {
                let (parts, body) = response.into_parts();
                let body = body
                    .collect()
                    .await
                    .map_err(|e| NetError::HttpBodyError(e.to_string()))?
                    .to_bytes();
                tracing::debug!(status = %parts.status, bytes = body.len(), "response received");
                return Ok(HttpResponse::new(parts, request.url, body));
            };

            if redirects >= self.max_redirects {
                return Err(NetError::TooManyRedirects(self.max_redirects));
            }
            if !matches!(next.scheme(), "http" | "https") {
                return Err(NetError::UnknownUrlScheme(next.scheme().to_string()));
            }
            redirects += 1;

            // Drain the redirect body so the connection can go back to the pool.
            let _ = response.into_body().collect().await;
            tracing::debug!(status = %status, location = %next, hop = redirects, "following redirect");
            redirect::follow(&mut request, status, next);
        }
    }

    /// Fill in session defaults the request did not set.
    fn apply_default_headers(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.default_headers {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
    }
}

impl Default for Session {
    /// Session with [`SessionConfig::default`] settings.
    fn default() -> Self {
        Self::with_user_agent(
            SessionConfig::default(),
            HeaderValue::from_static(DEFAULT_USER_AGENT),
        )
    }
}
