//! # sessionnet
//!
//! A small HTTP session wrapper over a pooled hyper client.
//!
//! A [`ConnectionManager`] keeps a base URL, default headers, a timeout, a
//! TLS verification policy and proxies, and issues GET/POST/PUT/DELETE
//! requests against paths resolved relative to the base URL. Every failure
//! surfaces as a single [`ConnectionError`].
//!
//! ## Features
//!
//! - **URL joining**: RFC 3986 reference resolution against the base URL
//! - **Proxies**: HTTP and HTTPS proxies, `CONNECT` tunnels, `NO_PROXY`
//! - **TLS**: BoringSSL with system roots, verification off, or a CA bundle
//! - **Redirects**: followed with method rewriting and credential stripping
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sessionnet::ConnectionManager;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut manager = ConnectionManager::new("https://example.com/api/");
//!     manager.add_param_headers("X-Token", "abc");
//!
//!     let response = manager.raw_get("items", &[("limit", 10)]).await.unwrap();
//!     println!("Status: {}", response.status());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error types
//! - [`http`] - Request targets, bodies, responses and redirects
//! - [`socket`] - Connector, proxies and TLS
//! - [`session`] - Pooled transport shared by a manager
//! - [`manager`] - The public `ConnectionManager`

pub mod base;
pub mod http;
pub mod manager;
pub mod session;
pub mod socket;

pub use base::neterror::{ConnectionError, NetError};
pub use http::{HttpResponse, RequestBody, NO_QUERY};
pub use manager::{ConnectionManager, ConnectionManagerBuilder, DEFAULT_TIMEOUT};
pub use session::{Session, SessionConfig};
pub use socket::{ProxyMap, ProxySettings, Verify};
