//! Socket and connection management.
//!
//! - [`connectjob`]: DNS -> TCP -> proxy -> TLS connection flow
//! - [`proxy`]: proxy map, selection and credentials
//! - [`matcher`]: `NO_PROXY` bypass rules
//! - [`tls`]: verification policy and BoringSSL connector
//! - [`stream`]: boxed sockets handed to the pooled client

pub mod connectjob;
pub mod matcher;
pub mod proxy;
pub mod stream;
pub mod tls;

pub use connectjob::Connector;
pub use proxy::{ProxyMap, ProxySettings, ProxyType};
pub use tls::Verify;
