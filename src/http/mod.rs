//! HTTP request and response types.
//!
//! - [`target`]: base URL join and query parameters
//! - [`requestbody`]: form and raw request bodies
//! - [`request`]: a fully resolved outgoing request
//! - [`response`]: the response handed back to callers
//! - [`redirect`]: redirect following rules
//! - [`auth`]: the per-request authentication hook

pub mod auth;
pub mod redirect;
pub mod request;
pub mod requestbody;
pub mod response;
pub mod target;

// Re-exports for convenience
pub use auth::{Authenticate, NoAuth};
pub use request::PreparedRequest;
pub use requestbody::RequestBody;
pub use response::HttpResponse;
pub use target::NO_QUERY;
