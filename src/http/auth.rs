//! Request authentication hook.
//!
//! The session runs every outgoing request through an [`Authenticate`]
//! implementation right before it is sent. The installed default is
//! [`NoAuth`], which leaves the request untouched, so the only credentials
//! that reach the server are the headers the caller set explicitly.

use bytes::Bytes;
use http::Request;
use http_body_util::Full;
use std::fmt;

/// Hook applied to each outgoing request, including redirect hops.
pub trait Authenticate: Send + Sync + fmt::Debug {
    fn authenticate(&self, request: &mut Request<Full<Bytes>>);
}

/// Identity hook: adds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl Authenticate for NoAuth {
    fn authenticate(&self, _request: &mut Request<Full<Bytes>>) {}
}
