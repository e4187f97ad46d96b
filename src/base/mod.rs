//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): transport failure causes
//! - [`ConnectionError`](neterror::ConnectionError): the error request methods return
//! - [`IoResultExt`](context::IoResultExt): context helpers for `io::Error`

pub mod context;
pub mod neterror;
