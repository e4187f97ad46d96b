//! Redirect handling.
//!
//! Decides whether a response redirects, where to, and how the follow-up
//! request changes (method, body, credentials).

use crate::http::request::PreparedRequest;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use url::Url;

/// Default limit on redirects followed for one request.
pub const DEFAULT_MAX_REDIRECTS: usize = 30;

/// Location of the next hop, if `status` redirects and `Location` is usable.
pub fn location(current: &Url, status: StatusCode, headers: &HeaderMap) -> Option<Url> {
    if !is_redirect(status) {
        return None;
    }
    let location = headers.get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Method of the follow-up request.
///
/// 303 and 302 switch to GET (HEAD stays HEAD); 301 switches POST to GET.
pub fn next_method(status: StatusCode, method: &Method) -> Method {
    match status {
        StatusCode::SEE_OTHER | StatusCode::FOUND if method != Method::HEAD => Method::GET,
        StatusCode::MOVED_PERMANENTLY if method == Method::POST => Method::GET,
        _ => method.clone(),
    }
}

/// Whether `Authorization` must be dropped when moving from `old` to `new`.
///
/// Kept for the same host, and for an http→https upgrade on default ports.
pub fn should_strip_auth(old: &Url, new: &Url) -> bool {
    if old.host_str() != new.host_str() {
        return true;
    }
    if old.scheme() == "http"
        && new.scheme() == "https"
        && matches!(old.port(), None | Some(80))
        && matches!(new.port(), None | Some(443))
    {
        return false;
    }
    old.scheme() != new.scheme() || old.port_or_known_default() != new.port_or_known_default()
}

/// Rewrite `request` in place to follow a redirect to `next`.
pub fn follow(request: &mut PreparedRequest, status: StatusCode, next: Url) {
    request.method = next_method(status, &request.method);

    if status != StatusCode::TEMPORARY_REDIRECT && status != StatusCode::PERMANENT_REDIRECT {
        request.body.clear();
        request.headers.remove(CONTENT_TYPE);
        request.headers.remove(TRANSFER_ENCODING);
        request.headers.remove(CONTENT_LENGTH);
        if request.method != Method::GET && request.method != Method::HEAD {
            request
                .headers
                .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        }
    }

    if should_strip_auth(&request.url, &next) {
        request.headers.remove(AUTHORIZATION);
    }

    request.url = next;
}
