//! Request target resolution.
//!
//! Joins a request path against the manager's base URL with RFC 3986
//! reference resolution, then appends the query parameters.

use crate::base::neterror::NetError;
use serde::Serialize;
use url::Url;

/// Query parameters for calls that have none.
pub const NO_QUERY: &[(&str, &str)] = &[];

/// Resolve `path` against `base`.
///
/// - `"foo"` replaces the last segment of the base path
/// - `"/foo"` replaces the whole base path
/// - `"https://other/x"` replaces everything
/// - an empty base yields `path`, an empty path yields `base`
pub fn join(base: &str, path: &str) -> Result<Url, NetError> {
    if base.is_empty() {
        return parse(path);
    }
    let base_url = parse(base)?;
    if path.is_empty() {
        return Ok(base_url);
    }
    base_url
        .join(path)
        .map_err(|e| NetError::InvalidUrl(format!("{} (joining {:?} onto {})", e, path, base)))
}

/// Append serialized query parameters after any query already on `url`.
pub fn append_query<Q>(url: &mut Url, query: &Q) -> Result<(), NetError>
where
    Q: Serialize + ?Sized,
{
    let encoded =
        serde_urlencoded::to_string(query).map_err(|e| NetError::BodyEncoding(e.to_string()))?;
    if encoded.is_empty() {
        return Ok(());
    }

    let merged = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{}&{}", existing, encoded),
        _ => encoded,
    };
    url.set_query(Some(&merged));
    Ok(())
}

/// Join, then attach query parameters.
pub fn resolve<Q>(base: &str, path: &str, query: &Q) -> Result<Url, NetError>
where
    Q: Serialize + ?Sized,
{
    let mut url = join(base, path)?;
    append_query(&mut url, query)?;
    check_scheme(&url)?;
    Ok(url)
}

fn parse(s: &str) -> Result<Url, NetError> {
    Url::parse(s).map_err(|e| NetError::InvalidUrl(format!("{}: {:?}", e, s)))
}

fn check_scheme(url: &Url) -> Result<(), NetError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(NetError::UnknownUrlScheme(other.to_string())),
    }
}
