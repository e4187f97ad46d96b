//! Request body for POST/PUT/DELETE operations.

use crate::base::neterror::NetError;
use bytes::Bytes;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Request body for HTTP methods that send data.
///
/// Form data is the default shape: maps and lists of pairs are
/// form-urlencoded. Strings and byte buffers are sent as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    /// No body. An empty form collapses to this.
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` payload, already encoded.
    Form(String),
    /// Body with raw bytes and no implied content type.
    Bytes(Bytes),
}

impl RequestBody {
    /// Encode any serializable value (struct, map, list of pairs) as a form.
    pub fn form<T: Serialize + ?Sized>(value: &T) -> Result<Self, NetError> {
        let encoded =
            serde_urlencoded::to_string(value).map_err(|e| NetError::BodyEncoding(e.to_string()))?;
        Ok(Self::from_encoded_form(encoded))
    }

    /// Encode form pairs, keeping their order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        Self::from_encoded_form(encoded)
    }

    fn from_encoded_form(encoded: String) -> Self {
        if encoded.is_empty() {
            RequestBody::Empty
        } else {
            RequestBody::Form(encoded)
        }
    }

    /// Check if the body is empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Get the length of the body in bytes.
    pub fn len(&self) -> usize {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Form(s) => s.len(),
            RequestBody::Bytes(b) => b.len(),
        }
    }

    /// Whether this body implies a form content type.
    pub fn is_form(&self) -> bool {
        matches!(self, RequestBody::Form(_))
    }

    /// Consume into the wire bytes.
    pub fn into_bytes(self) -> Bytes {
        match self {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Form(s) => Bytes::from(s),
            RequestBody::Bytes(b) => b,
        }
    }
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Bytes(Bytes::from(s))
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Bytes(Bytes::from(s.to_owned()))
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl<K: AsRef<str>, V: AsRef<str>> From<&[(K, V)]> for RequestBody {
    fn from(pairs: &[(K, V)]) -> Self {
        RequestBody::from_pairs(pairs.iter().map(|(k, v)| (k, v)))
    }
}

impl<K: AsRef<str>, V: AsRef<str>, const N: usize> From<[(K, V); N]> for RequestBody {
    fn from(pairs: [(K, V); N]) -> Self {
        RequestBody::from_pairs(pairs)
    }
}

impl<K: AsRef<str>, V: AsRef<str>> From<Vec<(K, V)>> for RequestBody {
    fn from(pairs: Vec<(K, V)>) -> Self {
        RequestBody::from_pairs(pairs)
    }
}

impl From<HashMap<String, String>> for RequestBody {
    fn from(map: HashMap<String, String>) -> Self {
        RequestBody::from_pairs(map)
    }
}

impl From<BTreeMap<String, String>> for RequestBody {
    fn from(map: BTreeMap<String, String>) -> Self {
        RequestBody::from_pairs(map)
    }
}
