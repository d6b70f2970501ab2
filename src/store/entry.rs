use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// Synthetic response-header field carrying the status code while an
/// entry sits in the metadata ledger. Stripped again on restore.
pub(crate) const STATUS_FIELD: &str = "x-status";

/// Marker header pointing a stored response at its entity record. Unlike
/// the status field this one stays visible on restored responses, so a
/// re-served response can be written back without re-storing its body.
pub(crate) const DIGEST_FIELD: &str = "x-content-digest";

/// One Vary-distinguished representation stored under a cache key: the
/// request headers it was generated for, paired with the response
/// headers (including the synthetic fields above).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct VariantEntry {
    pub request: Vec<(String, String)>,
    pub response: Vec<(String, String)>,
}

impl VariantEntry {
    pub(crate) fn request_headers(&self) -> HeaderMap {
        pairs_to_headermap(&self.request)
    }

    pub(crate) fn response_headers(&self) -> HeaderMap {
        pairs_to_headermap(&self.response)
    }

    /// The Vary signature this entry was stored under: all `vary` values
    /// joined with `", "`, empty when the response did not vary.
    pub(crate) fn vary_signature(&self) -> String {
        vary_signature_of_pairs(&self.response)
    }

    pub(crate) fn content_digest(&self) -> Option<&str> {
        self.response
            .iter()
            .find(|(name, _)| name == DIGEST_FIELD)
            .map(|(_, value)| value.as_str())
    }
}

pub(crate) fn headermap_to_pairs(map: &HeaderMap) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(map.len());
    for (name, value) in map.iter() {
        if let Ok(value) = value.to_str() {
            pairs.push((name.as_str().to_string(), value.to_string()));
        }
    }
    pairs
}

pub(crate) fn pairs_to_headermap(pairs: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            map.append(name, value);
        }
    }
    map
}

/// Snapshot of response headers ready for the ledger: the live headers
/// plus the synthetic status field.
pub(crate) fn persist_response(status: StatusCode, headers: &HeaderMap) -> Vec<(String, String)> {
    let mut pairs = headermap_to_pairs(headers);
    pairs.push((STATUS_FIELD.to_string(), status.as_u16().to_string()));
    pairs
}

/// Rebuilds a response from persisted headers and a fetched body,
/// restoring the status from the synthetic field and dropping it from
/// the visible header set.
pub(crate) fn restore_response(mut headers: HeaderMap, body: Bytes) -> Response<Bytes> {
    let status = headers
        .remove(STATUS_FIELD)
        .and_then(|value| value.to_str().ok().map(str::to_owned))
        .and_then(|value| value.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

pub(crate) fn vary_signature(headers: &HeaderMap) -> String {
    headers
        .get_all(http::header::VARY)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join(", ")
}

fn vary_signature_of_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .filter(|(name, _)| name == "vary")
        .map(|(_, value)| value.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
