use std::time::{Duration, SystemTime};

use http::{HeaderMap, HeaderValue};

#[derive(Debug, Clone, Default)]
pub struct CacheControl {
    pub public: bool,
    pub private: bool,
    pub no_cache: bool,
    pub no_store: bool,
    pub max_age: Option<Duration>,
    pub s_maxage: Option<Duration>,
    pub must_revalidate: bool,
}

pub fn parse_cache_control(headers: &HeaderMap) -> CacheControl {
    let mut cc = CacheControl::default();

    for value in headers.get_all(http::header::CACHE_CONTROL) {
        if let Ok(s) = value.to_str() {
            for part in s.split(',') {
                let part = part.trim();
                if part.eq_ignore_ascii_case("public") {
                    cc.public = true;
                } else if part.eq_ignore_ascii_case("private") {
                    cc.private = true;
                } else if part.eq_ignore_ascii_case("no-cache") {
                    cc.no_cache = true;
                } else if part.eq_ignore_ascii_case("no-store") {
                    cc.no_store = true;
                } else if part.eq_ignore_ascii_case("must-revalidate") {
                    cc.must_revalidate = true;
                } else if let Some(stripped) = part.strip_prefix("max-age=")
                    && let Ok(secs) = stripped.parse::<u64>()
                {
                    cc.max_age = Some(Duration::from_secs(secs));
                } else if let Some(stripped) = part.strip_prefix("s-maxage=")
                    && let Ok(secs) = stripped.parse::<u64>()
                {
                    cc.s_maxage = Some(Duration::from_secs(secs));
                }
            }
        }
    }
    cc
}

/// Freshness lifetime granted by a stored response: s-maxage wins over
/// max-age, which wins over Expires relative to the Date header (or to
/// now when Date is absent). None means the response carries no
/// freshness information at all.
pub fn freshness_lifetime(headers: &HeaderMap) -> Option<Duration> {
    let cc = parse_cache_control(headers);

    if let Some(s_maxage) = cc.s_maxage {
        return Some(s_maxage);
    }
    if let Some(max_age) = cc.max_age {
        return Some(max_age);
    }

    if let Some(expires) = headers.get(http::header::EXPIRES)
        && let Ok(expires_str) = expires.to_str()
        && let Ok(expires_time) = httpdate::parse_http_date(expires_str)
    {
        let origin = response_date(headers).unwrap_or_else(SystemTime::now);
        if let Ok(duration) = expires_time.duration_since(origin) {
            return Some(duration);
        }
        // Expires already in the past.
        return Some(Duration::ZERO);
    }

    None
}

/// Age of a stored response: the larger of its Age header and the time
/// elapsed since its Date header.
pub fn current_age(headers: &HeaderMap) -> Duration {
    let header_age = headers
        .get(http::header::AGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_default();

    let elapsed = response_date(headers)
        .and_then(|date| SystemTime::now().duration_since(date).ok())
        .unwrap_or_default();

    header_age.max(elapsed)
}

/// Remaining freshness, or None when the response never declared any.
pub fn time_to_live(headers: &HeaderMap) -> Option<Duration> {
    freshness_lifetime(headers).map(|lifetime| lifetime.saturating_sub(current_age(headers)))
}

pub fn is_fresh(headers: &HeaderMap) -> bool {
    matches!(time_to_live(headers), Some(ttl) if ttl > Duration::ZERO)
}

/// Forces a fresh response into the expired state by pinning its Age to
/// the full freshness lifetime. Stale or lifetime-less responses are
/// left untouched.
pub fn expire(headers: &mut HeaderMap) {
    if !is_fresh(headers) {
        return;
    }
    if let Some(lifetime) = freshness_lifetime(headers) {
        headers.insert(http::header::AGE, HeaderValue::from(lifetime.as_secs()));
    }
}

fn response_date(headers: &HeaderMap) -> Option<SystemTime> {
    let value = headers.get(http::header::DATE)?;
    let value = value.to_str().ok()?;
    httpdate::parse_http_date(value).ok()
}
