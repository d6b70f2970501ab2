use http::Uri;

const METADATA_PREFIX: &str = "md";
const ENTITY_PREFIX: &str = "en";
const LOCK_SUFFIX: &str = ".lck";

/// Derives the cache key shared by every representation stored for `uri`.
///
/// The key depends only on the URI as the caller's HTTP stack rendered
/// it; no further normalization is applied here, so two requests must
/// present the same URI to land on the same key.
pub(crate) fn cache_key(uri: &Uri) -> String {
    format!(
        "{METADATA_PREFIX}{}",
        blake3::hash(uri.to_string().as_bytes()).to_hex()
    )
}

/// Derives the content-addressed entity key for a response body.
/// Identical bodies collapse to the same record regardless of which
/// response produced them.
pub(crate) fn content_digest(body: &[u8]) -> String {
    format!("{ENTITY_PREFIX}{}", blake3::hash(body).to_hex())
}

pub(crate) fn lock_key(cache_key: &str) -> String {
    format!("{cache_key}{LOCK_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(value: &str) -> Uri {
        value.parse().expect("parse test uri")
    }

    #[test]
    fn cache_key_is_deterministic() {
        let a = cache_key(&uri("http://example.com/resource?page=2"));
        let b = cache_key(&uri("http://example.com/resource?page=2"));
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_separates_uris() {
        let a = cache_key(&uri("http://example.com/resource"));
        let b = cache_key(&uri("http://example.com/resource?page=2"));
        let c = cache_key(&uri("http://other.example.com/resource"));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn key_namespaces_do_not_collide() {
        // The same bytes hashed as a URI and as a body must land in
        // different store namespaces.
        let key = cache_key(&uri("http://example.com/"));
        let digest = content_digest(b"http://example.com/");
        assert!(key.starts_with("md"));
        assert!(digest.starts_with("en"));
        // Same bytes, same hash; the prefix alone keeps the records apart.
        assert_eq!(&key[2..], &digest[2..]);
        assert_ne!(key, digest);
    }

    #[test]
    fn content_digest_tracks_body_bytes() {
        assert_eq!(content_digest(b"hello"), content_digest(b"hello"));
        assert_ne!(content_digest(b"hello"), content_digest(b"hello!"));
    }

    #[test]
    fn lock_key_appends_suffix() {
        let key = cache_key(&uri("http://example.com/"));
        assert_eq!(lock_key(&key), format!("{key}.lck"));
    }
}
