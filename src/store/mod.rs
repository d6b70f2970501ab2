use bytes::Bytes;
use http::header::{CONTENT_LENGTH, HeaderName, HeaderValue, TRANSFER_ENCODING};
use http::{HeaderMap, Request, Response, Uri};
use tracing::{trace, warn};

mod entry;
mod key;
mod lock;

use crate::driver::Driver;
use crate::error::StoreError;
use crate::freshness;
use entry::{
    DIGEST_FIELD, VariantEntry, headermap_to_pairs, persist_response, restore_response,
    vary_signature,
};
use key::{cache_key, content_digest, lock_key};
use lock::LockRegistry;

const LOCK_PAYLOAD: &[u8] = b"lock";

/// Outcome of a lock attempt. `AlreadyHeld` carries the marker key as an
/// opaque token the caller can use while polling or backing off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    Acquired,
    AlreadyHeld(String),
}

impl LockStatus {
    pub fn is_acquired(&self) -> bool {
        matches!(self, LockStatus::Acquired)
    }
}

/// HTTP response cache store over a key/value driver.
///
/// Entries for one canonical URI live in an ordered, newest-first list
/// of variant entries under a digest-derived cache key; bodies are
/// content-addressed and shared across keys. The store itself performs
/// no read-modify-write coordination for the variant list: two writers
/// racing on the same key resolve last-writer-wins at the blob level,
/// and callers serialize regeneration with the per-key lock operations
/// instead.
///
/// A store instance owns only the set of lock markers it acquired; all
/// cached state belongs to the driver.
#[derive(Debug)]
pub struct HttpStore<D: Driver> {
    driver: D,
    locks: LockRegistry,
}

impl<D: Driver> HttpStore<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            locks: LockRegistry::default(),
        }
    }

    /// Locates a stored response matching `request`, honoring the Vary
    /// header of each stored variant. All misses come back as `None`,
    /// whether from absent metadata, no variant agreeing on the varied
    /// headers, or a body deleted out from under the ledger.
    pub fn lookup<B>(&self, request: &Request<B>) -> Option<Response<Bytes>> {
        let key = cache_key(request.uri());

        let matched = self.metadata(&key).into_iter().find(|entry| {
            requests_match(
                &entry.vary_signature(),
                request.headers(),
                &entry.request_headers(),
            )
        })?;

        let digest = match matched.content_digest() {
            Some(digest) => digest.to_string(),
            None => {
                warn!(key = %key, "variant entry has no content digest");
                return None;
            }
        };

        match self.driver.fetch(&digest) {
            Some(body) => {
                trace!(key = %key, "cache hit");
                Some(restore_response(
                    matched.response_headers(),
                    Bytes::from(body),
                ))
            }
            None => {
                // Metadata and entity records are not transactionally
                // linked; a missing body is a miss, not corruption.
                trace!(key = %key, digest = %digest, "stored body missing");
                None
            }
        }
    }

    /// Writes a cache entry for the given request/response pair and
    /// returns the cache key it was stored under.
    ///
    /// The response is stamped in place: an original response (one not
    /// already carrying a content-digest marker) gets its body stored in
    /// the entity store, an `x-content-digest` header, and a
    /// `content-length` unless it uses a transfer encoding. Existing variants
    /// superseded by this write (same Vary signature, matching request
    /// headers) are dropped from the list rather than duplicated.
    pub fn write<B>(
        &self,
        request: &Request<B>,
        response: &mut Response<Bytes>,
    ) -> Result<String, StoreError> {
        if !response.headers().contains_key(DIGEST_FIELD) {
            let digest = content_digest(response.body());
            if !self.save_verified(&digest, response.body()) {
                return Err(StoreError::Entity { digest });
            }

            let body_len = response.body().len();
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&digest) {
                headers.insert(HeaderName::from_static(DIGEST_FIELD), value);
            }
            if !headers.contains_key(TRANSFER_ENCODING) {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(body_len));
            }
        }

        let key = cache_key(request.uri());
        let stored_env = headermap_to_pairs(request.headers());

        // Retain entries this write does not supersede: a different Vary
        // signature, or request headers that disagree under that Vary.
        let vary = vary_signature(response.headers());
        let mut entries: Vec<VariantEntry> = self
            .metadata(&key)
            .into_iter()
            .filter(|entry| {
                entry.vary_signature() != vary
                    || !requests_match(&vary, &entry.request_headers(), request.headers())
            })
            .collect();

        let mut response_pairs = persist_response(response.status(), response.headers());
        // Freshness bookkeeping is recomputed by the caller, never cached.
        response_pairs.retain(|(name, _)| name != "age");

        entries.insert(
            0,
            VariantEntry {
                request: stored_env,
                response: response_pairs,
            },
        );

        let blob = serde_json::to_vec(&entries)?;
        if !self.save_verified(&key, &blob) {
            return Err(StoreError::Metadata { key });
        }

        trace!(key = %key, variants = entries.len(), "stored variant entry");
        Ok(key)
    }

    /// Forces every still-fresh variant stored for `request`'s URI into
    /// the expired state. Entries already stale are left byte-identical,
    /// and if nothing was fresh no write is issued at all.
    pub fn invalidate<B>(&self, request: &Request<B>) -> Result<(), StoreError> {
        let key = cache_key(request.uri());
        let mut modified = false;

        let mut entries = self.metadata(&key);
        for entry in &mut entries {
            let mut headers = entry.response_headers();
            if freshness::is_fresh(&headers) {
                freshness::expire(&mut headers);
                entry.response = headermap_to_pairs(&headers);
                modified = true;
            }
        }

        if modified {
            let blob = serde_json::to_vec(&entries)?;
            if !self.save_verified(&key, &blob) {
                return Err(StoreError::Metadata { key });
            }
            trace!(key = %key, "invalidated fresh variants");
        }
        Ok(())
    }

    /// Attempts to take the single-writer lock for `request`'s cache
    /// key, used by callers to keep concurrent regenerations of the
    /// same resource from dog-piling.
    pub fn lock<B>(&self, request: &Request<B>) -> LockStatus {
        let key = lock_key(&cache_key(request.uri()));

        if self.driver.save(&key, LOCK_PAYLOAD) {
            self.locks.record(key);
            return LockStatus::Acquired;
        }

        if self.driver.contains(&key) {
            LockStatus::AlreadyHeld(key)
        } else {
            // The driver reported failure but no marker exists. Treat
            // the attempt as acquired rather than stalling the caller
            // on a lock nobody holds.
            LockStatus::Acquired
        }
    }

    /// Releases the lock for `request`. True iff a marker existed and
    /// was removed, whichever instance created it.
    pub fn unlock<B>(&self, request: &Request<B>) -> bool {
        let key = lock_key(&cache_key(request.uri()));
        if !self.driver.contains(&key) {
            return false;
        }
        let removed = self.driver.delete(&key);
        if removed {
            self.locks.forget(&key);
        }
        removed
    }

    /// Whether any instance currently holds the lock for `request`.
    pub fn is_locked<B>(&self, request: &Request<B>) -> bool {
        self.driver.contains(&lock_key(&cache_key(request.uri())))
    }

    /// Releases every lock this instance acquired. Markers created by
    /// other instances are left alone, as is all cached data.
    pub fn cleanup(&self) {
        for key in self.locks.drain() {
            self.driver.delete(&key);
        }
    }

    /// Removes all variant metadata stored for `url`. True iff metadata
    /// existed and was deleted. Entity bodies referenced by the removed
    /// entries are left behind, as are any lock markers.
    pub fn purge(&self, url: &str) -> bool {
        let uri: Uri = match url.parse() {
            Ok(uri) => uri,
            // Nothing can have been stored under an unparseable URL.
            Err(_) => return false,
        };

        let key = cache_key(&uri);
        if self.driver.contains(&key) {
            return self.driver.delete(&key);
        }
        false
    }

    fn metadata(&self, key: &str) -> Vec<VariantEntry> {
        let Some(blob) = self.driver.fetch(key) else {
            return Vec::new();
        };
        match serde_json::from_slice(&blob) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(key = %key, error = %err, "undecodable variant metadata, treating as empty");
                Vec::new()
            }
        }
    }

    // The driver's own success flag is advisory; the read-back
    // comparison decides whether the write stands.
    fn save_verified(&self, key: &str, value: &[u8]) -> bool {
        self.driver.save(key, value);
        match self.driver.fetch(key) {
            Some(stored) => stored == value,
            None => false,
        }
    }
}

/// Whether two request header sets are non-varying under `vary`: for
/// every header the Vary value names, both sets must carry an identical
/// value sequence (both absent counts as agreement). An empty Vary
/// matches everything.
fn requests_match(vary: &str, left: &HeaderMap, right: &HeaderMap) -> bool {
    if vary.is_empty() {
        return true;
    }

    for raw in vary.split(|c: char| c.is_whitespace() || c == ',') {
        if raw.is_empty() {
            continue;
        }
        let name = raw.to_ascii_lowercase().replace('_', "-");
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            // A name no header set can carry distinguishes nothing.
            continue;
        };

        let left_values: Vec<&HeaderValue> = left.get_all(&name).iter().collect();
        let right_values: Vec<&HeaderValue> = right.get_all(&name).iter().collect();
        if left_values != right_values {
            return false;
        }
    }
    true
}
