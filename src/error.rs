use thiserror::Error;

/// Failures surfaced by the store's write-then-verify discipline.
///
/// Every persisted write is read back and compared before the operation
/// is considered successful; a mismatch means the underlying driver
/// accepted the write but cannot reproduce it, and the caller should
/// serve without caching rather than retry here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to store the entity under digest {digest}")]
    Entity { digest: String },

    #[error("unable to store the metadata under key {key}")]
    Metadata { key: String },

    #[error("failed to encode variant metadata")]
    Encode(#[from] serde_json::Error),
}
