//! Origin hash calls and the local fallback.
//!
//! An origin may expose its own `hash(bytes)` view. When an [`OriginHasher`]
//! is configured its answer is preferred for `content_hash`; any failure
//! falls back to the local digest and is recorded as
//! [`HashSource::LocalFallback`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use metaboard_core::{Address, Hash32, HashSource};

/// Why an origin hash call produced no usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashCallError {
    /// The call executed and reverted.
    #[error("call reverted: {0}")]
    Reverted(String),

    /// The origin could not be reached.
    #[error("origin unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete in time.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

/// The origin's own hash function, reached over some host-provided channel.
#[async_trait]
pub trait OriginHasher: Send + Sync {
    /// Hash `data` the way `origin` does.
    async fn hash(&self, origin: &Address, data: &[u8]) -> Result<[u8; 32], HashCallError>;
}

/// Compute `content_hash` for a raw payload.
///
/// Never fails: without a hasher, or when the call fails, the local digest
/// is used and the source says so.
pub async fn resolve_content_hash(
    hasher: Option<&dyn OriginHasher>,
    origin: &Address,
    data: &[u8],
    timeout: Option<Duration>,
) -> (Hash32, HashSource) {
    let Some(hasher) = hasher else {
        return (Hash32::digest(data), HashSource::Local);
    };

    let call = hasher.hash(origin, data);
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(HashCallError::Timeout(limit)),
        },
        None => call.await,
    };

    match result {
        Ok(hash) => (Hash32::from_bytes(hash), HashSource::Origin),
        Err(e) => {
            tracing::warn!(%origin, error = %e, "origin hash call failed, using local digest");
            (
                Hash32::digest(data),
                HashSource::LocalFallback {
                    reason: e.to_string(),
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant([u8; 32]);

    #[async_trait]
    impl OriginHasher for Constant {
        async fn hash(&self, _: &Address, _: &[u8]) -> Result<[u8; 32], HashCallError> {
            Ok(self.0)
        }
    }

    struct Reverts;

    #[async_trait]
    impl OriginHasher for Reverts {
        async fn hash(&self, _: &Address, _: &[u8]) -> Result<[u8; 32], HashCallError> {
            Err(HashCallError::Reverted("execution reverted".into()))
        }
    }

    struct Hangs;

    #[async_trait]
    impl OriginHasher for Hangs {
        async fn hash(&self, _: &Address, _: &[u8]) -> Result<[u8; 32], HashCallError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_local_without_hasher() {
        let (hash, source) = resolve_content_hash(None, &Address::ZERO, b"x", None).await;
        assert_eq!(hash, Hash32::digest(b"x"));
        assert_eq!(source, HashSource::Local);
    }

    #[tokio::test]
    async fn test_origin_answer_preferred() {
        let hasher = Constant([7; 32]);
        let (hash, source) =
            resolve_content_hash(Some(&hasher), &Address::ZERO, b"x", None).await;
        assert_eq!(hash, Hash32::from_bytes([7; 32]));
        assert_eq!(source, HashSource::Origin);
    }

    #[tokio::test]
    async fn test_revert_falls_back() {
        let (hash, source) =
            resolve_content_hash(Some(&Reverts), &Address::ZERO, b"x", None).await;
        assert_eq!(hash, Hash32::digest(b"x"));
        assert_eq!(
            source.reason(),
            Some("call reverted: execution reverted")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let (hash, source) = resolve_content_hash(
            Some(&Hangs),
            &Address::ZERO,
            b"x",
            Some(Duration::from_millis(50)),
        )
        .await;
        assert_eq!(hash, Hash32::digest(b"x"));
        assert!(matches!(source, HashSource::LocalFallback { .. }));
    }
}
