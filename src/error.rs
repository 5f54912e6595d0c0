//! Error taxonomy for the memory core.
//!
//! Only [`MemoryError::Persistence`] on the interaction path is ever shown to an
//! end user; provider and judgment failures degrade to "no context" or "no note
//! update" at the call sites.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    /// An embedding or judgment call failed or timed out.
    #[error("{provider} provider unavailable: {reason}")]
    ProviderUnavailable {
        provider: &'static str,
        reason: String,
    },

    /// The judgment provider answered, but not in the expected shape.
    #[error("malformed judgment output: {0}")]
    MalformedJudgmentOutput(String),

    /// A store write or read failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl MemoryError {
    pub fn unavailable(provider: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::ProviderUnavailable {
            provider,
            reason: reason.to_string(),
        }
    }

    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

pub type MemoryResult<T> = Result<T, MemoryError>;

/// Bound an external call by `limit`. An elapsed timer is reported the same way
/// as a failed call.
pub async fn bounded<T, F>(provider: &'static str, limit: Duration, call: F) -> MemoryResult<T>
where
    F: std::future::Future<Output = MemoryResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(MemoryError::unavailable(
            provider,
            format!("timed out after {}ms", limit.as_millis()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_maps_to_provider_unavailable() {
        let result: MemoryResult<()> = bounded("embedding", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(MemoryError::ProviderUnavailable { provider, reason }) => {
                assert_eq!(provider, "embedding");
                assert!(reason.contains("timed out"));
            }
            other => panic!("expected ProviderUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn completed_call_passes_through() {
        let result = bounded("judgment", Duration::from_secs(1), async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn display_includes_provider() {
        let err = MemoryError::unavailable("judgment", "connection refused");
        assert_eq!(
            err.to_string(),
            "judgment provider unavailable: connection refused"
        );
    }
}
