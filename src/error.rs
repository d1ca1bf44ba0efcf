//! Failure taxonomy for engine operations, and the stable codes the CLI
//! reports to manual-trigger callers.

use thiserror::Error;

use crate::source::SourceError;
use crate::store::StoreError;

/// Machine-readable code attached to every surfaced failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Unauthenticated,
    PermissionDenied,
    InvalidArgument,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::PermissionDenied => "permission-denied",
            ErrorCode::InvalidArgument => "invalid-argument",
            ErrorCode::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Manual trigger without a resolvable caller identity.
    #[error("caller is not signed in")]
    Unauthenticated,

    /// Caller identity resolved to a role the operation does not admit.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Unauthenticated => ErrorCode::Unauthenticated,
            EngineError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            EngineError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            EngineError::Source(_) | EngineError::Store(_) => ErrorCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(EngineError::Unauthenticated.code().as_str(), "unauthenticated");
        assert_eq!(
            EngineError::PermissionDenied("manager cannot trigger snapshots".into())
                .code()
                .as_str(),
            "permission-denied"
        );
        assert_eq!(
            EngineError::InvalidArgument("bad frequency".into()).code().as_str(),
            "invalid-argument"
        );
        assert_eq!(
            EngineError::Source(SourceError::Unavailable("down".into())).code().as_str(),
            "internal"
        );
        assert_eq!(
            EngineError::Store(StoreError::NotFound { entity: "insight", id: "x".into() })
                .code()
                .as_str(),
            "internal"
        );
    }
}
