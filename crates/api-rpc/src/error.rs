//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use loft_core::domain::DomainError;
use loft_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const INTERNAL_ERROR: i32 = 5000;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Domain(e) => match e {
            DomainError::QueueNotFound(_) | DomainError::MetadataKeyNotFound { .. } => {
                code::NOT_FOUND
            }
            DomainError::QueueAlreadyExists(_)
            | DomainError::DuplicateTaskId { .. }
            | DomainError::InvalidStateTransition { .. } => code::CONFLICT,
            DomainError::ValidationError(_) => code::VALIDATION_ERROR,
        },
        AppError::Validation(_) | AppError::Serialization(_) => code::VALIDATION_ERROR,
        AppError::Io(_) | AppError::Config(_) | AppError::Internal(_) => code::INTERNAL_ERROR,
    };
    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        let not_found = to_rpc_error(DomainError::QueueNotFound("A".into()).into());
        assert_eq!(not_found.code(), code::NOT_FOUND);
        assert!(not_found.message().contains("Queue not found: A"));

        let conflict = to_rpc_error(
            DomainError::DuplicateTaskId {
                queue: "A".into(),
                task_id: "t1".into(),
            }
            .into(),
        );
        assert_eq!(conflict.code(), code::CONFLICT);

        let invalid = to_rpc_error(DomainError::ValidationError("empty".into()).into());
        assert_eq!(invalid.code(), code::VALIDATION_ERROR);

        let internal = to_rpc_error(AppError::Internal("boom".into()));
        assert_eq!(internal.code(), code::INTERNAL_ERROR);
    }
}
