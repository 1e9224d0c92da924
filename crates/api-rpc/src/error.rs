//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use courier_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const QUEUE_ERROR: i32 = 5001;
    pub const DELIVERY_ERROR: i32 = 5002;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Validation(_) | AppError::Domain(_) | AppError::Serialization(_) => {
            code::VALIDATION_ERROR
        }
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::InvalidState(_) => code::CONFLICT,
        AppError::Queue(_) => code::QUEUE_ERROR,
        AppError::Delivery(_) => code::DELIVERY_ERROR,
        AppError::Config(_) | AppError::Internal(_) => code::INTERNAL_ERROR,
    };
    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::domain::DomainError;

    #[test]
    fn test_domain_errors_are_validation_errors() {
        let err = to_rpc_error(AppError::Domain(DomainError::EmptyTenantId));
        assert_eq!(err.code(), code::VALIDATION_ERROR);
    }

    #[test]
    fn test_queue_errors_are_server_side() {
        let err = to_rpc_error(AppError::Queue("database is locked".to_string()));
        assert_eq!(err.code(), code::QUEUE_ERROR);
        assert!(err.message().contains("database is locked"));
    }
}
