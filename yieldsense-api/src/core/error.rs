//! Centralized error types for the liquidity API

use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Malformed or incomplete request input, rejected before any network call
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid price range: lower tick ({lower}) must be less than upper tick ({upper}). Check your min/max price inputs.")]
    InvalidTickRange { lower: i32, upper: i32 },

    #[error(transparent)]
    Deposit(#[from] DepositError),

    /// Raw message from the Whirlpools core math, passed through verbatim
    #[error("{0}")]
    Quote(String),

    #[error("Whirlpool not found: {address}")]
    PoolNotFound { address: String },

    #[error("No Orca whirlpool found for this token pair")]
    NoPoolForPair,

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Invalid account data for {account_type}: {reason}")]
    InvalidAccountData {
        account_type: String,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Closed set of deposit failures the caller can act on
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositError {
    #[error("Deposit amount too small for this price range. Please increase amount.")]
    TooSmall,

    #[error("Deposit amount exceeds the maximum representable token amount")]
    AmountOverflow,
}

/// Network-specific errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed RPC response: {0}")]
    MalformedResponse(String),
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn invalid_account(account_type: &str, reason: impl Into<String>) -> Self {
        ServiceError::InvalidAccountData {
            account_type: account_type.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap an error reported by `orca_whirlpools_core`
    pub fn core<E: std::fmt::Display>(err: E) -> Self {
        ServiceError::Quote(err.to_string())
    }

    /// True for errors caused by the request rather than the service or the ledger
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidRequest(_)
                | ServiceError::InvalidTickRange { .. }
                | ServiceError::Deposit(_)
                | ServiceError::Quote(_)
                | ServiceError::Unsupported(_)
        )
    }
}

impl From<bincode::Error> for ServiceError {
    fn from(err: bincode::Error) -> Self {
        ServiceError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_error_message_is_user_facing() {
        let err = ServiceError::from(DepositError::TooSmall);
        assert_eq!(
            err.to_string(),
            "Deposit amount too small for this price range. Please increase amount."
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn test_tick_range_message_names_both_ticks() {
        let err = ServiceError::InvalidTickRange { lower: 128, upper: 64 };
        let message = err.to_string();
        assert!(message.contains("lower tick (128)"));
        assert!(message.contains("upper tick (64)"));
    }

    #[test]
    fn test_core_errors_pass_through_verbatim() {
        let err = ServiceError::core("Arithmetic over- or underflow");
        assert_eq!(err.to_string(), "Arithmetic over- or underflow");
    }

    #[test]
    fn test_network_errors_are_not_client_errors() {
        let err = ServiceError::from(NetworkError::Transport("connection refused".into()));
        assert!(!err.is_client_error());
        assert!(!ServiceError::NoPoolForPair.is_client_error());
    }
}
