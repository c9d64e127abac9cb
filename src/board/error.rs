//! Board-level errors.
//!
//! Every variant is recoverable: the user can retry the action that raised it.

use thiserror::Error;

use crate::blockchain::types::BlockchainError;

#[derive(Debug, Error)]
pub enum BoardError {
    /// Input rejected before any network access.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A write was requested with no contract bound.
    #[error("Wallet not connected")]
    NotConnected,

    /// Another write is still being confirmed.
    #[error("A transaction is already in progress")]
    TransactionInFlight,

    #[error("Read failed: {0}")]
    Read(#[source] BlockchainError),

    #[error("Transaction failed: {0}")]
    Write(#[source] BlockchainError),
}

pub type BoardResult<T> = Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BoardError::Write(BlockchainError::Reverted("out of gas".to_string()));
        assert_eq!(err.to_string(), "Transaction failed: Transaction reverted: out of gas");
        assert_eq!(BoardError::NotConnected.to_string(), "Wallet not connected");
    }
}
