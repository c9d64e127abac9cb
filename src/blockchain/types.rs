//! Ledger record types and error definitions.

use alloy::primitives::{Address, TxHash, U256};
use thiserror::Error;

// Client code reads its chain settings through this path.
pub use crate::config::schema::ChainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur while talking to the ledger.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Transaction was reverted on-chain.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// Invalid private key format or signer error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// A ledger value could not be represented client-side.
    #[error("Decode error: {0}")]
    Decode(String),

    /// No contract binding is available.
    #[error("Ledger not available: {0}")]
    NotAvailable(String),
}

/// Result type for ledger operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// A question exactly as the contract returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerQuestion {
    pub id: U256,
    pub content: String,
    pub author: Address,
    /// Bounty in wei.
    pub bounty: U256,
    pub answered: bool,
}

/// An answer exactly as the contract returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAnswer {
    pub id: U256,
    pub content: String,
    pub author: Address,
    pub accepted: bool,
    pub question_id: U256,
}

/// Outcome of a confirmed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxConfirmation {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}
