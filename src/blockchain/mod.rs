//! Ledger access subsystem.
//!
//! # Data Flow
//! ```text
//! Environment variable (private key)
//!     → wallet.rs (signer)
//!     → client.rs (contract bound on every RPC endpoint, read failover)
//!     → contract.rs (BountyBoard handle consumed by the board controller)
//!     → transaction.rs (pending write → receipt)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys
//! - Reads have configurable timeouts; confirmation waits do not

pub mod client;
pub mod contract;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::ContractClient;
pub use contract::{BountyBoard, PendingTx};
pub use types::{BlockchainError, BlockchainResult, ChainId, LedgerAnswer, LedgerQuestion, TxConfirmation};
pub use wallet::Wallet;
