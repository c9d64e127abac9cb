//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the bounty board client.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct BoardConfig {
    /// RPC endpoints and confirmation policy.
    pub chain: ChainConfig,

    /// The deployed question board contract.
    pub contract: ContractConfig,

    /// Signing wallet settings.
    pub wallet: WalletConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Presentation settings used by the CLI.
    pub display: DisplayConfig,
}

impl BoardConfig {
    /// Whether two configs would produce a different ledger binding.
    pub fn connection_differs(&self, other: &BoardConfig) -> bool {
        self.chain != other.chain || self.contract != other.contract || self.wallet != other.wallet
    }
}

/// Chain access configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs, tried in order for reads.
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds. Does not apply to confirmation.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations a write waits for.
    pub confirmation_blocks: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 31337,
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
        }
    }
}

/// Contract location.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ContractConfig {
    /// Hex address of the deployed contract.
    pub address: String,
}

/// Wallet configuration.
///
/// The key itself never lives in the config file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WalletConfig {
    /// Name of the environment variable holding the private key.
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: "BOARD_PRIVATE_KEY".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Presentation settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Hide the question at ledger index 0 when listing.
    pub first_question_is_placeholder: bool,
}
