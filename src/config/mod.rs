//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BoardConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → only chain/contract/wallet changes are forwarded
//!     → caller swaps the wallet connector and rebinds
//! ```

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{BoardConfig, ChainConfig, ContractConfig, DisplayConfig, ObservabilityConfig, WalletConfig};
