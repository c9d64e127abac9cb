//! Bounty-backed question board client library.

pub mod blockchain;
pub mod board;
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use board::{BoardController, ConnectionContext};
pub use config::BoardConfig;
pub use lifecycle::Shutdown;
