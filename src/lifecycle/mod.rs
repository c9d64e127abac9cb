//! Lifecycle management.
//!
//! ```text
//! ctrl-c → Shutdown::trigger → board sync loop exits → process exits
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
