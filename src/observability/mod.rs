//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! board + blockchain modules produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stderr
//!     → Prometheus scrape (optional)
//! ```

pub mod logging;
pub mod metrics;
