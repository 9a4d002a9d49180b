//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline + http produce:
//!     → logging.rs (structured log events, one span per invocation)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Invocation ID flows through every stage's log events
//! - Tool stderr and error chains go to logs, never to responses
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
