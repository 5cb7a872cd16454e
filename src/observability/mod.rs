//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!     → request_log.rs (one plain-text line per request)
//! ```
//!
//! The request ID set by the HTTP layer is carried by the trace spans.

pub mod logging;
pub mod metrics;
pub mod request_log;

pub use request_log::{request_log_middleware, RequestLog};
