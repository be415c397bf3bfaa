//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!
//! HTTP requests additionally get:
//!     → TraceLayer spans, tagged with the x-request-id
//! ```
//!
//! # Design Decisions
//! - Request ID flows through dispatch and handler failure logs
//! - Handler stderr is relayed as warnings, one event per line

pub mod logging;
