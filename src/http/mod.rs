//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, body limit, tracing)
//!     → dispatch.rs (decode path, resolve against the site)
//!         → response.rs (static file, listing, error status)
//!         → cgi::HandlerInvoker (handler output)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::{Dispatch, DispatchError, Dispatcher};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
