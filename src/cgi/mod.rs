//! External handler invocation subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher decides "invoke handler"
//!     → InvocationContext (executable, cwd, env, args)
//!     → HandlerInvoker::invoke (process.rs for real CGI)
//!         → environment.rs (RFC 3875 meta-variables)
//!         → spawn, feed stdin, collect stdout/stderr
//!         → output.rs (header block → status + headers, rest → body)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - The dispatcher only knows the trait; tests substitute a fake
//! - Invocation is awaited to completion; no timeout, no cancellation
//! - Invocation failures become responses here, never dispatcher errors

pub mod environment;
pub mod output;
pub mod process;

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{body::Body, http::Request, response::Response};

pub use process::CgiProcess;

/// Everything needed to run one handler for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    /// Absolute path of the handler executable.
    pub executable: PathBuf,
    /// Working directory of the handler process.
    pub working_dir: PathBuf,
    /// Extra environment entries; these override the standard CGI variables.
    pub env: Vec<(String, String)>,
    /// Names of server environment variables passed through.
    pub inherit_env: Vec<String>,
    /// Positional arguments.
    pub args: Vec<PathBuf>,
    /// Peer address of the client, if known.
    pub remote_addr: Option<SocketAddr>,
}

impl InvocationContext {
    /// Value of an extra environment entry.
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Runs an external handler and relays its answer.
pub trait HandlerInvoker: Send + Sync + 'static {
    /// Exchange `request` with the handler described by `context`.
    fn invoke(
        &self,
        context: InvocationContext,
        request: Request<Body>,
    ) -> impl Future<Output = Response> + Send;
}
