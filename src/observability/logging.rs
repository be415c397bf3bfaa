//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Apply the configured level unless `RUST_LOG` says otherwise
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - The configured level covers this crate and tower-http's request traces

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("cgi_server={level},tower_http={level}")
}

/// Install the global subscriber.
pub fn init(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level).into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
