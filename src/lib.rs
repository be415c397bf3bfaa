//! CGI server library.
//!
//! Maps request paths onto a document root, resolves them to a file, a
//! directory or a handler script, and either serves the content or runs
//! the handler over CGI/1.1.

pub mod cgi;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::Site;
