//! Request path resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Decoded request path
//!     → mapper.rs (clean: "/", ".", "..")
//!     → alias.rs (prefix substitution)
//!     → mapper.rs (relative fragment, joined to the document root)
//!     → resolver.rs (file / index / handler parent / default handler)
//!     → Return: existing path or NotFound
//!
//! Site Compilation (at startup):
//!     ServerConfig
//!     → Canonicalize document root
//!     → Locate handler executables (handlers.rs)
//!     → Sort aliases
//!     → Freeze as immutable Site
//! ```
//!
//! # Design Decisions
//! - Site compiled at startup, immutable at runtime
//! - Deterministic: same filesystem and input always resolve the same way
//! - No resolution cache; every request stats afresh

pub mod alias;
pub mod handlers;
pub mod mapper;
pub mod resolver;
pub mod site;

pub use handlers::HandlerTable;
pub use resolver::{ResolveError, Resolver};
pub use site::Site;
