//! Request dispatch: static content, listings, or handler invocation.
//!
//! # Responsibilities
//! - Decode and resolve the request path against the [`Site`]
//! - Choose between static serving and a handler by file extension
//! - Build the invocation context for handlers
//! - Map failures to HTTP statuses
//!
//! # Design Decisions
//! - Resolution stats the filesystem, so it runs on the blocking pool
//! - Handler executables were located at startup; dispatch only re-checks
//!   that they are still runnable
//! - Invocation errors are the invoker's to report; dispatch never retries

use std::net::SocketAddr;
use std::path::PathBuf;
use std::string::FromUtf8Error;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::cgi::{HandlerInvoker, InvocationContext};
use crate::http::request::{basic_auth_user, request_id, sanitize_remote_user};
use crate::http::response::{directory_listing, serve_file, status_response};
use crate::routing::handlers::is_executable;
use crate::routing::mapper::decode_url_path;
use crate::routing::{ResolveError, Site};

/// Why a request could not be dispatched.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("request path is not valid UTF-8: {0}")]
    BadPath(#[from] FromUtf8Error),

    #[error(transparent)]
    NotFound(#[from] ResolveError),

    #[error("handler `{}` is no longer executable", .0.display())]
    HandlerMissing(PathBuf),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("cannot serve {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::BadPath(_) => StatusCode::BAD_REQUEST,
            DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::Io { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
                std::io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            DispatchError::HandlerMissing(_) | DispatchError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        status_response(self.status())
    }
}

/// What to do with a resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Serve the file, or list the directory.
    Static(PathBuf),
    /// Run `executable` with `script` as its argument.
    Handler { executable: PathBuf, script: PathBuf },
}

/// Turns requests into responses for one site.
pub struct Dispatcher<I> {
    site: Arc<Site>,
    invoker: I,
}

impl<I: HandlerInvoker> Dispatcher<I> {
    pub fn new(site: Arc<Site>, invoker: I) -> Self {
        Self { site, invoker }
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Decode and resolve a raw (percent-encoded) request path.
    pub async fn resolve(&self, raw_path: &str) -> Result<PathBuf, DispatchError> {
        let url_path = decode_url_path(raw_path)?.into_owned();
        let site = Arc::clone(&self.site);
        let resolved = tokio::task::spawn_blocking(move || site.locate(&url_path)).await??;
        Ok(resolved)
    }

    /// Pick static serving or a handler by the resolved path's extension.
    pub fn decide(&self, resolved: PathBuf) -> Dispatch {
        match self.site.handlers.for_path(&resolved) {
            Some(executable) => Dispatch::Handler {
                executable: executable.to_path_buf(),
                script: resolved,
            },
            None => Dispatch::Static(resolved),
        }
    }

    /// Context for running `executable` on `script` for a request.
    pub fn invocation_context(
        &self,
        executable: PathBuf,
        script: PathBuf,
        headers: &HeaderMap,
        remote_addr: Option<SocketAddr>,
    ) -> InvocationContext {
        let remote_user = basic_auth_user(headers)
            .map(|user| sanitize_remote_user(&user))
            .unwrap_or_default();
        InvocationContext {
            executable,
            working_dir: self.site.document_root.clone(),
            env: vec![
                ("SCRIPT_FILENAME".to_string(), script.display().to_string()),
                ("REMOTE_USER".to_string(), remote_user),
            ],
            inherit_env: self.site.inherit_env.clone(),
            args: vec![script],
            remote_addr,
        }
    }

    /// Answer one request.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let id = request_id(request.headers()).to_string();
        let path = request.uri().path().to_string();
        match self.try_dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                let status = e.status();
                if status.is_server_error() {
                    tracing::error!(request_id = %id, path = %path, error = %e, "Dispatch failed");
                } else {
                    tracing::info!(request_id = %id, path = %path, status = %status, error = %e, "Request rejected");
                }
                e.into_response()
            }
        }
    }

    async fn try_dispatch(&self, request: Request<Body>) -> Result<Response, DispatchError> {
        let uri = request.uri().clone();
        let resolved = self.resolve(uri.path()).await?;

        match self.decide(resolved) {
            Dispatch::Static(path) => {
                tracing::debug!(path = %path.display(), "Serving static content");
                let meta = tokio::fs::metadata(&path)
                    .await
                    .map_err(|source| DispatchError::Io { path: path.clone(), source })?;
                if meta.is_dir() {
                    directory_listing(&path, &uri)
                        .await
                        .map_err(|source| DispatchError::Io { path, source })
                } else {
                    Ok(serve_file(&path, request).await)
                }
            }
            Dispatch::Handler { executable, script } => {
                let check = executable.clone();
                if !tokio::task::spawn_blocking(move || is_executable(&check)).await? {
                    return Err(DispatchError::HandlerMissing(executable));
                }
                let remote_addr = request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|info| info.0);
                let context = self.invocation_context(executable, script, request.headers(), remote_addr);
                tracing::debug!(
                    handler = %context.executable.display(),
                    script = ?context.args,
                    "Invoking handler"
                );
                Ok(self.invoker.invoke(context, request).await)
            }
        }
    }
}
