//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all dispatch handler
//! - Wire up middleware (tracing, request ID, body limit)
//! - Serve connections until shutdown is signalled

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::cgi::HandlerInvoker;
use crate::config::ServerConfig;
use crate::http::dispatch::Dispatcher;
use crate::http::request::UuidRequestId;
use crate::routing::Site;

/// Application state injected into handlers.
pub struct AppState<I> {
    pub dispatcher: Arc<Dispatcher<I>>,
}

impl<I> Clone for AppState<I> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

/// HTTP front end of the CGI server.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server for `site`, running handlers through `invoker`.
    pub fn new<I: HandlerInvoker>(config: &ServerConfig, site: Arc<Site>, invoker: I) -> Self {
        let state = AppState {
            dispatcher: Arc::new(Dispatcher::new(site, invoker)),
        };
        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router<I: HandlerInvoker>(config: &ServerConfig, state: AppState<I>) -> Router {
        Router::new()
            .route("/{*path}", any(serve_request::<I>))
            .route("/", any(serve_request::<I>))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The router, for driving the server without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown requested, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn serve_request<I: HandlerInvoker>(
    State(state): State<AppState<I>>,
    request: Request<Body>,
) -> Response {
    state.dispatcher.dispatch(request).await
}
