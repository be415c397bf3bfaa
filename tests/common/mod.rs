//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;

use cgi_server::cgi::CgiProcess;
use cgi_server::config::{HandlerConfig, ServerConfig};
use cgi_server::lifecycle::{build_site, Shutdown};
use cgi_server::HttpServer;

/// A document root in a temporary directory.
pub struct TestSite {
    _dir: tempfile::TempDir,
    pub root: PathBuf,
}

impl TestSite {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        Self { _dir: dir, root }
    }

    /// Write `contents` to `rel` under the root, creating parents.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Config for this root with `.sh` files run by `sh`.
    pub fn config(&self) -> ServerConfig {
        ServerConfig {
            document_root: self.root.display().to_string(),
            handlers: vec![HandlerConfig {
                file_ext: ".sh".into(),
                handler: "sh".into(),
            }],
            ..ServerConfig::default()
        }
    }
}

/// A running server; stops when dropped.
pub struct RunningServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the server on an ephemeral port.
pub async fn start_server(config: &ServerConfig) -> RunningServer {
    let site = build_site(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, Arc::new(site), CgiProcess::new(config.limits.max_body_size));
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, receiver).await.unwrap();
    });

    RunningServer { addr, shutdown }
}
