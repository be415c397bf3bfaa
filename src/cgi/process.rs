//! CGI handler execution with `tokio::process`.
//!
//! The header block is read before the response is built; the rest of the
//! handler's stdout is streamed to the client as it is produced. Reaping
//! the child and relaying its stderr happen on a separate task.

use std::process::Stdio;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio_util::io::ReaderStream;

use crate::cgi::environment::build_env;
use crate::cgi::output::{parse_header_block, read_header_block};
use crate::cgi::{HandlerInvoker, InvocationContext};

/// Failure while exchanging a request with a handler process.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error("failed to start handler: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to read handler output: {0}")]
    Read(#[source] std::io::Error),

    #[error("handler header block exceeds {0} bytes")]
    HeaderTooLarge(usize),

    #[error("malformed handler headers: {0}")]
    MalformedHeaders(#[from] httparse::Error),

    #[error("handler printed no headers")]
    NoHeaders,

    #[error("handler response is missing Content-Type")]
    MissingContentType,

    #[error("handler printed bogus status `{0}`")]
    BogusStatus(String),
}

impl IntoResponse for InvokeError {
    fn into_response(self) -> Response {
        let status = match self {
            // Usually the body limit; a reset client never sees this anyway.
            InvokeError::Body(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, status.canonical_reason().unwrap_or_default()).into_response()
    }
}

/// Runs handlers as child processes speaking CGI/1.1.
#[derive(Debug, Clone)]
pub struct CgiProcess {
    max_body_size: usize,
}

impl CgiProcess {
    pub fn new(max_body_size: usize) -> Self {
        Self { max_body_size }
    }

    async fn run(&self, context: &InvocationContext, request: Request<Body>) -> Result<Response, InvokeError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, self.max_body_size)
            .await
            .map_err(InvokeError::Body)?;

        let env = build_env(context, &parts, body.len());

        let mut child = Command::new(&context.executable)
            .args(&context.args)
            .current_dir(&context.working_dir)
            .env_clear()
            .envs(&env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(InvokeError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                // Handlers may exit without reading their input.
                if let Err(e) = stdin.write_all(&body).await {
                    tracing::debug!(error = %e, "Handler closed stdin early");
                }
            });
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        tokio::spawn(reap(child, stderr, context.executable.display().to_string()));

        let stdout = stdout.ok_or_else(|| {
            InvokeError::Spawn(std::io::Error::other("handler stdout was not captured"))
        })?;
        let mut stdout = BufReader::new(stdout);
        let head = read_header_block(&mut stdout).await?;
        let (status, headers) = parse_header_block(&head)?;

        let mut response = Response::new(Body::from_stream(ReaderStream::new(stdout)));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Relay stderr lines as warnings, then wait for the handler to exit.
async fn reap(mut child: Child, stderr: Option<ChildStderr>, handler: String) {
    if let Some(stderr) = stderr {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => tracing::warn!(handler = %handler, "{}", line),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(handler = %handler, error = %e, "Stopped reading handler stderr");
                    break;
                }
            }
        }
    }

    match child.wait().await {
        Ok(status) if !status.success() => {
            tracing::warn!(handler = %handler, status = %status, "Handler exited unsuccessfully");
        }
        Ok(_) => {}
        Err(e) => tracing::error!(handler = %handler, error = %e, "Failed to wait for handler"),
    }
}

impl HandlerInvoker for CgiProcess {
    async fn invoke(&self, context: InvocationContext, request: Request<Body>) -> Response {
        match self.run(&context, request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    handler = %context.executable.display(),
                    error = %e,
                    "Handler invocation failed"
                );
                e.into_response()
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn context(dir: &std::path::Path, script: &str) -> InvocationContext {
        let path = dir.join("script.sh");
        std::fs::write(&path, script).unwrap();
        InvocationContext {
            executable: PathBuf::from("/bin/sh"),
            working_dir: dir.to_path_buf(),
            env: vec![("SCRIPT_FILENAME".into(), path.display().to_string())],
            inherit_env: Vec::new(),
            args: vec![path],
            remote_addr: None,
        }
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_echoes_environment_and_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(
            dir.path(),
            "printf 'Content-Type: text/plain\\r\\n\\r\\n'\n\
             echo \"$REQUEST_METHOD $QUERY_STRING\"\n\
             cat\n",
        );
        let request = Request::post("/script.sh?a=b").body(Body::from("payload")).unwrap();

        let response = CgiProcess::new(1024).invoke(ctx, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "POST a=b\npayload");
    }

    #[tokio::test]
    async fn test_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "printf 'Content-Type: text/plain\\n\\n'\npwd -P\n");
        let expected = dir.path().canonicalize().unwrap();

        let response = CgiProcess::new(1024).invoke(ctx, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(body_string(response).await.trim_end(), expected.display().to_string());
    }

    #[tokio::test]
    async fn test_garbage_output_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "echo\necho not a cgi response\n");

        let response = CgiProcess::new(1024).invoke(ctx, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path(), "");
        ctx.executable = dir.path().join("missing-binary");

        let response = CgiProcess::new(1024).invoke(ctx, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_endless_header_block_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "yes a | tr -d '\\n' | head -c 200000\n");

        let response = CgiProcess::new(1024).invoke(ctx, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_large_body_relayed_intact() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(
            dir.path(),
            "printf 'Content-Type: application/octet-stream\\n\\n'\n\
             head -c 3000000 /dev/zero\n",
        );

        let response = CgiProcess::new(1024).invoke(ctx, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.len(), 3_000_000);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[tokio::test]
    async fn test_stderr_and_exit_status_do_not_affect_response() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(
            dir.path(),
            "echo 'warning from handler' >&2\n\
             printf 'Content-Type: text/plain\\n\\nok'\n\
             exit 3\n",
        );

        let response = CgiProcess::new(1024).invoke(ctx, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn test_body_limit() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "printf 'Content-Type: text/plain\\n\\n'\n");
        let request = Request::post("/").body(Body::from(vec![b'x'; 64])).unwrap();

        let response = CgiProcess::new(16).invoke(ctx, request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
