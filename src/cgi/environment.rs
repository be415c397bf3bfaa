//! CGI/1.1 meta-variables (RFC 3875 section 4.1).

use std::collections::BTreeMap;

use axum::http::{header, request::Parts};

use crate::cgi::InvocationContext;

const DEFAULT_PATH: &str = "/bin:/usr/bin:/usr/ucb:/usr/bsd:/usr/local/bin";

#[cfg(target_os = "linux")]
const OS_INHERIT_ENV: &[&str] = &["LD_LIBRARY_PATH"];
#[cfg(target_os = "macos")]
const OS_INHERIT_ENV: &[&str] = &["DYLD_LIBRARY_PATH"];
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
const OS_INHERIT_ENV: &[&str] = &[];

/// Build the full handler environment. Later sources override earlier ones:
/// request variables, `PATH`, inherited variables, then the context entries.
pub fn build_env(
    context: &InvocationContext,
    parts: &Parts,
    content_length: usize,
) -> BTreeMap<String, String> {
    build_env_with(context, parts, content_length, |name| std::env::var(name).ok())
}

/// [`build_env`] with an injectable view of the server environment.
pub fn build_env_with(
    context: &InvocationContext,
    parts: &Parts,
    content_length: usize,
    server_env: impl Fn(&str) -> Option<String>,
) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    let mut set = |key: &str, value: String| {
        env.insert(key.to_string(), value);
    };

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .unwrap_or_default();
    let (server_name, server_port) = split_host(&host);

    set("SERVER_SOFTWARE", concat!("cgi-server/", env!("CARGO_PKG_VERSION")).to_string());
    set("SERVER_PROTOCOL", format!("{:?}", parts.version));
    set("SERVER_NAME", server_name.to_string());
    set("SERVER_PORT", server_port.to_string());
    set("HTTP_HOST", host.clone());
    set("GATEWAY_INTERFACE", "CGI/1.1".to_string());
    set("REQUEST_METHOD", parts.method.to_string());
    set("QUERY_STRING", parts.uri.query().unwrap_or_default().to_string());
    set(
        "REQUEST_URI",
        parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string()),
    );
    set("SCRIPT_NAME", "/".to_string());
    set("PATH_INFO", path_info(parts.uri.path()));
    set("SCRIPT_FILENAME", context.executable.display().to_string());

    if let Some(addr) = context.remote_addr {
        set("REMOTE_ADDR", addr.ip().to_string());
        set("REMOTE_HOST", addr.ip().to_string());
        set("REMOTE_PORT", addr.port().to_string());
    }

    for name in parts.headers.keys() {
        // httpoxy: never let a client set HTTP_PROXY
        if name.as_str().eq_ignore_ascii_case("proxy") {
            continue;
        }
        let separator = if *name == header::COOKIE { "; " } else { ", " };
        let value = parts
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(separator);
        set(&format!("HTTP_{}", name.as_str().to_ascii_uppercase().replace('-', "_")), value);
    }

    if content_length > 0 {
        set("CONTENT_LENGTH", content_length.to_string());
    }
    if let Some(content_type) = parts.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        set("CONTENT_TYPE", content_type.to_string());
    }

    set("PATH", server_env("PATH").filter(|p| !p.is_empty()).unwrap_or_else(|| DEFAULT_PATH.to_string()));

    let inherited = context.inherit_env.iter().map(String::as_str).chain(OS_INHERIT_ENV.iter().copied());
    for name in inherited {
        if let Some(value) = server_env(name).filter(|v| !v.is_empty()) {
            set(name, value);
        }
    }

    for (key, value) in &context.env {
        set(key, value.clone());
    }

    env
}

fn path_info(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn split_host(host: &str) -> (&str, &str) {
    // Bracketed IPv6 literals keep their colons.
    let port_sep = match host.rfind(']') {
        Some(bracket) => host[bracket..].rfind(':').map(|i| bracket + i),
        None => host.rfind(':'),
    };
    match port_sep {
        Some(i) => (&host[..i], &host[i + 1..]),
        None => (host, "80"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use std::path::PathBuf;

    fn context() -> InvocationContext {
        InvocationContext {
            executable: PathBuf::from("/usr/bin/php-cgi"),
            working_dir: PathBuf::from("/site"),
            env: vec![
                ("SCRIPT_FILENAME".into(), "/site/app.php".into()),
                ("REMOTE_USER".into(), "alice".into()),
            ],
            inherit_env: vec!["LANG".into()],
            args: vec![PathBuf::from("/site/app.php")],
            remote_addr: Some("10.0.0.7:51000".parse().unwrap()),
        }
    }

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    fn fake_env(name: &str) -> Option<String> {
        match name {
            "PATH" => Some("/usr/local/bin:/usr/bin".into()),
            "LANG" => Some("C.UTF-8".into()),
            _ => None,
        }
    }

    #[test]
    fn test_request_variables() {
        let parts = parts(
            Request::post("/app.php/extra%20info?x=1&y=2")
                .header("Host", "example.com:8080")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .header("X-Custom-Header", "v")
                .body(())
                .unwrap(),
        );
        let env = build_env_with(&context(), &parts, 7, fake_env);

        assert_eq!(env["GATEWAY_INTERFACE"], "CGI/1.1");
        assert_eq!(env["REQUEST_METHOD"], "POST");
        assert_eq!(env["QUERY_STRING"], "x=1&y=2");
        assert_eq!(env["REQUEST_URI"], "/app.php/extra%20info?x=1&y=2");
        assert_eq!(env["PATH_INFO"], "/app.php/extra info");
        assert_eq!(env["SCRIPT_NAME"], "/");
        assert_eq!(env["SERVER_NAME"], "example.com");
        assert_eq!(env["SERVER_PORT"], "8080");
        assert_eq!(env["SERVER_PROTOCOL"], "HTTP/1.1");
        assert_eq!(env["REMOTE_ADDR"], "10.0.0.7");
        assert_eq!(env["REMOTE_PORT"], "51000");
        assert_eq!(env["CONTENT_LENGTH"], "7");
        assert_eq!(env["CONTENT_TYPE"], "application/x-www-form-urlencoded");
        assert_eq!(env["HTTP_X_CUSTOM_HEADER"], "v");
    }

    #[test]
    fn test_context_entries_override() {
        let parts = parts(Request::get("/app.php").body(()).unwrap());
        let env = build_env_with(&context(), &parts, 0, fake_env);

        assert_eq!(env["SCRIPT_FILENAME"], "/site/app.php");
        assert_eq!(env["REMOTE_USER"], "alice");
        assert!(!env.contains_key("CONTENT_LENGTH"));
    }

    #[test]
    fn test_server_environment() {
        let parts = parts(Request::get("/").body(()).unwrap());
        let env = build_env_with(&context(), &parts, 0, fake_env);
        assert_eq!(env["PATH"], "/usr/local/bin:/usr/bin");
        assert_eq!(env["LANG"], "C.UTF-8");

        let env = build_env_with(&context(), &parts, 0, |_| None);
        assert_eq!(env["PATH"], DEFAULT_PATH);
        assert!(!env.contains_key("LANG"));
    }

    #[test]
    fn test_proxy_header_dropped() {
        let parts = parts(
            Request::get("/")
                .header("Proxy", "http://evil.example")
                .body(())
                .unwrap(),
        );
        let env = build_env_with(&context(), &parts, 0, fake_env);
        assert!(!env.contains_key("HTTP_PROXY"));
    }

    #[test]
    fn test_split_host() {
        assert_eq!(split_host("example.com"), ("example.com", "80"));
        assert_eq!(split_host("example.com:81"), ("example.com", "81"));
        assert_eq!(split_host("[::1]:8080"), ("[::1]", "8080"));
        assert_eq!(split_host("[::1]"), ("[::1]", "80"));
    }
}
