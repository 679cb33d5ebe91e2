use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use reqwest::Url;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::api::{ApiCall, Method, PATH_DOWNLOAD_REPORT};
use crate::config::ServerConfig;
use crate::error::{Error, Result};

/// Identifies one backend request for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

/// Identifies one URL assignment to the display sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisplayToken(pub u64);

#[derive(Debug, Default)]
pub struct TicketSeq {
    next: AtomicU64,
}

impl TicketSeq {
    pub fn ticket(&self) -> Ticket {
        Ticket(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn display_token(&self) -> DisplayToken {
        DisplayToken(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub ticket: Ticket,
    pub call: ApiCall,
    pub outcome: Result<Value>,
}

/// Everything the event loop receives from background work.
#[derive(Debug, Clone)]
pub enum Inbound {
    Reply(Reply),
    ContentLoaded {
        token: DisplayToken,
        error: Option<String>,
    },
}

/// Issues a backend call without blocking. The completion is delivered later
/// as an [`Inbound::Reply`] carrying the same ticket.
pub trait RemoteCall: Send + Sync {
    fn dispatch(&self, ticket: Ticket, call: ApiCall);
}

/// Renders a report URL. Must emit exactly one [`Inbound::ContentLoaded`]
/// per call, even when rendering fails.
pub trait DisplaySink: Send + Sync {
    fn show(&self, token: DisplayToken, url: &str);
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::msg(format!("failed to build HTTP client: {e}")))
}

/// Resolves `reference` (absolute or server-relative) against `base`.
pub fn resolve_url(base: &str, reference: &str) -> Result<Url> {
    let base = Url::parse(base).map_err(|e| Error::msg(format!("invalid base url '{base}': {e}")))?;
    base.join(reference)
        .map_err(|e| Error::msg(format!("invalid url '{reference}': {e}")))
}

/// Joins a backend endpoint under `base`, keeping any path prefix the base
/// carries (`http://h/dash` + `/get_builds` is `http://h/dash/get_builds`).
pub fn endpoint_url(base: &str, path: &str) -> Result<Url> {
    let mut url =
        Url::parse(base).map_err(|e| Error::msg(format!("invalid base url '{base}': {e}")))?;
    if !url.path().ends_with('/') {
        let dir = format!("{}/", url.path());
        url.set_path(&dir);
    }
    url.join(path.trim_start_matches('/'))
        .map_err(|e| Error::msg(format!("invalid endpoint '{path}': {e}")))
}

/// `<scheme>://<server host>:<port>` for the embedded live terminal.
pub fn terminal_url(base: &str, port: u16) -> Result<String> {
    let url = Url::parse(base).map_err(|e| Error::msg(format!("invalid base url '{base}': {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::msg(format!("base url '{base}' has no host")))?;
    Ok(format!("{}://{}:{}", url.scheme(), host, port))
}

pub fn download_url(base: &str, build: &str) -> Result<Url> {
    let mut url = endpoint_url(base, PATH_DOWNLOAD_REPORT)?;
    url.query_pairs_mut().append_pair("build_name", build);
    Ok(url)
}

/// Blocking JSON request/response against the dashboard backend.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
    report_client: Client,
}

impl HttpBackend {
    pub fn new(cfg: &ServerConfig) -> Result<Self> {
        resolve_url(&cfg.base_url, "/")?;
        Ok(Self {
            base_url: cfg.base_url.clone(),
            client: build_client(cfg.request_timeout())?,
            report_client: build_client(cfg.report_timeout())?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn call(&self, call: &ApiCall) -> Result<Value> {
        let url = endpoint_url(&self.base_url, call.path())?;
        let client = if call.is_long_running() {
            &self.report_client
        } else {
            &self.client
        };
        let req = match (call.method(), call) {
            (Method::Post, ApiCall::SetEnv { values }) => client.post(url).form(values),
            (Method::Post, _) => client.post(url),
            (Method::Get, _) => client.get(url).query(&call.query()),
        };

        let started = Instant::now();
        let res = req.send().map_err(|e| Error::unavailable(e.to_string()))?;
        let status = res.status();
        let body = res.text().map_err(|e| Error::unavailable(e.to_string()))?;
        tracing::debug!(
            call = call.label(),
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backend call finished"
        );

        match serde_json::from_str::<Value>(&body) {
            Ok(v) => Ok(v),
            Err(_) if !status.is_success() => {
                Err(Error::unavailable(format!("HTTP {status} from {}", call.path())))
            }
            Err(e) => Err(Error::malformed(format!("{}: {e}", call.path()))),
        }
    }

    /// Fetches the report document. Used as the terminal display sink.
    pub fn fetch_document(&self, url: &str) -> Result<usize> {
        let url = resolve_url(&self.base_url, url)?;
        let res = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::unavailable(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::msg(format!("report returned HTTP {status}")));
        }
        let body = res.bytes().map_err(|e| Error::unavailable(e.to_string()))?;
        Ok(body.len())
    }

    /// Downloads the report archive for `build` into `dir` and returns the
    /// written path. The file name follows `x-suggested-filename` when sent.
    pub fn download_report(&self, build: &str, dir: &Path) -> Result<PathBuf> {
        let url = download_url(&self.base_url, build)?;
        let res = self
            .report_client
            .get(url)
            .send()
            .map_err(|e| Error::unavailable(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::msg(format!(
                "download of {build} failed with HTTP {status}"
            )));
        }
        let suggested = res
            .headers()
            .get("x-suggested-filename")
            .and_then(|v| v.to_str().ok())
            .map(sanitize_filename_component)
            .filter(|s| !s.is_empty());
        let name = suggested
            .unwrap_or_else(|| format!("{}.tar.gz", sanitize_filename_component(build)));
        let body = res.bytes().map_err(|e| Error::unavailable(e.to_string()))?;

        fs::create_dir_all(dir)
            .map_err(|e| Error::msg(format!("failed to create {}: {e}", dir.display())))?;
        let path = dir.join(name);
        fs::write(&path, &body)
            .map_err(|e| Error::msg(format!("failed to write {}: {e}", path.display())))?;
        tracing::info!(build, path = %path.display(), bytes = body.len(), "report downloaded");
        Ok(path)
    }
}

/// Runs each call on its own thread and posts the reply to the event loop.
pub struct ThreadedRemote {
    backend: HttpBackend,
    tx: mpsc::Sender<Inbound>,
}

impl ThreadedRemote {
    pub fn new(backend: HttpBackend, tx: mpsc::Sender<Inbound>) -> Self {
        Self { backend, tx }
    }
}

impl RemoteCall for ThreadedRemote {
    fn dispatch(&self, ticket: Ticket, call: ApiCall) {
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tracing::debug!(ticket = ticket.0, call = call.label(), "dispatching backend call");
        std::thread::spawn(move || {
            let outcome = backend.call(&call);
            let _ = tx.send(Inbound::Reply(Reply {
                ticket,
                call,
                outcome,
            }));
        });
    }
}

impl DisplaySink for ThreadedRemote {
    fn show(&self, token: DisplayToken, url: &str) {
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        let url = url.to_string();
        std::thread::spawn(move || {
            let error = match backend.fetch_document(&url) {
                Ok(bytes) => {
                    tracing::debug!(url = %url, bytes, "report content loaded");
                    None
                }
                Err(e) => {
                    tracing::warn!(url = %url, "report content failed to load: {e}");
                    Some(e.to_string())
                }
            };
            let _ = tx.send(Inbound::ContentLoaded { token, error });
        });
    }
}

fn sanitize_filename_component(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => Some(c),
            '/' | '\\' => None,
            _ => Some('_'),
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_url_swaps_port_and_keeps_scheme() {
        assert_eq!(
            terminal_url("https://fut.lab:5000/dash/", 57575).expect("url"),
            "https://fut.lab:57575"
        );
        assert!(terminal_url("not a url", 1).is_err());
    }

    #[test]
    fn relative_report_urls_resolve_against_server() {
        let url = resolve_url("http://10.0.0.2:5000", "/static/reports/run-1/index.html")
            .expect("resolve");
        assert_eq!(url.as_str(), "http://10.0.0.2:5000/static/reports/run-1/index.html");
        let abs = resolve_url("http://10.0.0.2:5000", "http://other/r.html").expect("resolve");
        assert_eq!(abs.as_str(), "http://other/r.html");
    }

    #[test]
    fn endpoints_keep_base_path_prefix() {
        let url = endpoint_url("http://h:5000", "/get_builds").expect("url");
        assert_eq!(url.as_str(), "http://h:5000/get_builds");
        let url = endpoint_url("http://h/dash", "/get_builds").expect("url");
        assert_eq!(url.as_str(), "http://h/dash/get_builds");
        let url = endpoint_url("http://h/dash/", "/set_env").expect("url");
        assert_eq!(url.as_str(), "http://h/dash/set_env");
        let url = download_url("http://h/dash/", "run-1").expect("url");
        assert_eq!(url.as_str(), "http://h/dash/download_allure?build_name=run-1");
    }

    #[test]
    fn download_url_escapes_build_name() {
        let url = download_url("http://h:5000", "run 1&x").expect("url");
        assert_eq!(url.as_str(), "http://h:5000/download_allure?build_name=run+1%26x");
    }

    #[test]
    fn tickets_are_unique_and_increasing() {
        let seq = TicketSeq::default();
        let a = seq.ticket();
        let t = seq.display_token();
        let b = seq.ticket();
        assert!(a < b);
        assert_ne!(a.0, t.0);
    }

    #[test]
    fn filenames_are_flattened() {
        assert_eq!(sanitize_filename_component("../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename_component("run 1.tar.gz"), "run_1.tar.gz");
    }
}
