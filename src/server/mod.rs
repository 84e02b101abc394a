//! HTTP API
//!
//! Routes:
//! - `GET /api/certificates/fetch?domain=…[&port=…][&servername=…]`
//! - `GET /api/certificates/subdomains?domain=…`
//! - `GET /api/certificates/history[?limit=…]`
//!
//! Fetch failures answer with `{ "message", "kind" }`: 400 for invalid
//! input, 500 for everything else.

use crate::certificate::{CertificateFetcher, FetchOptions};
use crate::config::Settings;
use crate::history::{History, MemoryHistoryStore, DEFAULT_RECENT_COUNT};
use crate::utils::{lookup_subdomains, ErrorKind, FetchError};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const FETCH_PATH: &str = "/api/certificates/fetch";
pub const SUBDOMAINS_PATH: &str = "/api/certificates/subdomains";
pub const HISTORY_PATH: &str = "/api/certificates/history";

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// State shared by all connections
pub struct AppState {
    pub fetcher: CertificateFetcher,
    pub settings: Settings,
    pub history: Mutex<History<MemoryHistoryStore>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let history = History::new(MemoryHistoryStore::new(), settings.server.history_limit);
        Self {
            fetcher: CertificateFetcher::new(),
            settings,
            history: Mutex::new(history),
        }
    }
}

/// Accept connections on `listener` until the task is cancelled
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("Listening on http://{}", addr);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!("Failed to accept connection: {}", e);
                if let Some(pause) = accept_backoff(&e) {
                    tokio::time::sleep(pause).await;
                }
                continue;
            }
        };
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { Ok::<_, Infallible>(handle(req, &state).await) }
            });

            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!("Connection from {} closed with error: {}", peer, e);
            }
        });
    }
}

/// Pause before the next accept. Errors tied to one connection are retried
/// at once; anything else, like running out of file descriptors, waits.
fn accept_backoff(error: &io::Error) -> Option<Duration> {
    match error.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

/// Bind to `addr` and serve
pub async fn run(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state).await
}

async fn handle(req: Request<Incoming>, state: &AppState) -> Response<Full<Bytes>> {
    let query = parse_query(req.uri().query());
    tracing::debug!("{} {}", req.method(), req.uri().path());
    route(req.method(), req.uri().path(), &query, state).await
}

/// Dispatch a request by method, path and decoded query parameters
pub async fn route(
    method: &Method,
    path: &str,
    query: &HashMap<String, String>,
    state: &AppState,
) -> Response<Full<Bytes>> {
    match path {
        FETCH_PATH | SUBDOMAINS_PATH | HISTORY_PATH if *method != Method::GET => {
            message_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }
        FETCH_PATH => fetch_certificate(query, state).await,
        SUBDOMAINS_PATH => match required_domain(query) {
            Ok(domain) => json_response(StatusCode::OK, &lookup_subdomains(domain)),
            Err(e) => error_response(&e),
        },
        HISTORY_PATH => {
            let limit = query
                .get("limit")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(DEFAULT_RECENT_COUNT);
            let entries = state.history.lock().await.recent(limit);
            json_response(StatusCode::OK, &entries)
        }
        _ => message_response(StatusCode::NOT_FOUND, "Not found"),
    }
}

async fn fetch_certificate(
    query: &HashMap<String, String>,
    state: &AppState,
) -> Response<Full<Bytes>> {
    let result = async {
        let domain = required_domain(query)?;
        let options = fetch_options(query, state)?;
        let cert = state.fetcher.fetch(domain, &options).await?;
        Ok::<_, FetchError>((domain, cert))
    }
    .await;

    match result {
        Ok((domain, cert)) => {
            let response = json_response(StatusCode::OK, &cert);
            state.history.lock().await.record(domain.trim(), cert);
            response
        }
        Err(e) => {
            tracing::warn!("Error fetching certificate: {}", e);
            error_response(&e)
        }
    }
}

fn required_domain(query: &HashMap<String, String>) -> Result<&str, FetchError> {
    query
        .get("domain")
        .map(String::as_str)
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| FetchError::invalid_input("Domain parameter is required"))
}

fn fetch_options(
    query: &HashMap<String, String>,
    state: &AppState,
) -> Result<FetchOptions, FetchError> {
    let mut options = FetchOptions::from(&state.settings.fetch);
    if let Some(port) = query.get("port") {
        options.port = port
            .parse()
            .map_err(|_| FetchError::invalid_input(format!("Invalid port: {}", port)))?;
    }
    if let Some(name) = query.get("servername") {
        options.server_name = Some(name.clone());
    }
    Ok(options)
}

/// Decode a URL query string; later duplicates win
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &FetchError) -> Response<Full<Bytes>> {
    json_response(status_for(error.kind()), &error.to_response())
}

fn message_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    #[derive(Serialize)]
    struct Message<'a> {
        message: &'a str,
    }
    json_response(status, &Message { message })
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let (status, body) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, bytes),
        Err(e) => {
            tracing::warn!("Failed to serialize response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"message":"Failed to serialize response"}"#.to_vec(),
            )
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}
