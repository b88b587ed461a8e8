//! Request monitoring: response-time and request-id headers plus a CSV
//! usage log with one row per request.

use std::convert::Infallible;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{Extensions, HeaderMap, HeaderName, HeaderValue, Uri, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::error;
use uuid::Uuid;

use crate::state::AppState;

pub const RESPONSE_TIME_HEADER: HeaderName = HeaderName::from_static("x-response-time");
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-api-request-id");

pub const CSV_HEADER: [&str; 7] = [
    "Request ID",
    "Datetime",
    "Endpoint Triggered",
    "Client IP Address",
    "Response Time",
    "Status Code",
    "Successful",
];

pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(peer_ip(&parts.extensions)))
    }
}

fn peer_ip(extensions: &Extensions) -> Option<String> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

fn request_url(uri: &Uri, headers: &HeaderMap) -> String {
    if uri.authority().is_some() {
        return uri.to_string();
    }
    match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) if !host.is_empty() => format!("http://{}{}", host, uri),
        _ => uri.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub request_id: String,
    pub datetime: DateTime<Utc>,
    pub endpoint: String,
    pub client_ip: String,
    pub response_time: f64,
    pub status: u16,
}

impl UsageRecord {
    pub fn successful(&self) -> bool {
        self.status < 400
    }
}

/// Append-only CSV usage log. The header row is written once, when the file
/// is empty.
#[derive(Clone)]
pub struct UsageLog {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl UsageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &UsageRecord) -> anyhow::Result<()> {
        let _guard = self.lock.lock().map_err(|e| anyhow::anyhow!("usage log lock poisoned: {}", e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = csv::Writer::from_writer(file);
        if is_empty {
            writer.write_record(CSV_HEADER)?;
        }
        writer.write_record([
            record.request_id.clone(),
            record.datetime.to_rfc3339_opts(SecondsFormat::Micros, true),
            record.endpoint.clone(),
            record.client_ip.clone(),
            format!("{:.4}", record.response_time),
            record.status.to_string(),
            record.successful().to_string(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

/// Tags every response with `X-Response-Time` and `X-API-Request-ID` and
/// appends a usage row.
pub async fn monitor_service(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().simple().to_string();
    let datetime = Utc::now();
    let endpoint = request_url(req.uri(), req.headers());
    let client_ip = peer_ip(req.extensions()).unwrap_or_else(|| "unknown".to_string());
    let start = Instant::now();

    let mut response = next.run(req).await;

    let response_time = start.elapsed().as_secs_f64();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&format!("{:.4}", response_time)) {
        headers.insert(RESPONSE_TIME_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }

    let record = UsageRecord {
        request_id,
        datetime,
        endpoint,
        client_ip,
        response_time,
        status: response.status().as_u16(),
    };
    let log = state.usage_log.clone();
    match tokio::task::spawn_blocking(move || log.append(&record)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Failed to write usage log: {:#}", e),
        Err(e) => error!("spawn_blocking join error: {}", e),
    }

    response
}
