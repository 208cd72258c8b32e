//! Per-request adapter: one event in, one response out, over the same `App`.
//!
//! An [`Invoker`] is one instance. It loads the document once and keeps it
//! in memory for as long as it lives; nothing else carries over between
//! invocations.

use crate::app::{build_app, App};
use crate::config::Settings;
use crate::error::AppError;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tower::ServiceExt;

/// Upper bound when buffering a response body.
const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

/// An incoming request as delivered by a function host.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    #[serde(alias = "method")]
    pub http_method: String,
    /// Request path; may carry a `?query` when `rawQueryString` is absent.
    #[serde(alias = "rawPath", alias = "url")]
    pub path: String,
    #[serde(default)]
    pub raw_query_string: Option<String>,
    #[serde(default)]
    pub query_string_parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl InvocationEvent {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            http_method: method.to_string(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    pub fn with_json_body(mut self, body: &serde_json::Value) -> Self {
        self.body = Some(body.to_string());
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert("content-type".into(), "application/json".into());
        self
    }

    fn uri(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        if let Some(q) = self.raw_query_string.as_deref().filter(|q| !q.is_empty()) {
            return format!("{}?{}", path, q);
        }
        match &self.query_string_parameters {
            Some(params) if !params.is_empty() => {
                let query: Vec<String> = params
                    .iter()
                    .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                    .collect();
                format!("{}?{}", path, query.join("&"))
            }
            _ => path,
        }
    }

    /// Convert into an HTTP request for the app.
    pub fn into_request(self) -> Result<Request<Body>, AppError> {
        let method = Method::from_bytes(self.http_method.to_uppercase().as_bytes())
            .map_err(|_| AppError::BadRequest(format!("invalid method: {}", self.http_method)))?;
        let uri = self.uri();
        let body = match self.body {
            Some(b) if self.is_base64_encoded => STANDARD
                .decode(b)
                .map_err(|e| AppError::BadRequest(format!("invalid base64 body: {}", e)))?,
            Some(b) => b.into_bytes(),
            None => Vec::new(),
        };
        let mut req = Request::builder()
            .method(method)
            .uri(&uri)
            .body(Body::from(body))
            .map_err(|e| AppError::BadRequest(format!("invalid request for {}: {}", uri, e)))?;
        for (k, v) in self.headers.unwrap_or_default() {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|_| AppError::BadRequest(format!("invalid header name: {}", k)))?;
            let value = HeaderValue::from_str(&v)
                .map_err(|_| AppError::BadRequest(format!("invalid value for header {}", k)))?;
            req.headers_mut().append(name, value);
        }
        Ok(req)
    }
}

/// The reply handed back to the function host.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    /// Last value per header name.
    pub headers: BTreeMap<String, String>,
    /// Every value per header name, in order; repeated `set-cookie` lives here.
    #[serde(default)]
    pub multi_value_headers: BTreeMap<String, Vec<String>>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl InvocationResponse {
    pub async fn from_response(res: Response) -> Self {
        let (parts, body) = res.into_parts();
        let mut headers = BTreeMap::new();
        let mut multi_value_headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in &parts.headers {
            let Ok(value) = value.to_str() else {
                tracing::warn!(header = %name, "dropping non-text response header value");
                continue;
            };
            headers.insert(name.as_str().to_string(), value.to_string());
            multi_value_headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(value.to_string());
        }
        let bytes = match axum::body::to_bytes(body, MAX_RESPONSE_BYTES).await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!("failed to buffer response body: {}", e);
                return Self {
                    status_code: 500,
                    headers: BTreeMap::new(),
                    multi_value_headers: BTreeMap::new(),
                    body: String::new(),
                    is_base64_encoded: false,
                };
            }
        };
        let (body, is_base64_encoded) = match String::from_utf8(bytes.to_vec()) {
            Ok(s) => (s, false),
            Err(e) => (STANDARD.encode(e.into_bytes()), true),
        };
        Self {
            status_code: parts.status.as_u16(),
            headers,
            multi_value_headers,
            body,
            is_base64_encoded,
        }
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// One function instance over one `App`.
#[derive(Clone)]
pub struct Invoker {
    app: App,
}

impl Invoker {
    pub fn new(app: App) -> Self {
        Self { app }
    }

    /// Build the instance: load the document and rewrite table once.
    pub async fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        Ok(Self::new(build_app(settings).await?))
    }

    /// Handle one event. Never fails: a malformed event becomes a 400 response.
    pub async fn invoke(&self, event: InvocationEvent) -> InvocationResponse {
        let req = match event.into_request() {
            Ok(req) => req,
            Err(e) => return InvocationResponse::from_response(e.into_response()).await,
        };
        let res = match self.app.clone().oneshot(req).await {
            Ok(res) => res,
            Err(never) => match never {},
        };
        InvocationResponse::from_response(res).await
    }

    /// Handle one event encoded as JSON text.
    pub async fn invoke_json(&self, event: &str) -> InvocationResponse {
        match serde_json::from_str::<InvocationEvent>(event) {
            Ok(event) => self.invoke(event).await,
            Err(e) => {
                let err = AppError::BadRequest(format!("malformed event: {}", e));
                InvocationResponse::from_response(err.into_response()).await
            }
        }
    }

    /// Read one event per line from `input`, write one response per line to
    /// `output`. Blank lines are skipped. Returns the number of events handled.
    pub async fn run_lines<R, W>(&self, input: R, mut output: W) -> Result<usize, AppError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut handled = 0;
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let res = self.invoke_json(&line).await;
            let mut out = serde_json::to_vec(&res)?;
            out.push(b'\n');
            output.write_all(&out).await?;
            output.flush().await?;
            handled += 1;
        }
        Ok(handled)
    }
}
