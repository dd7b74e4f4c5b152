//! Outbound request construction.
//!
//! Validates the method and URL before any network activity, parses the raw
//! `"Key: Value"` header lines, and records the caller's headers exactly as
//! parsed so the trace is independent of what the transport adds later.

use axum::body::Body;
use axum::http::header::{HOST, USER_AGENT};
use axum::http::{HeaderName, HeaderValue, Method, Request};
use url::{Position, Url};

use crate::error::TraceError;
use crate::net::connector::Endpoint;
use crate::trace::model::{HeaderList, TraceConfig};

/// Split a raw header line once on the first colon, trimming both sides.
/// Lines without a colon yield `None`.
pub fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

/// Parse and check an absolute `http`/`https` URL.
pub fn parse_url(raw: &str) -> Result<Url, TraceError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| TraceError::RequestConstruction(format!("invalid URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(TraceError::RequestConstruction(format!(
                "unsupported URL scheme '{other}' in '{raw}'"
            )))
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(TraceError::RequestConstruction(format!("URL '{raw}' has no host")));
    }
    Ok(url)
}

/// A validated request, ready to be dialed and sent.
#[derive(Debug)]
pub struct PreparedRequest {
    pub url: Url,
    pub method: Method,
    pub endpoint: Endpoint,
    /// Caller headers in application order; later entries replace earlier ones.
    headers: Vec<(HeaderName, HeaderValue)>,
    /// Caller headers as recorded in the trace.
    pub recorded_headers: HeaderList,
    pub body: String,
}

impl PreparedRequest {
    /// Build the outbound request in origin form, adding `Host` and
    /// `User-Agent` unless the caller supplied them.
    pub fn build(&self, user_agent: &str) -> Result<Request<Body>, TraceError> {
        let target = &self.url[Position::BeforePath..Position::AfterQuery];
        let target = if target.is_empty() { "/" } else { target };
        let host = &self.url[Position::BeforeHost..Position::AfterPort];

        let body = if self.body.is_empty() {
            Body::empty()
        } else {
            Body::from(self.body.clone())
        };

        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(target)
            .body(body)
            .map_err(|e| TraceError::RequestConstruction(e.to_string()))?;

        let headers = request.headers_mut();
        headers.insert(
            HOST,
            HeaderValue::from_str(host)
                .map_err(|e| TraceError::RequestConstruction(format!("invalid host '{host}': {e}")))?,
        );
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        if !headers.contains_key(USER_AGENT) {
            if let Ok(value) = HeaderValue::from_str(user_agent) {
                headers.insert(USER_AGENT, value);
            }
        }

        Ok(request)
    }
}

/// Validate `url` and `config` into a [`PreparedRequest`].
pub fn prepare(url: &str, config: &TraceConfig) -> Result<PreparedRequest, TraceError> {
    let method = Method::from_bytes(config.effective_method().as_bytes()).map_err(|_| {
        TraceError::RequestConstruction(format!("invalid method '{}'", config.method))
    })?;
    let url = parse_url(url)?;
    let endpoint = Endpoint::from_url(&url)?;

    let mut headers = Vec::new();
    let mut recorded_headers = HeaderList::new();
    for line in &config.headers {
        let Some((key, raw_value)) = parse_header_line(line) else {
            tracing::trace!(line = %line, "Skipping header line without a colon");
            continue;
        };
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| TraceError::RequestConstruction(format!("invalid header name '{key}'")))?;
        let value = HeaderValue::from_str(raw_value).map_err(|_| {
            TraceError::RequestConstruction(format!("invalid value for header '{key}'"))
        })?;

        headers.push((name, value));
        recorded_headers
            .entry(key.to_string())
            .or_default()
            .push(raw_value.to_string());
    }

    Ok(PreparedRequest {
        url,
        method,
        endpoint,
        headers,
        recorded_headers,
        body: config.body.clone(),
    })
}
