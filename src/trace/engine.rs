//! The trace engine: one exchange per hop, redirects followed recursively.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use hyper::body::Incoming;
use rustls::ClientConfig;
use tracing::Instrument;
use url::Url;

use crate::config::TransportConfig;
use crate::error::TraceError;
use crate::net::connector::{exchange, TracedConnector};
use crate::net::stream::TracedStream;
use crate::net::tls;
use crate::observability::metrics;
use crate::resilience::timeouts::Deadline;
use crate::trace::model::{HeaderList, RequestTrace, TraceConfig};
use crate::trace::recorder::{LifecycleObserver, TimelineRecorder};
use crate::trace::request;

/// Future returned by [`Tracer::trace`]. Boxed so the call can recurse.
pub type TraceFuture<'a> = Pin<Box<dyn Future<Output = Result<RequestTrace, TraceError>> + Send + 'a>>;

/// Issues traced requests. Holds no per-request state, so one instance can
/// serve any number of concurrent traces.
#[derive(Debug, Clone)]
pub struct Tracer {
    settings: TransportConfig,
    tls: Arc<ClientConfig>,
}

impl Tracer {
    /// Build a tracer, loading the TLS trust roots once.
    pub fn new(settings: TransportConfig) -> Result<Self, TraceError> {
        let tls = tls::client_config(settings.ca_file.as_deref().map(Path::new))?;
        Ok(Self { settings, tls })
    }

    pub fn settings(&self) -> &TransportConfig {
        &self.settings
    }

    /// Trace `url`, then follow any redirect with the same `config`.
    ///
    /// Only the first hop can fail the call. If a redirect target cannot be
    /// traced, the chain simply ends at the redirect response.
    pub fn trace<'a>(&'a self, url: &'a str, config: &'a TraceConfig) -> TraceFuture<'a> {
        Box::pin(async move {
            let mut hop = self.trace_hop(url, config).await?;

            if let Some(next) = redirect_target(&hop) {
                tracing::debug!(from = %hop.url, to = %next, "Following redirect");
                match self.trace(next.as_str(), config).await {
                    Ok(child) => hop.redirect_to = Some(Box::new(child)),
                    Err(err) => {
                        tracing::debug!(url = %next, error = %err, "Redirect target failed, ending chain");
                    }
                }
            }

            Ok(hop)
        })
    }

    /// Perform exactly one exchange and record it.
    async fn trace_hop(&self, url: &str, config: &TraceConfig) -> Result<RequestTrace, TraceError> {
        let prepared = request::prepare(url, config)?;
        let outbound = prepared.build(&self.settings.user_agent)?;
        let method = prepared.method.to_string();

        let url = url.trim();
        let span = tracing::debug_span!(
            "hop",
            method = %method,
            url = %url,
            authority = prepared.endpoint.authority(),
            tls = prepared.endpoint.is_tls(),
        );
        async move {
            let recorder = Arc::new(TimelineRecorder::new());
            let observer: Arc<dyn LifecycleObserver> = recorder.clone();
            let connector = TracedConnector::new(&self.settings, Arc::clone(&self.tls), Arc::clone(&observer));
            let deadline = Deadline::after(self.settings.request_timeout());
            let started = Instant::now();

            let result = deadline
                .run("request", async {
                    let stream = connector.connect(&prepared.endpoint).await?;
                    tracing::trace!(tls = stream.is_tls(), "Connected");
                    exchange(TracedStream::new(stream, observer), outbound).await
                })
                .await;

            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    let err = TraceError::from(err);
                    tracing::debug!(error = %err, "Hop failed");
                    metrics::record_error(err.kind());
                    return Err(err);
                }
            };

            let status = response.status().as_u16();
            let resp_headers = header_list(response.headers());
            tracing::debug!(status, "Response received");

            let resp_body = if config.show_body {
                let body = response.into_body();
                read_body(body, self.settings.max_body_bytes, &deadline).await
            } else {
                String::new()
            };

            let duration = started.elapsed();
            let timeline = recorder.take_events();
            metrics::record_hop(status, duration, &timeline);

            Ok(RequestTrace {
                url: url.to_string(),
                method,
                headers: prepared.recorded_headers,
                req_body: prepared.body,
                resp_status: status,
                resp_headers,
                resp_body,
                timeline,
                redirect_to: None,
                duration,
            })
        }
        .instrument(span)
        .await
    }
}

/// Trace `url` with default transport settings.
pub async fn trace(url: &str, config: &TraceConfig) -> Result<RequestTrace, TraceError> {
    Tracer::new(TransportConfig::default())?.trace(url, config).await
}

/// Where a hop redirects to, if it does.
///
/// Requires a 3xx status and a non-empty `Location`. Relative targets are
/// resolved against the hop's own URL.
fn redirect_target(hop: &RequestTrace) -> Option<Url> {
    if !(300..400).contains(&hop.resp_status) {
        return None;
    }
    let location = hop.resp_header("location").map(str::trim).filter(|l| !l.is_empty())?;
    let base = Url::parse(&hop.url).ok()?;
    match base.join(location) {
        Ok(url) => Some(url),
        Err(err) => {
            tracing::debug!(location, error = %err, "Unusable redirect location");
            None
        }
    }
}

/// Response headers as recorded: lowercase names, values in arrival order.
fn header_list(headers: &axum::http::HeaderMap) -> HeaderList {
    let mut list = HeaderList::new();
    for (name, value) in headers {
        list.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    list
}

/// Drain the body within the remaining deadline and the size cap.
/// Failures leave the body empty; the hop itself still succeeds.
async fn read_body(body: Incoming, limit: usize, deadline: &Deadline) -> String {
    match tokio::time::timeout(deadline.remaining(), axum::body::to_bytes(Body::new(body), limit)).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, limit, "Failed to read response body");
            String::new()
        }
        Err(_) => {
            tracing::warn!("Response body read hit the request deadline");
            String::new()
        }
    }
}
