//! Outbound connection setup for one hop.
//!
//! # Responsibilities
//! - Dial with hyper-util's `HttpConnector` (dial timeout, keep-alive,
//!   observed resolver)
//! - Run the TLS handshake for `https` targets under its own ceiling
//! - Drive one HTTP/1.1 exchange over the resulting stream
//!
//! Every phase boundary is reported to the hop's [`LifecycleObserver`].

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsConnector;
use tower::ServiceExt;
use url::Url;

use crate::config::TransportConfig;
use crate::error::{describe, TraceError, TransportError};
use crate::net::dns::TracedResolver;
use crate::net::stream::MaybeTlsStream;
use crate::net::tls;
use crate::resilience::timeouts::with_timeout;
use crate::trace::recorder::LifecycleObserver;

/// Where a hop connects to.
#[derive(Debug, Clone)]
pub struct Endpoint {
    uri: Uri,
    authority: String,
    tls: Option<ServerName<'static>>,
}

impl Endpoint {
    /// Derive the dial target from an absolute `http`/`https` URL.
    pub fn from_url(url: &Url) -> Result<Self, TraceError> {
        let host = url
            .host()
            .ok_or_else(|| TraceError::RequestConstruction(format!("URL '{url}' has no host")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| TraceError::RequestConstruction(format!("URL '{url}' has no port")))?;

        let tls = match url.scheme() {
            "https" => Some(tls::server_name(&host)?),
            _ => None,
        };
        let uri: Uri = url
            .as_str()
            .parse()
            .map_err(|e| TraceError::RequestConstruction(format!("invalid URL '{url}': {e}")))?;

        Ok(Self {
            uri,
            authority: format!("{host}:{port}"),
            tls,
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }
}

/// Dialer that reports DNS, connect and TLS phases for a single hop.
pub struct TracedConnector {
    http: HttpConnector<TracedResolver>,
    tls: TlsConnector,
    tls_timeout: Duration,
    observer: Arc<dyn LifecycleObserver>,
}

impl TracedConnector {
    pub fn new(
        settings: &TransportConfig,
        tls_config: Arc<ClientConfig>,
        observer: Arc<dyn LifecycleObserver>,
    ) -> Self {
        let mut http = HttpConnector::new_with_resolver(TracedResolver::new(Arc::clone(&observer)));
        http.enforce_http(false);
        http.set_nodelay(true);
        http.set_connect_timeout(Some(settings.dial_timeout()));
        http.set_keepalive(Some(settings.keep_alive()));

        Self {
            http,
            tls: TlsConnector::from(tls_config),
            tls_timeout: settings.tls_handshake_timeout(),
            observer,
        }
    }

    /// Dial `endpoint` and, for `https`, complete the TLS handshake.
    pub async fn connect(&self, endpoint: &Endpoint) -> Result<MaybeTlsStream, TransportError> {
        self.observer.connect_start(&endpoint.authority);

        let tcp = match self.http.clone().oneshot(endpoint.uri.clone()).await {
            Ok(io) => io.into_inner(),
            Err(err) => {
                let message = describe(&err);
                self.observer.connect_done(Err(&message));
                return Err(TransportError::Connect {
                    authority: endpoint.authority.clone(),
                    cause: Box::new(err),
                });
            }
        };

        match tcp.peer_addr() {
            Ok(addr) => self.observer.connect_done(Ok(addr)),
            Err(err) => self.observer.connect_done(Err(&err.to_string())),
        }

        let Some(server_name) = endpoint.tls.clone() else {
            return Ok(MaybeTlsStream::Plain(tcp));
        };

        self.observer.tls_handshake_start();
        let handshake = async {
            self.tls
                .connect(server_name, tcp)
                .await
                .map_err(|source| TransportError::Tls {
                    server_name: endpoint.authority.clone(),
                    source,
                })
        };

        match with_timeout("tls handshake", self.tls_timeout, handshake).await {
            Ok(stream) => {
                let peer = stream
                    .get_ref()
                    .1
                    .peer_certificates()
                    .and_then(|certs| certs.first());
                self.observer.tls_handshake_done(peer, None);
                Ok(MaybeTlsStream::Tls(Box::new(stream)))
            }
            Err(err) => {
                if let TransportError::Tls { source, .. } = &err {
                    self.observer.tls_handshake_done(None, Some(source));
                }
                Err(err)
            }
        }
    }
}

/// Send one request over `io` and return the response head with a streaming body.
pub async fn exchange<S>(io: S, request: Request<Body>) -> Result<Response<Incoming>, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(io)).await?;

    tokio::spawn(async move {
        if let Err(err) = connection.await {
            tracing::debug!(error = %err, "Connection closed with error");
        }
    });

    Ok(sender.send_request(request).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_for_plain_http_uses_default_port() {
        let endpoint = Endpoint::from_url(&Url::parse("http://example.com/a?b=c").unwrap()).unwrap();
        assert_eq!(endpoint.authority(), "example.com:80");
        assert!(!endpoint.is_tls());
    }

    #[test]
    fn endpoint_for_https_carries_server_name() {
        let endpoint = Endpoint::from_url(&Url::parse("https://127.0.0.1:8443/").unwrap()).unwrap();
        assert_eq!(endpoint.authority(), "127.0.0.1:8443");
        assert!(endpoint.is_tls());
    }

    #[test]
    fn endpoint_brackets_ipv6_hosts() {
        let endpoint = Endpoint::from_url(&Url::parse("https://[::1]/").unwrap()).unwrap();
        assert_eq!(endpoint.authority(), "[::1]:443");
    }
}
