//! Observed name resolution.
//!
//! Wraps hyper-util's getaddrinfo resolver so the dialer reports DNS start and
//! completion to the hop's observer. The dialer never calls the resolver for
//! IP-literal hosts, so no DNS event exists for them.

use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use hyper_util::client::legacy::connect::dns::{GaiResolver, Name};
use tower::{Service, ServiceExt};

use crate::trace::recorder::{DnsDoneInfo, LifecycleObserver};

type ResolveFuture = Pin<Box<dyn Future<Output = Result<std::vec::IntoIter<SocketAddr>, io::Error>> + Send>>;

/// Resolver that reports each lookup to a [`LifecycleObserver`].
///
/// One resolver belongs to one hop, so lookups are never shared with other
/// callers and are always reported as not coalesced.
#[derive(Clone)]
pub struct TracedResolver {
    inner: GaiResolver,
    observer: Arc<dyn LifecycleObserver>,
}

impl TracedResolver {
    pub fn new(observer: Arc<dyn LifecycleObserver>) -> Self {
        Self {
            inner: GaiResolver::new(),
            observer,
        }
    }
}

impl Service<Name> for TracedResolver {
    type Response = std::vec::IntoIter<SocketAddr>;
    type Error = io::Error;
    type Future = ResolveFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, name: Name) -> Self::Future {
        let resolver = self.inner.clone();
        let observer = Arc::clone(&self.observer);

        Box::pin(async move {
            let host = name.as_str().to_string();
            observer.dns_start(&host);

            match resolver.oneshot(name).await {
                Ok(addrs) => {
                    let addrs: Vec<SocketAddr> = addrs.collect();
                    let ips: Vec<IpAddr> = addrs.iter().map(SocketAddr::ip).collect();
                    tracing::trace!(host = %host, count = ips.len(), "Resolved host");
                    observer.dns_done(DnsDoneInfo {
                        addrs: &ips,
                        error: None,
                        coalesced: false,
                    });
                    Ok(addrs.into_iter())
                }
                Err(err) => {
                    tracing::debug!(host = %host, error = %err, "DNS lookup failed");
                    observer.dns_done(DnsDoneInfo {
                        addrs: &[],
                        error: Some(&err),
                        coalesced: false,
                    });
                    Err(err)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Calls(Mutex<Vec<String>>);

    impl LifecycleObserver for Calls {
        fn dns_start(&self, host: &str) {
            self.0.lock().unwrap().push(format!("start {host}"));
        }

        fn dns_done(&self, info: DnsDoneInfo<'_>) {
            self.0
                .lock()
                .unwrap()
                .push(format!("done ok={} coalesced={}", info.error.is_none(), info.coalesced));
        }
    }

    #[tokio::test]
    async fn reports_start_and_done_for_localhost() {
        let calls = Arc::new(Calls::default());
        let resolver = TracedResolver::new(calls.clone());

        let addrs: Vec<_> = resolver
            .oneshot(Name::from_str("localhost").unwrap())
            .await
            .unwrap()
            .collect();

        assert!(!addrs.is_empty());
        assert!(addrs.iter().all(|a| a.ip().is_loopback()));
        assert_eq!(
            *calls.0.lock().unwrap(),
            vec!["start localhost".to_string(), "done ok=true coalesced=false".to_string()]
        );
    }
}
