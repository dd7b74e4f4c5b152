//! Lifecycle observation.
//!
//! The transport layer calls a [`LifecycleObserver`] synchronously at each
//! phase boundary. [`TimelineRecorder`] is the observer used by the engine:
//! one instance per hop, turning start/done pairs into [`TimelineEvent`]s in
//! firing order.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rustls::pki_types::CertificateDer;

use crate::net::tls::summarize_certificate;
use crate::trace::model::{EventLabel, TimelineEvent};

/// Outcome of a DNS lookup as reported to an observer.
#[derive(Debug)]
pub struct DnsDoneInfo<'a> {
    pub addrs: &'a [IpAddr],
    pub error: Option<&'a io::Error>,
    /// The lookup shared its result with a concurrent identical lookup.
    pub coalesced: bool,
}

/// Callbacks fired by the transport during one exchange.
///
/// Implementations must not block: the transport waits for each callback
/// before moving to the next phase.
pub trait LifecycleObserver: Send + Sync {
    fn dns_start(&self, _host: &str) {}
    fn dns_done(&self, _info: DnsDoneInfo<'_>) {}
    fn connect_start(&self, _authority: &str) {}
    fn connect_done(&self, _result: Result<SocketAddr, &str>) {}
    fn tls_handshake_start(&self) {}
    fn tls_handshake_done(&self, _peer: Option<&CertificateDer<'_>>, _error: Option<&io::Error>) {}
    fn wrote_request(&self) {}
    fn first_response_byte(&self) {}
}

/// Wall-clock and monotonic reading taken at the same moment.
#[derive(Debug, Clone, Copy)]
struct Mark {
    at: Instant,
    wall: DateTime<Utc>,
}

impl Mark {
    fn now() -> Self {
        Self {
            at: Instant::now(),
            wall: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    events: Vec<TimelineEvent>,
    dns_start: Option<Mark>,
    connect_start: Option<Mark>,
    tls_start: Option<Mark>,
    request_sent: Option<Instant>,
}

impl RecorderState {
    fn push(&mut self, label: EventLabel, start: Mark, duration: Duration, message: Option<String>) {
        self.events.push(TimelineEvent {
            label,
            start_time: start.wall,
            duration,
            message,
        });
    }
}

/// Observer that builds the timeline of a single hop.
#[derive(Debug, Default)]
pub struct TimelineRecorder {
    state: Mutex<RecorderState>,
}

impl TimelineRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the recorded events, leaving the recorder empty.
    pub fn take_events(&self) -> Vec<TimelineEvent> {
        std::mem::take(&mut self.lock().events)
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LifecycleObserver for TimelineRecorder {
    fn dns_start(&self, _host: &str) {
        self.lock().dns_start = Some(Mark::now());
    }

    fn dns_done(&self, info: DnsDoneInfo<'_>) {
        let now = Mark::now();
        let mut state = self.lock();
        let start = state.dns_start.take().unwrap_or(now);

        let mut parts: Vec<String> = match info.error {
            Some(err) => vec![format!("error: {err}")],
            None => info.addrs.iter().map(ToString::to_string).collect(),
        };
        if info.coalesced {
            parts.push("(coalesced with a concurrent lookup)".to_string());
        }

        state.push(
            EventLabel::DnsLookup,
            start,
            now.at.saturating_duration_since(start.at),
            Some(parts.join(", ")),
        );

        // Dialing starts once resolution is done.
        if state.connect_start.is_some() {
            state.connect_start = Some(now);
        }
    }

    fn connect_start(&self, _authority: &str) {
        self.lock().connect_start = Some(Mark::now());
    }

    fn connect_done(&self, result: Result<SocketAddr, &str>) {
        let now = Mark::now();
        let mut state = self.lock();
        let start = state.connect_start.take().unwrap_or(now);
        let message = match result {
            Ok(addr) => addr.to_string(),
            Err(err) => format!("error: {err}"),
        };
        state.push(
            EventLabel::TcpConnect,
            start,
            now.at.saturating_duration_since(start.at),
            Some(message),
        );
    }

    fn tls_handshake_start(&self) {
        self.lock().tls_start = Some(Mark::now());
    }

    fn tls_handshake_done(&self, peer: Option<&CertificateDer<'_>>, error: Option<&io::Error>) {
        let now = Mark::now();
        let message = match (peer, error) {
            (Some(cert), _) => summarize_certificate(cert)
                .unwrap_or_else(|err| format!("(unreadable certificate: {err})")),
            (None, Some(err)) => format!("error: {err}"),
            (None, None) => "(no certificate)".to_string(),
        };

        let mut state = self.lock();
        let start = state.tls_start.take().unwrap_or(now);
        state.push(
            EventLabel::TlsHandshake,
            start,
            now.at.saturating_duration_since(start.at),
            Some(message),
        );
    }

    fn wrote_request(&self) {
        let now = Mark::now();
        let mut state = self.lock();
        state.request_sent = Some(now.at);
        state.push(EventLabel::RequestSent, now, Duration::ZERO, None);
    }

    fn first_response_byte(&self) {
        let now = Mark::now();
        let mut state = self.lock();
        let ttfb = state
            .request_sent
            .map(|sent| now.at.saturating_duration_since(sent))
            .unwrap_or_default();
        state.push(EventLabel::FirstByte, now, ttfb, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(events: &[TimelineEvent]) -> Vec<EventLabel> {
        events.iter().map(|e| e.label).collect()
    }

    #[test]
    fn records_events_in_firing_order() {
        let recorder = TimelineRecorder::new();
        let addrs = ["127.0.0.1".parse().unwrap(), "::1".parse().unwrap()];

        recorder.connect_start("localhost:80");
        recorder.dns_start("localhost");
        recorder.dns_done(DnsDoneInfo {
            addrs: &addrs,
            error: None,
            coalesced: false,
        });
        recorder.connect_done(Ok("127.0.0.1:80".parse().unwrap()));
        recorder.wrote_request();
        recorder.first_response_byte();

        let events = recorder.take_events();
        assert_eq!(
            labels(&events),
            vec![
                EventLabel::DnsLookup,
                EventLabel::TcpConnect,
                EventLabel::RequestSent,
                EventLabel::FirstByte,
            ]
        );
        assert_eq!(events[0].message.as_deref(), Some("127.0.0.1, ::1"));
        assert_eq!(events[1].message.as_deref(), Some("127.0.0.1:80"));
        assert_eq!(events[2].duration, Duration::ZERO);
        assert!(events[2].message.is_none());
        assert!(recorder.take_events().is_empty());
    }

    #[test]
    fn connect_starts_after_dns_completes() {
        let recorder = TimelineRecorder::new();
        recorder.connect_start("example.test:80");
        recorder.dns_start("example.test");
        std::thread::sleep(Duration::from_millis(20));
        recorder.dns_done(DnsDoneInfo {
            addrs: &["10.0.0.1".parse().unwrap()],
            error: None,
            coalesced: false,
        });
        recorder.connect_done(Ok("10.0.0.1:80".parse().unwrap()));

        let events = recorder.take_events();
        assert!(events[0].duration >= Duration::from_millis(20));
        assert!(events[1].start_time >= events[0].start_time);
        assert!(events[1].duration < Duration::from_millis(20));
    }

    #[test]
    fn dns_failure_and_coalescing_are_reported() {
        let recorder = TimelineRecorder::new();
        let err = io::Error::new(io::ErrorKind::NotFound, "no such host");
        recorder.dns_start("nowhere.invalid");
        recorder.dns_done(DnsDoneInfo {
            addrs: &[],
            error: Some(&err),
            coalesced: true,
        });

        let events = recorder.take_events();
        assert_eq!(
            events[0].message.as_deref(),
            Some("error: no such host, (coalesced with a concurrent lookup)")
        );
    }

    #[test]
    fn time_to_first_byte_is_measured_from_request_sent() {
        let recorder = TimelineRecorder::new();
        recorder.wrote_request();
        std::thread::sleep(Duration::from_millis(15));
        recorder.first_response_byte();

        let events = recorder.take_events();
        assert!(events[1].duration >= Duration::from_millis(15));
        assert!(events[1].start_time >= events[0].start_time);
    }

    #[test]
    fn tls_without_certificate() {
        let recorder = TimelineRecorder::new();
        recorder.tls_handshake_start();
        recorder.tls_handshake_done(None, None);

        let events = recorder.take_events();
        assert_eq!(events[0].label, EventLabel::TlsHandshake);
        assert_eq!(events[0].message.as_deref(), Some("(no certificate)"));
    }
}
