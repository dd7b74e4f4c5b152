//! Trace data model and its JSON shape.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header collection as recorded in a trace: name → values in arrival order.
pub type HeaderList = BTreeMap<String, Vec<String>>;

/// Per-invocation input, reapplied verbatim to every hop of a redirect chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceConfig {
    /// HTTP method; empty means `GET`.
    pub method: String,
    /// Raw `"Key: Value"` lines. Lines without a colon are skipped.
    pub headers: Vec<String>,
    /// Request payload; sent whenever non-empty, regardless of method.
    pub body: String,
    /// Rendering hint only; response headers are always captured.
    pub show_headers: bool,
    /// Whether the response body is captured at all.
    pub show_body: bool,
}

impl TraceConfig {
    /// Method to send, falling back to `GET`.
    pub fn effective_method(&self) -> &str {
        let method = self.method.trim();
        if method.is_empty() {
            "GET"
        } else {
            method
        }
    }
}

/// Fixed vocabulary of lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventLabel {
    #[serde(rename = "DNS Lookup")]
    DnsLookup,
    #[serde(rename = "TCP Connect")]
    TcpConnect,
    #[serde(rename = "TLS Handshake")]
    TlsHandshake,
    #[serde(rename = "Request Sent")]
    RequestSent,
    #[serde(rename = "First Byte Received")]
    FirstByte,
}

impl EventLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLabel::DnsLookup => "DNS Lookup",
            EventLabel::TcpConnect => "TCP Connect",
            EventLabel::TlsHandshake => "TLS Handshake",
            EventLabel::RequestSent => "Request Sent",
            EventLabel::FirstByte => "First Byte Received",
        }
    }

    /// Label used for the `phase` metric dimension.
    pub(crate) fn metric_name(&self) -> &'static str {
        match self {
            EventLabel::DnsLookup => "dns",
            EventLabel::TcpConnect => "connect",
            EventLabel::TlsHandshake => "tls",
            EventLabel::RequestSent => "write",
            EventLabel::FirstByte => "ttfb",
        }
    }
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed lifecycle moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub label: EventLabel,
    pub start_time: DateTime<Utc>,
    #[serde(with = "duration_nanos")]
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One request/response exchange, owning the trace of a followed redirect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTrace {
    pub url: String,
    pub method: String,
    /// Caller-supplied headers exactly as parsed from the header lines.
    pub headers: HeaderList,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub req_body: String,
    pub resp_status: u16,
    pub resp_headers: HeaderList,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resp_body: String,
    pub timeline: Vec<TimelineEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<Box<RequestTrace>>,
    #[serde(with = "duration_nanos")]
    pub duration: Duration,
}

impl RequestTrace {
    /// This hop followed by every redirect hop, outermost first.
    pub fn hops(&self) -> impl Iterator<Item = &RequestTrace> {
        std::iter::successors(Some(self), |hop| hop.redirect_to.as_deref())
    }

    /// The last hop of the chain.
    pub fn final_hop(&self) -> &RequestTrace {
        self.hops().last().unwrap_or(self)
    }

    /// First timeline event carrying `label`.
    pub fn event(&self, label: EventLabel) -> Option<&TimelineEvent> {
        self.timeline.iter().find(|event| event.label == label)
    }

    /// First value of a response header, by case-insensitive name.
    pub fn resp_header(&self, name: &str) -> Option<&str> {
        self.resp_headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

/// Durations cross the API boundary as integer nanoseconds.
mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hop(url: &str, status: u16) -> RequestTrace {
        RequestTrace {
            url: url.to_string(),
            method: "GET".to_string(),
            headers: HeaderList::new(),
            req_body: String::new(),
            resp_status: status,
            resp_headers: HeaderList::new(),
            resp_body: String::new(),
            timeline: Vec::new(),
            redirect_to: None,
            duration: Duration::from_millis(3),
        }
    }

    #[test]
    fn method_defaults_to_get() {
        assert_eq!(TraceConfig::default().effective_method(), "GET");
        let config = TraceConfig {
            method: "POST".into(),
            ..Default::default()
        };
        assert_eq!(config.effective_method(), "POST");
    }

    #[test]
    fn empty_optional_fields_are_omitted() {
        let value = serde_json::to_value(hop("http://a/", 200)).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("req_body"));
        assert!(!object.contains_key("resp_body"));
        assert!(!object.contains_key("redirect_to"));
        assert_eq!(value["duration"], json!(3_000_000));
        assert_eq!(value["timeline"], json!([]));
    }

    #[test]
    fn timeline_event_shape() {
        let event = TimelineEvent {
            label: EventLabel::FirstByte,
            start_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            duration: Duration::from_micros(1500),
            message: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "label": "First Byte Received",
                "start_time": "2023-11-14T22:13:20Z",
                "duration": 1_500_000,
            })
        );
    }

    #[test]
    fn hops_walk_the_redirect_chain() {
        let mut root = hop("http://a/", 301);
        let mut middle = hop("http://b/", 302);
        middle.redirect_to = Some(Box::new(hop("http://c/", 200)));
        root.redirect_to = Some(Box::new(middle));

        let urls: Vec<_> = root.hops().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["http://a/", "http://b/", "http://c/"]);
        assert_eq!(root.final_hop().resp_status, 200);

        let text = serde_json::to_string(&root).unwrap();
        let parsed: RequestTrace = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, root);
    }
}
