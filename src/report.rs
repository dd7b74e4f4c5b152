//! Console rendering of a trace tree.

use std::fmt::Write;
use std::time::Duration;

use crate::trace::{RequestTrace, TraceConfig};

const INDENT: &str = "    ";

/// Render `trace` and its redirect chain as indented text.
pub fn render(trace: &RequestTrace, config: &TraceConfig) -> String {
    let mut out = String::new();
    for (depth, hop) in trace.hops().enumerate() {
        let indent = INDENT.repeat(depth);
        if depth > 0 {
            let _ = writeln!(out, "{}Redirect:", INDENT.repeat(depth - 1));
        }
        render_hop(&mut out, hop, config, &indent);
    }
    out
}

fn render_hop(out: &mut String, hop: &RequestTrace, config: &TraceConfig, indent: &str) {
    let _ = writeln!(out, "{indent}Request: {} {}", hop.method, hop.url);

    for event in &hop.timeline {
        let _ = match &event.message {
            Some(message) => writeln!(out, "{indent}-> [{}] {message} ({})", event.label, millis(event.duration)),
            None => writeln!(out, "{indent}-> [{}] ({})", event.label, millis(event.duration)),
        };
    }

    let _ = writeln!(out, "{indent}Status: {}", hop.resp_status);

    if config.show_headers {
        let _ = writeln!(out, "{indent}Response headers:");
        for (name, values) in &hop.resp_headers {
            let _ = writeln!(out, "{indent}{INDENT}{name}: {}", values.join(", "));
        }
    }

    if config.show_body && !hop.resp_body.is_empty() {
        let _ = writeln!(out, "{indent}Response body:");
        let _ = writeln!(out, "{}", hop.resp_body);
    }

    let _ = writeln!(out, "{indent}Elapsed: {}", millis(hop.duration));
}

fn millis(duration: Duration) -> String {
    format!("{:.2}ms", duration.as_secs_f64() * 1000.0)
}
