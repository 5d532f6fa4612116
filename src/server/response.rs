use crate::context::Response;
use dashmap::DashMap;
use http::StatusCode;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Upper bound on distinct interned header lines.
pub const MAX_INTERNED_HEADERS: usize = 4096;

/// Header slots in a `may_minihttp` response; writing past them panics.
pub const RESPONSE_HEADER_SLOTS: usize = 16;

/// `may_minihttp` takes header lines as `&'static str`. Distinct lines are
/// leaked once and reused; the cache is bounded so request-dependent values
/// cannot grow it without limit.
struct HeaderInterner {
    lines: DashMap<String, &'static str>,
    capacity: usize,
    full_warned: AtomicBool,
}

impl HeaderInterner {
    fn new(capacity: usize) -> Self {
        Self {
            lines: DashMap::new(),
            capacity,
            full_warned: AtomicBool::new(false),
        }
    }

    /// Lines past the capacity are still returned, leaked without caching.
    fn line(&self, name: &str, value: &str) -> &'static str {
        let line = format!("{name}: {value}");
        if let Some(interned) = self.lines.get(&line) {
            return *interned;
        }
        if self.lines.len() >= self.capacity {
            if !self.full_warned.swap(true, Ordering::Relaxed) {
                warn!(
                    header = %name,
                    limit = self.capacity,
                    "Header cache full, new header lines are no longer interned"
                );
            }
            return leak(line);
        }
        *self.lines.entry(line.clone()).or_insert_with(|| leak(line))
    }
}

static HEADER_LINES: Lazy<HeaderInterner> =
    Lazy::new(|| HeaderInterner::new(MAX_INTERNED_HEADERS));

/// Headers the HTTP server writes itself.
fn is_managed(name: &str) -> bool {
    name.eq_ignore_ascii_case("content-length")
        || name.eq_ignore_ascii_case("date")
        || name.eq_ignore_ascii_case("server")
}

fn leak(line: String) -> &'static str {
    Box::leak(line.into_boxed_str())
}

/// `Name: value` as a `&'static str`, interned up to
/// [`MAX_INTERNED_HEADERS`] distinct lines.
#[must_use]
pub fn header_line(name: &str, value: &str) -> &'static str {
    HEADER_LINES.line(name, value)
}

/// Pack header lines into at most [`RESPONSE_HEADER_SLOTS`] slots. Lines
/// that do not fit their own slot share the last one, CRLF-joined.
fn pack_header_lines(lines: Vec<&'static str>) -> Vec<&'static str> {
    if lines.len() <= RESPONSE_HEADER_SLOTS {
        return lines;
    }
    let mut packed = lines;
    let overflow = packed.split_off(RESPONSE_HEADER_SLOTS - 1);
    packed.push(leak(overflow.join("\r\n")));
    packed
}

#[must_use]
pub fn canonical_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// Copy a dispatched [`Response`] into the `may_minihttp` response.
pub fn write_response(res: &mut may_minihttp::Response, response: &mut Response) {
    let status = response.status();
    res.status_code(usize::from(status.as_u16()), canonical_reason(status));
    let lines: Vec<&'static str> = response
        .headers()
        .iter()
        .filter(|(name, _)| !is_managed(name))
        .map(|(name, value)| header_line(name, value))
        .collect();
    for line in pack_header_lines(lines) {
        res.header(line);
    }
    res.body_vec(response.take_body());
}

/// Minimal JSON error for requests that never reached the dispatcher.
pub fn write_error(res: &mut may_minihttp::Response, status: StatusCode, message: &str) {
    res.status_code(usize::from(status.as_u16()), canonical_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(serde_json::json!({ "error": message }).to_string().into_bytes());
}
