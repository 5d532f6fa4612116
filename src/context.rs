//! Per-request state shared by filters, the binder and handlers.
//!
//! A [`RequestContext`] is created at the start of dispatch and is
//! exclusively owned by one in-flight request. It carries the parsed input
//! (method, path, query, headers, cookies, body, matched parameters), the
//! response being built, and the abort flag filters use to stop the
//! pipeline.

use crate::ids::RequestId;
use crate::pattern::Params;
use http::{Method, StatusCode};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Parse a `Cookie` header value into name/value pairs.
#[must_use]
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Parse the query string of a request target (`/p?x=1&y=2`).
///
/// Repeated keys keep the last value.
#[must_use]
pub fn parse_query_params(target: &str) -> HashMap<String, String> {
    match target.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => HashMap::new(),
    }
}

/// Why and how a filter or handler stopped the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortSignal {
    pub status: StatusCode,
    pub message: String,
}

/// Response under construction.
///
/// `started` turns true on the first body write or redirect, mirroring an
/// HTTP writer that has flushed its header; filters registered with
/// `return_on_output` stop the pipeline once it is set.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    started: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: Vec::new(),
            started: false,
        }
    }
}

impl Response {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rfind(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn take_body(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.body)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
        self.started = true;
    }

    pub fn write_text(&mut self, status: StatusCode, text: &str) {
        self.status = status;
        if self.header("content-type").is_none() {
            self.set_header("Content-Type", "text/plain; charset=utf-8");
        }
        self.write(text.as_bytes());
    }

    /// Serialize `value` as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; the response is left untouched.
    pub fn write_json<T: Serialize + ?Sized>(
        &mut self,
        status: StatusCode,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        self.status = status;
        self.set_header("Content-Type", "application/json");
        self.write(&bytes);
        Ok(())
    }

    pub fn redirect(&mut self, status: StatusCode, location: &str) {
        self.status = status;
        self.set_header("Location", location);
        self.started = true;
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Drop the body and clear `started`, keeping status and headers.
    pub fn clear_body(&mut self) {
        self.body.clear();
        self.started = false;
    }

    /// Discard everything written so far.
    pub fn reset(&mut self) {
        *self = Response::default();
    }
}

/// Per-request dispatch state.
#[derive(Debug)]
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    path: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    body: Vec<u8>,
    params: Params,
    route_pattern: Option<Arc<str>>,
    data: HashMap<String, serde_json::Value>,
    response: Response,
    abort: Option<AbortSignal>,
    started_at: Instant,
}

impl RequestContext {
    /// Build a context from a method and a request target (path plus
    /// optional query string).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let path = target.split('?').next().unwrap_or("/");
        let path = if path.is_empty() { "/" } else { path };
        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            query: parse_query_params(target),
            form: HashMap::new(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            body: Vec::new(),
            params: Params::new(),
            route_pattern: None,
            data: HashMap::new(),
            response: Response::default(),
            abort: None,
            started_at: Instant::now(),
        }
    }

    /// Add a request header. Names are stored lowercased; a `Cookie` header
    /// is parsed, and an `X-Request-Id` carrying a valid ULID replaces the
    /// generated request id.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.insert_header(name, value);
        self
    }

    /// Attach the raw request body. A form-encoded body also feeds
    /// [`RequestContext::query`].
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.set_body(body.into());
        self
    }

    pub(crate) fn insert_header(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "cookie" => self.cookies.extend(parse_cookies(value)),
            "x-request-id" => {
                self.request_id = RequestId::from_header_or_new(Some(value));
            }
            _ => {}
        }
        self.headers.insert(name, value.to_string());
    }

    /// Replace the request path, e.g. with its percent-decoded form.
    pub(crate) fn set_path(&mut self, path: String) {
        self.path = if path.is_empty() { "/".to_string() } else { path };
    }

    pub(crate) fn set_body(&mut self, body: Vec<u8>) {
        let is_form = self
            .header("content-type")
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            self.form = url::form_urlencoded::parse(&body)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
        }
        self.body = body;
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Replace the effective method (used by `_method` override).
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query-string value, falling back to a form-encoded body field.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .or_else(|| self.form.get(name))
            .map(String::as_str)
    }

    #[must_use]
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            self.headers
                .get(&name.to_ascii_lowercase())
                .map(String::as_str)
        } else {
            self.headers.get(name).map(String::as_str)
        }
    }

    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn body_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Route or filter parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    pub fn set_param(&mut self, name: &str, value: impl Into<String>) {
        self.params.insert(name, value);
    }

    /// The raw pattern of the matched route, once matching succeeded.
    #[must_use]
    pub fn route_pattern(&self) -> Option<&str> {
        self.route_pattern.as_deref()
    }

    pub(crate) fn route_pattern_arc(&self) -> Option<Arc<str>> {
        self.route_pattern.clone()
    }

    pub(crate) fn set_route_pattern(&mut self, pattern: Arc<str>) {
        self.route_pattern = Some(pattern);
    }

    /// Value stashed by an earlier filter or handler.
    #[must_use]
    pub fn data(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.response.set_status(status);
    }

    pub fn write_text(&mut self, text: &str) {
        let status = self.response.status();
        self.response.write_text(status, text);
    }

    /// # Errors
    ///
    /// Returns the serializer error when `value` cannot be encoded.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        let status = self.response.status();
        self.response.write_json(status, value)
    }

    pub fn redirect(&mut self, status: StatusCode, location: &str) {
        self.response.redirect(status, location);
    }

    /// Stop the pipeline. Remaining filters, binding and the handler are
    /// skipped; `finish` filters still run.
    pub fn abort(&mut self, status: StatusCode, message: impl Into<String>) {
        self.abort = Some(AbortSignal {
            status,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.abort.is_some()
    }

    #[must_use]
    pub fn abort_signal(&self) -> Option<&AbortSignal> {
        self.abort.as_ref()
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
