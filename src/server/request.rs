use crate::context::RequestContext;
use http::{Method, StatusCode};
use may_minihttp::Request;
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read};
use tracing::debug;

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Failure turning a raw HTTP request into a [`RequestContext`].
#[derive(Debug)]
pub enum RequestError {
    InvalidMethod(String),
    BodyTooLarge { limit: usize },
    Io(io::Error),
}

impl RequestError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::InvalidMethod(_) | RequestError::Io(_) => StatusCode::BAD_REQUEST,
            RequestError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidMethod(m) => write!(f, "invalid method '{m}'"),
            RequestError::BodyTooLarge { limit } => {
                write!(f, "request body exceeds {limit} bytes")
            }
            RequestError::Io(e) => write!(f, "failed to read request body: {e}"),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Percent-decode the path part of a request target. Invalid UTF-8 after
/// decoding leaves the path as sent.
#[must_use]
pub fn decode_path(path: &str) -> Cow<'_, str> {
    if !path.contains('%') {
        return Cow::Borrowed(path);
    }
    urlencoding::decode(path).unwrap_or(Cow::Borrowed(path))
}

/// Build a context from already-split request parts.
///
/// # Errors
///
/// [`RequestError::InvalidMethod`] when `method` is not an HTTP token.
pub fn context_from_parts<'a>(
    method: &str,
    target: &str,
    headers: impl IntoIterator<Item = (&'a str, &'a [u8])>,
    body: Vec<u8>,
) -> Result<RequestContext, RequestError> {
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| RequestError::InvalidMethod(method.to_string()))?;
    let mut ctx = RequestContext::new(method, target);
    let decoded = match decode_path(ctx.path()) {
        Cow::Owned(decoded) => Some(decoded),
        Cow::Borrowed(_) => None,
    };
    if let Some(decoded) = decoded {
        ctx.set_path(decoded);
    }

    let mut header_count = 0usize;
    for (name, value) in headers {
        ctx.insert_header(name, &String::from_utf8_lossy(value));
        header_count += 1;
    }
    // Headers first: form decoding depends on Content-Type.
    let body_len = body.len();
    ctx.set_body(body);

    debug!(
        request_id = %ctx.request_id(),
        method = %ctx.method(),
        path = %ctx.path(),
        header_count,
        body_size_bytes = body_len,
        "HTTP request parsed"
    );
    Ok(ctx)
}

/// Read a `may_minihttp` request into a [`RequestContext`], rejecting
/// bodies over `max_body_bytes`.
///
/// # Errors
///
/// See [`RequestError`].
pub fn build_context(req: Request, max_body_bytes: usize) -> Result<RequestContext, RequestError> {
    let method = req.method().to_string();
    let target = req.path().to_string();
    let headers: Vec<(String, Vec<u8>)> = req
        .headers()
        .iter()
        .map(|h| (h.name.to_string(), h.value.to_vec()))
        .collect();

    // Read the whole body so the connection stays framed for the next
    // request even when this one is rejected.
    let mut body = Vec::new();
    req.body()
        .read_to_end(&mut body)
        .map_err(RequestError::Io)?;
    if body.len() > max_body_bytes {
        return Err(RequestError::BodyTooLarge {
            limit: max_body_bytes,
        });
    }

    context_from_parts(
        &method,
        &target,
        headers.iter().map(|(n, v)| (n.as_str(), v.as_slice())),
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/a/b"), "/a/b");
        assert_eq!(decode_path("/files/my%20doc.txt"), "/files/my doc.txt");
        assert_eq!(decode_path("/q%3Fx"), "/q?x");
        // Not valid UTF-8 once decoded.
        assert_eq!(decode_path("/bad/%FF"), "/bad/%FF");
    }

    #[test]
    fn test_context_from_parts() {
        let ctx = context_from_parts(
            "POST",
            "/users/J%C3%BCrgen?lang=de",
            [
                ("Content-Type", b"application/x-www-form-urlencoded".as_slice()),
                ("Cookie", b"sid=abc".as_slice()),
            ],
            b"name=x".to_vec(),
        )
        .unwrap();
        assert_eq!(ctx.method(), &Method::POST);
        assert_eq!(ctx.path(), "/users/Jürgen");
        assert_eq!(ctx.query("lang"), Some("de"));
        assert_eq!(ctx.query("name"), Some("x"));
        assert_eq!(ctx.cookie("sid"), Some("abc"));
        assert_eq!(ctx.header("content-type"), Some("application/x-www-form-urlencoded"));
    }

    #[test]
    fn test_invalid_method() {
        let err = context_from_parts("GE T", "/", std::iter::empty(), Vec::new()).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("GE T"));
        assert_eq!(
            RequestError::BodyTooLarge { limit: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
