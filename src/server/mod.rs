//! HTTP adapter over `may_minihttp`.
//!
//! Each request is read into a [`RequestContext`](crate::context::RequestContext)
//! (percent-decoded path, lowercased headers, body up to a size limit), run
//! through the [`Dispatcher`](crate::dispatcher::Dispatcher) and the
//! resulting response copied back to the connection.

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{context_from_parts, decode_path, RequestError, DEFAULT_MAX_BODY_BYTES};
pub use response::{canonical_reason, header_line, MAX_INTERNED_HEADERS, RESPONSE_HEADER_SLOTS};
pub use service::AppService;
