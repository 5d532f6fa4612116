use super::request::{build_context, DEFAULT_MAX_BODY_BYTES};
use super::response::{write_error, write_response};
use crate::dispatcher::Dispatcher;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use tracing::warn;

/// `may_minihttp` service running every request through a [`Dispatcher`].
///
/// Cloned once per connection; clones share the dispatcher, so routes and
/// filters registered at runtime are visible to every connection.
#[derive(Clone)]
pub struct AppService {
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: usize,
}

impl AppService {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Reject request bodies larger than `limit` bytes with 413.
    #[must_use]
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let mut ctx = match build_context(req, self.max_body_bytes) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!(error = %e, status = e.status().as_u16(), "Rejected request");
                write_error(res, e.status(), &e.to_string());
                return Ok(());
            }
        };

        self.dispatcher.dispatch(&mut ctx);
        write_response(res, ctx.response_mut());
        Ok(())
    }
}
