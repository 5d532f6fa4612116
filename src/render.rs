//! Render step: turns a handler [`Outcome`] into the response.

use crate::context::RequestContext;
use crate::dispatcher::DispatchError;
use crate::handler::Outcome;
use serde_json::json;
use tracing::warn;

/// Write `outcome` into the context's response.
///
/// Bodies are only written when the handler has not already started the
/// response itself. Error values render as `{"error": message}` with their
/// own status (500 by default); redirect and status results set their
/// declared status directly.
///
/// # Errors
///
/// Returns [`DispatchError::RenderError`] when the value cannot be
/// serialized into a body.
pub fn render(outcome: Outcome, ctx: &mut RequestContext) -> Result<(), DispatchError> {
    let started = ctx.response().is_started();
    match outcome {
        Outcome::Void | Outcome::Rendered => Ok(()),
        Outcome::Json(value) => {
            if !started {
                ctx.write_json(&value)
                    .map_err(|e| DispatchError::RenderError {
                        message: e.to_string(),
                    })?;
            }
            Ok(())
        }
        Outcome::Text(text) => {
            if !started {
                ctx.write_text(&text);
            }
            Ok(())
        }
        Outcome::Status(status) => {
            ctx.set_status(status);
            Ok(())
        }
        Outcome::Redirect { status, location } => {
            ctx.redirect(status, &location);
            Ok(())
        }
        Outcome::Error(err) => {
            warn!(
                request_id = %ctx.request_id(),
                status = err.status().as_u16(),
                error = %err,
                "Handler returned error"
            );
            if !started {
                ctx.response_mut()
                    .write_json(err.status(), &json!({ "error": err.message }))
                    .map_err(|e| DispatchError::RenderError {
                        message: e.to_string(),
                    })?;
            }
            Ok(())
        }
        Outcome::Unserializable(message) => Err(DispatchError::RenderError { message }),
    }
}
