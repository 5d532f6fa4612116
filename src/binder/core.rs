use super::error::BindingError;
use super::parsers::{parse, parse_json_list};
use super::types::{Args, MethodParam, ParamKind, ParamSource};
use crate::context::RequestContext;
use std::borrow::Cow;
use tracing::debug;

fn raw_value<'a>(
    param: &MethodParam,
    ctx: &'a RequestContext,
) -> Result<Option<Cow<'a, str>>, BindingError> {
    let key = param.key();
    let raw = match param.source() {
        ParamSource::Path => ctx.param(key).map(Cow::Borrowed),
        ParamSource::Query => ctx.query(key).map(Cow::Borrowed),
        ParamSource::Header => ctx.header(key).map(Cow::Borrowed),
        ParamSource::Cookie => ctx.cookie(key).map(Cow::Borrowed),
        ParamSource::Body => match std::str::from_utf8(ctx.body()) {
            Ok(body) => Some(Cow::Borrowed(body)),
            Err(e) => {
                return Err(BindingError::Conversion {
                    name: param.name().to_string(),
                    value: String::from_utf8_lossy(ctx.body()).into_owned(),
                    target: param.kind().to_string(),
                    reason: format!("body is not valid UTF-8: {e}"),
                })
            }
        },
    };
    // An empty value is treated as absent.
    Ok(raw.filter(|v| !v.is_empty()))
}

/// Resolve and convert every declared parameter.
///
/// For each [`MethodParam`] in order: read the raw value from its source;
/// fall back to the default when absent; fail with
/// [`BindingError::Missing`] when absent, required and without default;
/// otherwise convert with the parser for its [`ParamKind`]. The first
/// failure stops binding, later parameters are not looked at.
///
/// # Errors
///
/// Returns the first [`BindingError`] encountered.
pub fn bind(params: &[MethodParam], ctx: &RequestContext) -> Result<Args, BindingError> {
    let mut args = Args::new();
    for param in params {
        let raw = match raw_value(param, ctx)? {
            Some(raw) => raw,
            None => match param.default() {
                Some(default) => Cow::Borrowed(default),
                None if param.is_required() => {
                    debug!(
                        param = %param.name(),
                        source = %param.source(),
                        "Required parameter missing"
                    );
                    return Err(BindingError::Missing {
                        name: param.name().to_string(),
                        source: param.source(),
                    });
                }
                None => {
                    args.push(param.name_arc(), None);
                    continue;
                }
            },
        };

        let parsed = match (param.source(), param.kind()) {
            (ParamSource::Body, ParamKind::List(inner)) => parse_json_list(inner, &raw),
            (_, kind) => parse(kind, &raw),
        };
        match parsed {
            Ok(value) => args.push(param.name_arc(), Some(value)),
            Err(reason) => {
                debug!(
                    param = %param.name(),
                    value = %raw,
                    target = %param.kind(),
                    reason = %reason,
                    "Parameter conversion failed"
                );
                return Err(BindingError::Conversion {
                    name: param.name().to_string(),
                    value: raw.into_owned(),
                    target: param.kind().to_string(),
                    reason,
                });
            }
        }
    }
    Ok(args)
}
