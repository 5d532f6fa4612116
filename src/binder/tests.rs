use super::*;
use crate::context::RequestContext;
use http::Method;
use serde_json::json;

fn ctx_with_path_param(name: &str, value: &str) -> RequestContext {
    let mut ctx = RequestContext::new(Method::GET, "/");
    ctx.set_param(name, value);
    ctx
}

#[test]
fn test_bind_path_int() {
    let ctx = ctx_with_path_param("id", "42");
    let params = [MethodParam::path("id", ParamKind::Int(IntWidth::I64)).required()];
    let args = bind(&params, &ctx).unwrap();
    assert_eq!(args.get::<i64>("id"), Some(42));
    assert_eq!(args.get::<u8>("id"), Some(42));
    assert_eq!(args.get::<String>("id"), None);
}

#[test]
fn test_missing_required_names_param() {
    let ctx = RequestContext::new(Method::GET, "/search");
    let params = [MethodParam::query("q", ParamKind::Str).required()];
    let err = bind(&params, &ctx).unwrap_err();
    assert_eq!(
        err,
        BindingError::Missing {
            name: "q".into(),
            source: ParamSource::Query
        }
    );
    assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    assert!(err.to_string().contains("'q'"));
}

#[test]
fn test_empty_value_is_missing() {
    let ctx = RequestContext::new(Method::GET, "/search?q=");
    let params = [MethodParam::query("q", ParamKind::Str).required()];
    assert!(matches!(bind(&params, &ctx), Err(BindingError::Missing { .. })));
}

#[test]
fn test_default_and_optional() {
    let ctx = RequestContext::new(Method::GET, "/list");
    let params = [
        MethodParam::query("page", ParamKind::Int(IntWidth::U32)).default_value("1"),
        MethodParam::query("filter", ParamKind::Str),
    ];
    let args = bind(&params, &ctx).unwrap();
    assert_eq!(args.len(), 2);
    assert_eq!(args.get::<u32>("page"), Some(1));
    assert_eq!(args.value("filter"), None);
}

#[test]
fn test_conversion_error_names_value_and_target() {
    let ctx = RequestContext::new(Method::GET, "/?limit=300");
    let params = [MethodParam::query("limit", ParamKind::Int(IntWidth::U8))];
    let err = bind(&params, &ctx).unwrap_err();
    match &err {
        BindingError::Conversion {
            name,
            value,
            target,
            ..
        } => {
            assert_eq!(name, "limit");
            assert_eq!(value, "300");
            assert_eq!(target, "u8");
        }
        other => panic!("unexpected error {other:?}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("limit") && msg.contains("300") && msg.contains("u8"));
}

#[test]
fn test_first_failure_stops_binding() {
    // "b" is missing and required, but "a" fails first and is reported.
    let ctx = RequestContext::new(Method::GET, "/?a=nope");
    let params = [
        MethodParam::query("a", ParamKind::Bool),
        MethodParam::query("b", ParamKind::Str).required(),
    ];
    assert_eq!(bind(&params, &ctx).unwrap_err().param(), "a");
}

#[test]
fn test_header_cookie_and_lookup_key() {
    let ctx = RequestContext::new(Method::GET, "/")
        .with_header("X-Auth-Token", "secret")
        .with_header("Cookie", "theme=dark; visits=3");
    let params = [
        MethodParam::header("token", ParamKind::Str).lookup_key("x-auth-token"),
        MethodParam::cookie("visits", ParamKind::Int(IntWidth::I32)),
        MethodParam::cookie("theme", ParamKind::Str),
    ];
    let args = bind(&params, &ctx).unwrap();
    assert_eq!(args.get::<String>("token").as_deref(), Some("secret"));
    assert_eq!(args.get::<i32>("visits"), Some(3));
    assert_eq!(args.get::<String>("theme").as_deref(), Some("dark"));
}

#[test]
fn test_body_json_and_list() {
    let ctx = RequestContext::new(Method::POST, "/pets").with_body(r#"{"name":"Rex"}"#);
    let params = [MethodParam::body("pet", ParamKind::Json).required()];
    let args = bind(&params, &ctx).unwrap();
    assert_eq!(args.get::<serde_json::Value>("pet"), Some(json!({"name": "Rex"})));

    let ctx = RequestContext::new(Method::POST, "/ids").with_body("[1,2,3]");
    let params = [MethodParam::body(
        "ids",
        ParamKind::List(Box::new(ParamKind::Int(IntWidth::I64))),
    )];
    let args = bind(&params, &ctx).unwrap();
    assert_eq!(args.get::<Vec<i64>>("ids"), Some(vec![1, 2, 3]));
}

#[test]
fn test_body_must_be_utf8() {
    let ctx = RequestContext::new(Method::POST, "/notes").with_body(vec![b'h', 0xff, 0xfe]);
    let params = [MethodParam::body("note", ParamKind::Str).required()];
    let err = bind(&params, &ctx).unwrap_err();
    assert_eq!(err.param(), "note");
    assert!(matches!(
        &err,
        BindingError::Conversion { reason, .. } if reason.contains("UTF-8")
    ));
    assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
}

#[test]
fn test_f32_underflow_rejected() {
    let ctx = RequestContext::new(Method::GET, "/?v=1e-50");
    let params = [MethodParam::query("v", ParamKind::Float(FloatWidth::F32))];
    let err = bind(&params, &ctx).unwrap_err();
    assert_eq!(err.param(), "v");
}

#[test]
fn test_query_list_and_float_width() {
    let ctx = RequestContext::new(Method::GET, "/?tags=a,b&ratio=1e40");
    let params = [MethodParam::query(
        "tags",
        ParamKind::List(Box::new(ParamKind::Str)),
    )];
    let args = bind(&params, &ctx).unwrap();
    assert_eq!(
        args.get::<Vec<String>>("tags"),
        Some(vec!["a".to_string(), "b".to_string()])
    );

    let f32_param = [MethodParam::query("ratio", ParamKind::Float(FloatWidth::F32))];
    assert!(bind(&f32_param, &ctx).is_err());
    let f64_param = [MethodParam::query("ratio", ParamKind::Float(FloatWidth::F64))];
    assert_eq!(bind(&f64_param, &ctx).unwrap().get::<f64>("ratio"), Some(1e40));
}

#[test]
fn test_time_binding() {
    let ctx = RequestContext::new(Method::GET, "/?since=2024-01-31");
    let params = [MethodParam::query("since", ParamKind::Time)];
    let args = bind(&params, &ctx).unwrap();
    let since: chrono::DateTime<chrono::FixedOffset> = args.get("since").unwrap();
    assert_eq!(since.to_rfc3339(), "2024-01-31T00:00:00+00:00");
}

#[test]
fn test_args_to_json() {
    let mut ctx = RequestContext::new(Method::GET, "/?tags=a,b&limit=5");
    ctx.set_param("id", "7");
    let params = [
        MethodParam::path("id", ParamKind::Int(IntWidth::U32)),
        MethodParam::query("tags", ParamKind::List(Box::new(ParamKind::Str))),
        MethodParam::query("limit", ParamKind::Float(FloatWidth::F64)),
        MethodParam::query("missing", ParamKind::Bool),
    ];
    let args = bind(&params, &ctx).unwrap();
    assert_eq!(
        args.to_json(),
        json!({"id": 7, "tags": ["a", "b"], "limit": 5.0, "missing": null})
    );
}

#[test]
fn test_kind_and_source_from_str() {
    assert_eq!("int".parse::<ParamKind>(), Ok(ParamKind::Int(IntWidth::I64)));
    assert_eq!("U8".parse::<ParamKind>(), Ok(ParamKind::Int(IntWidth::U8)));
    assert_eq!(
        "list<f32>".parse::<ParamKind>(),
        Ok(ParamKind::List(Box::new(ParamKind::Float(FloatWidth::F32))))
    );
    assert_eq!(
        "[string]".parse::<ParamKind>(),
        Ok(ParamKind::List(Box::new(ParamKind::Str)))
    );
    // Display output parses back.
    let kind = ParamKind::List(Box::new(ParamKind::Time));
    assert_eq!(kind.to_string().parse::<ParamKind>(), Ok(kind));
    assert!("decimal".parse::<ParamKind>().is_err());

    assert_eq!("Header".parse::<ParamSource>(), Ok(ParamSource::Header));
    assert!("session".parse::<ParamSource>().is_err());
}
