//! Integration tests for the HTTP adapter
//!
//! Each test starts a real `may_minihttp` server on a free local port and
//! talks to it over a raw TCP connection, covering:
//! - Routing, parameter binding and JSON rendering end to end
//! - 404 / 405 error bodies and the `Allow` header
//! - Filters aborting before the router
//! - Handler panics contained as 500
//! - Percent-decoded paths, form bodies and the body size limit
//! - Static directories
//! - Responses with more headers than the server has slots for

mod common;

use common::http::{get, send_request};
use common::temp_files::create_static_dir;
use common::test_server::{start, start_service};
use hiverouter::binder::{Args, IntWidth, MethodParam, ParamKind};
use hiverouter::context::RequestContext;
use hiverouter::dispatcher::Dispatcher;
use hiverouter::filter::{FilterChain, FilterPosition};
use hiverouter::handler::Json;
use hiverouter::router::{Endpoint, Router};
use hiverouter::server::AppService;
use hiverouter::static_files::StaticDirs;
use http::StatusCode;
use serde_json::json;
use std::sync::Arc;

fn petstore_dispatcher() -> Dispatcher {
    let router = Arc::new(Router::new());
    router
        .get(
            "/pets/:id:int",
            Endpoint::new(|_: &mut RequestContext, args: &Args| {
                json!({ "id": args.get::<u64>("id"), "name": "Rex" })
            })
            .with_params(vec![
                MethodParam::path("id", ParamKind::Int(IntWidth::U64)).required(),
            ])
            .with_name("pet"),
        )
        .unwrap();
    router
        .post(
            "/pets",
            Endpoint::new(|ctx: &mut RequestContext, args: &Args| {
                ctx.set_status(StatusCode::CREATED);
                Json(json!({ "created": args.get::<String>("name") }))
            })
            .with_params(vec![MethodParam::query("name", ParamKind::Str).required()]),
        )
        .unwrap();
    router
        .put(
            "/pets/:id",
            Endpoint::new(|_: &mut RequestContext, _: &Args| StatusCode::NO_CONTENT),
        )
        .unwrap();
    router
        .get(
            "/files/*",
            Endpoint::new(|ctx: &mut RequestContext, _: &Args| {
                format!("file={}", ctx.param("splat").unwrap_or_default())
            }),
        )
        .unwrap();
    router
        .get(
            "/admin/stats",
            Endpoint::new(|_: &mut RequestContext, _: &Args| json!({ "admin": true })),
        )
        .unwrap();
    router
        .get(
            "/boom",
            Endpoint::new(|_: &mut RequestContext, _: &Args| -> &'static str {
                panic!("database exploded")
            }),
        )
        .unwrap();

    let filters = Arc::new(FilterChain::new());
    filters
        .insert("/admin/*", FilterPosition::BeforeRouter, |ctx: &mut RequestContext| {
            if ctx.header("x-token") != Some("secret") {
                ctx.abort(StatusCode::UNAUTHORIZED, "missing token");
            }
        })
        .unwrap();
    filters
        .insert("/*", FilterPosition::AfterExec, |ctx: &mut RequestContext| {
            ctx.response_mut().set_header("X-Powered-By", "hiverouter");
        })
        .unwrap();

    Dispatcher::new(router).with_filters(filters)
}

#[test]
fn test_route_bind_and_render() {
    let handle = start(petstore_dispatcher());
    let resp = get(handle.addr(), "/pets/42");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type"), Some("application/json"));
    assert_eq!(resp.header("x-powered-by"), Some("hiverouter"));
    assert_eq!(resp.json(), json!({"id": 42, "name": "Rex"}));
    handle.stop();
}

#[test]
fn test_not_found_and_method_not_allowed() {
    let handle = start(petstore_dispatcher());
    let addr = handle.addr();

    let resp = get(addr, "/nothing/here");
    assert_eq!(resp.status, 404);
    assert_eq!(resp.json()["error"], "Not Found");
    assert_eq!(resp.json()["path"], "/nothing/here");

    // `/pets/:id:int` is GET-only, `/pets/:id` is PUT-only.
    let resp = send_request(addr, "DELETE", "/pets/7", &[], b"");
    assert_eq!(resp.status, 405);
    assert_eq!(resp.header("allow"), Some("GET, PUT"));

    let resp = send_request(addr, "PUT", "/pets/7", &[], b"");
    assert_eq!(resp.status, 204);
    handle.stop();
}

#[test]
fn test_filter_abort_before_router() {
    let handle = start(petstore_dispatcher());
    let addr = handle.addr();

    let resp = get(addr, "/admin/stats");
    assert_eq!(resp.status, 401);
    assert_eq!(resp.json(), json!({"error": "missing token"}));

    let resp = send_request(addr, "GET", "/admin/stats", &[("X-Token", "secret")], b"");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json(), json!({"admin": true}));
    handle.stop();
}

#[test]
fn test_handler_panic_is_500() {
    let handle = start(petstore_dispatcher());
    let addr = handle.addr();

    let resp = get(addr, "/boom");
    assert_eq!(resp.status, 500);
    assert_eq!(resp.json()["error"], "Internal Server Error");
    assert!(!resp.text().contains("database exploded"));

    // The server keeps serving after a fault.
    assert_eq!(get(addr, "/pets/1").status, 200);
    handle.stop();
}

#[test]
fn test_binding_errors_are_400() {
    let handle = start(petstore_dispatcher());
    let resp = send_request(handle.addr(), "POST", "/pets", &[], b"");
    assert_eq!(resp.status, 400);
    assert_eq!(resp.json()["param"], "name");
    handle.stop();
}

#[test]
fn test_form_body_and_decoded_path() {
    let handle = start(petstore_dispatcher());
    let addr = handle.addr();

    let resp = send_request(
        addr,
        "POST",
        "/pets",
        &[("Content-Type", "application/x-www-form-urlencoded")],
        b"name=Fido+Jr",
    );
    assert_eq!(resp.status, 201);
    assert_eq!(resp.json(), json!({"created": "Fido Jr"}));

    let resp = get(addr, "/files/annual%20report/2024.pdf");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.text(), "file=annual report/2024.pdf");
    handle.stop();
}

#[test]
fn test_body_size_limit() {
    let service = AppService::new(Arc::new(petstore_dispatcher())).with_max_body_bytes(16);
    let handle = start_service(service);
    let resp = send_request(
        handle.addr(),
        "POST",
        "/pets",
        &[("Content-Type", "application/x-www-form-urlencoded")],
        &[b'a'; 64],
    );
    assert_eq!(resp.status, 413);
    assert!(resp.json()["error"].as_str().unwrap().contains("16"));
    handle.stop();
}

#[test]
fn test_static_directory() {
    let dir = create_static_dir();
    let mut statics = StaticDirs::new();
    statics.mount("/static", dir.path());
    let handle = start(petstore_dispatcher().with_static_dirs(statics));
    let addr = handle.addr();

    let resp = get(addr, "/static/hello.txt");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(resp.text(), "Hello, static!\n");

    let resp = get(addr, "/static/js/app.js");
    assert_eq!(resp.header("content-type"), Some("application/javascript"));

    assert_eq!(get(addr, "/static/../Cargo.toml").status, 404);
    assert_eq!(get(addr, "/static/missing.txt").status, 404);
    handle.stop();
}

#[test]
fn test_many_response_headers_all_sent() {
    let router = Arc::new(Router::new());
    router
        .get(
            "/many",
            Endpoint::new(|ctx: &mut RequestContext, _: &Args| {
                for i in 0..24 {
                    ctx.response_mut().set_header(&format!("X-Item-{i}"), i.to_string());
                }
                "ok"
            }),
        )
        .unwrap();
    let handle = start(Dispatcher::new(router));

    let resp = get(handle.addr(), "/many");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.text(), "ok");
    for i in 0..24 {
        let expected = i.to_string();
        assert_eq!(resp.header(&format!("x-item-{i}")), Some(expected.as_str()));
    }
    handle.stop();
}
