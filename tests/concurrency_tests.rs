//! Dispatch from many coroutines while routes and filters are registered
//!
//! Readers work on immutable snapshots of the route table and filter chain,
//! so in-flight requests must never observe a half-applied registration.

mod common;

use common::test_server::setup_may_runtime;
use hiverouter::binder::{Args, IntWidth, MethodParam, ParamKind};
use hiverouter::context::RequestContext;
use hiverouter::dispatcher::Dispatcher;
use hiverouter::filter::{FilterChain, FilterPosition};
use hiverouter::router::{Endpoint, Router};
use http::{Method, StatusCode};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

const WORKERS: usize = 8;
const REQUESTS_PER_WORKER: usize = 200;

fn items_dispatcher() -> Arc<Dispatcher> {
    let router = Arc::new(Router::new());
    router
        .get(
            "/items/:id:int",
            Endpoint::new(|_: &mut RequestContext, args: &Args| {
                json!({ "id": args.get::<u64>("id") })
            })
            .with_params(vec![
                MethodParam::path("id", ParamKind::Int(IntWidth::U64)).required(),
            ]),
        )
        .unwrap();
    Arc::new(Dispatcher::new(router).with_filters(Arc::new(FilterChain::new())))
}

#[test]
fn test_dispatch_during_registration() {
    setup_may_runtime();
    let dispatcher = items_dispatcher();
    let results: Arc<Mutex<Vec<(u64, u16, Value)>>> = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for worker in 0..WORKERS {
        let dispatcher = Arc::clone(&dispatcher);
        let results = Arc::clone(&results);
        // SAFETY: the coroutine owns everything it touches and is joined
        // before the test returns.
        let handle = unsafe {
            may::coroutine::Builder::new()
                .stack_size(may::config().get_stack_size())
                .spawn(move || {
                    for i in 0..REQUESTS_PER_WORKER {
                        let id = (worker * REQUESTS_PER_WORKER + i) as u64;
                        let mut ctx =
                            RequestContext::new(Method::GET, &format!("/items/{id}"));
                        let report = dispatcher.dispatch(&mut ctx);
                        let body: Value =
                            serde_json::from_slice(ctx.response().body()).unwrap();
                        results.lock().push((id, report.status.as_u16(), body));
                        may::coroutine::yield_now();
                    }
                })
                .unwrap()
        };
        handles.push(handle);
    }

    for n in 0..50 {
        dispatcher
            .router()
            .get(
                &format!("/extra/{n}"),
                Endpoint::new(move |_: &mut RequestContext, _: &Args| json!({ "extra": n })),
            )
            .unwrap();
        dispatcher
            .filters()
            .insert(
                &format!("/extra/{n}"),
                FilterPosition::AfterExec,
                |ctx: &mut RequestContext| ctx.response_mut().set_header("X-Extra", "1"),
            )
            .unwrap();
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let results = results.lock();
    assert_eq!(results.len(), WORKERS * REQUESTS_PER_WORKER);
    for (id, status, body) in results.iter() {
        assert_eq!(*status, 200);
        assert_eq!(body, &json!({ "id": id }));
    }

    assert_eq!(dispatcher.router().len(), 51);
    let mut ctx = RequestContext::new(Method::GET, "/extra/49");
    assert_eq!(dispatcher.dispatch(&mut ctx).status, StatusCode::OK);
    assert_eq!(ctx.response().header("x-extra"), Some("1"));
}

#[test]
fn test_stats_are_counted_across_coroutines() {
    setup_may_runtime();
    let dispatcher = items_dispatcher();

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            // SAFETY: joined below.
            unsafe {
                may::coroutine::Builder::new()
                    .spawn(move || {
                        for i in 0..REQUESTS_PER_WORKER {
                            let mut ctx =
                                RequestContext::new(Method::GET, &format!("/items/{i}"));
                            dispatcher.dispatch(&mut ctx);
                        }
                        let mut ctx = RequestContext::new(Method::GET, "/items/abc");
                        dispatcher.dispatch(&mut ctx);
                    })
                    .unwrap()
            }
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = dispatcher.stats().snapshot();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].pattern, "/items/:id:int");
    assert_eq!(stats[0].count, (WORKERS * REQUESTS_PER_WORKER) as u64);
    assert_eq!(stats[0].errors, 0);
}
