//! Declarative configuration served over HTTP
//!
//! Loads YAML and TOML files from disk, builds the dispatcher they describe
//! and drives it through a real server.

mod common;

use common::http::{get, send_request};
use common::temp_files::{create_static_dir, create_temp_config};
use common::test_server::start;
use hiverouter::config::RouterConfig;
use serde_json::json;

fn yaml_config(static_dir: &std::path::Path) -> String {
    format!(
        r#"
case_sensitive: false
stats_path: /_stats
static_dirs:
  /assets: {dir}
routes:
  - pattern: /items/:id:int
    name: item
    params:
      - {{ name: id, source: path, kind: u64, required: true }}
      - {{ name: fields, kind: "list<string>" }}
  - method: POST
    pattern: /items
    params:
      - {{ name: name, source: form, kind: string, required: true }}
    reply: {{ type: json, status: 201, body: {{ created: true }} }}
  - method: "*"
    pattern: /ping
    reply: {{ type: text, body: pong }}
  - pattern: /legacy/*
    reply: {{ type: redirect, location: /items/1 }}
"#,
        dir = static_dir.display()
    )
}

#[test]
fn test_yaml_config_end_to_end() {
    let assets = create_static_dir();
    let (_dir, path) = create_temp_config("hive.yaml", &yaml_config(assets.path()));
    let config = RouterConfig::load(&path).unwrap();
    let handle = start(config.build_dispatcher().unwrap());
    let addr = handle.addr();

    let resp = get(addr, "/Items/7?fields=a,b");
    assert_eq!(resp.status, 200);
    let body = resp.json();
    assert_eq!(body["route"], "/items/:id:int");
    assert_eq!(body["args"], json!({"id": 7, "fields": ["a", "b"]}));

    let resp = send_request(
        addr,
        "POST",
        "/items",
        &[("Content-Type", "application/x-www-form-urlencoded")],
        b"name=lamp",
    );
    assert_eq!(resp.status, 201);
    assert_eq!(resp.json(), json!({"created": true}));

    let resp = send_request(addr, "PATCH", "/ping", &[], b"");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.text(), "pong");

    let resp = get(addr, "/legacy/anything");
    assert_eq!(resp.status, 302);
    assert_eq!(resp.header("location"), Some("/items/1"));

    let resp = get(addr, "/assets/hello.txt");
    assert_eq!(resp.text(), "Hello, static!\n");

    let resp = get(addr, "/_stats");
    assert_eq!(resp.status, 200);
    let stats = resp.json();
    assert!(stats
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s["pattern"] == "/items/:id:int" && s["count"] == 1));
    handle.stop();
}

#[test]
fn test_toml_config_missing_required_param() {
    let (_dir, path) = create_temp_config(
        "hive.toml",
        r#"
[dispatch]
expose_fault_details = false

[[routes]]
method = "GET"
pattern = "/search"

[[routes.params]]
name = "q"
required = true
"#,
    );
    let dispatcher = RouterConfig::load(&path)
        .unwrap()
        .build_dispatcher()
        .unwrap();
    let handle = start(dispatcher);

    let resp = get(handle.addr(), "/search");
    assert_eq!(resp.status, 400);
    assert_eq!(resp.json()["param"], "q");

    let resp = get(handle.addr(), "/search?q=rust");
    assert_eq!(resp.json()["args"], json!({"q": "rust"}));
    handle.stop();
}

#[test]
fn test_invalid_config_names_the_route() {
    let (_dir, path) = create_temp_config(
        "hive.yaml",
        "routes:\n  - pattern: /ok\n  - method: \"GE T\"\n    pattern: /coffee\n",
    );
    let config = RouterConfig::load(&path).unwrap();
    let err = config.build_dispatcher().unwrap_err();
    assert!(format!("{err:#}").contains("/coffee"));
}
