//! Unit tests for CLI commands

use crate::cli::{run, Cli, Commands};
use clap::Parser;
use std::fs;

const CONFIG: &str = r#"
routes:
  - pattern: /users/:id:int
    name: user
    params:
      - { name: id, source: path, kind: u32, required: true }
  - method: DELETE
    pattern: /items/:id
    reply: { type: status, status: 204 }
"#;

fn run_to_string(args: &[&str]) -> (anyhow::Result<bool>, String) {
    let cli = Cli::try_parse_from(args).unwrap();
    let mut out = Vec::new();
    let result = run(&cli, &mut out);
    (result, String::from_utf8(out).unwrap())
}

#[test]
fn test_parse_match_command() {
    let cli = Cli::try_parse_from(["hiverouter", "match", "/a/:b", "/a/1", "--case-insensitive"])
        .unwrap();
    match cli.command {
        Commands::Match {
            pattern,
            path,
            case_insensitive,
        } => {
            assert_eq!(pattern, "/a/:b");
            assert_eq!(path, "/a/1");
            assert!(case_insensitive);
        }
        _ => panic!("Expected Match command"),
    }
}

#[test]
fn test_match_prints_params() {
    let (result, out) = run_to_string(&["hiverouter", "match", "/users/:id:int/*", "/users/7/a/b"]);
    assert!(result.unwrap());
    assert!(out.starts_with("match"));
    assert!(out.contains("id = 7"));
    assert!(out.contains("splat = a/b"));

    let (result, out) = run_to_string(&["hiverouter", "match", "/users/:id:int", "/users/x"]);
    assert!(!result.unwrap());
    assert_eq!(out.trim(), "no match");
}

#[test]
fn test_match_rejects_bad_pattern() {
    let (result, _) = run_to_string(&["hiverouter", "match", "/a/{b", "/a/1"]);
    assert!(result.is_err());
}

#[test]
fn test_routes_listing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hive.yaml");
    fs::write(&path, CONFIG).unwrap();
    let config = path.to_str().unwrap();

    let (result, out) = run_to_string(&["hiverouter", "routes", "--config", config]);
    assert!(result.unwrap());
    assert!(out.contains("/users/:id:int"));
    assert!(out.contains("user"));
    assert!(out.contains("DELETE"));

    let (_, out) = run_to_string(&["hiverouter", "routes", "--config", config, "--json"]);
    let routes: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(routes.as_array().unwrap().len(), 2);
}

#[test]
fn test_request_command() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hive.yaml");
    fs::write(&path, CONFIG).unwrap();
    let config = path.to_str().unwrap();

    let (result, out) = run_to_string(&["hiverouter", "request", "--config", config, "/users/9"]);
    assert!(result.unwrap());
    assert!(out.starts_with("200 OK"));
    assert!(out.contains(r#""args":{"id":9}"#));

    let (result, out) =
        run_to_string(&["hiverouter", "request", "--config", config, "-X", "post", "/users/9"]);
    assert!(!result.unwrap());
    assert!(out.starts_with("405"));
    assert!(out.contains("Allow: GET"));

    let (result, out) =
        run_to_string(&["hiverouter", "request", "-c", config, "-X", "POST", "/items/3?_method=DELETE"]);
    assert!(result.unwrap());
    assert!(out.starts_with("204"));
}
