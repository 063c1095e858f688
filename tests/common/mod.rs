#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Once;

use http::Method;
use routrie::{
    Route, RouteBuilder, RouteCollection, RouteMatcher, RouteMatchingResult, RuleRegistry,
    TrieCompiler,
};

static TRACING: Once = Once::new();

/// Installs a global fmt subscriber once, honoring `RUST_LOG`, so a
/// failing test comes with the router's own log output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Builds a matcher over `routes` with the built-in rule registry.
pub fn matcher_for(routes: impl IntoIterator<Item = Route>) -> RouteMatcher {
    let collection: RouteCollection = routes.into_iter().collect();
    let registry = RuleRegistry::with_builtin_rules();
    let trie = TrieCompiler::new(&registry)
        .compile(&collection)
        .expect("failed to compile routes");
    RouteMatcher::new(trie, &registry).expect("failed to build matcher")
}

pub fn get(path: &str, handler: &str) -> Route {
    RouteBuilder::get(path, handler)
        .build()
        .expect("invalid route template")
}

pub fn no_headers() -> HashMap<String, String> {
    HashMap::new()
}

/// Asserts that `method path` resolves to `expected_handler` and returns the
/// captured variables for further checks.
pub fn assert_match(
    matcher: &RouteMatcher,
    method: Method,
    path: &str,
    expected_handler: &str,
) -> HashMap<String, String> {
    let result = matcher
        .match_route(&method, "example.com", path, &no_headers())
        .expect("match_route failed");
    match result {
        RouteMatchingResult::Match(candidate) => {
            assert_eq!(
                candidate.route.handler().as_str(),
                expected_handler,
                "handler mismatch for {method} {path}"
            );
            candidate.route_variables
        }
        other => panic!("expected {method} {path} to match, got {other:?}"),
    }
}

pub fn assert_not_found(matcher: &RouteMatcher, method: Method, path: &str) {
    let result = matcher
        .match_route(&method, "example.com", path, &no_headers())
        .expect("match_route failed");
    assert!(
        matches!(result, RouteMatchingResult::NotFound),
        "expected {method} {path} to be not-found, got {result:?}"
    );
}

/// Asserts a method-not-allowed outcome advertising exactly `allowed`.
pub fn assert_method_not_allowed(
    matcher: &RouteMatcher,
    method: Method,
    path: &str,
    allowed: &[Method],
) {
    let result = matcher
        .match_route(&method, "example.com", path, &no_headers())
        .expect("match_route failed");
    match result {
        RouteMatchingResult::MethodNotAllowed { allowed: actual } => {
            let mut actual: Vec<String> = actual.iter().map(|m| m.to_string()).collect();
            actual.sort();
            let mut expected: Vec<String> = allowed.iter().map(|m| m.to_string()).collect();
            expected.sort();
            assert_eq!(
                actual, expected,
                "allowed methods mismatch for {method} {path}"
            );
        }
        other => panic!("expected {method} {path} to be method-not-allowed, got {other:?}"),
    }
}
