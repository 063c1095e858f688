use std::collections::HashMap;
use std::fmt;

use http::Method;
use serde::{Deserialize, Serialize};

use crate::matcher::MatchedRouteCandidate;

/// A custom post-match check, evaluated after a candidate's path, rules,
/// and built-in constraints have all passed.
///
/// Implementations live in process memory only; they are attached via
/// [`RouteBuilder::custom_constraint`](crate::route::RouteBuilder::custom_constraint)
/// and are not part of the serialized trie. A failing custom constraint
/// rejects the candidate without contributing to the `allowed` method
/// set, so it produces not-found rather than method-not-allowed.
pub trait Constraint: Send + Sync + fmt::Debug {
    /// Returns `true` when the candidate may serve this request.
    fn passes(
        &self,
        candidate: &MatchedRouteCandidate,
        method: &Method,
        host: &str,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> bool;
}

/// A built-in, serializable post-match check.
///
/// Built-in constraints are stored on the route and survive the trie
/// cache round trip, unlike [`Constraint`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteConstraint {
    /// The request method must be one of `allowed`.
    ///
    /// `allowed` is kept uppercase, sorted, and deduplicated; when `GET`
    /// is allowed, `HEAD` is too. This is the only constraint whose
    /// failure feeds the method-not-allowed response.
    Method { allowed: Vec<String> },
    /// The request must have arrived over HTTPS, judged by the
    /// `x-forwarded-proto` header a fronting proxy sets.
    HttpsOnly,
    /// The request host (port ignored) must equal one of `hosts`, or
    /// match a leading-wildcard entry like `*.example.com`.
    Host { hosts: Vec<String> },
}

impl RouteConstraint {
    /// Builds a method constraint from HTTP methods, normalizing the
    /// allowed set: uppercase, `HEAD` implied by `GET`, sorted, deduped.
    pub fn methods(methods: &[Method]) -> Self {
        let mut allowed: Vec<String> = methods
            .iter()
            .map(|m| m.as_str().to_ascii_uppercase())
            .collect();
        if allowed.iter().any(|m| m == "GET") && !allowed.iter().any(|m| m == "HEAD") {
            allowed.push("HEAD".to_string());
        }
        allowed.sort_unstable();
        allowed.dedup();
        RouteConstraint::Method { allowed }
    }

    /// Builds a host allow-list constraint; entries are lowercased.
    pub fn hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RouteConstraint::Host {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Evaluates the constraint against a request.
    pub fn passes(&self, method: &Method, host: &str, headers: &HashMap<String, String>) -> bool {
        match self {
            RouteConstraint::Method { allowed } => {
                allowed.iter().any(|m| m == method.as_str())
            }
            RouteConstraint::HttpsOnly => header_value(headers, "x-forwarded-proto")
                .is_some_and(|proto| proto.eq_ignore_ascii_case("https")),
            RouteConstraint::Host { hosts } => {
                let request_host = strip_port(host).to_ascii_lowercase();
                hosts.iter().any(|allowed| host_matches(allowed, &request_host))
            }
        }
    }

    /// The allowed method names, when this is a method constraint.
    pub fn allowed_methods(&self) -> Option<&[String]> {
        match self {
            RouteConstraint::Method { allowed } => Some(allowed),
            _ => None,
        }
    }
}

/// `*.example.com` matches subdomains of `example.com` but not the apex.
fn host_matches(allowed: &str, request_host: &str) -> bool {
    if let Some(suffix) = allowed.strip_prefix("*.") {
        request_host
            .strip_suffix(suffix)
            .is_some_and(|prefix| prefix.ends_with('.') && prefix.len() > 1)
    } else {
        allowed == request_host
    }
}

/// Case-insensitive header lookup. Callers usually store lowercase keys,
/// so the exact-key probe wins without a scan.
pub(crate) fn header_value<'h>(
    headers: &'h HashMap<String, String>,
    name: &str,
) -> Option<&'h str> {
    if let Some(value) = headers.get(name) {
        return Some(value);
    }
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Strips a trailing `:port` from a host, leaving bracketed IPv6
/// literals intact.
pub(crate) fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((bare, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => bare,
        _ => host,
    }
}
