//! # Matcher Module
//!
//! Iterative trie matching with bounded backtracking. The matcher walks
//! a [`CompiledTrie`] one path segment at a time, preferring literal
//! edges over variable edges, and evaluates rules, host patterns, and
//! constraints only when it reaches a terminal node.
//!
//! ## Walk order
//!
//! At each node the current segment is tried against the literal child
//! first. When the node also has a variable child, that branch is
//! recorded as a choice point; a dead end (no edge, or a terminal whose
//! rules or constraints reject the candidate) pops the newest choice
//! point and resumes down the variable edge. The stack is explicit and
//! at most one choice point deep per path segment, so matching cost is
//! bounded by the path length, not the route count.
//!
//! ## Not-found versus method-not-allowed
//!
//! Candidates whose path matched but whose method constraint failed
//! contribute their allowed methods to a set; when the walk exhausts
//! every branch the result is
//! [`RouteMatchingResult::MethodNotAllowed`] if that set is non-empty
//! and [`RouteMatchingResult::NotFound`] otherwise. Only the method
//! constraint feeds the set; a candidate rejected by a rule, host, or
//! HTTPS check reports not-found, which avoids advertising methods the
//! client cannot actually use.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use http::Method;
//! use routrie::matcher::{RouteMatcher, RouteMatchingResult};
//! use routrie::route::{RouteBuilder, RouteCollection};
//! use routrie::rules::RuleRegistry;
//! use routrie::trie::TrieCompiler;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut routes = RouteCollection::new();
//! routes.add(RouteBuilder::get("/users/:id(int)", "users.show").build()?);
//!
//! let registry = RuleRegistry::with_builtin_rules();
//! let trie = TrieCompiler::new(&registry).compile(&routes)?;
//! let matcher = RouteMatcher::new(trie, &registry)?;
//!
//! let result = matcher.match_route(&Method::GET, "example.com", "/users/42", &HashMap::new())?;
//! match result {
//!     RouteMatchingResult::Match(candidate) => {
//!         assert_eq!(candidate.variable("id"), Some("42"));
//!         assert_eq!(candidate.route.handler().as_str(), "users.show");
//!     }
//!     other => panic!("expected a match, got {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;
use tracing::debug;

use crate::rules::{Rule, RuleError, RuleRegistry};
use crate::trie::{CompiledRoute, CompiledTrie, RouteEntry, TrieNode};

/// Paths with at most this many segments match without heap allocation
/// for the segment and captured-value buffers.
pub const MAX_INLINE_SEGMENTS: usize = 8;

type SegmentVec<'p> = SmallVec<[&'p str; MAX_INLINE_SEGMENTS]>;

/// Rule instances for one terminal, grouped per variable in path order
type EntryRules = Vec<Vec<Box<dyn Rule>>>;

/// A successful match: the compiled route plus every variable bound
/// from the path, the host, or template defaults.
#[derive(Debug, Clone)]
pub struct MatchedRouteCandidate {
    pub route: Arc<CompiledRoute>,
    pub route_variables: HashMap<String, String>,
}

impl MatchedRouteCandidate {
    /// Looks up one bound variable. Path bindings shadow host bindings
    /// of the same name, and defaults fill only unbound names.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.route_variables.get(name).map(String::as_str)
    }
}

/// Outcome of matching one request
#[derive(Debug, Clone)]
pub enum RouteMatchingResult {
    /// A route matched; dispatch to its handler
    Match(MatchedRouteCandidate),
    /// Some route matched the path but not the method: respond 405
    /// with an `Allow` header built from `allowed`
    MethodNotAllowed { allowed: HashSet<Method> },
    /// Nothing matched: respond 404
    NotFound,
}

impl RouteMatchingResult {
    pub fn is_match(&self) -> bool {
        matches!(self, RouteMatchingResult::Match(_))
    }

    pub fn candidate(&self) -> Option<&MatchedRouteCandidate> {
        match self {
            RouteMatchingResult::Match(candidate) => Some(candidate),
            _ => None,
        }
    }

    pub fn into_candidate(self) -> Option<MatchedRouteCandidate> {
        match self {
            RouteMatchingResult::Match(candidate) => Some(candidate),
            _ => None,
        }
    }

    /// The methods a 405 response should advertise; `None` unless this
    /// is [`RouteMatchingResult::MethodNotAllowed`].
    pub fn allowed_methods(&self) -> Option<&HashSet<Method>> {
        match self {
            RouteMatchingResult::MethodNotAllowed { allowed } => Some(allowed),
            _ => None,
        }
    }
}

/// The request path was not matchable at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    InvalidPath {
        path: String,
        reason: &'static str,
    },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::InvalidPath { path, reason } => {
                write!(f, "invalid request path `{path}`: {reason}")
            }
        }
    }
}

impl std::error::Error for MatchError {}

/// A deferred variable branch recorded during the walk
struct ChoicePoint<'m> {
    node: &'m TrieNode,
    segment_index: usize,
    values_len: usize,
}

/// The request fields a terminal evaluation needs, bundled to keep
/// signatures flat.
struct RequestView<'q> {
    method: &'q Method,
    host: &'q str,
    path: &'q str,
    headers: &'q HashMap<String, String>,
}

/// Matches request paths against a compiled trie.
///
/// Construction instantiates every rule the trie references exactly
/// once, via the registry, so per-request matching never touches rule
/// factories. The matcher is immutable and `Send + Sync`; share it
/// behind an `Arc` (see [`SharedMatcher`](crate::factory::SharedMatcher)
/// for hot-swappable sharing).
pub struct RouteMatcher {
    root: TrieNode,
    routes: Vec<Arc<CompiledRoute>>,
    /// Indexed by [`RouteEntry::entry`]; `None` for ids that were
    /// displaced by a later registration
    rules: Vec<Option<EntryRules>>,
    fingerprint: String,
}

impl fmt::Debug for RouteMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatcher")
            .field("routes", &self.routes.len())
            .field("nodes", &self.root.node_count())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl RouteMatcher {
    /// Builds a matcher from a compiled trie, instantiating its rules
    /// from `registry`.
    ///
    /// Fails when the trie references a rule the registry does not
    /// know, which happens when a cached trie was compiled against a
    /// richer registry than the current process configured.
    pub fn new(trie: CompiledTrie, registry: &RuleRegistry) -> Result<Self, RuleError> {
        let mut rules: Vec<Option<EntryRules>> = Vec::new();
        rules.resize_with(trie.entries as usize, || None);
        instantiate_rules(&trie.root, registry, &mut rules)?;
        Ok(Self {
            root: trie.root,
            routes: trie.routes.into_iter().map(Arc::new).collect(),
            rules,
            fingerprint: trie.fingerprint,
        })
    }

    /// Fingerprint of the route set this matcher was compiled from
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Matches one request.
    ///
    /// `path` must be non-empty and start with `/`; anything else is an
    /// [`MatchError::InvalidPath`], distinct from a clean not-found.
    /// Empty segments collapse, so `/users//42/` matches `/users/:id`.
    pub fn match_route(
        &self,
        method: &Method,
        host: &str,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> Result<RouteMatchingResult, MatchError> {
        if path.is_empty() {
            return Err(MatchError::InvalidPath {
                path: path.to_string(),
                reason: "path must not be empty",
            });
        }
        if !path.starts_with('/') {
            return Err(MatchError::InvalidPath {
                path: path.to_string(),
                reason: "path must start with `/`",
            });
        }

        let request = RequestView {
            method,
            host,
            path,
            headers,
        };
        let segments: SegmentVec<'_> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        let mut allowed: HashSet<Method> = HashSet::new();
        let mut values: SegmentVec<'_> = SmallVec::new();
        let mut pending: SmallVec<[ChoicePoint<'_>; 4]> = SmallVec::new();
        let mut node = &self.root;
        let mut index = 0usize;

        loop {
            let dead_end = if index == segments.len() {
                if let Some(entry) = node.route() {
                    if let Some(candidate) = self.evaluate(entry, &values, &request, &mut allowed)
                    {
                        return Ok(RouteMatchingResult::Match(candidate));
                    }
                }
                true
            } else {
                let segment = segments[index];
                match (node.literal_child(segment), node.variable_child()) {
                    (Some(literal), variable) => {
                        if let Some(variable) = variable {
                            pending.push(ChoicePoint {
                                node: variable,
                                segment_index: index,
                                values_len: values.len(),
                            });
                        }
                        node = literal;
                        index += 1;
                        false
                    }
                    (None, Some(variable)) => {
                        values.push(segment);
                        node = variable;
                        index += 1;
                        false
                    }
                    (None, None) => true,
                }
            };

            if dead_end {
                // retry the newest deferred variable branch, restoring
                // the captured values to that point
                let Some(choice) = pending.pop() else { break };
                values.truncate(choice.values_len);
                values.push(segments[choice.segment_index]);
                node = choice.node;
                index = choice.segment_index + 1;
            }
        }

        if allowed.is_empty() {
            Ok(RouteMatchingResult::NotFound)
        } else {
            Ok(RouteMatchingResult::MethodNotAllowed { allowed })
        }
    }

    /// Evaluates one terminal: rules, host pattern, variable binding,
    /// then constraints, in that order. Returns `None` to keep the walk
    /// searching; a method-constraint failure also records the
    /// candidate's allowed methods.
    fn evaluate(
        &self,
        entry: &RouteEntry,
        values: &[&str],
        request: &RequestView<'_>,
        allowed: &mut HashSet<Method>,
    ) -> Option<MatchedRouteCandidate> {
        debug_assert_eq!(values.len(), entry.vars.len());
        let entry_rules = self.rules.get(entry.entry as usize)?.as_ref()?;
        for ((value, var), var_rules) in values.iter().zip(&entry.vars).zip(entry_rules) {
            for rule in var_rules {
                if !rule.passes(value) {
                    debug!(
                        variable = %var.name,
                        value,
                        "captured value failed a rule; continuing the search"
                    );
                    return None;
                }
            }
        }

        let compiled = self.routes.get(entry.route as usize)?;

        let mut route_variables = HashMap::with_capacity(entry.vars.len());
        if let Some(pattern) = &compiled.host {
            let host_variables = pattern.matches(request.host)?;
            for (name, value) in host_variables {
                route_variables.insert(name, value);
            }
        }
        for (value, var) in values.iter().zip(&entry.vars) {
            route_variables.insert(var.name.clone(), (*value).to_string());
        }
        for (name, default) in &compiled.defaults {
            if !route_variables.contains_key(name) {
                route_variables.insert(name.clone(), default.clone());
            }
        }

        let candidate = MatchedRouteCandidate {
            route: Arc::clone(compiled),
            route_variables,
        };

        for constraint in &candidate.route.route.constraints {
            if !constraint.passes(request.method, request.host, request.headers) {
                if let Some(methods) = constraint.allowed_methods() {
                    for name in methods {
                        if let Ok(method) = name.parse::<Method>() {
                            allowed.insert(method);
                        }
                    }
                }
                return None;
            }
        }
        for constraint in &candidate.route.route.custom_constraints {
            if !constraint.passes(
                &candidate,
                request.method,
                request.host,
                request.path,
                request.headers,
            ) {
                return None;
            }
        }
        Some(candidate)
    }
}

fn instantiate_rules(
    node: &TrieNode,
    registry: &RuleRegistry,
    rules: &mut Vec<Option<EntryRules>>,
) -> Result<(), RuleError> {
    if let Some(entry) = node.route() {
        let table = entry
            .vars
            .iter()
            .map(|var| {
                var.rules
                    .iter()
                    .map(|spec| registry.create(&spec.slug, &spec.params))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<EntryRules, _>>()?;
        let slot = entry.entry as usize;
        if slot >= rules.len() {
            // a hand-edited cache file can understate `entries`
            rules.resize_with(slot + 1, || None);
        }
        rules[slot] = Some(table);
    }
    for child in node.children() {
        instantiate_rules(child, registry, rules)?;
    }
    Ok(())
}
