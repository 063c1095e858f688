use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::constraints::{Constraint, RouteConstraint};
use crate::template::{self, TemplateError};

/// Opaque reference to a handler or middleware implementation.
///
/// Routes carry ids, never callables, so a compiled trie can be written
/// to disk and read back. A [`HandlerRegistry`](crate::registry::HandlerRegistry)
/// resolves ids to whatever handler representation the application uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(String);

impl HandlerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandlerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for HandlerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The URI shape a route matches: a path template plus an optional host
/// template and HTTPS requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriTemplate {
    /// Path template, always stored with a leading `/`
    pub path: String,
    /// Host template, e.g. `api.example.com` or `:tenant.example.com`
    pub host: Option<String>,
    /// Whether the route also carries an HTTPS-only constraint
    pub https_only: bool,
}

impl UriTemplate {
    pub fn new(path: &str) -> Self {
        Self {
            path: normalize_path(path),
            host: None,
            https_only: false,
        }
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// A middleware reference on a route, with optional static parameters
/// that are handed to the middleware when the route matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiddlewareBinding {
    pub middleware: HandlerId,
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl MiddlewareBinding {
    pub fn new(middleware: impl Into<HandlerId>) -> Self {
        Self {
            middleware: middleware.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }
}

/// A single registered route: template, handler id, constraints, and
/// middleware bindings.
///
/// Everything except `custom_constraints` serializes; custom constraints
/// are process-local trait objects and are re-attached per process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    /// Optional symbolic name for URI generation and diagnostics
    pub name: Option<String>,
    pub template: UriTemplate,
    pub handler: HandlerId,
    pub constraints: Vec<RouteConstraint>,
    pub middleware: Vec<MiddlewareBinding>,
    #[serde(skip)]
    pub custom_constraints: Vec<Arc<dyn Constraint>>,
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.template == other.template
            && self.handler == other.handler
            && self.constraints == other.constraints
            && self.middleware == other.middleware
            && self.custom_constraints.len() == other.custom_constraints.len()
            && self
                .custom_constraints
                .iter()
                .zip(&other.custom_constraints)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

/// Fluent builder for [`Route`].
///
/// ```rust
/// use routrie::route::RouteBuilder;
///
/// let route = RouteBuilder::get("/users/:id(int)", "users.show")
///     .name("user-detail")
///     .build()
///     .unwrap();
/// assert_eq!(route.template.path, "/users/:id(int)");
/// ```
///
/// `build` checks template syntax, so a typo fails at registration
/// rather than surfacing as a route that never matches.
#[derive(Debug)]
pub struct RouteBuilder {
    name: Option<String>,
    path: String,
    host: Option<String>,
    https_only: bool,
    methods: Vec<Method>,
    handler: HandlerId,
    constraints: Vec<RouteConstraint>,
    middleware: Vec<MiddlewareBinding>,
    custom_constraints: Vec<Arc<dyn Constraint>>,
}

impl RouteBuilder {
    /// Starts a route with no method constraint; such a route matches
    /// every HTTP method.
    pub fn new(path: &str, handler: impl Into<HandlerId>) -> Self {
        Self {
            name: None,
            path: path.to_string(),
            host: None,
            https_only: false,
            methods: Vec::new(),
            handler: handler.into(),
            constraints: Vec::new(),
            middleware: Vec::new(),
            custom_constraints: Vec::new(),
        }
    }

    pub fn get(path: &str, handler: impl Into<HandlerId>) -> Self {
        Self::new(path, handler).methods(&[Method::GET])
    }

    pub fn post(path: &str, handler: impl Into<HandlerId>) -> Self {
        Self::new(path, handler).methods(&[Method::POST])
    }

    pub fn put(path: &str, handler: impl Into<HandlerId>) -> Self {
        Self::new(path, handler).methods(&[Method::PUT])
    }

    pub fn delete(path: &str, handler: impl Into<HandlerId>) -> Self {
        Self::new(path, handler).methods(&[Method::DELETE])
    }

    pub fn patch(path: &str, handler: impl Into<HandlerId>) -> Self {
        Self::new(path, handler).methods(&[Method::PATCH])
    }

    /// Restricts the route to `methods`. Replaces any previous set.
    pub fn methods(mut self, methods: &[Method]) -> Self {
        self.methods = methods.to_vec();
        self
    }

    /// Requires the request host to match `host`, which may itself be a
    /// template with variables, e.g. `:tenant.example.com`.
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// Requires the request to have arrived over HTTPS.
    pub fn https_only(mut self) -> Self {
        self.https_only = true;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn middleware(mut self, binding: MiddlewareBinding) -> Self {
        self.middleware.push(binding);
        self
    }

    pub fn constraint(mut self, constraint: RouteConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn custom_constraint(mut self, constraint: Arc<dyn Constraint>) -> Self {
        self.custom_constraints.push(constraint);
        self
    }

    /// Validates the templates and assembles the route.
    ///
    /// The method and HTTPS requirements become leading entries in the
    /// route's constraint list, ahead of any explicitly added
    /// constraints.
    pub fn build(self) -> Result<Route, TemplateError> {
        let template = UriTemplate {
            path: normalize_path(&self.path),
            host: self.host,
            https_only: self.https_only,
        };
        template::parse_path(&template.path)?;
        if let Some(host) = &template.host {
            template::parse_host(host)?;
        }

        let mut constraints = Vec::new();
        if !self.methods.is_empty() {
            constraints.push(RouteConstraint::methods(&self.methods));
        }
        if template.https_only {
            constraints.push(RouteConstraint::HttpsOnly);
        }
        constraints.extend(self.constraints);

        Ok(Route {
            name: self.name,
            template,
            handler: self.handler,
            constraints,
            middleware: self.middleware,
            custom_constraints: self.custom_constraints,
        })
    }
}

/// An ordered set of routes, the input to trie compilation.
///
/// Registration order matters: when two routes share an identical
/// template shape, the later registration wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteCollection {
    routes: Vec<Route>,
}

impl RouteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn extend(&mut self, routes: impl IntoIterator<Item = Route>) {
        self.routes.extend(routes);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// SHA-256 over every detail of the route set that affects the
    /// compiled trie. Two collections that compile identically hash
    /// identically, so the hash doubles as a cache key.
    ///
    /// Custom constraints are deliberately excluded: they do not change
    /// the trie shape, and hashing process-local trait objects would
    /// invalidate the cache on every restart.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for route in &self.routes {
            hash_component(&mut hasher, route.name.as_deref().unwrap_or(""));
            hash_component(&mut hasher, &route.template.path);
            hash_component(&mut hasher, route.template.host.as_deref().unwrap_or(""));
            hasher.update([u8::from(route.template.https_only)]);
            hash_component(&mut hasher, route.handler.as_str());
            for constraint in &route.constraints {
                match constraint {
                    RouteConstraint::Method { allowed } => {
                        hash_component(&mut hasher, "method");
                        for method in allowed {
                            hash_component(&mut hasher, method);
                        }
                    }
                    RouteConstraint::HttpsOnly => hash_component(&mut hasher, "https_only"),
                    RouteConstraint::Host { hosts } => {
                        hash_component(&mut hasher, "host");
                        for host in hosts {
                            hash_component(&mut hasher, host);
                        }
                    }
                }
            }
            for binding in &route.middleware {
                hash_component(&mut hasher, binding.middleware.as_str());
                for (key, value) in &binding.parameters {
                    hash_component(&mut hasher, key);
                    hash_component(&mut hasher, &value.to_string());
                }
            }
        }
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}

fn hash_component(hasher: &mut Sha256, component: &str) {
    hasher.update(component.as_bytes());
    // NUL delimiter so ("ab", "c") and ("a", "bc") hash differently
    hasher.update([0u8]);
}

impl FromIterator<Route> for RouteCollection {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}

impl<'c> IntoIterator for &'c RouteCollection {
    type Item = &'c Route;
    type IntoIter = std::slice::Iter<'c, Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_normalizes_the_path() {
        let route = RouteBuilder::get("users/:id", "users.show").build().unwrap();
        assert_eq!(route.template.path, "/users/:id");
    }

    #[test]
    fn test_builder_rejects_bad_templates() {
        assert!(RouteBuilder::get("/users/:", "users.show").build().is_err());
        assert!(RouteBuilder::get("/users/[oops", "users.show").build().is_err());
        assert!(RouteBuilder::new("/ok", "h").host(":").build().is_err());
    }

    #[test]
    fn test_builder_front_loads_method_and_https_constraints() {
        let route = RouteBuilder::get("/users", "users.index")
            .https_only()
            .constraint(RouteConstraint::hosts(["example.com"]))
            .build()
            .unwrap();
        assert!(matches!(
            route.constraints[0],
            RouteConstraint::Method { .. }
        ));
        assert_eq!(route.constraints[1], RouteConstraint::HttpsOnly);
        assert!(matches!(route.constraints[2], RouteConstraint::Host { .. }));
    }

    #[test]
    fn test_route_without_methods_has_no_method_constraint() {
        let route = RouteBuilder::new("/anything", "h").build().unwrap();
        assert!(route.constraints.is_empty());
    }

    #[test]
    fn test_fingerprint_is_stable_and_order_sensitive() {
        let a = RouteBuilder::get("/a", "a").build().unwrap();
        let b = RouteBuilder::get("/b", "b").build().unwrap();

        let mut first = RouteCollection::new();
        first.add(a.clone());
        first.add(b.clone());

        let mut same = RouteCollection::new();
        same.add(a.clone());
        same.add(b.clone());
        assert_eq!(first.fingerprint(), same.fingerprint());

        let mut reversed = RouteCollection::new();
        reversed.add(b);
        reversed.add(a);
        assert_ne!(first.fingerprint(), reversed.fingerprint());
    }

    #[test]
    fn test_fingerprint_tracks_handler_changes() {
        let mut before = RouteCollection::new();
        before.add(RouteBuilder::get("/a", "old").build().unwrap());
        let mut after = RouteCollection::new();
        after.add(RouteBuilder::get("/a", "new").build().unwrap());
        assert_ne!(before.fingerprint(), after.fingerprint());
    }

    #[test]
    fn test_fingerprint_is_lowercase_sha256_hex() {
        let mut routes = RouteCollection::new();
        routes.add(RouteBuilder::get("/a", "a").build().unwrap());
        let fingerprint = routes.fingerprint();
        assert_eq!(fingerprint.len(), 64, "one hex pair per digest byte");
        assert!(fingerprint
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_routes_serialize_without_custom_constraints() {
        let route = RouteBuilder::get("/users/:id", "users.show")
            .middleware(MiddlewareBinding::new("auth").with_parameter("role", "admin"))
            .build()
            .unwrap();
        let json = serde_json::to_string(&route).unwrap();
        let back: Route = serde_json::from_str(&json).unwrap();
        assert_eq!(route, back);
        assert!(back.custom_constraints.is_empty());
    }
}
