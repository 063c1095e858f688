//! # routrie
//!
//! **routrie** matches HTTP requests against URI templates using a
//! compiled trie. Templates carry typed variables, defaults, and
//! optional segments:
//!
//! ```text
//! /users/:id(int)
//! /books/:bookId[/chapters/:chapterId]
//! /archive[/:year(numeric)[/:month(between(1,12))]]
//! ```
//!
//! ## Overview
//!
//! Routes are registered once, compiled into a prefix tree, and matched
//! per request in time proportional to the request path's length. The
//! compiled trie is plain data: it serializes to JSON, round-trips
//! through a file cache, and can be hot-swapped into a running process
//! while requests are in flight. Handlers are referenced by id, so
//! dispatch stays the application's business.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`template`]** - URI template lexing and parsing
//! - **[`rules`]** - Variable validation rules and the rule registry
//! - **[`route`]** - Route definitions, builder, constraints, and collections
//! - **[`trie`]** - Trie compilation from route collections
//! - **[`matcher`]** - Iterative trie matching with bounded backtracking
//! - **[`cache`]** - File-backed persistence for compiled tries
//! - **[`config`]** - Explicit router configuration (env and YAML)
//! - **[`factory`]** - Memoized matcher construction and hot-swappable sharing
//! - **[`hot_reload`]** - Live matcher replacement when the cache file changes
//! - **[`registry`]** - Handler id to handler value resolution
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use http::Method;
//! use routrie::{
//!     MatcherFactory, RouteBuilder, RouteCollection, RouteMatchingResult, RouterConfig,
//!     RuleRegistry,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut routes = RouteCollection::new();
//! routes.add(RouteBuilder::get("/users/:id(int)", "users.show").build()?);
//! routes.add(RouteBuilder::post("/users", "users.create").build()?);
//!
//! let factory = MatcherFactory::new(
//!     routes,
//!     RuleRegistry::with_builtin_rules(),
//!     RouterConfig::default(),
//! );
//! let matcher = factory.matcher()?;
//!
//! let headers = HashMap::new();
//! match matcher.match_route(&Method::GET, "example.com", "/users/42", &headers)? {
//!     RouteMatchingResult::Match(candidate) => {
//!         assert_eq!(candidate.route.handler().as_str(), "users.show");
//!         assert_eq!(candidate.variable("id"), Some("42"));
//!     }
//!     RouteMatchingResult::MethodNotAllowed { allowed } => {
//!         // respond 405 with an Allow header built from `allowed`
//!         # let _ = allowed;
//!         # unreachable!();
//!     }
//!     RouteMatchingResult::NotFound => {
//!         # unreachable!();
//!         // respond 404
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Matching Semantics
//!
//! - Literal segments win over variable segments; a dead end backtracks
//!   to the nearest deferred variable branch.
//! - Rules, host templates, and constraints are checked only at
//!   terminal nodes; a failed candidate resumes the search instead of
//!   ending it.
//! - A path that matched some route but not its method constraint
//!   yields [`RouteMatchingResult::MethodNotAllowed`] with the union of
//!   allowed methods; allowing `GET` implies allowing `HEAD`.
//! - Matching never allocates on the walk for paths of up to
//!   [`matcher::MAX_INLINE_SEGMENTS`] segments; variable text is copied
//!   only when a candidate is accepted at a terminal.
//!
//! ## Caching
//!
//! Compilation cost scales with the route count, so deployments with
//! large route sets can persist the compiled trie and skip compilation
//! at boot:
//!
//! ```rust,no_run
//! use routrie::{MatcherFactory, RouteCollection, RouterConfig, RuleRegistry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = RouterConfig::default();
//! config.cache.enabled = true;
//! config.cache.path = "/var/cache/app/trie.json".into();
//!
//! let factory = MatcherFactory::new(
//!     RouteCollection::new(),
//!     RuleRegistry::with_builtin_rules(),
//!     config,
//! );
//! let matcher = factory.matcher()?; // reads the cache, or compiles and writes it
//! # let _ = matcher;
//! # Ok(())
//! # }
//! ```
//!
//! The cache file embeds a format version and the route set's
//! fingerprint; either mismatching turns the read into a miss, so stale
//! files recompile instead of serving old routes.

pub mod cache;
pub mod config;
pub mod factory;
pub mod hot_reload;
pub mod matcher;
pub mod registry;
pub mod route;
pub mod rules;
pub mod template;
pub mod trie;

pub use cache::{CacheError, FileTrieCache, TrieCache, CACHE_FORMAT_VERSION};
pub use config::{CacheConfig, RouterConfig};
pub use factory::{FactoryError, MatcherFactory, SharedMatcher};
pub use matcher::{MatchError, MatchedRouteCandidate, RouteMatcher, RouteMatchingResult};
pub use registry::HandlerRegistry;
pub use route::{
    Constraint, HandlerId, MiddlewareBinding, Route, RouteBuilder, RouteCollection,
    RouteConstraint, UriTemplate,
};
pub use rules::{Rule, RuleError, RuleRegistry};
pub use template::TemplateError;
pub use trie::{CompileError, CompiledTrie, TrieCompiler};
