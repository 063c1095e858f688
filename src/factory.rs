//! # Matcher Factory Module
//!
//! Lazy, memoized construction of the route matcher. Building a matcher
//! is the expensive step (template parsing, rule instantiation, maybe a
//! cache read), so applications construct a [`MatcherFactory`] once at
//! startup and call [`MatcherFactory::matcher`] wherever a matcher is
//! needed; the first call compiles, every later call returns the same
//! `Arc` without locking.
//!
//! Concurrent first calls are safe: the underlying cell guarantees the
//! compile runs once and losers observe the winner's matcher. A failed
//! compile is not memoized, so a transient failure (an unreadable cache
//! file that an operator then fixes) does not poison the process.
//!
//! [`SharedMatcher`] covers the other lifecycle need: replacing the
//! matcher in a running process. Readers call [`SharedMatcher::load`]
//! per request at roughly the cost of an atomic load; a reloader thread
//! calls [`SharedMatcher::store`] with a freshly built matcher and
//! in-flight requests keep the matcher they loaded.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::OnceCell;

use crate::cache::FileTrieCache;
use crate::config::RouterConfig;
use crate::matcher::RouteMatcher;
use crate::route::RouteCollection;
use crate::rules::{RuleError, RuleRegistry};
use crate::trie::{CompileError, TrieCompiler};

/// Error producing a matcher
#[derive(Debug)]
pub enum FactoryError {
    Compile(CompileError),
    /// The compiled trie references a rule the registry does not know
    Rule(RuleError),
}

impl fmt::Display for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryError::Compile(source) => write!(f, "failed to compile routes: {source}"),
            FactoryError::Rule(source) => write!(f, "failed to build matcher: {source}"),
        }
    }
}

impl std::error::Error for FactoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FactoryError::Compile(source) => Some(source),
            FactoryError::Rule(source) => Some(source),
        }
    }
}

impl From<CompileError> for FactoryError {
    fn from(source: CompileError) -> Self {
        FactoryError::Compile(source)
    }
}

impl From<RuleError> for FactoryError {
    fn from(source: RuleError) -> Self {
        FactoryError::Rule(source)
    }
}

/// Owns a route collection, rule registry, and configuration, and
/// produces one shared [`RouteMatcher`] from them on demand.
pub struct MatcherFactory {
    routes: RouteCollection,
    registry: RuleRegistry,
    config: RouterConfig,
    matcher: OnceCell<Arc<RouteMatcher>>,
}

impl fmt::Debug for MatcherFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherFactory")
            .field("routes", &self.routes.len())
            .field("config", &self.config)
            .field("built", &self.matcher.get().is_some())
            .finish()
    }
}

impl MatcherFactory {
    pub fn new(routes: RouteCollection, registry: RuleRegistry, config: RouterConfig) -> Self {
        Self {
            routes,
            registry,
            config,
            matcher: OnceCell::new(),
        }
    }

    /// The memoized matcher, compiled on first call.
    ///
    /// Compilation honors `config.cache`: when enabled, the trie is
    /// read from (or written back to) a [`FileTrieCache`] keyed by the
    /// route collection's fingerprint.
    pub fn matcher(&self) -> Result<Arc<RouteMatcher>, FactoryError> {
        self.matcher
            .get_or_try_init(|| {
                let compiler = TrieCompiler::new(&self.registry);
                let trie = if self.config.cache.enabled {
                    let cache = FileTrieCache::keyed(&self.config.cache.path, &self.routes);
                    compiler.compile_with_cache(&self.routes, &cache)?
                } else {
                    compiler.compile(&self.routes)?
                };
                let matcher = RouteMatcher::new(trie, &self.registry)?;
                Ok(Arc::new(matcher))
            })
            .map(Arc::clone)
    }

    pub fn routes(&self) -> &RouteCollection {
        &self.routes
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}

/// A matcher slot that can be replaced while requests read it.
///
/// Wraps [`ArcSwap`], so loads on the request path are wait-free and a
/// store never blocks readers.
pub struct SharedMatcher {
    inner: ArcSwap<RouteMatcher>,
}

impl SharedMatcher {
    pub fn new(matcher: Arc<RouteMatcher>) -> Self {
        Self {
            inner: ArcSwap::from(matcher),
        }
    }

    /// The current matcher. Callers hold it for the duration of one
    /// request; a concurrent [`store`](Self::store) does not affect it.
    pub fn load(&self) -> Arc<RouteMatcher> {
        self.inner.load_full()
    }

    /// Replaces the matcher for all future loads.
    pub fn store(&self, matcher: Arc<RouteMatcher>) {
        self.inner.store(matcher);
    }
}

impl fmt::Debug for SharedMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMatcher")
            .field("matcher", &self.inner.load_full())
            .finish()
    }
}
