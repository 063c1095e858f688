//! # Handler Registry Module
//!
//! Maps [`HandlerId`]s to whatever the application dispatches to. The
//! matcher resolves requests to handler ids, never to callables, so
//! that a compiled trie survives serialization; this registry is the
//! other half of that split.
//!
//! The value type is generic because applications disagree about what a
//! handler is: a function pointer, a boxed closure, a channel sender, a
//! service index. The router does not care.
//!
//! ## Usage
//!
//! ```rust
//! use routrie::registry::HandlerRegistry;
//! use routrie::route::HandlerId;
//!
//! type Handler = fn() -> &'static str;
//!
//! let mut registry: HandlerRegistry<Handler> = HandlerRegistry::new();
//! registry.register("users.show", || "user detail");
//!
//! let handler = registry.resolve(&HandlerId::new("users.show")).unwrap();
//! assert_eq!(handler(), "user detail");
//! ```

use std::collections::HashMap;

use crate::route::HandlerId;

/// Maps handler ids to handler values of the application's choosing.
#[derive(Debug, Clone)]
pub struct HandlerRegistry<T> {
    handlers: HashMap<HandlerId, T>,
}

impl<T> HandlerRegistry<T> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` under `id`, returning the handler it
    /// displaced, if any.
    pub fn register(&mut self, id: impl Into<HandlerId>, handler: T) -> Option<T> {
        self.handlers.insert(id.into(), handler)
    }

    /// The handler registered under `id`, if any.
    pub fn resolve(&self, id: &HandlerId) -> Option<&T> {
        self.handlers.get(id)
    }

    pub fn contains(&self, id: &HandlerId) -> bool {
        self.handlers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered ids, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &HandlerId> {
        self.handlers.keys()
    }
}

impl<T> Default for HandlerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut registry: HandlerRegistry<&'static str> = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register("a", "first").is_none());
        assert_eq!(registry.resolve(&HandlerId::new("a")), Some(&"first"));
        assert!(!registry.contains(&HandlerId::new("b")));
    }

    #[test]
    fn test_register_returns_the_displaced_handler() {
        let mut registry: HandlerRegistry<&'static str> = HandlerRegistry::new();
        registry.register("a", "first");
        assert_eq!(registry.register("a", "second"), Some("first"));
        assert_eq!(registry.resolve(&HandlerId::new("a")), Some(&"second"));
        assert_eq!(registry.len(), 1);
    }
}
