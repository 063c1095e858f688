//! # Trie Module
//!
//! The compiled routing trie and its compiler. Templates are compiled
//! once into a prefix tree keyed by path segment; matching then costs a
//! walk proportional to the request path's length rather than a scan
//! over every route.
//!
//! ## Shape
//!
//! Each trie level corresponds to one path segment. A node holds its
//! literal children (distinct by segment text) and at most one variable
//! child; every variable edge at a position is merged into that single
//! child, which is what makes the later literal-over-variable
//! preference in the matcher well defined. Nodes reached at the end of
//! some template variant carry a [`RouteEntry`] payload naming the
//! route and the variables consumed along the way.
//!
//! Optional segments multiply out at compile time:
//!
//! ```text
//! /books/:bookId[/chapters/:chapterId]
//! ```
//!
//! compiles exactly like the pair
//!
//! ```text
//! /books/:bookId
//! /books/:bookId/chapters/:chapterId
//! ```
//!
//! sharing their common prefix in the tree.
//!
//! ## Serialization
//!
//! The whole [`CompiledTrie`] is plain serde data: no trait objects, no
//! process-local state. Rules appear as slug-plus-parameters
//! ([`RuleSpec`]); the matcher re-instantiates them from its registry.
//! That is what allows [`FileTrieCache`](crate::cache::FileTrieCache)
//! to round-trip tries through disk, and a version tag in the cache
//! envelope keeps old files from being misread when this layout
//! changes.

mod compiler;
mod host;
mod node;
#[cfg(test)]
mod tests;

pub use compiler::{CompileError, TrieCompiler};
pub use host::{HostPattern, HostSegment};
pub use node::{CompiledRoute, CompiledTrie, RouteEntry, RuleSpec, TrieNode, VarSpec};
