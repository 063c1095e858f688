use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::host::HostPattern;
use crate::route::{HandlerId, MiddlewareBinding, Route};

/// A rule reference as it appears in a compiled trie: the slug and raw
/// parameters, not the rule instance. The matcher rebuilds instances
/// from its own [`RuleRegistry`](crate::rules::RuleRegistry), which is
/// what lets a trie loaded from disk keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub slug: String,
    pub params: Vec<String>,
}

/// One variable consumed on the way to a terminal node: its name and
/// the rules its captured value must pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarSpec {
    pub name: String,
    pub rules: Vec<RuleSpec>,
}

/// The payload of a terminal trie node.
///
/// `vars` are ordered root-to-leaf; the i-th entry names the i-th
/// variable segment consumed while reaching this node, so captured
/// values zip against it directly. `entry` is a dense id used by the
/// matcher to index its per-terminal rule instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Index into [`CompiledTrie::routes`]
    pub route: u32,
    /// Dense terminal id, unique within one compiled trie
    pub entry: u32,
    pub vars: Vec<VarSpec>,
}

/// A node in the compiled trie.
///
/// The tag field makes the on-disk encoding self-describing:
///
/// ```json
/// {"kind": "literal", "segment": "users", "children": [...], "route": null}
/// ```
///
/// Each node has at most one variable child; literal children are
/// distinct by segment. Any node may carry a route payload, which makes
/// it a terminal for paths ending there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrieNode {
    Root {
        children: Vec<TrieNode>,
        route: Option<RouteEntry>,
    },
    Literal {
        segment: String,
        children: Vec<TrieNode>,
        route: Option<RouteEntry>,
    },
    Variable {
        children: Vec<TrieNode>,
        route: Option<RouteEntry>,
    },
}

impl TrieNode {
    pub(crate) fn root() -> Self {
        TrieNode::Root {
            children: Vec::new(),
            route: None,
        }
    }

    pub(crate) fn literal(segment: &str) -> Self {
        TrieNode::Literal {
            segment: segment.to_string(),
            children: Vec::new(),
            route: None,
        }
    }

    pub(crate) fn variable() -> Self {
        TrieNode::Variable {
            children: Vec::new(),
            route: None,
        }
    }

    pub fn children(&self) -> &[TrieNode] {
        match self {
            TrieNode::Root { children, .. }
            | TrieNode::Literal { children, .. }
            | TrieNode::Variable { children, .. } => children,
        }
    }

    fn children_mut(&mut self) -> &mut Vec<TrieNode> {
        match self {
            TrieNode::Root { children, .. }
            | TrieNode::Literal { children, .. }
            | TrieNode::Variable { children, .. } => children,
        }
    }

    pub fn route(&self) -> Option<&RouteEntry> {
        match self {
            TrieNode::Root { route, .. }
            | TrieNode::Literal { route, .. }
            | TrieNode::Variable { route, .. } => route.as_ref(),
        }
    }

    /// Attaches a route payload, returning the displaced payload when
    /// this node already was a terminal.
    pub(crate) fn set_route(&mut self, entry: RouteEntry) -> Option<RouteEntry> {
        match self {
            TrieNode::Root { route, .. }
            | TrieNode::Literal { route, .. }
            | TrieNode::Variable { route, .. } => route.replace(entry),
        }
    }

    /// The literal child matching `segment` exactly, if any.
    pub fn literal_child(&self, segment: &str) -> Option<&TrieNode> {
        self.children().iter().find(
            |child| matches!(child, TrieNode::Literal { segment: s, .. } if s == segment),
        )
    }

    /// The variable child, if any. The compiler merges all variable
    /// edges at one position into a single child, so there is never
    /// more than one.
    pub fn variable_child(&self) -> Option<&TrieNode> {
        self.children()
            .iter()
            .find(|child| matches!(child, TrieNode::Variable { .. }))
    }

    /// The literal child for `segment`, created on first use.
    pub(crate) fn literal_child_entry(&mut self, segment: &str) -> &mut TrieNode {
        let children = self.children_mut();
        let position = children
            .iter()
            .position(|child| matches!(child, TrieNode::Literal { segment: s, .. } if s == segment));
        let index = match position {
            Some(index) => index,
            None => {
                children.push(TrieNode::literal(segment));
                children.len() - 1
            }
        };
        &mut children[index]
    }

    /// The variable child, created on first use.
    pub(crate) fn variable_child_entry(&mut self) -> &mut TrieNode {
        let children = self.children_mut();
        let position = children
            .iter()
            .position(|child| matches!(child, TrieNode::Variable { .. }));
        let index = match position {
            Some(index) => index,
            None => {
                children.push(TrieNode::variable());
                children.len() - 1
            }
        };
        &mut children[index]
    }

    /// Total node count of this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(TrieNode::node_count)
            .sum::<usize>()
    }
}

/// A route plus everything the matcher needs at terminal time that is
/// derived from its template: default variable values and the compiled
/// host pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledRoute {
    pub route: Route,
    /// Defaults collected from `:name=value` variables, applied to
    /// variables the matched path did not bind
    pub defaults: BTreeMap<String, String>,
    /// Compiled form of the route's host template, when it has one
    pub host: Option<HostPattern>,
}

impl CompiledRoute {
    pub fn handler(&self) -> &HandlerId {
        &self.route.handler
    }

    pub fn name(&self) -> Option<&str> {
        self.route.name.as_deref()
    }

    pub fn middleware(&self) -> &[MiddlewareBinding] {
        &self.route.middleware
    }

    pub fn path_template(&self) -> &str {
        &self.route.template.path
    }
}

/// The output of trie compilation and the unit of caching.
///
/// `fingerprint` is the [`RouteCollection::fingerprint`](crate::route::RouteCollection::fingerprint)
/// of the compiled route set; keyed caches compare it to decide whether
/// a stored trie is still current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledTrie {
    pub fingerprint: String,
    pub routes: Vec<CompiledRoute>,
    pub root: TrieNode,
    /// Exclusive upper bound on [`RouteEntry::entry`] ids in `root`
    pub entries: u32,
}

impl CompiledTrie {
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }
}
