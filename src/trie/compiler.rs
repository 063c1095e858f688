use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};

use super::host::{HostPattern, HostSegment};
use super::node::{CompiledRoute, CompiledTrie, RouteEntry, RuleSpec, TrieNode, VarSpec};
use crate::cache::{CacheError, TrieCache};
use crate::route::{Route, RouteCollection};
use crate::rules::{RuleError, RuleRegistry};
use crate::template::{self, AstNode, AstNodeKind, TemplateError};

/// Error compiling a route collection into a trie
#[derive(Debug)]
pub enum CompileError {
    /// A route template failed to lex or parse
    Template {
        template: String,
        source: TemplateError,
    },
    /// A template references an unknown rule or passes bad parameters
    Rule {
        template: String,
        source: RuleError,
    },
    /// The template parsed but describes a shape the trie cannot hold
    UnsupportedTemplate { template: String, reason: String },
    /// The trie cache failed to read or write
    Cache(CacheError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Template { template, source } => {
                write!(f, "invalid route template `{template}`: {source}")
            }
            CompileError::Rule { template, source } => {
                write!(f, "invalid rule in route template `{template}`: {source}")
            }
            CompileError::UnsupportedTemplate { template, reason } => {
                write!(f, "unsupported route template `{template}`: {reason}")
            }
            CompileError::Cache(source) => {
                write!(f, "trie cache error: {source}")
            }
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Template { source, .. } => Some(source),
            CompileError::Rule { source, .. } => Some(source),
            CompileError::UnsupportedTemplate { .. } => None,
            CompileError::Cache(source) => Some(source),
        }
    }
}

/// Compiles a [`RouteCollection`] into a [`CompiledTrie`].
///
/// Compilation expands optional segments into explicit template
/// variants, merges shared prefixes into trie nodes, and validates
/// every rule reference against the registry so that a bad template
/// fails here rather than at request time.
pub struct TrieCompiler<'r> {
    registry: &'r RuleRegistry,
}

impl<'r> TrieCompiler<'r> {
    pub fn new(registry: &'r RuleRegistry) -> Self {
        Self { registry }
    }

    /// Compiles the collection from scratch.
    pub fn compile(&self, routes: &RouteCollection) -> Result<CompiledTrie, CompileError> {
        let mut root = TrieNode::root();
        let mut compiled = Vec::with_capacity(routes.len());
        let mut entries: u32 = 0;

        for (index, route) in routes.iter().enumerate() {
            let path = &route.template.path;
            let ast = template::parse_path(path).map_err(|source| CompileError::Template {
                template: path.clone(),
                source,
            })?;

            let mut defaults = BTreeMap::new();
            collect_defaults(&ast, &mut defaults);

            let host = match &route.template.host {
                Some(host) => Some(self.compile_host(host)?),
                None => None,
            };

            for variant in expand(&ast.children) {
                let segments = build_segments(&variant, path)?;
                self.validate_rules(&segments, path)?;
                insert(&mut root, &segments, index as u32, &mut entries, route);
            }

            compiled.push(CompiledRoute {
                route: route.clone(),
                defaults,
                host,
            });
        }

        let trie = CompiledTrie {
            fingerprint: routes.fingerprint(),
            routes: compiled,
            root,
            entries,
        };
        info!(
            routes = trie.route_count(),
            nodes = trie.node_count(),
            terminals = trie.entries,
            "compiled route trie"
        );
        Ok(trie)
    }

    /// Compiles through a cache: a stored trie is returned as-is, and a
    /// miss compiles then writes back. The cache is authoritative;
    /// detecting staleness is the cache implementation's job, not the
    /// compiler's. Read and write failures both fail the compile.
    pub fn compile_with_cache(
        &self,
        routes: &RouteCollection,
        cache: &dyn TrieCache,
    ) -> Result<CompiledTrie, CompileError> {
        match cache.get() {
            Ok(Some(trie)) => {
                debug!(routes = trie.route_count(), "route trie served from cache");
                return Ok(trie);
            }
            Ok(None) => debug!("trie cache miss"),
            Err(source) => return Err(CompileError::Cache(source)),
        }
        let trie = self.compile(routes)?;
        cache.set(&trie).map_err(CompileError::Cache)?;
        Ok(trie)
    }

    /// Instantiates and discards every rule a variant references, so
    /// unknown slugs and bad parameters fail the compile.
    fn validate_rules(&self, segments: &[Segment], path: &str) -> Result<(), CompileError> {
        for segment in segments {
            if let Segment::Variable(spec) = segment {
                for rule in &spec.rules {
                    self.registry
                        .create(&rule.slug, &rule.params)
                        .map_err(|source| CompileError::Rule {
                            template: path.to_string(),
                            source,
                        })?;
                }
            }
        }
        Ok(())
    }

    fn compile_host(&self, host: &str) -> Result<HostPattern, CompileError> {
        let ast = template::parse_host(host).map_err(|source| CompileError::Template {
            template: host.to_string(),
            source,
        })?;
        let mut variants = Vec::new();
        for variant in expand(&ast.children) {
            variants.push(build_host_labels(&variant, host)?);
        }
        Ok(HostPattern { variants })
    }
}

/// A path template variant reduced to matchable segments.
enum Segment {
    Literal(String),
    Variable(VarSpec),
}

/// Expands optional segments into explicit variants, preserving node
/// order. For each optional group the without-variant comes first, so
/// re-compiling a collection assigns the same entry ids every time.
fn expand(nodes: &[AstNode]) -> Vec<Vec<&AstNode>> {
    let mut variants: Vec<Vec<&AstNode>> = vec![Vec::new()];
    for node in nodes {
        if node.kind == AstNodeKind::OptionalSegment {
            let inner = expand(&node.children);
            let mut next = Vec::with_capacity(variants.len() * (1 + inner.len()));
            for variant in &variants {
                next.push(variant.clone());
                for inner_variant in &inner {
                    let mut with = variant.clone();
                    with.extend(inner_variant.iter().copied());
                    next.push(with);
                }
            }
            variants = next;
        } else {
            for variant in &mut variants {
                variant.push(node);
            }
        }
    }
    variants
}

/// Builds the segment list for one expanded variant. Within a segment a
/// variable must stand alone; `/:file.txt` style mixing is rejected.
fn build_segments(nodes: &[&AstNode], path: &str) -> Result<Vec<Segment>, CompileError> {
    let mixed = || CompileError::UnsupportedTemplate {
        template: path.to_string(),
        reason: "a variable must span a whole path segment".to_string(),
    };

    let mut segments = Vec::new();
    let mut pending_text = String::new();
    let mut pending_var: Option<VarSpec> = None;

    let mut finalize = |pending_text: &mut String, pending_var: &mut Option<VarSpec>| {
        if let Some(spec) = pending_var.take() {
            segments.push(Segment::Variable(spec));
        } else if !pending_text.is_empty() {
            segments.push(Segment::Literal(std::mem::take(pending_text)));
        }
    };

    for node in nodes {
        match node.kind {
            AstNodeKind::Text => {
                let value = node.value_str();
                if value == "/" {
                    finalize(&mut pending_text, &mut pending_var);
                } else if value.contains('/') {
                    // only reachable through quoted text like '/a/b'
                    return Err(CompileError::UnsupportedTemplate {
                        template: path.to_string(),
                        reason: "path segments must not contain `/`".to_string(),
                    });
                } else {
                    if pending_var.is_some() {
                        return Err(mixed());
                    }
                    pending_text.push_str(value);
                }
            }
            AstNodeKind::Variable => {
                if pending_var.is_some() || !pending_text.is_empty() {
                    return Err(mixed());
                }
                pending_var = Some(var_spec(node));
            }
            // Root, OptionalSegment and variable details never appear in
            // an expanded variant sequence.
            _ => {}
        }
    }
    finalize(&mut pending_text, &mut pending_var);
    Ok(segments)
}

/// Builds the label list for one expanded host variant. `.` separates
/// labels; a variable must stand alone in its label.
fn build_host_labels(nodes: &[&AstNode], host: &str) -> Result<Vec<HostSegment>, CompileError> {
    let unsupported = |reason: &str| CompileError::UnsupportedTemplate {
        template: host.to_string(),
        reason: reason.to_string(),
    };

    let mut labels = Vec::new();
    let mut pending_text = String::new();
    let mut pending_var: Option<String> = None;

    let mut finalize = |pending_text: &mut String,
                        pending_var: &mut Option<String>|
     -> Result<(), CompileError> {
        if let Some(name) = pending_var.take() {
            labels.push(HostSegment::Variable { name });
            Ok(())
        } else if !pending_text.is_empty() {
            labels.push(HostSegment::Literal {
                value: std::mem::take(pending_text).to_ascii_lowercase(),
            });
            Ok(())
        } else {
            Err(CompileError::UnsupportedTemplate {
                template: host.to_string(),
                reason: "empty host label".to_string(),
            })
        }
    };

    for node in nodes {
        match node.kind {
            AstNodeKind::Text => {
                for (piece_index, piece) in node.value_str().split('.').enumerate() {
                    if piece_index > 0 {
                        finalize(&mut pending_text, &mut pending_var)?;
                    }
                    if !piece.is_empty() {
                        if pending_var.is_some() {
                            return Err(unsupported(
                                "a variable must span a whole host label",
                            ));
                        }
                        pending_text.push_str(piece);
                    }
                }
            }
            AstNodeKind::Variable => {
                if node
                    .children
                    .iter()
                    .any(|child| child.kind == AstNodeKind::VariableRule)
                {
                    return Err(unsupported("host variables do not support rules"));
                }
                if node
                    .children
                    .iter()
                    .any(|child| child.kind == AstNodeKind::VariableDefaultValue)
                {
                    return Err(unsupported("host variables do not support default values"));
                }
                if pending_var.is_some() || !pending_text.is_empty() {
                    return Err(unsupported("a variable must span a whole host label"));
                }
                pending_var = Some(node.value_str().to_string());
            }
            _ => {}
        }
    }
    finalize(&mut pending_text, &mut pending_var)?;
    Ok(labels)
}

fn var_spec(node: &AstNode) -> VarSpec {
    let rules = node
        .children
        .iter()
        .filter(|child| child.kind == AstNodeKind::VariableRule)
        .map(|rule| RuleSpec {
            slug: rule.value_str().to_string(),
            params: rule
                .children
                .iter()
                .filter(|child| child.kind == AstNodeKind::VariableRuleParameters)
                .flat_map(|params| params.children.iter())
                .map(|param| param.value_str().to_string())
                .collect(),
        })
        .collect();
    VarSpec {
        name: node.value_str().to_string(),
        rules,
    }
}

/// Collects `:name=value` defaults from the whole template, optional
/// segments included. Duplicate names keep the last value seen.
fn collect_defaults(node: &AstNode, defaults: &mut BTreeMap<String, String>) {
    if node.kind == AstNodeKind::Variable {
        for child in &node.children {
            if child.kind == AstNodeKind::VariableDefaultValue {
                defaults.insert(
                    node.value_str().to_string(),
                    child.value_str().to_string(),
                );
            }
        }
    }
    for child in &node.children {
        collect_defaults(child, defaults);
    }
}

/// Walks (and grows) the trie along `segments` and attaches the route
/// payload at the final node. When the node already carries a payload
/// the new one displaces it: the last registration wins.
fn insert(
    root: &mut TrieNode,
    segments: &[Segment],
    route_index: u32,
    entries: &mut u32,
    route: &Route,
) {
    let mut node = root;
    let mut vars = Vec::new();
    for segment in segments {
        node = match segment {
            Segment::Literal(text) => node.literal_child_entry(text),
            Segment::Variable(spec) => {
                vars.push(spec.clone());
                node.variable_child_entry()
            }
        };
    }
    let entry = RouteEntry {
        route: route_index,
        entry: *entries,
        vars,
    };
    *entries += 1;
    if node.set_route(entry).is_some() {
        warn!(
            template = %route.template.path,
            handler = %route.handler,
            "route template shape registered more than once; the last registration wins"
        );
    }
}
