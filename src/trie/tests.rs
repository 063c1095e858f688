use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::*;
use crate::cache::{CacheError, TrieCache};
use crate::route::{Route, RouteBuilder, RouteCollection};
use crate::rules::RuleRegistry;

fn get(path: &str, handler: &str) -> Route {
    RouteBuilder::get(path, handler).build().unwrap()
}

fn collection(routes: impl IntoIterator<Item = Route>) -> RouteCollection {
    routes.into_iter().collect()
}

fn compile(routes: &RouteCollection) -> CompiledTrie {
    let registry = RuleRegistry::with_builtin_rules();
    TrieCompiler::new(&registry).compile(routes).unwrap()
}

fn compile_err(routes: &RouteCollection) -> CompileError {
    let registry = RuleRegistry::with_builtin_rules();
    TrieCompiler::new(&registry).compile(routes).unwrap_err()
}

#[test]
fn test_literal_routes_share_prefix_nodes() {
    let routes = collection([get("/users/all", "users.all"), get("/users/new", "users.new")]);
    let trie = compile(&routes);

    let users = trie.root.literal_child("users").unwrap();
    assert!(users.route().is_none());
    assert_eq!(users.children().len(), 2);

    let all = users.literal_child("all").unwrap();
    assert_eq!(all.route().unwrap().route, 0);
    let new = users.literal_child("new").unwrap();
    assert_eq!(new.route().unwrap().route, 1);
}

#[test]
fn test_variable_edges_merge_into_one_child() {
    let routes = collection([
        get("/a/:x/b", "ab"),
        get("/a/:y/c", "ac"),
    ]);
    let trie = compile(&routes);

    let a = trie.root.literal_child("a").unwrap();
    assert_eq!(a.children().len(), 1);
    let variable = a.variable_child().unwrap();

    let b = variable.literal_child("b").unwrap();
    assert_eq!(b.route().unwrap().vars[0].name, "x");
    let c = variable.literal_child("c").unwrap();
    assert_eq!(c.route().unwrap().vars[0].name, "y");
}

#[test]
fn test_root_path_route_sits_on_the_root_node() {
    let routes = collection([get("/", "home")]);
    let trie = compile(&routes);
    assert_eq!(trie.root.route().unwrap().route, 0);
    assert!(trie.root.children().is_empty());
}

#[test]
fn test_optional_segment_creates_both_variants() {
    let routes = collection([get("/foo[/:id]", "foo")]);
    let trie = compile(&routes);
    assert_eq!(trie.entries, 2);

    let foo = trie.root.literal_child("foo").unwrap();
    // without-variant terminal
    let without = foo.route().unwrap();
    assert!(without.vars.is_empty());
    assert_eq!(without.entry, 0);
    // with-variant terminal one level down
    let with = foo.variable_child().unwrap().route().unwrap();
    assert_eq!(with.vars[0].name, "id");
    assert_eq!(with.entry, 1);
    assert_eq!(without.route, with.route);
}

#[test]
fn test_nested_optionals_expand_to_three_variants() {
    let routes = collection([get("/a[/b[/c]]", "abc")]);
    let trie = compile(&routes);
    assert_eq!(trie.entries, 3);

    let a = trie.root.literal_child("a").unwrap();
    assert!(a.route().is_some());
    let b = a.literal_child("b").unwrap();
    assert!(b.route().is_some());
    let c = b.literal_child("c").unwrap();
    assert!(c.route().is_some());
}

#[test]
fn test_rules_are_recorded_on_the_terminal() {
    let routes = collection([get("/archive/:month(between(1,12))", "archive")]);
    let trie = compile(&routes);

    let terminal = trie
        .root
        .literal_child("archive")
        .unwrap()
        .variable_child()
        .unwrap();
    let vars = &terminal.route().unwrap().vars;
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].rules.len(), 1);
    assert_eq!(vars[0].rules[0].slug, "between");
    assert_eq!(vars[0].rules[0].params, vec!["1", "12"]);
}

#[test]
fn test_unknown_rule_fails_compilation() {
    let routes = collection([get("/users/:id(bogus)", "users.show")]);
    let err = compile_err(&routes);
    assert!(matches!(err, CompileError::Rule { .. }));
}

#[test]
fn test_bad_rule_parameters_fail_compilation() {
    let routes = collection([get("/archive/:m(between(1))", "archive")]);
    let err = compile_err(&routes);
    assert!(matches!(err, CompileError::Rule { .. }));
}

#[test]
fn test_partial_segment_variables_are_rejected() {
    let routes = collection([get("/files/:name.txt", "files.show")]);
    let err = compile_err(&routes);
    assert!(matches!(err, CompileError::UnsupportedTemplate { .. }));
}

#[test]
fn test_identical_shapes_keep_the_last_registration() {
    let routes = collection([get("/users/:id", "first"), get("/users/:x", "second")]);
    let trie = compile(&routes);

    let terminal = trie
        .root
        .literal_child("users")
        .unwrap()
        .variable_child()
        .unwrap();
    let entry = terminal.route().unwrap();
    assert_eq!(entry.route, 1);
    assert_eq!(entry.vars[0].name, "x");
    // the displaced terminal still consumed an entry id
    assert_eq!(trie.entries, 2);
}

#[test]
fn test_defaults_are_collected_from_the_whole_template() {
    let routes = collection([get("/users[/:id=me]", "users.show")]);
    let trie = compile(&routes);
    let expected: BTreeMap<String, String> =
        [("id".to_string(), "me".to_string())].into_iter().collect();
    assert_eq!(trie.routes[0].defaults, expected);
}

#[test]
fn test_host_templates_compile_to_patterns() {
    let route = RouteBuilder::get("/dash", "dash")
        .host(":tenant.example.com")
        .build()
        .unwrap();
    let trie = compile(&collection([route]));

    let pattern = trie.routes[0].host.as_ref().unwrap();
    assert_eq!(pattern.variants.len(), 1);
    assert_eq!(
        pattern.variants[0],
        vec![
            HostSegment::Variable {
                name: "tenant".to_string()
            },
            HostSegment::Literal {
                value: "example".to_string()
            },
            HostSegment::Literal {
                value: "com".to_string()
            },
        ]
    );
}

#[test]
fn test_optional_host_labels_expand_to_variants() {
    let route = RouteBuilder::get("/", "home")
        .host("[www.]example.com")
        .build()
        .unwrap();
    let trie = compile(&collection([route]));
    let pattern = trie.routes[0].host.as_ref().unwrap();
    assert_eq!(pattern.variants.len(), 2);
    assert_eq!(pattern.variants[0].len(), 2);
    assert_eq!(pattern.variants[1].len(), 3);
}

#[test]
fn test_host_variables_cannot_carry_rules() {
    let route = RouteBuilder::get("/", "home")
        .host(":tenant(alpha).example.com")
        .build()
        .unwrap();
    let registry = RuleRegistry::with_builtin_rules();
    let err = TrieCompiler::new(&registry)
        .compile(&collection([route]))
        .unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedTemplate { .. }));
}

#[test]
fn test_empty_host_labels_are_rejected() {
    let route = RouteBuilder::get("/", "home").host(".example.com").build().unwrap();
    let registry = RuleRegistry::with_builtin_rules();
    let err = TrieCompiler::new(&registry)
        .compile(&collection([route]))
        .unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedTemplate { .. }));
}

#[test]
fn test_compiling_twice_produces_identical_tries() {
    let routes = collection([
        get("/users/:id(int)", "users.show"),
        get("/books/:bookId[/chapters/:chapterId]", "books.chapters"),
    ]);
    assert_eq!(compile(&routes), compile(&routes));
}

#[test]
fn test_trie_embeds_the_collection_fingerprint() {
    let routes = collection([get("/a", "a")]);
    let trie = compile(&routes);
    assert_eq!(trie.fingerprint, routes.fingerprint());
}

#[test]
fn test_compiled_trie_round_trips_through_json() {
    let route = RouteBuilder::get("/users/:id(int)[/posts]", "users.show")
        .host(":tenant.example.com")
        .build()
        .unwrap();
    let trie = compile(&collection([route]));

    let json = serde_json::to_string(&trie).unwrap();
    let back: CompiledTrie = serde_json::from_str(&json).unwrap();
    assert_eq!(trie, back);
}

#[derive(Default)]
struct MemoryCache {
    stored: Mutex<Option<CompiledTrie>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl TrieCache for MemoryCache {
    fn get(&self) -> Result<Option<CompiledTrie>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.stored.lock().unwrap().clone())
    }

    fn set(&self, trie: &CompiledTrie) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock().unwrap() = Some(trie.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), CacheError> {
        *self.stored.lock().unwrap() = None;
        Ok(())
    }
}

struct BrokenCache;

impl TrieCache for BrokenCache {
    fn get(&self) -> Result<Option<CompiledTrie>, CacheError> {
        Err(CacheError::Corrupt {
            path: PathBuf::from("broken"),
            detail: "unit test".to_string(),
        })
    }

    fn set(&self, _trie: &CompiledTrie) -> Result<(), CacheError> {
        Err(CacheError::Corrupt {
            path: PathBuf::from("broken"),
            detail: "unit test".to_string(),
        })
    }

    fn flush(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[test]
fn test_cache_miss_compiles_and_writes_back() {
    let registry = RuleRegistry::with_builtin_rules();
    let compiler = TrieCompiler::new(&registry);
    let routes = collection([get("/a", "a")]);
    let cache = MemoryCache::default();

    let first = compiler.compile_with_cache(&routes, &cache).unwrap();
    assert_eq!(cache.gets.load(Ordering::SeqCst), 1);
    assert_eq!(cache.sets.load(Ordering::SeqCst), 1);

    let second = compiler.compile_with_cache(&routes, &cache).unwrap();
    assert_eq!(cache.gets.load(Ordering::SeqCst), 2);
    // the hit did not write again
    assert_eq!(cache.sets.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
}

#[test]
fn test_cache_contents_are_authoritative() {
    let registry = RuleRegistry::with_builtin_rules();
    let compiler = TrieCompiler::new(&registry);
    let cache = MemoryCache::default();

    let original = collection([get("/a", "a")]);
    compiler.compile_with_cache(&original, &cache).unwrap();

    // the collection changed, but this cache does no staleness check
    let changed = collection([get("/b", "b")]);
    let served = compiler.compile_with_cache(&changed, &cache).unwrap();
    assert_eq!(served.fingerprint, original.fingerprint());
}

#[test]
fn test_cache_failures_fail_the_compile() {
    let registry = RuleRegistry::with_builtin_rules();
    let compiler = TrieCompiler::new(&registry);
    let routes = collection([get("/a", "a")]);
    let err = compiler.compile_with_cache(&routes, &BrokenCache).unwrap_err();
    assert!(matches!(err, CompileError::Cache(_)));
}
