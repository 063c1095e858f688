//! # Hot Reload Module
//!
//! Live replacement of the route matcher when the trie cache file
//! changes on disk. This supports workflows where routes are compiled
//! out of band (a deploy step, an admin process, another instance) and
//! running processes pick the new trie up without restarting.
//!
//! ## Overview
//!
//! [`watch_cache`] installs a filesystem watcher on the cache file.
//! When the file is modified or recreated it:
//! - reads the file through [`FileTrieCache`]
//! - rebuilds a [`RouteMatcher`] against the process's rule registry
//! - stores the new matcher into a [`SharedMatcher`]
//!
//! In-flight requests keep the matcher they loaded; new requests see
//! the replacement on their next load.
//!
//! ## Error Handling
//!
//! If the new file is unreadable, corrupt, from a different format
//! version, or references rules this process has not registered:
//! - the failure is logged at `warn`
//! - the previous matcher stays active
//!
//! A bad write therefore never takes a serving process down.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use routrie::hot_reload::watch_cache;
//!
//! let shared = Arc::new(SharedMatcher::new(factory.matcher()?));
//! let watcher = watch_cache(
//!     "routrie_trie.json",
//!     shared.clone(),
//!     Arc::new(RuleRegistry::with_builtin_rules()),
//!     |matcher| println!("reloaded {} routes", matcher.route_count()),
//! )?;
//!
//! // Keep watcher alive for as long as reloads should happen
//! std::mem::forget(watcher);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use crate::cache::{FileTrieCache, TrieCache};
use crate::factory::SharedMatcher;
use crate::matcher::RouteMatcher;
use crate::rules::RuleRegistry;

/// Watch a trie cache file and swap a rebuilt [`RouteMatcher`] into
/// `shared` when it changes.
///
/// The cache is read unkeyed: a reload is expected to carry a new
/// fingerprint, because the point is that the route set changed. The
/// callback runs after each successful swap with the new matcher.
pub fn watch_cache<P, F>(
    cache_path: P,
    shared: Arc<SharedMatcher>,
    registry: Arc<RuleRegistry>,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
    F: FnMut(&RouteMatcher) + Send + 'static,
{
    let path: PathBuf = cache_path.as_ref().to_path_buf();
    let watch_path = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    let cache = FileTrieCache::new(&watch_path);
                    let trie = match cache.get() {
                        Ok(Some(trie)) => trie,
                        Ok(None) => {
                            warn!(
                                path = %watch_path.display(),
                                "hot-reload: cache file missing or stale; keeping active matcher"
                            );
                            return;
                        }
                        Err(e) => {
                            warn!(
                                path = %watch_path.display(),
                                error = %e,
                                "hot-reload: failed to read cache; keeping active matcher"
                            );
                            return;
                        }
                    };
                    match RouteMatcher::new(trie, &registry) {
                        Ok(matcher) => {
                            info!(
                                path = %watch_path.display(),
                                routes = matcher.route_count(),
                                fingerprint = matcher.fingerprint(),
                                "hot-reload: swapped in matcher from updated cache"
                            );
                            let matcher = Arc::new(matcher);
                            shared.store(Arc::clone(&matcher));
                            on_reload(&matcher);
                        }
                        Err(e) => {
                            warn!(
                                path = %watch_path.display(),
                                error = %e,
                                "hot-reload: cache references unknown rules; keeping active matcher"
                            );
                        }
                    }
                }
            }
            Err(e) => warn!(error = ?e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
