//! # Trie Cache Module
//!
//! Persistence for compiled tries. Compiling a large route collection
//! costs parse and validation work per route; a cache lets a process
//! skip all of it when the route set has not changed since the trie was
//! last written.
//!
//! The cache is authoritative: a stored trie is used as-is, without
//! re-deriving anything from the route collection. What keeps that
//! honest is the envelope every cache file carries:
//!
//! - a format version, bumped when the serialized layout changes, so a
//!   new binary silently recompiles instead of misreading old files
//! - the route-set fingerprint the trie was compiled from, so a keyed
//!   cache detects that the routes changed and recompiles
//!
//! Both mismatches are treated as a miss, logged at `warn`. A file that
//! fails to deserialize at all is an error, not a miss; silently
//! recompiling over a corrupt file would hide real problems such as a
//! truncated write or two processes sharing one path.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::route::RouteCollection;
use crate::trie::CompiledTrie;

/// Bump when [`CompiledTrie`]'s serialized layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Storage for compiled tries.
///
/// `get` returning `Ok(None)` means "no usable trie, compile one";
/// implementations decide what counts as unusable (absent, stale,
/// wrong version). Errors are reserved for storage that exists but
/// cannot be trusted.
pub trait TrieCache: Send + Sync {
    fn get(&self) -> Result<Option<CompiledTrie>, CacheError>;
    fn set(&self, trie: &CompiledTrie) -> Result<(), CacheError>;
    /// Removes the stored trie; absent storage is not an error.
    fn flush(&self) -> Result<(), CacheError>;
}

/// Error reading or writing a trie cache
#[derive(Debug)]
pub enum CacheError {
    Io { path: PathBuf, source: io::Error },
    /// The file exists but does not deserialize as a cache envelope
    Corrupt { path: PathBuf, detail: String },
    /// The trie failed to serialize
    Encode { detail: String },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io { path, source } => {
                write!(f, "trie cache io error at {}: {source}", path.display())
            }
            CacheError::Corrupt { path, detail } => {
                write!(f, "trie cache at {} is corrupt: {detail}", path.display())
            }
            CacheError::Encode { detail } => {
                write!(f, "failed to encode trie cache: {detail}")
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct CacheEnvelopeRef<'t> {
    format: u32,
    fingerprint: &'t str,
    trie: &'t CompiledTrie,
}

#[derive(Deserialize)]
struct CacheEnvelope {
    format: u32,
    fingerprint: String,
    trie: CompiledTrie,
}

/// JSON-on-disk [`TrieCache`].
///
/// An unkeyed cache (from [`FileTrieCache::new`]) accepts any stored
/// trie with the right format version; use it when something else
/// manages invalidation, such as a deployment step that flushes the
/// file. A keyed cache (from [`FileTrieCache::keyed`]) additionally
/// requires the stored fingerprint to match the route set it was built
/// with, turning route changes into automatic cache misses.
pub struct FileTrieCache {
    path: PathBuf,
    expected_fingerprint: Option<String>,
}

impl FileTrieCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            expected_fingerprint: None,
        }
    }

    pub fn keyed(path: impl Into<PathBuf>, routes: &RouteCollection) -> Self {
        Self {
            path: path.into(),
            expected_fingerprint: Some(routes.fingerprint()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TrieCache for FileTrieCache {
    fn get(&self) -> Result<Option<CompiledTrie>, CacheError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no trie cache file");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };
        let envelope: CacheEnvelope =
            serde_json::from_slice(&bytes).map_err(|e| CacheError::Corrupt {
                path: self.path.clone(),
                detail: e.to_string(),
            })?;
        if envelope.format != CACHE_FORMAT_VERSION {
            warn!(
                path = %self.path.display(),
                found = envelope.format,
                expected = CACHE_FORMAT_VERSION,
                "trie cache has a different format version; recompiling"
            );
            return Ok(None);
        }
        if let Some(expected) = &self.expected_fingerprint {
            if *expected != envelope.fingerprint {
                warn!(
                    path = %self.path.display(),
                    "route set changed since the trie cache was written; recompiling"
                );
                return Ok(None);
            }
        }
        debug!(path = %self.path.display(), "trie cache hit");
        Ok(Some(envelope.trie))
    }

    fn set(&self, trie: &CompiledTrie) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }
        let envelope = CacheEnvelopeRef {
            format: CACHE_FORMAT_VERSION,
            fingerprint: &trie.fingerprint,
            trie,
        };
        let bytes = serde_json::to_vec(&envelope).map_err(|e| CacheError::Encode {
            detail: e.to_string(),
        })?;
        fs::write(&self.path, &bytes).map_err(|e| self.io_error(e))?;
        info!(
            path = %self.path.display(),
            bytes = bytes.len(),
            routes = trie.route_count(),
            "wrote trie cache"
        );
        Ok(())
    }

    fn flush(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
