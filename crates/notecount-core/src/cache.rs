//! Path-keyed count cache.
//!
//! Keys are vault-relative paths with forward slashes and no leading or
//! trailing slash; the vault root is [`ROOT`]. Every ancestor folder of a
//! cached note has an entry, and a folder's record is always the
//! [`aggregate`] of its direct children.
//!
//! Records are shared behind [`Arc`] so a recount that leaves a record alone
//! keeps the very same allocation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use camino::Utf8Path;
use serde::Serialize;
use serde_json::Value;

use crate::aggregate::aggregate;
use crate::config::CountingConfig;
use crate::error::{CacheError, CacheResult};
use crate::record::CountRecord;

/// Cache key of the vault root.
pub const ROOT: &str = "/";

/// Version of the persisted cache layout. Bump when [`CountRecord`] changes.
pub const CACHE_VERSION: u32 = 2;

/// Normalize a path into cache-key form.
///
/// Backslashes become slashes, `.` segments and repeated slashes are dropped,
/// and an empty result is the root.
pub fn normalize_path(path: &str) -> String {
    let joined = path
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        ROOT.to_string()
    } else {
        joined
    }
}

/// The parent folder key of a normalized path, `None` for the root.
pub fn parent_path(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    Some(path.rsplit_once('/').map_or(ROOT, |(parent, _)| parent))
}

/// All ancestor folder keys of a normalized path, nearest first, ending at the root.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(parent_path(path), |p| parent_path(p))
}

fn depth(path: &str) -> usize {
    if path == ROOT {
        0
    } else {
        path.matches('/').count() + 1
    }
}

/// Mapping from path to [`CountRecord`] for notes and folders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountCache {
    entries: BTreeMap<String, Arc<CountRecord>>,
}

/// On-disk layout of a persisted cache.
#[derive(Serialize)]
struct PersistedCache<'a> {
    version: u32,
    counting: &'a CountingConfig,
    entries: &'a BTreeMap<String, Arc<CountRecord>>,
}

/// Outcome of reading a persisted cache.
#[derive(Debug, Default)]
pub struct CacheLoad {
    /// Entries that matched the current record shape.
    pub cache: CountCache,
    /// Entries dropped because their shape did not match.
    pub discarded: usize,
    /// No cache file existed yet.
    pub missing: bool,
    /// The file was written by an incompatible version.
    pub version_mismatch: bool,
    /// The records were counted under different counting rules.
    pub rules_changed: bool,
}

impl CacheLoad {
    /// Whether the caller should run a full rebuild before trusting the cache.
    pub const fn needs_rebuild(&self) -> bool {
        self.missing || self.version_mismatch || self.rules_changed || self.discarded > 0
    }
}

impl CountCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a note or folder. Unknown paths have no data.
    pub fn get(&self, path: &str) -> Option<&CountRecord> {
        self.entries.get(&normalize_path(path)).map(Arc::as_ref)
    }

    /// Look up a record, sharing the cached allocation.
    pub fn get_shared(&self, path: &str) -> Option<Arc<CountRecord>> {
        self.entries.get(&normalize_path(path)).cloned()
    }

    /// The whole-vault aggregate.
    pub fn root(&self) -> Option<&CountRecord> {
        self.entries.get(ROOT).map(Arc::as_ref)
    }

    /// Number of cached notes and folders.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(path, record)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CountRecord)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Replace the record at `path`, returning the previous one.
    pub fn insert(&mut self, path: &str, record: CountRecord) -> Option<Arc<CountRecord>> {
        self.entries.insert(normalize_path(path), Arc::new(record))
    }

    /// Remove the record at `path`.
    pub fn remove(&mut self, path: &str) -> Option<Arc<CountRecord>> {
        self.entries.remove(&normalize_path(path))
    }

    /// Direct children of a folder, in path order.
    pub fn children<'a>(
        &'a self,
        folder: &str,
    ) -> impl Iterator<Item = (&'a str, &'a CountRecord)> + 'a {
        let folder = normalize_path(folder);
        let prefix = if folder == ROOT {
            String::new()
        } else {
            format!("{folder}/")
        };
        let len = prefix.len();
        self.entries
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(prefix.as_str()))
            .filter(move |(key, _)| {
                let rest = &key[len..];
                key.as_str() != ROOT && !rest.is_empty() && !rest.contains('/')
            })
            .map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Recompute one folder from its direct children.
    pub fn reaggregate(&mut self, folder: &str) {
        let folder = normalize_path(folder);
        let record = aggregate(self.children(&folder).map(|(_, record)| record));
        self.entries.insert(folder, Arc::new(record));
    }

    /// Recompute every ancestor of `path`, nearest first, up to the root.
    ///
    /// Returns how many folders were recomputed. Siblings are untouched.
    pub fn reaggregate_ancestors(&mut self, path: &str) -> usize {
        let path = normalize_path(path);
        let folders: Vec<String> = ancestors(&path).map(str::to_string).collect();
        for folder in &folders {
            self.reaggregate(folder);
        }
        folders.len()
    }

    /// Recompute every folder bottom-up, creating missing ancestors and the root.
    ///
    /// Returns how many folders were recomputed.
    pub fn aggregate_all(&mut self) -> usize {
        let mut folders: BTreeSet<String> = BTreeSet::new();
        folders.insert(ROOT.to_string());
        for (path, record) in &self.entries {
            if record.is_directory {
                folders.insert(path.clone());
            }
            folders.extend(ancestors(path).map(str::to_string));
        }

        let mut ordered: Vec<String> = folders.into_iter().collect();
        ordered.sort_by_key(|folder| std::cmp::Reverse(depth(folder)));
        for folder in &ordered {
            self.reaggregate(folder);
        }
        ordered.len()
    }

    /// Write the cache as JSON, replacing any previous file atomically.
    ///
    /// `counting` is stored alongside the records so a later load under
    /// different rules knows they are stale.
    #[tracing::instrument(skip(self, counting), fields(entries = self.entries.len()))]
    pub fn save(&self, path: &Utf8Path, counting: &CountingConfig) -> CacheResult<()> {
        let io_err = |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let persisted = PersistedCache {
            version: CACHE_VERSION,
            counting,
            entries: &self.entries,
        };
        let json = serde_json::to_vec(&persisted).map_err(|source| CacheError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        tracing::debug!(%path, "cache saved");
        Ok(())
    }

    /// Read a persisted cache, dropping entries whose shape is out of date.
    ///
    /// A missing file, a different layout version, counting rules other than
    /// `counting`, or any dropped entry makes [`CacheLoad::needs_rebuild`]
    /// true. Only unreadable files and invalid JSON are errors.
    #[tracing::instrument(skip(counting))]
    pub fn load(path: &Utf8Path, counting: &CountingConfig) -> CacheResult<CacheLoad> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CacheLoad {
                    missing: true,
                    ..CacheLoad::default()
                });
            }
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let value: Value = serde_json::from_slice(&bytes).map_err(|source| CacheError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_value(value, counting))
    }

    fn from_value(mut value: Value, counting: &CountingConfig) -> CacheLoad {
        let version = value.get("version").and_then(Value::as_u64);
        if version != Some(u64::from(CACHE_VERSION)) {
            tracing::warn!(?version, expected = CACHE_VERSION, "cache version mismatch");
            return CacheLoad {
                version_mismatch: true,
                ..CacheLoad::default()
            };
        }

        let stored = value
            .get_mut("counting")
            .map(Value::take)
            .and_then(|raw| serde_json::from_value::<CountingConfig>(raw).ok());
        if stored.as_ref() != Some(counting) {
            tracing::warn!("cache was counted under other rules");
            return CacheLoad {
                rules_changed: true,
                ..CacheLoad::default()
            };
        }

        let Some(Value::Object(raw_entries)) = value.get_mut("entries").map(Value::take) else {
            return CacheLoad {
                version_mismatch: true,
                ..CacheLoad::default()
            };
        };

        let mut load = CacheLoad::default();
        for (path, raw) in raw_entries {
            match serde_json::from_value::<CountRecord>(raw) {
                Ok(record) => {
                    load.cache.entries.insert(path, Arc::new(record));
                }
                Err(e) => {
                    tracing::debug!(%path, error = %e, "discarding cache entry");
                    load.discarded += 1;
                }
            }
        }
        if load.discarded > 0 {
            tracing::warn!(discarded = load.discarded, "cache entries had an outdated shape");
        }
        load
    }
}
