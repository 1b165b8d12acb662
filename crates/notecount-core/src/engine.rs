//! The incremental counting engine.
//!
//! [`CountEngine`] owns the cache and the counting rules and reacts to three
//! triggers:
//!
//! - a full rebuild ([`CountEngine::refresh_all`]) recounts every note,
//!   aggregates every folder, and swaps the whole cache in one step;
//! - a content change ([`CountEngine::update_one`]) recounts one note and
//!   re-aggregates only its ancestor folders;
//! - a structural change ([`CountEngine::on_structural_change`]) falls back
//!   to a full rebuild, since paths and folder membership moved.
//!
//! A rebuild is split into [`begin_rebuild`](CountEngine::begin_rebuild),
//! [`scan`](CountEngine::scan) and [`commit`](CountEngine::commit) so that a
//! driver can keep listening for events while the scan is suspended on reads.
//! Every rebuild carries a generation number, and a rebuild older than the
//! last committed one is dropped instead of overwriting newer results.

use serde::Serialize;

use crate::cache::{CountCache, normalize_path};
use crate::config::CountingConfig;
use crate::error::{VaultError, VaultResult};
use crate::record::{CountRecord, build_record};
use crate::vault::VaultSource;

/// A note that could not be counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    /// Vault-relative path.
    pub path: String,
    /// Human-readable cause.
    pub reason: String,
}

impl FileFailure {
    fn new(path: &str, error: &VaultError) -> Self {
        Self {
            path: path.to_string(),
            reason: error.to_string(),
        }
    }
}

/// What a full rebuild did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Generation of the rebuild.
    pub generation: u64,
    /// Notes counted.
    pub notes: usize,
    /// Folders aggregated, the root included.
    pub folders: usize,
    /// Notes and folders skipped because they could not be read.
    pub failures: Vec<FileFailure>,
    /// False when a newer rebuild had already been committed.
    pub committed: bool,
}

/// Handle for a rebuild that has been started but not scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildTicket {
    generation: u64,
}

impl RebuildTicket {
    /// The rebuild's generation number.
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// A scanned tree waiting to be committed.
#[derive(Debug)]
pub struct Rebuild {
    generation: u64,
    cache: CountCache,
    notes: usize,
    folders: usize,
    failures: Vec<FileFailure>,
}

impl Rebuild {
    /// The rebuild's generation number.
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of a single-note update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The note was recounted.
    Updated {
        /// Vault-relative path of the note.
        path: String,
        /// How many ancestor folders were re-aggregated.
        folders: usize,
    },
    /// The note no longer exists and was dropped from the cache.
    Removed {
        /// Vault-relative path of the note.
        path: String,
    },
    /// The note could not be read and was dropped from the totals.
    Failed(FileFailure),
}

/// A change to the shape of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralChange {
    /// A note or folder appeared.
    Created(String),
    /// A note or folder disappeared.
    Deleted(String),
    /// A note or folder moved.
    Renamed {
        /// Previous vault-relative path.
        from: String,
        /// New vault-relative path.
        to: String,
    },
}

/// Counts a vault and keeps the counts current.
#[derive(Debug)]
pub struct CountEngine<S> {
    source: S,
    config: CountingConfig,
    cache: CountCache,
    started: u64,
    committed: u64,
}

impl<S: VaultSource> CountEngine<S> {
    /// Create an engine with an empty cache.
    ///
    /// `config` must already be validated: rates are positive and finite.
    pub fn new(source: S, config: CountingConfig) -> Self {
        Self::with_cache(source, config, CountCache::new())
    }

    /// Create an engine seeded with a previously persisted cache.
    pub const fn with_cache(source: S, config: CountingConfig, cache: CountCache) -> Self {
        Self {
            source,
            config,
            cache,
            started: 0,
            committed: 0,
        }
    }

    /// The current counts.
    pub const fn cache(&self) -> &CountCache {
        &self.cache
    }

    /// Consume the engine, keeping its counts.
    pub fn into_cache(self) -> CountCache {
        self.cache
    }

    /// The counting rules in use.
    pub const fn config(&self) -> &CountingConfig {
        &self.config
    }

    /// The note source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Look up a note or folder. Unknown paths have no data.
    pub fn get(&self, path: &str) -> Option<&CountRecord> {
        self.cache.get(path)
    }

    /// Generation of the last committed rebuild, 0 before the first.
    pub const fn committed_generation(&self) -> u64 {
        self.committed
    }

    /// Reserve a generation number for a new rebuild.
    pub const fn begin_rebuild(&mut self) -> RebuildTicket {
        self.started += 1;
        RebuildTicket {
            generation: self.started,
        }
    }

    /// Count every note and aggregate every folder into a fresh cache.
    ///
    /// Notes and subtrees that cannot be read are skipped and reported. Only
    /// a vault root that cannot be listed is an error. Yields to the runtime between notes.
    #[tracing::instrument(skip(self), fields(generation = ticket.generation))]
    pub async fn scan(&self, ticket: RebuildTicket) -> VaultResult<Rebuild> {
        let listing = self.source.list().await?;
        let mut cache = CountCache::new();
        let mut failures = listing.skipped;
        let mut notes = 0;

        for entry in &listing.entries {
            if entry.is_dir {
                cache.insert(&entry.path, CountRecord::empty_folder());
                continue;
            }
            match self.count_note(&entry.path).await {
                Ok(record) => {
                    cache.insert(&entry.path, record);
                    notes += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %entry.path, error = %e, "skipping unreadable note");
                    failures.push(FileFailure::new(&entry.path, &e));
                }
            }
            tokio::task::yield_now().await;
        }

        let folders = cache.aggregate_all();
        Ok(Rebuild {
            generation: ticket.generation,
            cache,
            notes,
            folders,
            failures,
        })
    }

    /// Swap a scanned tree into place unless a newer one already landed.
    pub fn commit(&mut self, rebuild: Rebuild) -> RefreshSummary {
        let Rebuild {
            generation,
            cache,
            notes,
            folders,
            failures,
        } = rebuild;

        if generation < self.committed {
            tracing::warn!(
                generation,
                committed = self.committed,
                "discarding stale rebuild"
            );
            return RefreshSummary {
                generation,
                notes,
                folders,
                failures,
                committed: false,
            };
        }

        self.cache = cache;
        self.committed = generation;
        tracing::info!(
            generation,
            notes,
            folders,
            failures = failures.len(),
            "rebuild committed"
        );
        RefreshSummary {
            generation,
            notes,
            folders,
            failures,
            committed: true,
        }
    }

    /// Recount the whole vault.
    pub async fn refresh_all(&mut self) -> VaultResult<RefreshSummary> {
        let ticket = self.begin_rebuild();
        let rebuild = self.scan(ticket).await?;
        Ok(self.commit(rebuild))
    }

    /// Recount one note and re-aggregate its ancestors up to the root.
    ///
    /// Sibling notes and folders keep their records untouched. A note that
    /// vanished or became unreadable is dropped from the totals.
    #[tracing::instrument(skip(self))]
    pub async fn update_one(&mut self, path: &str) -> UpdateOutcome {
        let key = normalize_path(path);
        match self.count_note(&key).await {
            Ok(record) => {
                self.cache.insert(&key, record);
                let folders = self.cache.reaggregate_ancestors(&key);
                tracing::debug!(folders, "note updated");
                UpdateOutcome::Updated { path: key, folders }
            }
            Err(VaultError::NotFound(_)) => {
                if self.cache.remove(&key).is_some() {
                    self.cache.reaggregate_ancestors(&key);
                }
                tracing::debug!("note is gone");
                UpdateOutcome::Removed { path: key }
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable note");
                if self.cache.remove(&key).is_some() {
                    self.cache.reaggregate_ancestors(&key);
                }
                UpdateOutcome::Failed(FileFailure::new(&key, &e))
            }
        }
    }

    /// Entry point for content modifications.
    pub async fn on_file_changed(&mut self, path: &str) -> UpdateOutcome {
        self.update_one(path).await
    }

    /// Entry point for creations, deletions, and renames.
    pub async fn on_structural_change(
        &mut self,
        change: &StructuralChange,
    ) -> VaultResult<RefreshSummary> {
        tracing::debug!(?change, "structural change");
        self.refresh_all().await
    }

    /// Swap the counting rules, rebuilding when they differ.
    ///
    /// Returns `None` when the rules are unchanged.
    pub async fn reconfigure(
        &mut self,
        config: CountingConfig,
    ) -> VaultResult<Option<RefreshSummary>> {
        if config == self.config {
            return Ok(None);
        }
        self.config = config;
        self.refresh_all().await.map(Some)
    }

    async fn count_note(&self, path: &str) -> VaultResult<CountRecord> {
        let raw = self.source.read(path).await?;
        let metadata = self.source.metadata(path).await?;
        Ok(build_record(path, &raw, &metadata, &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ROOT;
    use crate::record::FileMetadata;
    use crate::vault::MemoryVault;
    use std::sync::Arc;

    fn vault() -> Arc<MemoryVault> {
        let vault = Arc::new(MemoryVault::new());
        vault.put("book/ch1.md", "one two three");
        vault.put("book/ch2.md", "four five");
        vault.put("notes/idea.md", "six");
        vault.put_folder("empty");
        vault
    }

    #[tokio::test]
    async fn refresh_counts_everything() {
        let mut engine = CountEngine::new(vault(), CountingConfig::default());
        let summary = engine.refresh_all().await.unwrap();

        assert!(summary.committed);
        assert_eq!(summary.generation, 1);
        assert_eq!(summary.notes, 3);
        assert_eq!(summary.folders, 4);
        assert!(summary.failures.is_empty());
        assert_eq!(engine.get(ROOT).unwrap().word_count, 6);
        assert_eq!(engine.get("book").unwrap().note_count, 2);
        assert_eq!(engine.get("empty").unwrap(), &CountRecord::empty_folder());
    }

    #[tokio::test]
    async fn update_one_reads_only_that_note() {
        let source = vault();
        let mut engine = CountEngine::new(Arc::clone(&source), CountingConfig::default());
        engine.refresh_all().await.unwrap();
        let before = source.reads();

        source.put("book/ch2.md", "four five plus three more");
        let outcome = engine.update_one("book/ch2.md").await;

        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                path: "book/ch2.md".to_string(),
                folders: 2
            }
        );
        assert_eq!(source.reads() - before, 1);
        assert_eq!(engine.get("book").unwrap().word_count, 8);
        assert_eq!(engine.get(ROOT).unwrap().word_count, 9);
    }

    #[tokio::test]
    async fn unreadable_note_is_skipped_not_fatal() {
        let source = vault();
        source.put_unreadable("book/locked.md");
        let mut engine = CountEngine::new(source, CountingConfig::default());

        let summary = engine.refresh_all().await.unwrap();

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].path, "book/locked.md");
        assert!(engine.get("book/locked.md").is_none());
        assert_eq!(engine.get("book").unwrap().note_count, 2);
    }

    #[tokio::test]
    async fn unlistable_folder_is_reported_not_fatal() {
        let source = vault();
        source.put_unlistable("locked");
        let mut engine = CountEngine::new(source, CountingConfig::default());

        let summary = engine.refresh_all().await.unwrap();

        assert!(summary.committed);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].path, "locked");
        assert!(engine.get("locked").is_none());
        assert_eq!(engine.get(ROOT).unwrap().word_count, 6);
    }

    #[tokio::test]
    async fn update_of_deleted_note_removes_it() {
        let source = vault();
        let mut engine = CountEngine::new(Arc::clone(&source), CountingConfig::default());
        engine.refresh_all().await.unwrap();

        source.remove("notes/idea.md");
        let outcome = engine.update_one("notes/idea.md").await;

        assert!(matches!(outcome, UpdateOutcome::Removed { .. }));
        assert!(engine.get("notes/idea.md").is_none());
        assert_eq!(engine.get("notes").unwrap().word_count, 0);
        assert_eq!(engine.get(ROOT).unwrap().word_count, 5);
    }

    #[tokio::test]
    async fn update_of_unreadable_note_drops_it_from_totals() {
        let source = vault();
        let mut engine = CountEngine::new(Arc::clone(&source), CountingConfig::default());
        engine.refresh_all().await.unwrap();

        source.put_unreadable("book/ch1.md");
        let outcome = engine.update_one("book/ch1.md").await;

        assert!(matches!(outcome, UpdateOutcome::Failed(ref f) if f.path == "book/ch1.md"));
        assert_eq!(engine.get("book").unwrap().word_count, 2);
    }

    #[tokio::test]
    async fn stale_rebuild_is_not_committed() {
        let source = vault();
        let mut engine = CountEngine::new(Arc::clone(&source), CountingConfig::default());

        let older = engine.begin_rebuild();
        let newer = engine.begin_rebuild();
        let old_scan = engine.scan(older).await.unwrap();

        source.put("late.md", "arrived after the first scan");
        let new_scan = engine.scan(newer).await.unwrap();
        assert!(engine.commit(new_scan).committed);

        let summary = engine.commit(old_scan);
        assert!(!summary.committed);
        assert_eq!(engine.committed_generation(), 2);
        assert!(engine.get("late.md").is_some());
    }

    #[tokio::test]
    async fn structural_change_rebuilds() {
        let source = vault();
        let mut engine = CountEngine::new(Arc::clone(&source), CountingConfig::default());
        engine.refresh_all().await.unwrap();

        source.rename("book", "novel");
        let summary = engine
            .on_structural_change(&StructuralChange::Renamed {
                from: "book".to_string(),
                to: "novel".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(summary.generation, 2);
        assert!(engine.get("book").is_none());
        assert_eq!(engine.get("novel").unwrap().word_count, 5);
    }

    #[tokio::test]
    async fn reconfigure_rebuilds_only_on_change() {
        let source = Arc::new(MemoryVault::new());
        source.put_with(
            "zh.md",
            "我们今天学习中文写作",
            FileMetadata {
                created: 1,
                modified: 2,
                size: 30,
            },
        );
        let mut engine = CountEngine::new(source, CountingConfig::default());
        engine.refresh_all().await.unwrap();
        assert_eq!(engine.get("zh.md").unwrap().word_count, 1);

        assert!(engine.reconfigure(CountingConfig::default()).await.unwrap().is_none());

        let cjk = CountingConfig {
            word_count_type: crate::config::WordCountType::Cjk,
            ..CountingConfig::default()
        };
        let summary = engine.reconfigure(cjk).await.unwrap().unwrap();
        assert!(summary.committed);
        assert_eq!(engine.get("zh.md").unwrap().word_count, 10);
    }
}
