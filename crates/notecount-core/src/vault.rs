//! Note sources.
//!
//! The engine never touches the filesystem directly. It asks a
//! [`VaultSource`] for the tree listing, each note's text, and its metadata.
//! [`FsVault`] serves a directory on disk; [`MemoryVault`] serves an
//! in-memory tree and is handy for tests and embedding.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

use crate::cache::normalize_path;
use crate::config::Config;
use crate::engine::FileFailure;
use crate::error::{VaultError, VaultResult};
use crate::record::FileMetadata;

/// One item of a vault listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VaultEntry {
    /// Vault-relative path with forward slashes.
    pub path: String,
    /// Whether the entry is a folder.
    pub is_dir: bool,
}

impl VaultEntry {
    /// A note entry.
    pub fn note(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }

    /// A folder entry.
    pub fn folder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }
}

/// A tree listing plus the paths that could not be walked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultListing {
    /// Notes and folders, excluding the root itself.
    pub entries: Vec<VaultEntry>,
    /// Subtrees left out because they could not be read.
    pub skipped: Vec<FileFailure>,
}

/// Supplies note text, metadata, and the tree listing.
///
/// Reads are the only suspension points of a rebuild.
pub trait VaultSource {
    /// Every note and folder beneath the root, excluding the root itself.
    ///
    /// Only an unreadable root is an error; anything below it that cannot be
    /// read is reported in [`VaultListing::skipped`].
    fn list(&self) -> impl Future<Output = VaultResult<VaultListing>>;

    /// Raw text of one note.
    fn read(&self, path: &str) -> impl Future<Output = VaultResult<String>>;

    /// Filesystem metadata of one note.
    fn metadata(&self, path: &str) -> impl Future<Output = VaultResult<FileMetadata>>;
}

impl<T: VaultSource> VaultSource for Arc<T> {
    fn list(&self) -> impl Future<Output = VaultResult<VaultListing>> {
        (**self).list()
    }

    fn read(&self, path: &str) -> impl Future<Output = VaultResult<String>> {
        (**self).read(path)
    }

    fn metadata(&self, path: &str) -> impl Future<Output = VaultResult<FileMetadata>> {
        (**self).metadata(path)
    }
}

/// A vault rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: Utf8PathBuf,
    extensions: Vec<String>,
    exclude: GlobSet,
}

impl FsVault {
    /// Serve the notes under `root`, using the extension and exclude
    /// settings from `config`.
    ///
    /// Invalid exclude patterns are logged and ignored. A pattern ending in
    /// `/**` also excludes the folder it names.
    pub fn new(root: impl Into<Utf8PathBuf>, config: &Config) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude {
            let folder = pattern.strip_suffix("/**").filter(|dir| !dir.is_empty());
            for pattern in std::iter::once(pattern.as_str()).chain(folder) {
                match Glob::new(pattern) {
                    Ok(glob) => {
                        builder.add(glob);
                    }
                    Err(e) => {
                        tracing::warn!(%pattern, error = %e, "ignoring invalid exclude pattern");
                    }
                }
            }
        }
        let exclude = builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "exclude patterns could not be combined, excluding nothing");
            GlobSet::empty()
        });

        Self {
            root: root.into(),
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            exclude,
        }
    }

    /// The vault's root directory.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Absolute location of a vault-relative path.
    pub fn absolute(&self, path: &str) -> Utf8PathBuf {
        let key = normalize_path(path);
        if key == crate::cache::ROOT {
            self.root.clone()
        } else {
            self.root.join(key)
        }
    }

    /// Vault-relative key of an absolute path, `None` when it lies outside
    /// the vault or is not UTF-8.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let path = Utf8Path::from_path(path)?;
        let rel = path.strip_prefix(&self.root).ok()?;
        Some(normalize_path(rel.as_str()))
    }

    /// Whether a vault-relative path is a note this vault serves.
    pub fn is_note(&self, path: &str) -> bool {
        let rel = Utf8Path::new(path);
        let has_extension = rel.extension().is_some_and(|ext| {
            self.extensions
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(ext))
        });
        has_extension && !self.is_hidden(path) && !self.is_excluded(path)
    }

    /// Whether any segment of a vault-relative path starts with a dot.
    pub fn is_hidden(&self, path: &str) -> bool {
        path.split('/').any(|segment| segment.starts_with('.') && segment != ".")
    }

    /// Whether a vault-relative path matches an exclude pattern.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.is_match(path)
    }

    fn key_of(&self, entry: &DirEntry) -> Option<String> {
        let key = self.relative(entry.path());
        if key.is_none() {
            tracing::debug!(path = %entry.path().display(), "skipping non-UTF-8 path");
        }
        key
    }

    fn keep(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        let hidden = entry.file_name().to_str().is_none_or(|name| name.starts_with('.'));
        if hidden {
            return false;
        }
        self.key_of(entry)
            .is_some_and(|key| !self.is_excluded(&key))
    }
}

impl VaultSource for FsVault {
    #[tracing::instrument(skip(self), fields(root = %self.root))]
    async fn list(&self) -> VaultResult<VaultListing> {
        let mut listing = VaultListing::default();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.keep(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) if source.depth() == 0 => {
                    return Err(VaultError::Walk {
                        root: self.root.clone(),
                        source,
                    });
                }
                Err(e) => {
                    let path = match e.path() {
                        Some(path) => self
                            .relative(path)
                            .unwrap_or_else(|| path.display().to_string()),
                        None => String::new(),
                    };
                    tracing::warn!(%path, error = %e, "skipping unreadable path");
                    // The folder itself was listed before descending failed.
                    listing.entries.retain(|listed| listed.path != path);
                    listing.skipped.push(FileFailure {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let Some(key) = self.key_of(&entry) else {
                continue;
            };
            if entry.file_type().is_dir() {
                listing.entries.push(VaultEntry::folder(key));
            } else if entry.file_type().is_file() && self.is_note(&key) {
                listing.entries.push(VaultEntry::note(key));
            }
        }

        tracing::debug!(
            entries = listing.entries.len(),
            skipped = listing.skipped.len(),
            "listed vault"
        );
        Ok(listing)
    }

    async fn read(&self, path: &str) -> VaultResult<String> {
        let bytes = tokio::fs::read(self.absolute(path))
            .await
            .map_err(|source| io_error(path, source, |path, source| VaultError::Read { path, source }))?;
        String::from_utf8(bytes).map_err(|_| VaultError::NotUtf8 {
            path: path.to_string(),
        })
    }

    async fn metadata(&self, path: &str) -> VaultResult<FileMetadata> {
        let meta = tokio::fs::metadata(self.absolute(path))
            .await
            .map_err(|source| {
                io_error(path, source, |path, source| VaultError::Metadata { path, source })
            })?;
        Ok(FileMetadata {
            created: meta.created().map(epoch_millis).unwrap_or(0),
            modified: meta.modified().map(epoch_millis).unwrap_or(0),
            size: meta.len(),
        })
    }
}

fn io_error(
    path: &str,
    source: std::io::Error,
    wrap: impl FnOnce(String, std::io::Error) -> VaultError,
) -> VaultError {
    if source.kind() == std::io::ErrorKind::NotFound {
        VaultError::NotFound(path.to_string())
    } else {
        wrap(path.to_string(), source)
    }
}

/// Milliseconds since the Unix epoch, 0 for times before it.
#[allow(clippy::cast_possible_truncation)]
pub fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    Note { text: String, metadata: FileMetadata },
    Folder,
    Unreadable,
    Unlistable,
}

/// An in-memory vault.
///
/// Mutations take `&self` so a test can edit the tree while an engine holds
/// a reference to it.
#[derive(Debug, Default)]
pub struct MemoryVault {
    entries: Mutex<BTreeMap<String, MemoryEntry>>,
    reads: AtomicUsize,
}

impl MemoryVault {
    /// An empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, MemoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a note. Its size is the text length and its dates are unknown.
    pub fn put(&self, path: &str, text: &str) {
        let metadata = FileMetadata {
            size: text.len() as u64,
            ..FileMetadata::default()
        };
        self.put_with(path, text, metadata);
    }

    /// Add or replace a note with explicit metadata.
    pub fn put_with(&self, path: &str, text: &str, metadata: FileMetadata) {
        self.lock().insert(
            normalize_path(path),
            MemoryEntry::Note {
                text: text.to_string(),
                metadata,
            },
        );
    }

    /// Add an empty folder.
    pub fn put_folder(&self, path: &str) {
        self.lock().insert(normalize_path(path), MemoryEntry::Folder);
    }

    /// Add a note whose reads always fail.
    pub fn put_unreadable(&self, path: &str) {
        self.lock().insert(normalize_path(path), MemoryEntry::Unreadable);
    }

    /// Add a folder the listing cannot descend into.
    pub fn put_unlistable(&self, path: &str) {
        self.lock().insert(normalize_path(path), MemoryEntry::Unlistable);
    }

    /// Remove a note or a folder with everything beneath it.
    pub fn remove(&self, path: &str) {
        let key = normalize_path(path);
        let prefix = format!("{key}/");
        self.lock()
            .retain(|existing, _| *existing != key && !existing.starts_with(&prefix));
    }

    /// Move a note or folder, with everything beneath it.
    pub fn rename(&self, from: &str, to: &str) {
        let (from, to) = (normalize_path(from), normalize_path(to));
        let prefix = format!("{from}/");
        let mut entries = self.lock();
        let moved: Vec<String> = entries
            .keys()
            .filter(|key| **key == from || key.starts_with(&prefix))
            .cloned()
            .collect();
        for old in moved {
            if let Some(entry) = entries.remove(&old) {
                let new = format!("{to}{}", &old[from.len()..]);
                entries.insert(new, entry);
            }
        }
    }

    /// How many note reads have been served.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl VaultSource for MemoryVault {
    async fn list(&self) -> VaultResult<VaultListing> {
        let mut listing = VaultListing::default();
        for (path, entry) in self.lock().iter() {
            match entry {
                MemoryEntry::Unlistable => listing.skipped.push(FileFailure {
                    path: path.clone(),
                    reason: "permission denied".to_string(),
                }),
                MemoryEntry::Folder => listing.entries.push(VaultEntry::folder(path.clone())),
                MemoryEntry::Note { .. } | MemoryEntry::Unreadable => {
                    listing.entries.push(VaultEntry::note(path.clone()));
                }
            }
        }
        Ok(listing)
    }

    async fn read(&self, path: &str) -> VaultResult<String> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        match self.lock().get(&normalize_path(path)) {
            Some(MemoryEntry::Note { text, .. }) => Ok(text.clone()),
            Some(MemoryEntry::Unreadable) => Err(VaultError::Read {
                path: path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "unreadable"),
            }),
            Some(MemoryEntry::Folder | MemoryEntry::Unlistable) | None => {
                Err(VaultError::NotFound(path.to_string()))
            }
        }
    }

    async fn metadata(&self, path: &str) -> VaultResult<FileMetadata> {
        match self.lock().get(&normalize_path(path)) {
            Some(MemoryEntry::Note { metadata, .. }) => Ok(*metadata),
            Some(MemoryEntry::Unreadable) => Ok(FileMetadata::default()),
            Some(MemoryEntry::Folder | MemoryEntry::Unlistable) | None => {
                Err(VaultError::NotFound(path.to_string()))
            }
        }
    }
}
