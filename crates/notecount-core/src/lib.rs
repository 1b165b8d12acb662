//! Core library for notecount.
//!
//! Counts words, characters, pages, links, and embeds in a vault of Markdown
//! notes, rolls the counts up through every folder to the vault root, and
//! keeps them current as notes change.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading and the counting rules
//! - [`normalize`] - Separating countable prose from metadata and markup
//! - [`metrics`] - Word, character, page, and reading-time calculations
//! - [`record`] - Per-note count records
//! - [`aggregate`] - Folder roll-ups
//! - [`cache`] - The path-keyed cache and its persisted form
//! - [`vault`] - Note sources on disk and in memory
//! - [`engine`] - Full rebuilds and incremental updates
//! - [`schedule`] - Debouncing and single-flight rebuilds for live events
//! - [`error`] - Error types and result aliases
//!
//! # Quick Start
//!
//! ```no_run
//! use notecount_core::{ConfigLoader, CountEngine, FsVault};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let (config, _sources) = ConfigLoader::new().with_user_config(true).load()?;
//! let vault = FsVault::new("/path/to/vault", &config);
//! let mut engine = CountEngine::new(vault, config.counting.clone());
//! engine.refresh_all().await?;
//!
//! if let Some(root) = engine.get("/") {
//!     println!("{} words in {} notes", root.word_count, root.note_count);
//! }
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod markdown;
pub mod metrics;
pub mod normalize;
pub mod record;
pub mod schedule;
pub mod vault;

pub use cache::{CacheLoad, CountCache, ROOT};
pub use config::{Config, ConfigLoader, ConfigSources, CountingConfig, LogLevel, Metric};
pub use engine::{CountEngine, FileFailure, RefreshSummary, StructuralChange, UpdateOutcome};
pub use error::{CacheError, ConfigError, ConfigResult, VaultError, VaultResult};
pub use record::{CountRecord, FileMetadata, build_record};
pub use vault::{FsVault, MemoryVault, VaultEntry, VaultListing, VaultSource};
