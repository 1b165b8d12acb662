//! Command implementations.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use owo_colors::OwoColorize;

use notecount_core::config::{Config, user_cache_dir};
use notecount_core::{CountCache, CountEngine, FsVault, RefreshSummary};

pub mod info;
pub mod scan;
pub mod show;
#[cfg(feature = "watch")]
pub mod watch;

/// Resolve the vault directory: `dir` relative to `cwd`, or `cwd` itself.
///
/// The result is canonical so that cache keys and watcher paths agree.
pub fn resolve_vault(dir: Option<&Utf8Path>, cwd: &Utf8Path) -> anyhow::Result<Utf8PathBuf> {
    let dir = dir.map_or_else(|| cwd.to_path_buf(), |d| cwd.join(d));
    let canonical = std::fs::canonicalize(dir.as_std_path())
        .with_context(|| format!("vault directory {dir} does not exist"))?;
    if !canonical.is_dir() {
        anyhow::bail!("{dir} is not a directory");
    }
    Utf8PathBuf::try_from(canonical)
        .map_err(|e| anyhow::anyhow!("vault path is not valid UTF-8: {}", e.into_path_buf().display()))
}

/// Where the persisted cache for `vault` lives.
///
/// `cache_file` from the config wins; otherwise one file per vault under the
/// user cache directory. `None` when no cache directory is available.
pub fn cache_path(config: &Config, vault: &Utf8Path) -> Option<Utf8PathBuf> {
    if let Some(path) = &config.cache_file {
        return Some(path.clone());
    }
    let key: String = vault
        .as_str()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let key = key.trim_matches('-');
    let key = if key.is_empty() { "root" } else { key };
    Some(user_cache_dir()?.join("vaults").join(format!("{key}.json")))
}

/// A single-threaded runtime: rebuilds are cooperative and never run in parallel.
pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")
}

/// Create an engine for `vault`, seeded from the persisted cache when it is
/// usable and rebuilt from scratch otherwise.
///
/// Returns the rebuild summary when a rebuild ran.
pub async fn open_engine(
    vault: FsVault,
    config: &Config,
    cache_file: Option<&Utf8Path>,
) -> anyhow::Result<(CountEngine<FsVault>, Option<RefreshSummary>)> {
    let cached = match cache_file {
        Some(path) => match CountCache::load(path, &config.counting) {
            Ok(load) if !load.needs_rebuild() => Some(load.cache),
            Ok(load) => {
                tracing::debug!(
                    missing = load.missing,
                    rules_changed = load.rules_changed,
                    discarded = load.discarded,
                    "cache unusable, rebuilding"
                );
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable cache");
                None
            }
        },
        None => None,
    };

    if let Some(cache) = cached {
        return Ok((CountEngine::with_cache(vault, config.counting.clone(), cache), None));
    }

    let mut engine = CountEngine::new(vault, config.counting.clone());
    let summary = engine
        .refresh_all()
        .await
        .context("failed to scan vault")?;
    if let Some(path) = cache_file {
        save_cache(&engine, path);
    }
    Ok((engine, Some(summary)))
}

/// Persist the engine's cache with the rules it was counted under, logging
/// rather than failing: counts are still shown.
pub fn save_cache(engine: &CountEngine<FsVault>, path: &Utf8Path) {
    if let Err(e) = engine.cache().save(path, engine.config()) {
        tracing::warn!(error = %e, "failed to save cache");
    }
}

/// Tell the user which notes were skipped.
pub fn report_failures(summary: &RefreshSummary) {
    for failure in &summary.failures {
        eprintln!(
            "{} skipped {}: {}",
            "warning:".yellow().bold(),
            failure.path,
            failure.reason
        );
    }
}
