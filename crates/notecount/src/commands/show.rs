//! Show command: counts for one note or folder.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use notecount_core::cache::normalize_path;
use notecount_core::config::{Config, Metric};
use notecount_core::{CountRecord, FsVault};

use crate::label::label;

/// Arguments for the `show` subcommand.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Note or folder, relative to the vault root or absolute
    pub path: Utf8PathBuf,

    /// Vault directory (defaults to the current directory)
    #[arg(long)]
    pub vault: Option<Utf8PathBuf>,

    /// Metrics to show instead of the configured ones (comma-separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub metrics: Option<Vec<Metric>>,
}

#[derive(Serialize)]
struct ShowReport<'a> {
    path: &'a str,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<&'a CountRecord>,
}

/// Print the label for one path, or "no data" when the vault has no such note.
#[instrument(name = "cmd_show", skip_all, fields(path = %args.path))]
pub fn cmd_show(
    args: ShowArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    let root = super::resolve_vault(args.vault.as_deref(), cwd)?;
    let vault = FsVault::new(&root, config);
    let key = vault_key(&vault, &args.path, cwd);
    debug!(%root, %key, "executing show command");

    let cache_file = super::cache_path(config, &root);
    let (engine, summary) =
        super::runtime()?.block_on(super::open_engine(vault, config, cache_file.as_deref()))?;
    if let Some(summary) = &summary
        && !global_json
    {
        super::report_failures(summary);
    }

    let record = engine.get(&key);
    let text = record.map(|record| {
        let metrics = args.metrics.as_deref().unwrap_or(if record.is_directory {
            config.folder_metrics.as_slice()
        } else {
            config.note_metrics.as_slice()
        });
        label(record, metrics, &config.counting)
    });

    if global_json {
        let report = ShowReport {
            path: &key,
            found: record.is_some(),
            label: text,
            record,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match text {
        Some(text) => println!("{}  {text}", key.bold()),
        None => println!("{}  {}", key.bold(), "no data".yellow()),
    }
    Ok(())
}

/// Cache key for a user-supplied path.
///
/// Absolute paths, and relative paths that exist from the working directory,
/// are made relative to the vault. Anything else is taken as vault-relative.
fn vault_key(vault: &FsVault, path: &Utf8Path, cwd: &Utf8Path) -> String {
    let candidate = cwd.join(path);
    let resolved = std::fs::canonicalize(candidate.as_std_path())
        .ok()
        .and_then(|abs| vault.relative(&abs));
    resolved.unwrap_or_else(|| normalize_path(path.as_str()))
}
