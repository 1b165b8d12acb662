//! Scan command: count a whole vault.

use std::time::Duration;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use notecount_core::cache::ROOT;
use notecount_core::config::Config;
use notecount_core::{CountCache, CountEngine, CountRecord, FsVault, RefreshSummary};

use crate::label::label;

/// Arguments for the `scan` subcommand.
#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// Vault directory (defaults to the current directory)
    pub dir: Option<Utf8PathBuf>,

    /// List notes as well as folders
    #[arg(long)]
    pub notes: bool,

    /// Deepest level to print (0 prints only the vault total)
    #[arg(long)]
    pub depth: Option<usize>,

    /// Neither read nor write the persisted cache
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Serialize)]
struct ScanEntry<'a> {
    path: &'a str,
    label: String,
    #[serde(flatten)]
    record: &'a CountRecord,
}

#[derive(Serialize)]
struct ScanReport<'a> {
    vault: &'a Utf8Path,
    summary: &'a RefreshSummary,
    entries: Vec<ScanEntry<'a>>,
}

/// Count every note in a vault and print the totals.
#[instrument(name = "cmd_scan", skip_all, fields(dir = ?args.dir))]
pub fn cmd_scan(
    args: ScanArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    let root = super::resolve_vault(args.dir.as_deref(), cwd)?;
    debug!(%root, notes = args.notes, depth = ?args.depth, "executing scan command");

    let spinner = (!global_json).then(|| {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("Counting {root}"));
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    });

    let vault = FsVault::new(&root, config);
    let mut engine = CountEngine::new(vault, config.counting.clone());
    let summary = super::runtime()?
        .block_on(engine.refresh_all())
        .with_context(|| format!("failed to scan {root}"))?;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if !args.no_cache
        && let Some(path) = super::cache_path(config, &root)
    {
        super::save_cache(&engine, &path);
    }

    let rows = rows(engine.cache(), args.notes, args.depth);

    if global_json {
        let report = ScanReport {
            vault: &root,
            summary: &summary,
            entries: rows
                .iter()
                .map(|&(path, record)| ScanEntry {
                    path,
                    label: row_label(record, config),
                    record,
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    super::report_failures(&summary);
    for &(path, record) in &rows {
        let depth = level(path);
        let indent = "  ".repeat(depth);
        let name = if path == ROOT {
            root.file_name().unwrap_or(root.as_str()).bold().to_string()
        } else {
            let name = path.rsplit('/').next().unwrap_or(path);
            if record.is_directory {
                format!("{name}/").cyan().to_string()
            } else {
                name.to_string()
            }
        };
        println!("{indent}{name}  {}", row_label(record, config).dimmed());
    }

    Ok(())
}

fn row_label(record: &CountRecord, config: &Config) -> String {
    let metrics = if record.is_directory {
        &config.folder_metrics
    } else {
        &config.note_metrics
    };
    label(record, metrics, &config.counting)
}

/// Depth of a cache key: 0 for the root, 1 for its children.
fn level(path: &str) -> usize {
    if path == ROOT {
        0
    } else {
        path.split('/').count()
    }
}

/// The records to print, in tree order.
fn rows(cache: &CountCache, notes: bool, depth: Option<usize>) -> Vec<(&str, &CountRecord)> {
    let mut rows: Vec<(&str, &CountRecord)> = cache
        .iter()
        .filter(|(_, record)| notes || record.is_directory)
        .filter(|(path, _)| depth.is_none_or(|max| level(path) <= max))
        .collect();
    rows.sort_by_key(|(path, _)| {
        if *path == ROOT {
            Vec::new()
        } else {
            path.split('/').collect::<Vec<_>>()
        }
    });
    rows
}
