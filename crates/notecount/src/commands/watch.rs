//! Watch command: keep counts current while notes change.

use std::time::Duration;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use owo_colors::OwoColorize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use notecount_core::cache::ROOT;
use notecount_core::config::Config;
use notecount_core::schedule::{self, ChangeEvent, Settled};
use notecount_core::{CountEngine, FsVault, StructuralChange, UpdateOutcome};

use crate::label::label;

/// Pending events beyond this are held back by the watcher thread.
const CHANNEL_CAPACITY: usize = 1024;

/// Arguments for the `watch` subcommand.
#[derive(Args, Debug, Default)]
pub struct WatchArgs {
    /// Vault directory (defaults to the current directory)
    pub dir: Option<Utf8PathBuf>,

    /// Don't write the persisted cache after updates
    #[arg(long)]
    pub no_cache: bool,
}

/// Count the vault, then follow filesystem events until interrupted.
#[instrument(name = "cmd_watch", skip_all, fields(dir = ?args.dir))]
pub fn cmd_watch(
    args: WatchArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    let root = super::resolve_vault(args.dir.as_deref(), cwd)?;
    let cache_file = if args.no_cache {
        None
    } else {
        super::cache_path(config, &root)
    };
    let vault = FsVault::new(&root, config);
    let window = Duration::from_millis(config.debounce_ms);
    debug!(%root, ?cache_file, ?window, "executing watch command");

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let classifier = vault.clone();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let events = match res {
            Ok(event) => classify(&classifier, &event),
            Err(e) => {
                warn!(error = %e, "watcher error, rescanning");
                vec![ChangeEvent::Rescan]
            }
        };
        for event in events {
            if tx.blocking_send(event).is_err() {
                break;
            }
        }
    })
    .context("failed to start file watcher")?;
    watcher
        .watch(root.as_std_path(), RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {root}"))?;

    let report = |engine: &CountEngine<FsVault>, settled: Settled| {
        print_settled(engine, &settled, global_json, config);
        if let Some(path) = &cache_file {
            super::save_cache(engine, path);
        }
    };

    super::runtime()?.block_on(async {
        let mut engine = CountEngine::new(vault, config.counting.clone());
        let summary = engine
            .refresh_all()
            .await
            .with_context(|| format!("failed to scan {root}"))?;
        report(&engine, Settled::Rebuild(summary));
        info!(%root, "watching for changes");

        tokio::select! {
            () = schedule::run(&mut engine, rx, window, report) => {}
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for interrupt")?;
                info!("interrupted, stopping");
            }
        }
        anyhow::Ok(())
    })
}

/// Translate a filesystem event into engine events.
///
/// Content writes to notes are modifications. Creations, removals, and
/// renames of anything that is not hidden or excluded are structural.
fn classify(vault: &FsVault, event: &Event) -> Vec<ChangeEvent> {
    let keys: Vec<String> = event
        .paths
        .iter()
        .filter_map(|path| vault.relative(path))
        .filter(|key| key != ROOT)
        .collect();
    let visible = |key: &String| !vault.is_hidden(key) && !vault.is_excluded(key);
    let structural = |key: &String| {
        visible(key) && (vault.is_note(key) || Utf8Path::new(key).extension().is_none())
    };

    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if keys.len() == 2 => {
            if structural(&keys[0]) || structural(&keys[1]) {
                vec![ChangeEvent::Structural(StructuralChange::Renamed {
                    from: keys[0].clone(),
                    to: keys[1].clone(),
                })]
            } else {
                Vec::new()
            }
        }
        EventKind::Modify(ModifyKind::Name(_)) => keys
            .into_iter()
            .filter(|key| structural(key))
            .map(|key| {
                let change = if vault.absolute(&key).exists() {
                    StructuralChange::Created(key)
                } else {
                    StructuralChange::Deleted(key)
                };
                ChangeEvent::Structural(change)
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => keys
            .into_iter()
            .filter(|key| vault.is_note(key))
            .map(ChangeEvent::Modified)
            .collect(),
        EventKind::Create(_) => keys
            .into_iter()
            .filter(|key| structural(key))
            .map(|key| ChangeEvent::Structural(StructuralChange::Created(key)))
            .collect(),
        EventKind::Remove(_) => keys
            .into_iter()
            .filter(|key| structural(key))
            .map(|key| ChangeEvent::Structural(StructuralChange::Deleted(key)))
            .collect(),
        EventKind::Any | EventKind::Access(_) | EventKind::Other => Vec::new(),
    }
}

fn print_settled(engine: &CountEngine<FsVault>, settled: &Settled, json: bool, config: &Config) {
    let root_label = engine
        .get(ROOT)
        .map(|record| label(record, &config.folder_metrics, &config.counting))
        .unwrap_or_default();

    if json {
        let line = match settled {
            Settled::File(UpdateOutcome::Updated { path, .. }) => json!({
                "event": "updated",
                "path": path,
                "record": engine.get(path),
            }),
            Settled::File(UpdateOutcome::Removed { path }) => {
                json!({ "event": "removed", "path": path })
            }
            Settled::File(UpdateOutcome::Failed(failure)) => {
                json!({ "event": "failed", "path": failure.path, "reason": failure.reason })
            }
            Settled::Rebuild(summary) => json!({ "event": "rebuilt", "summary": summary }),
            Settled::Failed(e) => json!({ "event": "error", "reason": e.to_string() }),
        };
        println!("{line}");
        return;
    }

    match settled {
        Settled::File(UpdateOutcome::Updated { path, .. }) => {
            let text = engine
                .get(path)
                .map(|record| label(record, &config.note_metrics, &config.counting))
                .unwrap_or_default();
            println!("{}  {text}", path.bold());
        }
        Settled::File(UpdateOutcome::Removed { path }) => {
            println!("{}  {}", path.bold(), "removed".yellow());
        }
        Settled::File(UpdateOutcome::Failed(failure)) => {
            eprintln!(
                "{} skipped {}: {}",
                "warning:".yellow().bold(),
                failure.path,
                failure.reason
            );
        }
        Settled::Rebuild(summary) => {
            super::report_failures(summary);
            if summary.committed {
                println!("{}  {}", "vault".bold().cyan(), root_label);
            }
            return;
        }
        Settled::Failed(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            return;
        }
    }
    println!("{}  {}", "vault".bold().cyan(), root_label.dimmed());
}
