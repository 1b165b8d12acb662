//! Info command implementation

use clap::Args;
use notecount_core::config::{Config, ConfigSources, CountingConfig, Metric};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_file: Option<String>,
    extensions: &'a [String],
    exclude: &'a [String],
    debounce_ms: u64,
    note_metrics: &'a [Metric],
    folder_metrics: &'a [Metric],
    counting: &'a CountingConfig,
}

impl<'a> ConfigInfo<'a> {
    fn from_config(config: &'a Config, sources: &ConfigSources) -> Self {
        Self {
            config_file: sources.primary_file().map(|p| p.to_string()),
            log_level: config.log_level.as_str(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            cache_file: config.cache_file.as_ref().map(|p| p.to_string()),
            extensions: &config.extensions,
            exclude: &config.exclude,
            debounce_ms: config.debounce_ms,
            note_metrics: &config.note_metrics,
            folder_metrics: &config.folder_metrics,
            counting: &config.counting,
        }
    }
}

#[derive(Serialize)]
struct FullInfo<'a> {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo<'a>,
}

/// Print package information
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `sources` - Config source metadata from loading
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    sources: &ConfigSources,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let full_info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, sources),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&full_info)?);
        return Ok(());
    }

    let package = &full_info.package;
    println!("{} {}", package.name.bold(), package.version.green());
    if !package.description.is_empty() {
        println!("{}", package.description);
    }
    if !package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), package.license);
    }

    let info = &full_info.config;
    println!();
    println!("{}", "Configuration".bold().underline());
    if let Some(ref path) = info.config_file {
        println!("{}: {}", "Config file".dimmed(), path.cyan());
    } else {
        println!("{}: {}", "Config file".dimmed(), "none loaded".yellow());
    }
    println!("{}: {}", "Log level".dimmed(), info.log_level);
    if let Some(ref dir) = info.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    match info.cache_file {
        Some(ref path) => println!("{}: {}", "Cache file".dimmed(), path),
        None => println!("{}: {}", "Cache file".dimmed(), "per-vault default".dimmed()),
    }
    println!("{}: {}", "Extensions".dimmed(), info.extensions.join(", "));
    if !info.exclude.is_empty() {
        println!("{}: {}", "Exclude".dimmed(), info.exclude.join(", "));
    }
    println!("{}: {} ms", "Debounce".dimmed(), info.debounce_ms);
    println!("{}: {}", "Note metrics".dimmed(), join(info.note_metrics));
    println!("{}: {}", "Folder metrics".dimmed(), join(info.folder_metrics));

    let counting = info.counting;
    println!();
    println!("{}", "Counting".bold().underline());
    println!("{}: {:?}", "Words".dimmed(), counting.word_count_type);
    println!("{}: {:?}", "Characters".dimmed(), counting.character_count_type);
    println!("{}: {:?}", "Pages".dimmed(), counting.page_count_type);
    println!("{}: {}", "Words per page".dimmed(), counting.words_per_page);
    println!("{}: {}", "Characters per page".dimmed(), counting.chars_per_page);
    println!("{}: {}", "Words per minute".dimmed(), counting.words_per_minute);
    println!(
        "{}: {}",
        "CJK characters per minute".dimmed(),
        counting.cjk_chars_per_minute
    );
    println!("{}: {}", "Exclude comments".dimmed(), counting.exclude_comments);
    println!(
        "{}: {}",
        "Exclude code blocks".dimmed(),
        counting.exclude_code_blocks
    );

    Ok(())
}

fn join(metrics: &[Metric]) -> String {
    metrics
        .iter()
        .map(Metric::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
