//! Configuration loading and discovery.
//!
//! This module provides configuration file discovery by:
//! 1. Walking up from the current directory to find project config
//! 2. Loading user config from XDG config directory
//! 3. Merging with sensible defaults
//!
//! # Supported formats
//!
//! The following configuration file formats are supported:
//! - TOML (`.toml`)
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! # Config file locations (in order of precedence, highest first):
//! - `notecount.<ext>` in current directory or any parent
//! - `.notecount.<ext>` in current directory or any parent
//! - `~/.config/notecount/config.<ext>` (user config)
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`
//!
//! When multiple files exist in the same directory, all are merged via figment.
//! Later extensions override earlier: toml < yaml < yml < json.
//!
//! Counting rules live in the nested `[counting]` table. Environment variables
//! use the `NOTECOUNT_` prefix with `__` separating nested keys, e.g.
//! `NOTECOUNT_COUNTING__WORDS_PER_PAGE=250`.
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use notecount_core::config::{Config, ConfigLoader};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let (config, _sources) = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// How words are recognized in a note body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum WordCountType {
    /// Words are runs of non-whitespace.
    #[default]
    SpaceDelimited,
    /// Every Han, Kana, or Hangul character is one word.
    Cjk,
    /// Pick one of the above per document from its dominant script.
    AutoDetect,
}

/// How characters are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CharacterCountType {
    /// Every code point.
    #[default]
    StringLength,
    /// Every code point that is not whitespace.
    ExcludeWhitespace,
}

/// What a page is measured in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum PageCountType {
    /// `words / words_per_page`.
    #[default]
    ByWords,
    /// `characters / chars_per_page`.
    ByChars,
}

/// A statistic the presentation layer can show for a note or folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Metric {
    /// Word count.
    Words,
    /// Page count.
    Pages,
    /// Estimated reading time.
    ReadingTime,
    /// Character count.
    Characters,
    /// Number of notes beneath a folder.
    Notes,
    /// Outgoing links.
    Links,
    /// Embeds.
    Embeds,
    /// Front-matter aliases.
    Aliases,
    /// Progress toward the declared word goal.
    Goal,
    /// Creation date.
    Created,
    /// Last modification date.
    Modified,
    /// Size on disk.
    Size,
}

impl Metric {
    /// Returns the metric as a kebab-case string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Words => "words",
            Self::Pages => "pages",
            Self::ReadingTime => "reading-time",
            Self::Characters => "characters",
            Self::Notes => "notes",
            Self::Links => "links",
            Self::Embeds => "embeds",
            Self::Aliases => "aliases",
            Self::Goal => "goal",
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Size => "size",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rules the counting engine applies to every note.
///
/// All rates must be positive and finite; [`CountingConfig::validate`] is the
/// gate, and the core assumes it has passed.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CountingConfig {
    /// Word recognition mode.
    pub word_count_type: WordCountType,
    /// Character counting mode.
    pub character_count_type: CharacterCountType,
    /// Page measurement mode.
    pub page_count_type: PageCountType,
    /// In `by-chars` mode, count whitespace toward pages.
    pub chars_per_page_includes_whitespace: bool,
    /// Words on one page.
    pub words_per_page: f64,
    /// Characters on one page.
    pub chars_per_page: f64,
    /// Reading speed for space-delimited words.
    pub words_per_minute: f64,
    /// Reading speed for CJK characters.
    pub cjk_chars_per_minute: f64,
    /// Drop `%% ... %%` and `<!-- ... -->` comments before counting.
    pub exclude_comments: bool,
    /// Drop fenced and indented code blocks before counting.
    pub exclude_code_blocks: bool,
    /// Share of CJK characters among non-whitespace characters at which
    /// `auto-detect` switches a document to the CJK rule.
    pub auto_detect_cjk_threshold: f64,
}

impl Default for CountingConfig {
    fn default() -> Self {
        Self {
            word_count_type: WordCountType::default(),
            character_count_type: CharacterCountType::default(),
            page_count_type: PageCountType::default(),
            chars_per_page_includes_whitespace: false,
            words_per_page: 300.0,
            chars_per_page: 1500.0,
            words_per_minute: 265.0,
            cjk_chars_per_minute: 500.0,
            exclude_comments: false,
            exclude_code_blocks: false,
            auto_detect_cjk_threshold: 0.5,
        }
    }
}

impl CountingConfig {
    /// Reject rates and thresholds the engine cannot divide by.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("words_per_page", self.words_per_page),
            ("chars_per_page", self.chars_per_page),
            ("words_per_minute", self.words_per_minute),
            ("cjk_chars_per_minute", self.cjk_chars_per_minute),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidRate { field, value });
            }
        }
        let threshold = self.auto_detect_cjk_threshold;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(())
    }
}

/// The configuration for notecount.
///
/// This struct is deserialized from config files found during discovery
/// (TOML, YAML, or JSON).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files. File logging is off when unset.
    pub log_dir: Option<Utf8PathBuf>,
    /// Where the persisted count cache lives. Defaults to the user cache dir.
    pub cache_file: Option<Utf8PathBuf>,
    /// File extensions treated as notes (without the dot).
    pub extensions: Vec<String>,
    /// Glob patterns, relative to the vault root, that are never counted.
    pub exclude: Vec<String>,
    /// Quiet window for collapsing bursts of create/delete/rename events.
    pub debounce_ms: u64,
    /// Metrics shown next to notes.
    pub note_metrics: Vec<Metric>,
    /// Metrics shown next to folders.
    pub folder_metrics: Vec<Metric>,
    /// Counting rules.
    pub counting: CountingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_dir: None,
            cache_file: None,
            extensions: vec!["md".to_string()],
            exclude: Vec::new(),
            debounce_ms: 500,
            note_metrics: vec![Metric::Words, Metric::Pages, Metric::Modified],
            folder_metrics: vec![Metric::Words, Metric::Notes, Metric::Size],
            counting: CountingConfig::default(),
        }
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Metadata about which configuration sources were loaded.
///
/// Returned alongside [`Config`] from [`ConfigLoader::load()`] so commands
/// can report the actual config files without re-discovering them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigSources {
    /// Project config files found by walking up, ordered low→high precedence.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub project_files: Vec<Utf8PathBuf>,
    /// User config file from XDG config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_file: Option<Utf8PathBuf>,
    /// Explicit config files loaded (e.g., from `--config` flag).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigSources {
    /// Returns the highest-precedence config file that was loaded.
    ///
    /// Precedence: explicit files > project files > user file.
    pub fn primary_file(&self) -> Option<&Utf8Path> {
        self.explicit_files
            .last()
            .map(Utf8PathBuf::as_path)
            .or_else(|| self.project_files.last().map(Utf8PathBuf::as_path))
            .or(self.user_file.as_deref())
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "notecount";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Starting directory for project config search.
    project_search_root: Option<Utf8PathBuf>,
    /// Whether to include user config from XDG directory.
    include_user_config: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    /// Explicit config files to load (for testing or programmatic use).
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Set the starting directory for project config search.
    ///
    /// The loader will walk up from this directory looking for config files.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/notecount/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set a boundary marker to stop directory traversal.
    ///
    /// When walking up directories, stop if we find a directory containing
    /// this file or directory name. Default is `.git`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load.
    ///
    /// Files are loaded in order, with later files taking precedence.
    /// Explicit files are loaded after discovered files.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration, merging all discovered sources.
    ///
    /// The counting rules are validated before the config is returned, so
    /// a zero or negative rate never reaches the engine.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment (`NOTECOUNT_*`)
    /// 2. Explicit files (in order added via `with_file`)
    /// 3. Project config (closest to search root)
    /// 4. User config (`~/.config/notecount/config.<ext>`)
    /// 5. Default values
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<(Config, ConfigSources)> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let mut sources = ConfigSources::default();

        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
            sources.user_file = Some(user_config);
        }

        if let Some(ref root) = self.project_search_root {
            let project_configs = self.find_project_configs(root);
            for pc in &project_configs {
                figment = Self::merge_file(figment, pc);
            }
            sources.project_files = project_configs;
        }

        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }
        sources.explicit_files = self.explicit_files;

        // NOTECOUNT_LOG_LEVEL=debug, NOTECOUNT_COUNTING__WORD_COUNT_TYPE=cjk, etc.
        figment = figment.merge(Env::prefixed("NOTECOUNT_").split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        config.counting.validate()?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            word_count_type = ?config.counting.word_count_type,
            "configuration loaded"
        );
        Ok((config, sources))
    }

    /// Load configuration, returning an error if no config file is found.
    pub fn load_or_error(self) -> ConfigResult<(Config, ConfigSources)> {
        let has_user = self.include_user_config && self.find_user_config().is_some();
        let has_project = self
            .project_search_root
            .as_ref()
            .is_some_and(|root| !self.find_project_configs(root).is_empty());
        let has_explicit = !self.explicit_files.is_empty();

        if !has_user && !has_project && !has_explicit {
            return Err(ConfigError::NotFound);
        }

        self.load()
    }

    /// Find project config files by walking up from the given directory.
    ///
    /// Returns all matching config files from the closest directory that has any
    /// match, ordered low-to-high precedence: dotfiles before regular files.
    fn find_project_configs(&self, start: &Utf8Path) -> Vec<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            let mut found = Vec::new();

            for ext in CONFIG_EXTENSIONS {
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    found.push(dotfile);
                }
            }
            for ext in CONFIG_EXTENSIONS {
                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    found.push(regular);
                }
            }

            if !found.is_empty() {
                return found;
            }

            // Check for boundary marker AFTER checking config files,
            // so a config in the same directory as the marker is found.
            if let Some(ref marker) = self.boundary_marker
                && dir.join(marker).exists()
                && dir != start
            {
                break;
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        Vec::new()
    }

    /// Find user config in XDG config directory.
    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let config_dir = user_config_dir()?;
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| config_dir.join(format!("config.{ext}")))
            .find(|config_path| config_path.is_file())
    }

    /// Merge a config file into the figment, detecting format from extension.
    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Get the project directories for XDG-compliant path resolution.
///
/// Returns `None` if the home directory cannot be determined.
fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the user config directory path.
///
/// Returns `~/.config/notecount/` on Linux, `~/Library/Application Support/notecount/`
/// on macOS, and equivalent on other platforms.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// Get the user cache directory path.
///
/// Returns `~/.cache/notecount/` on Linux, `~/Library/Caches/notecount/`
/// on macOS, and equivalent on other platforms.
pub fn user_cache_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.cache_dir().to_path_buf()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serializes tests that mutate environment variables via `set_var`/`remove_var`.
    static TEST_ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn load_file(contents: &str, name: &str) -> ConfigResult<Config> {
        let _lock = TEST_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(name);
        fs::write(&config_path, contents).unwrap();
        let config_path = Utf8PathBuf::try_from(config_path).unwrap();

        ConfigLoader::new()
            .with_user_config(false)
            .with_file(&config_path)
            .load()
            .map(|(config, _)| config)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_dir.is_none());
        assert_eq!(config.extensions, vec!["md"]);
        assert_eq!(config.counting.words_per_page, 300.0);
        assert!(config.counting.validate().is_ok());
    }

    #[test]
    fn test_loader_builds_with_defaults() {
        let loader = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker();

        let (config, sources) = loader.load().unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(sources.primary_file().is_none());
    }

    #[test]
    fn test_single_file_overrides_default() {
        let config = load_file(
            r#"log_level = "debug"
log_dir = "/tmp/notecount"
debounce_ms = 250

[counting]
word_count_type = "cjk"
page_count_type = "by-chars"
chars_per_page = 1000
exclude_comments = true
"#,
            "config.toml",
        )
        .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.log_dir.as_deref().map(Utf8Path::as_str), Some("/tmp/notecount"));
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.counting.word_count_type, WordCountType::Cjk);
        assert_eq!(config.counting.page_count_type, PageCountType::ByChars);
        assert_eq!(config.counting.chars_per_page, 1000.0);
        assert!(config.counting.exclude_comments);
        // untouched keys keep their defaults
        assert_eq!(config.counting.words_per_page, 300.0);
    }

    #[test]
    fn test_yaml_metrics() {
        let config = load_file(
            "note_metrics: [words, reading-time, goal]\nfolder_metrics: [notes]\n",
            "config.yaml",
        )
        .unwrap();
        assert_eq!(
            config.note_metrics,
            vec![Metric::Words, Metric::ReadingTime, Metric::Goal]
        );
        assert_eq!(config.folder_metrics, vec![Metric::Notes]);
    }

    #[test]
    fn test_zero_rate_rejected() {
        let result = load_file("[counting]\nwords_per_page = 0\n", "config.toml");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidRate {
                field: "words_per_page",
                ..
            })
        ));
    }

    #[test]
    fn test_negative_reading_rate_rejected() {
        let counting = CountingConfig {
            words_per_minute: -10.0,
            ..CountingConfig::default()
        };
        assert!(matches!(
            counting.validate(),
            Err(ConfigError::InvalidRate {
                field: "words_per_minute",
                ..
            })
        ));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let counting = CountingConfig {
            auto_detect_cjk_threshold: 1.5,
            ..CountingConfig::default()
        };
        assert!(matches!(
            counting.validate(),
            Err(ConfigError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let tmp = TempDir::new().unwrap();

        let base_config = tmp.path().join("base.toml");
        fs::write(&base_config, r#"log_level = "warn""#).unwrap();

        let override_config = tmp.path().join("override.toml");
        fs::write(&override_config, r#"log_level = "error""#).unwrap();

        let base_config = Utf8PathBuf::try_from(base_config).unwrap();
        let override_config = Utf8PathBuf::try_from(override_config).unwrap();

        let (config, _sources) = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&base_config)
            .with_file(&override_config)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Error);
    }

    #[test]
    fn test_project_config_discovery() {
        let tmp = TempDir::new().unwrap();
        let project_dir = tmp.path().join("vault");
        let sub_dir = project_dir.join("journal").join("2024");
        fs::create_dir_all(&sub_dir).unwrap();

        fs::write(project_dir.join(".notecount.toml"), r#"log_level = "debug""#).unwrap();

        let sub_dir = Utf8PathBuf::try_from(sub_dir).unwrap();

        let (config, sources) = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(&sub_dir)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(!sources.project_files.is_empty());
    }

    #[test]
    fn test_boundary_marker_stops_search() {
        let tmp = TempDir::new().unwrap();

        let parent = tmp.path().join("parent");
        let child = parent.join("child");
        let work = child.join("work");
        fs::create_dir_all(&work).unwrap();

        fs::write(parent.join(".notecount.toml"), r#"log_level = "warn""#).unwrap();
        fs::create_dir(child.join(".git")).unwrap();

        let work = Utf8PathBuf::try_from(work).unwrap();

        let (config, sources) = ConfigLoader::new()
            .with_user_config(false)
            .with_boundary_marker(".git")
            .with_project_search(&work)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Info);
        assert!(sources.project_files.is_empty());
    }

    #[test]
    fn dotfile_before_regular_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".notecount.toml"), r#"log_level = "debug""#).unwrap();
        fs::write(tmp.path().join("notecount.toml"), r#"log_level = "error""#).unwrap();

        let tmp_path = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let (config, sources) = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(&tmp_path)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(sources.project_files.len(), 2);
        assert!(sources.primary_file().unwrap().as_str().ends_with("notecount.toml"));
    }

    #[test]
    fn test_load_or_error_fails_when_no_config() {
        let result = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .load_or_error();

        assert!(matches!(result, Err(ConfigError::NotFound)));
    }

    #[test]
    #[allow(unsafe_code)]
    fn test_env_var_overrides_nested_counting() {
        let _lock = TEST_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        // SAFETY: Test environment; the mutex serializes env access across tests.
        unsafe {
            std::env::set_var("NOTECOUNT_COUNTING__WORD_COUNT_TYPE", "auto-detect");
        }

        let result = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .load();

        // SAFETY: Cleanup after test.
        unsafe {
            std::env::remove_var("NOTECOUNT_COUNTING__WORD_COUNT_TYPE");
        }

        let (config, _sources) = result.unwrap();
        assert_eq!(config.counting.word_count_type, WordCountType::AutoDetect);
    }

    #[test]
    fn counting_deserializes_from_yaml() {
        let yaml = r#"
counting:
  word_count_type: space-delimited
  character_count_type: exclude-whitespace
  chars_per_page_includes_whitespace: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.counting.character_count_type,
            CharacterCountType::ExcludeWhitespace
        );
        assert!(config.counting.chars_per_page_includes_whitespace);
    }

    #[test]
    fn test_user_config_dir() {
        if let Some(path) = user_config_dir() {
            assert!(path.as_str().contains("notecount"));
        }
    }

    #[test]
    fn metric_as_str_roundtrips_through_serde() {
        for metric in [Metric::ReadingTime, Metric::Size, Metric::Goal] {
            let json = serde_json::to_string(&metric).unwrap();
            assert_eq!(json, format!("\"{}\"", metric.as_str()));
        }
    }
}
