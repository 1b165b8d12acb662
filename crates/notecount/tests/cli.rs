//! End-to-end CLI integration tests
//!
//! These tests invoke the compiled binary as a subprocess to verify
//! that the CLI behaves correctly from a user's perspective.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
///
/// Note: `cargo_bin` is marked deprecated for edge cases involving custom
/// cargo build directories, but works correctly for standard project layouts.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

/// A small vault with a git marker so config discovery stays inside it.
struct Vault {
    tmp: TempDir,
}

impl Vault {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("vault");
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("drafts")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::write(root.join("drafts/one.md"), "one two three").unwrap();
        fs::write(root.join("drafts/two.md"), "four five").unwrap();
        fs::write(root.join("top.md"), "six").unwrap();
        fs::write(root.join(".obsidian/hidden.md"), "never counted at all").unwrap();
        fs::write(root.join("drafts/picture.png"), "not text").unwrap();
        Self { tmp }
    }

    fn root(&self) -> PathBuf {
        self.tmp.path().join("vault")
    }

    fn cache_file(&self) -> PathBuf {
        self.tmp.path().join("cache.json")
    }

    /// A command run from inside the vault with its cache kept in the temp dir.
    fn cmd(&self) -> Command {
        let mut cmd = cmd();
        cmd.current_dir(self.root())
            .env("NOTECOUNT_CACHE_FILE", self.cache_file())
            .env_remove("NOTECOUNT_LOG_PATH")
            .env_remove("NOTECOUNT_LOG_DIR");
        cmd
    }
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("failed to run command");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("invalid JSON output")
}

fn entry<'a>(report: &'a Value, path: &str) -> &'a Value {
    report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["path"] == path)
        .unwrap_or_else(|| panic!("no entry for {path}"))
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("show"));
}

#[test]
fn long_help_lists_environment() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("NOTECOUNT_LOG_DIR"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_only_prints_bare_version() {
    cmd()
        .arg("--version-only")
        .assert()
        .success()
        .stdout(predicate::str::diff(format!(
            "{}\n",
            env!("CARGO_PKG_VERSION")
        )));
}

// =============================================================================
// Info Command
// =============================================================================

#[test]
fn info_shows_package_name_and_version() {
    cmd()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_NAME")))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")))
        .stdout(predicate::str::contains("Words per page"));
}

#[test]
fn info_json_outputs_valid_json() {
    let output = cmd().arg("info").arg("--json").assert().success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: Value = serde_json::from_str(&stdout).expect("info --json should output valid JSON");

    assert_eq!(json["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["config"]["counting"]["words_per_page"], 300.0);
}

// =============================================================================
// Global Flags
// =============================================================================

#[test]
fn quiet_and_verbose_flags_accepted() {
    cmd().args(["--quiet", "info"]).assert().success();
    cmd().args(["-vv", "info"]).assert().success();
}

#[test]
fn color_choices_accepted() {
    for choice in ["auto", "always", "never"] {
        cmd().args(["--color", choice, "info"]).assert().success();
    }
}

#[test]
fn chdir_nonexistent_fails() {
    cmd()
        .args(["-C", "/nonexistent/path/that/does/not/exist", "info"])
        .assert()
        .failure();
}

// =============================================================================
// Scan Command
// =============================================================================

#[test]
fn scan_json_totals_the_vault() {
    let vault = Vault::new();
    let report = json_output(vault.cmd().args(["scan", "--notes", "--json"]));

    assert_eq!(report["summary"]["committed"], true);
    assert_eq!(report["summary"]["notes"], 3);

    let root = entry(&report, "/");
    assert_eq!(root["word_count"], 6);
    assert_eq!(root["note_count"], 3);
    assert_eq!(root["is_directory"], true);

    let drafts = entry(&report, "drafts");
    assert_eq!(drafts["word_count"], 5);
    assert_eq!(entry(&report, "drafts/one.md")["word_count"], 3);

    let paths: Vec<&str> = report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["path"].as_str())
        .collect();
    assert!(!paths.iter().any(|p| p.starts_with(".obsidian")));
    assert!(!paths.contains(&"drafts/picture.png"));
}

#[test]
fn scan_writes_the_cache() {
    let vault = Vault::new();
    vault.cmd().arg("scan").assert().success();

    let cache: Value = serde_json::from_str(&fs::read_to_string(vault.cache_file()).unwrap()).unwrap();
    assert_eq!(cache["version"], 2);
    assert_eq!(cache["counting"]["word_count_type"], "space-delimited");
    assert_eq!(cache["entries"]["/"]["word_count"], 6);
}

#[test]
fn scan_no_cache_leaves_no_file() {
    let vault = Vault::new();
    vault.cmd().args(["scan", "--no-cache"]).assert().success();
    assert!(!vault.cache_file().exists());
}

#[test]
fn scan_text_prints_tree() {
    let vault = Vault::new();
    vault
        .cmd()
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("6 words"))
        .stdout(predicate::str::contains("drafts/"))
        .stdout(predicate::str::contains("5 words"))
        .stdout(predicate::str::contains("top.md").not());
}

#[test]
fn scan_depth_zero_prints_only_the_total() {
    let vault = Vault::new();
    let report = json_output(vault.cmd().args(["scan", "--depth", "0", "--json"]));
    assert_eq!(report["entries"].as_array().unwrap().len(), 1);
}

#[test]
fn scan_of_explicit_directory() {
    let vault = Vault::new();
    let report = json_output(
        cmd()
            .env("NOTECOUNT_CACHE_FILE", vault.cache_file())
            .args(["scan", "--json"])
            .arg(vault.root().join("drafts")),
    );
    assert_eq!(entry(&report, "/")["word_count"], 5);
}

#[test]
fn scan_missing_directory_fails() {
    let vault = Vault::new();
    vault
        .cmd()
        .args(["scan", "no-such-dir"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn scan_counts_only_configured_extensions() {
    let vault = Vault::new();
    fs::write(vault.root().join("drafts/extra.txt"), "seven eight").unwrap();
    fs::write(vault.root().join("drafts/skip.md"), "nine ten").unwrap();
    fs::write(
        vault.root().join(".notecount.toml"),
        "extensions = [\"md\", \"txt\"]\nexclude = [\"**/skip.md\"]\n",
    )
    .unwrap();
    let report = json_output(vault.cmd().args(["scan", "--json"]));
    assert_eq!(entry(&report, "/")["word_count"], 8);
}

// =============================================================================
// Show Command
// =============================================================================

#[test]
fn show_prints_label_for_note() {
    let vault = Vault::new();
    vault
        .cmd()
        .args(["show", "drafts/one.md", "--metrics", "words"])
        .assert()
        .success()
        .stdout(predicate::str::contains("drafts/one.md"))
        .stdout(predicate::str::contains("3 words"))
        .stdout(predicate::str::contains("pages").not());
}

#[test]
fn show_folder_json() {
    let vault = Vault::new();
    let report = json_output(vault.cmd().args(["show", "drafts", "--json"]));
    assert_eq!(report["found"], true);
    assert_eq!(report["record"]["word_count"], 5);
    assert_eq!(report["record"]["note_count"], 2);
    assert!(report["label"].as_str().unwrap().contains("5 words"));
}

#[test]
fn show_unknown_path_reports_no_data() {
    let vault = Vault::new();
    vault
        .cmd()
        .args(["show", "missing.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no data"));
}

#[test]
fn show_reads_a_saved_cache() {
    let vault = Vault::new();
    vault.cmd().arg("scan").assert().success();

    // Change a note on disk; show answers from the saved cache.
    fs::write(vault.root().join("top.md"), "six seven eight").unwrap();
    let report = json_output(vault.cmd().args(["show", "top.md", "--json"]));
    assert_eq!(report["record"]["word_count"], 1);
}

#[test]
fn show_rebuilds_when_counting_rules_changed() {
    let vault = Vault::new();
    fs::write(vault.root().join("zh.md"), "我们今天学习中文写作").unwrap();
    vault.cmd().arg("scan").assert().success();

    let report = json_output(
        vault
            .cmd()
            .env("NOTECOUNT_COUNTING__WORD_COUNT_TYPE", "cjk")
            .args(["show", "zh.md", "--json"]),
    );
    assert_eq!(report["record"]["word_count"], 10);
}

#[test]
fn show_rebuilds_when_cache_is_corrupt() {
    let vault = Vault::new();
    fs::write(vault.cache_file(), "{ not json").unwrap();
    let report = json_output(vault.cmd().args(["show", "/", "--json"]));
    assert_eq!(report["record"]["word_count"], 6);
}

#[test]
fn show_with_vault_flag() {
    let vault = Vault::new();
    let report = json_output(
        cmd()
            .current_dir(Path::new("/"))
            .env("NOTECOUNT_CACHE_FILE", vault.cache_file())
            .args(["show", "drafts/two.md", "--json", "--vault"])
            .arg(vault.root()),
    );
    assert_eq!(report["path"], "drafts/two.md");
    assert_eq!(report["record"]["word_count"], 2);
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn no_subcommand_shows_help() {
    // arg_required_else_help makes clap print help to stderr and exit 2
    cmd()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn invalid_subcommand_shows_error() {
    cmd()
        .arg("not-a-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn unknown_metric_shows_error() {
    let vault = Vault::new();
    vault
        .cmd()
        .args(["show", "top.md", "--metrics", "syllables"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}
