//! Count records and the per-file builder.

use serde::{Deserialize, Serialize};

use crate::config::CountingConfig;
use crate::metrics;
use crate::normalize;

/// Filesystem facts about one note, supplied by the vault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Creation time in epoch milliseconds, 0 when unknown.
    pub created: u64,
    /// Last modification time in epoch milliseconds, 0 when unknown.
    pub modified: u64,
    /// Size on disk in bytes.
    pub size: u64,
}

/// Computed statistics for one note or folder.
///
/// Records are replaced wholesale on every recount, never patched.
/// Every field is always present; dates are 0 when unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountRecord {
    /// Words in the note, or in all notes beneath a folder.
    pub word_count: u64,
    /// How many of `word_count` were counted one CJK character per word.
    pub cjk_word_count: u64,
    /// Characters under the configured character rule.
    pub character_count: u64,
    /// Fractional pages.
    pub page_count: f64,
    /// Words that count toward a declared goal.
    pub word_count_toward_goal: u64,
    /// Declared word goal, 0 when unset.
    pub word_goal: u64,
    /// 1 for a note, number of notes beneath a folder.
    pub note_count: u64,
    /// Outgoing wiki and Markdown links.
    pub link_count: u64,
    /// Embedded notes and images.
    pub embed_count: u64,
    /// Aliases from the note's metadata block. Always empty for folders.
    pub aliases: Vec<String>,
    /// Creation time in epoch milliseconds.
    pub created_date: u64,
    /// Last modification time in epoch milliseconds.
    pub modified_date: u64,
    /// Size on disk in bytes.
    pub size_in_bytes: u64,
    /// Whether this record describes a folder.
    pub is_directory: bool,
}

impl CountRecord {
    /// The record of a folder with no notes beneath it.
    pub fn empty_folder() -> Self {
        Self {
            is_directory: true,
            ..Self::default()
        }
    }

    /// Share of the word goal reached, `None` when no goal is declared.
    #[allow(clippy::cast_precision_loss)]
    pub fn goal_fraction(&self) -> Option<f64> {
        (self.word_goal > 0)
            .then(|| self.word_count_toward_goal as f64 / self.word_goal as f64)
    }

    /// Goal progress as a whole percentage, rounded half away from zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn goal_percent(&self) -> Option<u64> {
        self.goal_fraction().map(|f| (f * 100.0).round() as u64)
    }
}

/// Build the record for a single note.
///
/// Pure: the same inputs always give the same record. `path` is only used
/// for tracing.
#[tracing::instrument(skip(raw, metadata, config), fields(input_len = raw.len()))]
pub fn build_record(
    path: &str,
    raw: &str,
    metadata: &FileMetadata,
    config: &CountingConfig,
) -> CountRecord {
    let normalized = normalize::normalize(raw, config);
    let metrics = metrics::calculate(&normalized.body, config);

    let word_count_toward_goal = if normalized.word_goal > 0 {
        metrics.word_count
    } else {
        0
    };

    CountRecord {
        word_count: metrics.word_count,
        cjk_word_count: metrics.cjk_word_count,
        character_count: metrics.character_count,
        page_count: metrics.page_count,
        word_count_toward_goal,
        word_goal: normalized.word_goal,
        note_count: 1,
        link_count: normalized.link_count,
        embed_count: normalized.embed_count,
        aliases: normalized.aliases,
        created_date: metadata.created,
        modified_date: metadata.modified,
        size_in_bytes: metadata.size,
        is_directory: false,
    }
}
