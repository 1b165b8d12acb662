//! Word, character, and page metrics for normalized prose.
//!
//! Script handling: Chinese, Japanese, and Korean text is not space
//! delimited, so under the CJK rule each Han, Kana, or Hangul character is a
//! word of its own. Any non-CJK text in the same document is still counted by
//! whitespace, which keeps mixed notes ("用 Rust 写") sensible.

use serde::{Deserialize, Serialize};

use crate::config::{CharacterCountType, CountingConfig, PageCountType, WordCountType};
use crate::record::CountRecord;

/// The word rule applied to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Script {
    /// Whitespace-separated words.
    SpaceDelimited,
    /// One word per CJK character.
    Cjk,
}

/// Metrics computed from one normalized body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    /// Words under the applied rule.
    pub word_count: u64,
    /// How many of `word_count` are single CJK characters.
    pub cjk_word_count: u64,
    /// Characters under the configured character rule.
    pub character_count: u64,
    /// Fractional pages, never rounded.
    pub page_count: f64,
    /// The rule that produced `word_count`.
    pub script: Script,
}

/// Whether a character belongs to a script counted one character per word.
pub const fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF     // CJK Unified Ideographs
        | 0x3400..=0x4DBF   // CJK Extension A
        | 0x20000..=0x2A6DF // CJK Extension B
        | 0xF900..=0xFAFF   // CJK Compatibility Ideographs
        | 0x3040..=0x309F   // Hiragana
        | 0x30A0..=0x30FF   // Katakana
        | 0x31F0..=0x31FF   // Katakana Phonetic Extensions
        | 0xFF66..=0xFF9D   // Halfwidth Katakana
        | 0xAC00..=0xD7AF   // Hangul Syllables
        | 0x1100..=0x11FF   // Hangul Jamo
        | 0x3130..=0x318F   // Hangul Compatibility Jamo
    )
}

/// Classify a document by its dominant script.
///
/// The share of CJK characters among non-whitespace characters is compared
/// with `threshold`. Empty text is space delimited.
#[allow(clippy::cast_precision_loss)]
pub fn detect_script(body: &str, threshold: f64) -> Script {
    let (mut cjk, mut visible) = (0u64, 0u64);
    for c in body.chars().filter(|c| !c.is_whitespace()) {
        visible += 1;
        if is_cjk(c) {
            cjk += 1;
        }
    }
    if visible > 0 && cjk as f64 / visible as f64 >= threshold {
        Script::Cjk
    } else {
        Script::SpaceDelimited
    }
}

/// Count whitespace-separated tokens.
pub fn count_space_delimited(body: &str) -> u64 {
    body.split_whitespace().count() as u64
}

/// Count words under the CJK rule.
///
/// Returns `(total, cjk)`: every CJK character is one word, and each run of
/// other non-whitespace characters containing a letter or digit is one more.
/// CJK punctuation on its own is not a word.
pub fn count_cjk(body: &str) -> (u64, u64) {
    let (mut cjk, mut runs) = (0u64, 0u64);
    let mut in_run = false;
    let mut run_has_word = false;

    for c in body.chars() {
        if is_cjk(c) || c.is_whitespace() {
            if in_run && run_has_word {
                runs += 1;
            }
            in_run = false;
            run_has_word = false;
            if !c.is_whitespace() {
                cjk += 1;
            }
        } else {
            in_run = true;
            run_has_word |= c.is_alphanumeric();
        }
    }
    if in_run && run_has_word {
        runs += 1;
    }

    (cjk + runs, cjk)
}

/// Compute word, character, and page counts for a normalized body.
///
/// `config` is assumed validated: page rates are positive and finite.
#[tracing::instrument(skip_all, fields(body_len = body.len()))]
#[allow(clippy::cast_precision_loss)]
pub fn calculate(body: &str, config: &CountingConfig) -> Metrics {
    debug_assert!(config.words_per_page > 0.0 && config.chars_per_page > 0.0);

    let script = match config.word_count_type {
        WordCountType::SpaceDelimited => Script::SpaceDelimited,
        WordCountType::Cjk => Script::Cjk,
        WordCountType::AutoDetect => detect_script(body, config.auto_detect_cjk_threshold),
    };
    let (word_count, cjk_word_count) = match script {
        Script::SpaceDelimited => (count_space_delimited(body), 0),
        Script::Cjk => count_cjk(body),
    };

    let all_chars = body.chars().count() as u64;
    let visible_chars = body.chars().filter(|c| !c.is_whitespace()).count() as u64;
    let character_count = match config.character_count_type {
        CharacterCountType::StringLength => all_chars,
        CharacterCountType::ExcludeWhitespace => visible_chars,
    };

    let page_count = match config.page_count_type {
        PageCountType::ByWords => word_count as f64 / config.words_per_page,
        PageCountType::ByChars => {
            let chars = if config.chars_per_page_includes_whitespace {
                all_chars
            } else {
                visible_chars
            };
            chars as f64 / config.chars_per_page
        }
    };

    Metrics {
        word_count,
        cjk_word_count,
        character_count,
        page_count,
        script,
    }
}

/// Estimated reading time in minutes for a note or folder.
///
/// CJK words are read at `cjk_chars_per_minute`, everything else at
/// `words_per_minute`. Works for folders too, since both counts are sums.
#[allow(clippy::cast_precision_loss)]
pub fn reading_time(record: &CountRecord, config: &CountingConfig) -> f64 {
    debug_assert!(config.words_per_minute > 0.0 && config.cjk_chars_per_minute > 0.0);

    let cjk = record.cjk_word_count.min(record.word_count);
    let spaced = record.word_count - cjk;
    spaced as f64 / config.words_per_minute + cjk as f64 / config.cjk_chars_per_minute
}
