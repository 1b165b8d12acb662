//! Text normalization.
//!
//! Separates a note's raw text into the prose that gets counted and the side
//! data that does not: front-matter aliases and word goal, comments, code
//! blocks, embeds, and links. The order of the passes matters. Embeds are
//! removed before links so that `![[x]]` is never also seen as `[[x]]`.

use regex::{Captures, Regex};
use serde_yaml::Value;
use std::sync::LazyLock;

use crate::config::CountingConfig;
use crate::markdown;

/// `%% ... %%` and `<!-- ... -->`, possibly spanning lines. An unterminated
/// comment runs to the end of the document.
static COMMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)%%.*?(?:%%|\z)|<!--.*?(?:-->|\z)").expect("valid regex")
});

/// `![[target]]` and `![alt](url)`.
static EMBED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[\[[^\[\]]*\]\]|!\[[^\[\]]*\]\([^()]*\)").expect("valid regex")
});

/// `[[target]]` or `[[target|display]]`.
static WIKILINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").expect("valid regex"));

/// `[display](url)`.
static MARKDOWN_LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]*)\]\(([^()]*)\)").expect("valid regex"));

/// A note split into countable prose and extracted side data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    /// Prose left after metadata, comments, embeds, and link syntax are gone.
    pub body: String,
    /// Aliases declared in the metadata block, in declaration order.
    pub aliases: Vec<String>,
    /// Declared `word-goal`, or 0 when absent or malformed.
    pub word_goal: u64,
    /// Number of wiki and Markdown links.
    pub link_count: u64,
    /// Number of embeds.
    pub embed_count: u64,
}

/// Normalize raw note text for counting.
///
/// Never fails: a malformed metadata block is treated as declaring no
/// aliases and no goal, and its text is still removed from the body.
#[tracing::instrument(skip_all, fields(input_len = raw.len()))]
pub fn normalize(raw: &str, config: &CountingConfig) -> Normalized {
    let (frontmatter, body) = markdown::split_frontmatter(raw);
    let (aliases, word_goal) = frontmatter.map(parse_frontmatter).unwrap_or_default();

    let mut body = body.to_string();

    if config.exclude_code_blocks {
        body = markdown::strip_code_blocks(&body);
    }

    if config.exclude_comments {
        body = COMMENT_PATTERN.replace_all(&body, " ").into_owned();
    }

    let embed_count = EMBED_PATTERN.find_iter(&body).count() as u64;
    if embed_count > 0 {
        body = EMBED_PATTERN.replace_all(&body, " ").into_owned();
    }

    let mut link_count = 0u64;
    body = WIKILINK_PATTERN
        .replace_all(&body, |caps: &Captures<'_>| {
            link_count += 1;
            let inner = &caps[1];
            inner
                .split_once('|')
                .map_or(inner, |(_, display)| display)
                .to_string()
        })
        .into_owned();
    body = MARKDOWN_LINK_PATTERN
        .replace_all(&body, |caps: &Captures<'_>| {
            link_count += 1;
            caps[1].to_string()
        })
        .into_owned();

    Normalized {
        body,
        aliases,
        word_goal,
        link_count,
        embed_count,
    }
}

/// Pull `aliases` and `word-goal` out of a YAML metadata block.
fn parse_frontmatter(yaml: &str) -> (Vec<String>, u64) {
    let value: Value = match serde_yaml::from_str(yaml) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed metadata block");
            return (Vec::new(), 0);
        }
    };
    let Value::Mapping(map) = value else {
        return (Vec::new(), 0);
    };

    let aliases = map
        .get("aliases")
        .or_else(|| map.get("alias"))
        .map(aliases_from)
        .unwrap_or_default();
    let word_goal = map.get("word-goal").and_then(goal_from).unwrap_or(0);

    (aliases, word_goal)
}

fn aliases_from(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn goal_from(value: &Value) -> Option<u64> {
    let goal = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (goal.is_finite() && goal > 0.0).then(|| goal.floor() as u64)
}
