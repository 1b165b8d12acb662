//! One-line labels for notes and folders.
//!
//! Formatting only: every number comes straight from a [`CountRecord`].

use notecount_core::config::{CountingConfig, Metric};
use notecount_core::metrics::reading_time;
use notecount_core::record::CountRecord;

/// Separator between metrics on one line.
pub const SEPARATOR: &str = " · ";

/// Render the configured metrics for a record, skipping metrics with nothing
/// to show (no aliases, no goal, unknown dates).
pub fn label(record: &CountRecord, metrics: &[Metric], counting: &CountingConfig) -> String {
    metrics
        .iter()
        .filter_map(|metric| metric_text(record, *metric, counting))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Render a single metric, `None` when it has nothing to show.
pub fn metric_text(record: &CountRecord, metric: Metric, counting: &CountingConfig) -> Option<String> {
    let text = match metric {
        Metric::Words => counted(record.word_count, "word", "words"),
        Metric::Pages => pages(record.page_count),
        Metric::ReadingTime => minutes(reading_time(record, counting)),
        Metric::Characters => counted(record.character_count, "character", "characters"),
        Metric::Notes => counted(record.note_count, "note", "notes"),
        Metric::Links => counted(record.link_count, "link", "links"),
        Metric::Embeds => counted(record.embed_count, "embed", "embeds"),
        Metric::Aliases => {
            if record.aliases.is_empty() {
                return None;
            }
            record.aliases.join(", ")
        }
        Metric::Goal => {
            let percent = record.goal_percent()?;
            format!("{percent}% of {} goal", compact(record.word_goal))
        }
        Metric::Created => format!("created {}", date(record.created_date)?),
        Metric::Modified => format!("modified {}", date(record.modified_date)?),
        Metric::Size => bytes(record.size_in_bytes),
    };
    Some(text)
}

/// `1 word`, `12 words`, `3.4k words`.
pub fn counted(n: u64, singular: &str, plural: &str) -> String {
    format!("{} {}", compact(n), if n == 1 { singular } else { plural })
}

/// Abbreviate thousands and millions to one decimal place.
#[allow(clippy::cast_precision_loss)]
pub fn compact(n: u64) -> String {
    match n {
        0..1_000 => n.to_string(),
        1_000..1_000_000 => with_suffix(n as f64 / 1_000.0, "k"),
        _ => with_suffix(n as f64 / 1_000_000.0, "M"),
    }
}

fn with_suffix(value: f64, suffix: &str) -> String {
    let text = format!("{value:.1}");
    let text = text.strip_suffix(".0").unwrap_or(&text);
    format!("{text}{suffix}")
}

/// Whole pages rounded up, or two decimals below one page.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn pages(page_count: f64) -> String {
    if page_count <= 0.0 {
        "0 pages".to_string()
    } else if page_count < 1.0 {
        format!("{page_count:.2} pages")
    } else {
        let whole = page_count.ceil() as u64;
        counted(whole, "page", "pages")
    }
}

/// Reading time, rounded up to whole minutes.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn minutes(minutes: f64) -> String {
    if minutes <= 0.0 {
        "0 min read".to_string()
    } else if minutes < 1.0 {
        "<1 min read".to_string()
    } else {
        format!("{} min read", minutes.ceil() as u64)
    }
}

/// Byte size in binary units.
#[allow(clippy::cast_precision_loss)]
pub fn bytes(size: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if size < 1024 {
        return format!("{size} B");
    }
    let mut value = size as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// `YYYY-MM-DD` in UTC, `None` for an unknown (zero) date.
pub fn date(epoch_ms: u64) -> Option<String> {
    if epoch_ms == 0 {
        return None;
    }
    let millis = i64::try_from(epoch_ms).ok()?;
    let time = chrono::DateTime::from_timestamp_millis(millis)?;
    Some(time.format("%Y-%m-%d").to_string())
}
