//! Folder aggregation.
//!
//! A folder's record is a pure function of its direct children's records:
//! sums for counts and sizes, the earliest known creation date, the latest
//! modification date, and no aliases.

use crate::record::CountRecord;

/// Combine child records into the record of their parent folder.
///
/// Children may be notes or folders that were already aggregated; callers
/// resolve descendants first (post-order). Goals are summed, so a folder's
/// goal is the total of its notes' goals.
pub fn aggregate<'a, I>(children: I) -> CountRecord
where
    I: IntoIterator<Item = &'a CountRecord>,
{
    let mut folder = CountRecord::empty_folder();
    let mut earliest_created: Option<u64> = None;

    for child in children {
        folder.word_count += child.word_count;
        folder.cjk_word_count += child.cjk_word_count;
        folder.character_count += child.character_count;
        folder.page_count += child.page_count;
        folder.word_count_toward_goal += child.word_count_toward_goal;
        folder.word_goal += child.word_goal;
        folder.note_count += child.note_count;
        folder.link_count += child.link_count;
        folder.embed_count += child.embed_count;
        folder.size_in_bytes += child.size_in_bytes;
        folder.modified_date = folder.modified_date.max(child.modified_date);

        // 0 means unknown and never wins the minimum
        if child.created_date > 0 {
            earliest_created =
                Some(earliest_created.map_or(child.created_date, |d| d.min(child.created_date)));
        }
    }

    folder.created_date = earliest_created.unwrap_or(0);
    folder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(words: u64, created: u64, modified: u64) -> CountRecord {
        CountRecord {
            word_count: words,
            character_count: words * 5,
            page_count: words as f64 / 300.0,
            note_count: 1,
            link_count: 2,
            embed_count: 1,
            aliases: vec!["alias".to_string()],
            created_date: created,
            modified_date: modified,
            size_in_bytes: 100,
            ..CountRecord::default()
        }
    }

    #[test]
    fn sums_counts() {
        let children = [note(100, 5, 10), note(50, 3, 30), note(0, 0, 20)];
        let folder = aggregate(&children);

        assert_eq!(folder.word_count, 150);
        assert_eq!(folder.character_count, 750);
        assert_eq!(folder.note_count, 3);
        assert_eq!(folder.link_count, 6);
        assert_eq!(folder.embed_count, 3);
        assert_eq!(folder.size_in_bytes, 300);
        assert!((folder.page_count - 0.5).abs() < 1e-12);
        assert!(folder.is_directory);
        assert!(folder.aliases.is_empty());
    }

    #[test]
    fn dates_use_min_nonzero_created_and_max_modified() {
        let children = [note(1, 0, 10), note(1, 7, 40), note(1, 4, 20)];
        let folder = aggregate(&children);
        assert_eq!(folder.created_date, 4);
        assert_eq!(folder.modified_date, 40);
    }

    #[test]
    fn all_unknown_created_stays_zero() {
        let children = [note(1, 0, 10), note(1, 0, 0)];
        assert_eq!(aggregate(&children).created_date, 0);
    }

    #[test]
    fn goals_are_summed() {
        let with_goal = CountRecord {
            word_count: 250,
            word_count_toward_goal: 250,
            word_goal: 1000,
            note_count: 1,
            ..CountRecord::default()
        };
        let without_goal = note(400, 1, 1);
        let folder = aggregate([&with_goal, &without_goal]);

        assert_eq!(folder.word_goal, 1000);
        assert_eq!(folder.word_count_toward_goal, 250);
        assert_eq!(folder.goal_percent(), Some(25));
    }

    #[test]
    fn nested_folders_sum_transitively() {
        let inner = aggregate(&[note(10, 2, 2), note(20, 3, 3)]);
        let outer = aggregate([&inner, &note(5, 1, 9)]);
        assert_eq!(outer.word_count, 35);
        assert_eq!(outer.note_count, 3);
        assert_eq!(outer.created_date, 1);
        assert_eq!(outer.modified_date, 9);
    }

    #[test]
    fn empty_folder_is_zero() {
        let folder = aggregate(std::iter::empty());
        assert_eq!(folder, CountRecord::empty_folder());
        assert_eq!(folder.created_date, 0);
        assert_eq!(folder.modified_date, 0);
    }
}
