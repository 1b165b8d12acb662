//! Markdown structure helpers.
//!
//! Code blocks are located with pulldown-cmark rather than regexes so that
//! fences nested in lists, indented blocks, and unterminated fences behave
//! the way a CommonMark renderer shows them.

use pulldown_cmark::{Event, Options, Parser, Tag};

/// Split a leading `---` metadata block from the document.
///
/// The opening fence must be the very first line of the document. The block
/// ends at the first line that is exactly `---` or `...`. Returns the raw
/// block contents (without fences) and the remaining body; an unterminated
/// block is not metadata and the whole text is returned as body.
pub fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text.strip_prefix("---") else {
        return (None, text);
    };
    let rest = rest.trim_start_matches([' ', '\t']);
    let Some(rest) = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let fence = line.trim_end();
        if fence == "---" || fence == "..." {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }

    (None, text)
}

/// Remove fenced and indented code blocks, keeping everything else verbatim.
///
/// Each removed block is replaced by a newline so the text on either side
/// never fuses into one word.
#[tracing::instrument(skip_all, fields(input_len = text.len()))]
pub fn strip_code_blocks(text: &str) -> String {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES;
    let parser = Parser::new_ext(text, options).into_offset_iter();

    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;

    for (event, range) in parser {
        if let Event::Start(Tag::CodeBlock(_)) = event
            && range.start >= cursor
        {
            result.push_str(&text[cursor..range.start]);
            result.push('\n');
            cursor = range.end;
        }
    }

    result.push_str(&text[cursor..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontmatter_split_at_document_start() {
        let (meta, body) = split_frontmatter("---\naliases: [a]\n---\nBody text.");
        assert_eq!(meta, Some("aliases: [a]\n"));
        assert_eq!(body, "Body text.");
    }

    #[test]
    fn frontmatter_accepts_dot_terminator_and_crlf() {
        let (meta, body) = split_frontmatter("---\r\nword-goal: 10\r\n...\r\nBody");
        assert_eq!(meta, Some("word-goal: 10\r\n"));
        assert_eq!(body, "Body");
    }

    #[test]
    fn frontmatter_empty_block() {
        let (meta, body) = split_frontmatter("---\n---\nBody");
        assert_eq!(meta, Some(""));
        assert_eq!(body, "Body");
    }

    #[test]
    fn frontmatter_must_be_first_line() {
        let text = "\n---\ntitle: x\n---\nBody";
        assert_eq!(split_frontmatter(text), (None, text));
    }

    #[test]
    fn unterminated_frontmatter_is_body() {
        let text = "---\ntitle: x\nBody without a closing fence";
        assert_eq!(split_frontmatter(text), (None, text));
    }

    #[test]
    fn horizontal_rule_prefix_is_not_frontmatter() {
        let text = "----\nBody";
        assert_eq!(split_frontmatter(text), (None, text));
    }

    #[test]
    fn strip_removes_fenced_blocks() {
        let input = "Some text.\n\n```rust\nlet x = 1;\n```\n\nMore text.";
        let result = strip_code_blocks(input);
        assert!(!result.contains("let x"));
        assert!(result.contains("Some text."));
        assert!(result.contains("More text."));
    }

    #[test]
    fn strip_removes_indented_blocks() {
        let input = "Intro paragraph.\n\n    indented code here\n\nOutro.";
        let result = strip_code_blocks(input);
        assert!(!result.contains("indented code"));
        assert!(result.contains("Outro."));
    }

    #[test]
    fn strip_keeps_inline_code() {
        let input = "Call `render()` twice.";
        assert_eq!(strip_code_blocks(input), input);
    }

    #[test]
    fn empty_input_returns_empty() {
        assert!(strip_code_blocks("").is_empty());
    }
}
