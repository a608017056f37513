//! Terminal output for one answered question.
//!
//! During generation tokens are printed raw as they arrive. Once the chain
//! returns, the full answer is printed again word-wrapped, followed by its
//! sources and the elapsed time.

use std::io::Write;
use std::time::Duration;

use console::style;

use docchat_types::chat::AnswerResult;

pub struct ChatRenderer {
    width: usize,
}

impl ChatRenderer {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    pub fn print_streaming_token(&self, token: &str) {
        print!("{token}");
        let _ = std::io::stdout().flush();
    }

    /// Wrapped answer, then `Sources:` lines or a notice when there are none.
    pub fn print_response(&self, result: &AnswerResult) {
        println!("{}", wrap_text_preserve_newlines(&result.answer, self.width));

        if result.has_sources() {
            println!("\n{}", style("Sources:").bold());
            for line in source_lines(result) {
                println!("{line}");
            }
        } else {
            println!(
                "\n{}",
                style("No source documents were used for this answer.").dim()
            );
            tracing::debug!(?result, "answer without source documents");
        }
    }

    pub fn print_elapsed(&self, elapsed: Duration) {
        println!("{}", format_elapsed(elapsed));
    }
}

/// `<url> page: <page>` for every source document, in retrieval order.
pub fn source_lines(result: &AnswerResult) -> Vec<String> {
    result
        .source_documents
        .iter()
        .map(|doc| doc.source.to_string())
        .collect()
}

pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.2} seconds", elapsed.as_secs_f64())
}

/// Wrap each newline-delimited line on its own, keeping the line structure.
pub fn wrap_text_preserve_newlines(text: &str, width: usize) -> String {
    text.split('\n')
        .map(|line| wrap_line(line, width))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Greedy word wrap of a single line.
///
/// Leading indentation is kept on the first output line. Whitespace runs
/// between words collapse to one space. A word longer than `width` is placed
/// on its own line unbroken.
pub fn wrap_line(line: &str, width: usize) -> String {
    let body = line.trim_start();
    if body.is_empty() {
        return String::new();
    }
    let indent = &line[..line.len() - body.len()];

    let mut out = String::with_capacity(line.len());
    out.push_str(indent);
    let mut current = indent.chars().count();
    let mut first = true;

    for word in body.split_whitespace() {
        let len = word.chars().count();
        if first {
            out.push_str(word);
            current += len;
            first = false;
        } else if current + 1 + len <= width {
            out.push(' ');
            out.push_str(word);
            current += 1 + len;
        } else {
            out.push('\n');
            out.push_str(word);
            current = len;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use docchat_types::document::{DocumentChunk, SourceMetadata};

    use super::*;

    fn result(answer: &str, sources: &[(&str, u32)]) -> AnswerResult {
        AnswerResult {
            answer: answer.to_string(),
            standalone_question: "q".to_string(),
            source_documents: sources
                .iter()
                .map(|(url, page)| {
                    DocumentChunk::new(
                        "text",
                        SourceMetadata {
                            url: url.to_string(),
                            page: *page,
                        },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn test_short_line_unchanged() {
        assert_eq!(wrap_line("Mikla has a rooftop terrace.", 110), "Mikla has a rooftop terrace.");
    }

    #[test]
    fn test_wraps_at_width() {
        assert_eq!(wrap_line("aaa bbb ccc ddd", 7), "aaa bbb\nccc ddd");
        assert_eq!(wrap_line("aaa bbb ccc", 6), "aaa\nbbb\nccc");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(wrap_line("one \t two   three ", 110), "one two three");
        assert_eq!(wrap_line("   \t ", 110), "");
    }

    #[test]
    fn test_keeps_leading_indentation() {
        assert_eq!(wrap_line("    - nested item", 110), "    - nested item");
        assert_eq!(wrap_line("  aaa bbb ccc", 9), "  aaa bbb\nccc");

        let text = "Menu:\n  - meze\n    - haydari";
        assert_eq!(wrap_text_preserve_newlines(text, 110), text);
    }

    #[test]
    fn test_long_word_is_not_broken() {
        let url = "https://www.priceless.com/filter/options/location/istanbul/category/dining";
        let wrapped = wrap_line(&format!("see {url} now"), 20);
        assert_eq!(wrapped, format!("see\n{url}\nnow"));
    }

    #[test]
    fn test_preserves_newline_segments() {
        let text = "first line\n\nthird line that is a bit longer\nlast";
        let wrapped = wrap_text_preserve_newlines(text, 110);
        assert_eq!(wrapped.split('\n').count(), 4);
        assert_eq!(wrapped, text);

        let narrow = wrap_text_preserve_newlines(text, 10);
        assert_eq!(narrow, "first line\n\nthird line\nthat is a\nbit longer\nlast");
    }

    #[test]
    fn test_no_line_exceeds_width() {
        let text = "The Bosphorus view from the terrace is best at sunset, when the call to prayer \
                    echoes across the water and the city lights come on one by one.\nShort.";
        for width in [10, 25, 40, 110] {
            for line in wrap_text_preserve_newlines(text, width).lines() {
                assert!(line.chars().count() <= width, "{line:?} exceeds {width}");
            }
        }
    }

    #[test]
    fn test_wrap_counts_chars_not_bytes() {
        assert_eq!(wrap_line("çiğ köfte", 9), "çiğ köfte");
    }

    #[test]
    fn test_source_lines_in_order() {
        let r = result(
            "answer",
            &[("https://www.priceless.com/a", 1), ("docs/menu.pdf", 3)],
        );
        assert_eq!(
            source_lines(&r),
            vec!["https://www.priceless.com/a page: 1", "docs/menu.pdf page: 3"]
        );
        assert!(source_lines(&result("answer", &[])).is_empty());
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(5381)), "5.38 seconds");
    }
}
