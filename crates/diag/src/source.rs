//! Source spans, locations, and the highlight renderer that turns a span
//! into a line-numbered excerpt with a caret underline.

/// Byte range into a source buffer. Non-owning; the buffer is wherever the
/// producing reader keeps its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSpan {
    pub begin: usize,
    pub len: usize,
}

impl SourceSpan {
    pub fn new(begin: usize, len: usize) -> Self {
        SourceSpan { begin, len }
    }
}

/// 1-indexed line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Default for Location {
    fn default() -> Self {
        Location { line: 1, column: 0 }
    }
}

/// Render `span` within `text`: the spanned line plus one line of leading
/// context, with a line-number gutter and a caret underline. Returns an
/// empty string when the span falls outside the buffer.
pub fn format_highlight(text: &str, span: SourceSpan, loc: Location) -> String {
    if text.is_empty() || span.begin > text.len() {
        return String::new();
    }
    let begin = span.begin.min(text.len());

    // Boundaries of the line holding the span start.
    let line_start = text[..begin].rfind('\n').map(|ix| ix + 1).unwrap_or(0);
    let line_end = text[begin..]
        .find(|c| c == '\n' || c == '\r')
        .map(|ix| begin + ix)
        .unwrap_or(text.len());

    let gutter_width = digits(loc.line);
    let mut out = String::new();

    if line_start > 0 {
        let prev_end = line_start - 1;
        let prev_end = if text[..prev_end].ends_with('\r') {
            prev_end - 1
        } else {
            prev_end
        };
        let prev_start = text[..prev_end].rfind('\n').map(|ix| ix + 1).unwrap_or(0);
        if loc.line > 1 {
            out.push_str(&format!(
                "{:>width$} | {}\n",
                loc.line - 1,
                &text[prev_start..prev_end],
                width = gutter_width
            ));
        }
    }

    out.push_str(&format!(
        "{:>width$} | {}\n",
        loc.line,
        &text[line_start..line_end],
        width = gutter_width
    ));

    // Caret underline, clamped to the spanned line.
    let caret_offset = text[line_start..begin].chars().count();
    let caret_len = text[begin..line_end.max(begin)]
        .chars()
        .count()
        .min(span.len)
        .max(1);
    out.push_str(&format!(
        "{:>width$} | {}{}",
        "",
        " ".repeat(caret_offset),
        "^".repeat(caret_len),
        width = gutter_width
    ));

    out
}

fn digits(mut v: u32) -> usize {
    let mut n = 1;
    while v >= 10 {
        v /= 10;
        n += 1;
    }
    n
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_line_highlight() {
        let text = r#"{"a": xyz}"#;
        let rendered = format_highlight(
            text,
            SourceSpan::new(6, 3),
            Location { line: 1, column: 7 },
        );
        assert_eq!(rendered, "1 | {\"a\": xyz}\n  |       ^^^");
    }

    #[test]
    fn test_highlight_with_leading_context() {
        let text = "{\n  \"a\": 1,\n  \"a\": 2\n}";
        // Span points at the second `"a"`.
        let begin = text.rfind("\"a\"").unwrap();
        let rendered = format_highlight(
            text,
            SourceSpan::new(begin, 3),
            Location { line: 3, column: 3 },
        );
        assert_eq!(rendered, "2 |   \"a\": 1,\n3 |   \"a\": 2\n  |   ^^^");
    }

    #[test]
    fn test_empty_buffer() {
        assert_eq!(
            format_highlight("", SourceSpan::new(0, 1), Location::default()),
            ""
        );
    }

    #[test]
    fn test_span_at_end_of_input() {
        let text = "[1, 2";
        let rendered = format_highlight(
            text,
            SourceSpan::new(5, 1),
            Location { line: 1, column: 6 },
        );
        assert_eq!(rendered, "1 | [1, 2\n  |      ^");
    }
}
