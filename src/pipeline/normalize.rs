//! Page text normalization into trimmed, non-empty lines.
//!
//! Whitespace runs are collapsed, but a run that looks like a column gap
//! (a tab, or two or more spaces) collapses to a tab or a double space
//! instead of a single space, so the grid parser can still split columns.

use unicode_normalization::UnicodeNormalization;

/// Normalize one page of text and split it into lines.
pub fn normalize_lines(text: &str) -> Vec<String> {
    let text: String = text
        .nfkc()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}'))
        .map(|c| match c {
            '\u{00A0}' | '\u{202F}' | '\u{2007}' => ' ',
            other => other,
        })
        .collect();

    text.split(['\n', '\r', '\u{2028}', '\u{2029}', '\u{000C}'])
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Collapse horizontal whitespace in a single line and trim it.
fn collapse_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut run = String::new();

    let flush = |run: &mut String, out: &mut String| {
        if run.is_empty() {
            return;
        }
        if run.contains('\t') {
            out.push('\t');
        } else if run.chars().count() >= 2 {
            out.push_str("  ");
        } else {
            out.push(' ');
        }
        run.clear();
    };

    for c in line.trim().chars() {
        if c.is_whitespace() {
            run.push(c);
        } else {
            flush(&mut run, &mut out);
            out.push(c);
        }
    }
    out
}

/// Join normalized page lines into the document plain text.
pub fn join_pages(pages: &[Vec<String>]) -> String {
    pages
        .iter()
        .map(|lines| lines.join("\n"))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
