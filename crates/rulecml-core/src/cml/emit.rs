//! Text helpers shared by the CML renderers.

/// Indentation unit of the emitted text.
pub const INDENT: &str = "\t";

/// Wraps `text` in double quotes, escaping backslashes and quotes.
#[must_use]
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Re-indents CML text by brace depth.
///
/// Every non-blank line is trimmed and prefixed with one tab per open brace;
/// a line starting with `}` closes before it is written and a line ending
/// with `{` opens after. Blank lines stay empty.
#[must_use]
pub fn format_indentation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth: usize = 0;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            out.push('\n');
            continue;
        }
        if trimmed.starts_with('}') {
            depth = depth.saturating_sub(1);
        }
        out.push_str(&INDENT.repeat(depth));
        out.push_str(trimmed);
        out.push('\n');
        if trimmed.ends_with('{') {
            depth += 1;
        }
    }

    out
}
