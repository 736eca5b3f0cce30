//! Whitespace and comment minification for JavaScript.
//!
//! The minifier works on characters, not on a syntax tree: comments are
//! dropped, whitespace runs collapse to nothing or to one separator, and
//! string, template and regular-expression literals are copied verbatim.
//! A line break is kept wherever automatic semicolon insertion could depend
//! on it. Identifiers are never renamed, so output is deterministic.

/// Characters after which a `/` starts a regular expression literal.
const REGEX_PRECEDERS: &str = "(,=:[!&|?{};+-*%<>~^";

/// Keywords after which a `/` starts a regular expression literal.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "new", "delete", "void", "throw",
    "instanceof",
];

/// A line break after one of these can always be dropped.
const JOIN_AFTER: &str = ",;({[=:?&|!~<>*%^";

/// A line break before one of these can always be dropped.
const JOIN_BEFORE: &str = ",;)}]:?.=&|*%^<>";

/// What the scanner does with string, template and regex literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Literals {
    Keep,
    /// Replace literal bodies with an empty literal, except the argument of a
    /// direct `require(` call.
    Mask,
}

/// Minify JavaScript source text.
pub fn minify(source: &str) -> String {
    scan(source, Literals::Keep)
}

/// Minified code with the contents of every literal blanked out, apart from
/// `require(...)` arguments. Text inside strings, templates and regular
/// expressions can then never be mistaken for code.
pub(crate) fn code_only(source: &str) -> String {
    scan(source, Literals::Mask)
}

fn scan(source: &str, literals: Literals) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut pending_space = false;
    let mut pending_newline = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                pending_newline = true;
                i += 1;
            }
            c if c.is_whitespace() || c == '\u{feff}' => {
                pending_space = true;
                i += 1;
            }
            '/' if next == Some('/') => {
                while i < chars.len() && !is_line_break(chars[i]) {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                let start = i + 2;
                let mut end = start;
                while end < chars.len() && !(chars[end] == '*' && chars.get(end + 1) == Some(&'/')) {
                    end += 1;
                }
                if chars[start..end.min(chars.len())].iter().any(|&ch| is_line_break(ch)) {
                    pending_newline = true;
                } else {
                    pending_space = true;
                }
                i = (end + 2).min(chars.len());
            }
            _ => {
                let regex_here = c == '/' && regex_allowed(&out);
                flush_separator(&mut out, pending_space, pending_newline, c);
                pending_space = false;
                pending_newline = false;

                let keep = literals == Literals::Keep || follows_require(&out);
                if c == '"' || c == '\'' || c == '`' {
                    i = copy_literal(&chars, i, &mut out, keep, copy_string);
                } else if regex_here {
                    i = copy_literal(&chars, i, &mut out, keep, copy_regex);
                } else {
                    out.push(c);
                    i += 1;
                }
            }
        }
    }

    out
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\\' || !c.is_ascii()
}

/// Whether dropping all whitespace between `prev` and `next` would merge two
/// tokens into one.
fn needs_space(prev: char, next: char) -> bool {
    (is_word(prev) && is_word(next))
        || (prev == '+' && next == '+')
        || (prev == '-' && next == '-')
        || (prev == '/' && (next == '/' || next == '*'))
        || (prev.is_ascii_digit() && next == '.')
}

fn flush_separator(out: &mut String, space: bool, newline: bool, next: char) {
    let Some(prev) = out.chars().last() else {
        return;
    };
    if newline && !JOIN_AFTER.contains(prev) && !JOIN_BEFORE.contains(next) {
        out.push('\n');
    } else if (space || newline) && needs_space(prev, next) {
        out.push(' ');
    }
}

fn regex_allowed(out: &str) -> bool {
    let trimmed = out.trim_end();
    let Some(prev) = trimmed.chars().last() else {
        return true;
    };
    if prev == '+' || prev == '-' {
        // `a++ / b` divides; `a + /re/` does not.
        let mut before = trimmed.chars().rev().skip(1);
        if before.next() == Some(prev) {
            return !before
                .next()
                .is_some_and(|ch| is_word(ch) || ch == ')' || ch == ']');
        }
        return true;
    }
    if REGEX_PRECEDERS.contains(prev) {
        return true;
    }
    if !is_word(prev) {
        return false;
    }
    let word_start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, ch)| is_word(*ch))
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let word = &trimmed[word_start..];
    REGEX_KEYWORDS.contains(&word)
}

/// Whether the output ends in a direct `require(` call.
fn follows_require(out: &str) -> bool {
    let Some(head) = out.strip_suffix("require(") else {
        return false;
    };
    !head.chars().last().is_some_and(|ch| is_word(ch) || ch == '.')
}

/// Copy a literal with `copy`, or when `keep` is false skip it and emit an
/// empty literal with the same delimiters.
fn copy_literal(
    chars: &[char],
    start: usize,
    out: &mut String,
    keep: bool,
    copy: fn(&[char], usize, &mut String) -> usize,
) -> usize {
    if keep {
        return copy(chars, start, out);
    }
    let mut skipped = String::new();
    let end = copy(chars, start, &mut skipped);
    let delimiter = chars[start];
    out.push(delimiter);
    out.push(delimiter);
    end
}

/// Copy a quoted literal starting at `start`; returns the index after it.
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push(quote);
    let mut i = start + 1;
    while i < chars.len() {
        let ch = chars[i];
        out.push(ch);
        i += 1;
        if ch == '\\' {
            if let Some(&escaped) = chars.get(i) {
                out.push(escaped);
                i += 1;
            }
        } else if ch == quote {
            break;
        }
    }
    i
}

/// Copy a regular expression literal starting at `start`; returns the index
/// after the closing slash.
fn copy_regex(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('/');
    let mut i = start + 1;
    let mut in_class = false;
    while i < chars.len() && !is_line_break(chars[i]) {
        let ch = chars[i];
        out.push(ch);
        i += 1;
        match ch {
            '\\' => {
                if let Some(&escaped) = chars.get(i) {
                    out.push(escaped);
                    i += 1;
                }
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => break,
            _ => {}
        }
    }
    i
}
