//! Sanitization of names and text for splicing into generated C++.
//!
//! Both functions are total: any input yields a usable result.

use serde::Serialize;

/// Characters that npm package names commonly carry and C++ symbols cannot.
///
/// Any other character outside `[A-Za-z0-9_]` is replaced as well.
pub const DISALLOWED_IDENT_CHARS: &[char] = &['-', '\\', '?', '\'', '"'];

/// Ordered escape table for C++ string literal bodies.
///
/// Applied top to bottom. The backslash entry must come first, otherwise the
/// backslashes inserted by later entries would be escaped a second time.
pub const LITERAL_ESCAPES: &[(&str, &str)] = &[
    ("\\", "\\\\"),
    ("\n", "\\n"),
    ("\"", "\\\""),
    ("\r", "\\r"),
];

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "asm", "auto", "bool", "break", "case", "catch", "char",
    "class", "const", "constexpr", "continue", "default", "delete", "do", "double", "else",
    "enum", "explicit", "extern", "false", "float", "for", "friend", "goto", "if", "inline",
    "int", "long", "mutable", "namespace", "new", "noexcept", "not", "nullptr", "operator",
    "or", "private", "protected", "public", "register", "return", "short", "signed", "sizeof",
    "static", "struct", "switch", "template", "this", "throw", "true", "try", "typedef",
    "typename", "union", "unsigned", "using", "virtual", "void", "volatile", "while",
];

/// Convert an arbitrary name into a valid bare C++ identifier.
///
/// `7-dep's"name` becomes `_7_dep_s_name`.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if DISALLOWED_IDENT_CHARS.contains(&c) || !(c.is_ascii_alphanumeric() || c == '_') {
                '_'
            } else {
                c
            }
        })
        .collect();

    match out.chars().next() {
        None => out.push('_'),
        Some(first) if first.is_ascii_digit() => out.insert(0, '_'),
        Some(_) => {}
    }

    if CPP_KEYWORDS.contains(&out.as_str()) {
        out.push('_');
    }

    out
}

/// Escape text so it can sit verbatim between `"` delimiters in C++.
pub fn sanitize_string_literal(text: &str) -> String {
    LITERAL_ESCAPES
        .iter()
        .fold(text.to_string(), |acc, (pattern, replacement)| {
            acc.replace(pattern, replacement)
        })
}

/// One program embedded into the generated source file.
///
/// `source_length` is the byte length of the unescaped text; the escaped body
/// is longer and cannot be used to recover it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddedSource {
    /// Sanitized symbol name.
    pub name: String,
    /// Byte length of the unescaped program.
    pub source_length: usize,
    /// Escaped literal body.
    pub source: String,
}

impl EmbeddedSource {
    /// Sanitize `name` and escape `text` for embedding.
    pub fn new(name: &str, text: &str) -> Self {
        Self {
            name: sanitize_identifier(name),
            source_length: text.len(),
            source: sanitize_string_literal(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reverse the C++ escapes this module produces.
    fn unescape(body: &str) -> String {
        let mut out = String::new();
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                other => panic!("unexpected escape: {other:?}"),
            }
        }
        out
    }

    /// True when no `"` in the body terminates the literal early.
    fn quotes_are_escaped(body: &str) -> bool {
        let mut escaped = false;
        for c in body.chars() {
            match (escaped, c) {
                (false, '\\') => escaped = true,
                (false, '"') | (false, '\n') => return false,
                _ => escaped = false,
            }
        }
        !escaped
    }

    #[test]
    fn identifier_replaces_disallowed_and_leading_digit() {
        assert_eq!(sanitize_identifier("7-dep's\"name"), "_7_dep_s_name");
    }

    #[test]
    fn identifier_examples() {
        assert_eq!(sanitize_identifier("fade-led"), "fade_led");
        assert_eq!(sanitize_identifier("a\\b?c"), "a_b_c");
        assert_eq!(sanitize_identifier("@scope/pkg.js"), "_scope_pkg_js");
        assert_eq!(sanitize_identifier("already_ok"), "already_ok");
    }

    #[test]
    fn identifier_degenerate_inputs() {
        assert_eq!(sanitize_identifier(""), "_");
        assert_eq!(sanitize_identifier("-?'\""), "____");
        assert_eq!(sanitize_identifier("42"), "_42");
        assert_eq!(sanitize_identifier("int"), "int_");
    }

    #[test]
    fn identifier_output_is_always_valid() {
        for input in ["", "9", "é", "a b", "--", "\\", "x-1", "return", "ünïcode-9"] {
            let out = sanitize_identifier(input);
            let first = out.chars().next().unwrap();
            assert!(first == '_' || first.is_ascii_alphabetic(), "{input:?} -> {out:?}");
            assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            assert!(!CPP_KEYWORDS.contains(&out.as_str()));
        }
    }

    #[test]
    fn literal_escapes_backslash_before_newline() {
        let input = "a\\\nb";
        let escaped = sanitize_string_literal(input);
        assert_eq!(escaped, "a\\\\\\nb");
        assert_eq!(unescape(&escaped), input);
    }

    #[test]
    fn literal_escape_table_order() {
        assert_eq!(LITERAL_ESCAPES[0].0, "\\");
        assert_eq!(LITERAL_ESCAPES[1].0, "\n");
        assert_eq!(LITERAL_ESCAPES[2].0, "\"");

        // Running the table with backslash last double-escapes newlines.
        let mut reversed: Vec<_> = LITERAL_ESCAPES.to_vec();
        reversed.rotate_left(1);
        let wrong = reversed
            .iter()
            .fold("\n".to_string(), |acc, (p, r)| acc.replace(p, r));
        assert_eq!(wrong, "\\\\n");
        assert_eq!(sanitize_string_literal("\n"), "\\n");
    }

    #[test]
    fn literal_round_trips() {
        let samples = [
            "",
            "plain",
            "say \"hi\"\n",
            "path\\to\\file",
            "\\\"",
            "line1\r\nline2",
            "var s = 'it\\'s';\nconsole.log(\"\\n\");",
            "trailing backslash \\",
        ];
        for text in samples {
            let escaped = sanitize_string_literal(text);
            assert!(quotes_are_escaped(&escaped), "{text:?} -> {escaped:?}");
            assert_eq!(unescape(&escaped), text);
        }
    }

    #[test]
    fn embedded_source_keeps_unescaped_length() {
        let text = "let a = \"x\";\nlet b = 1;";
        let embedded = EmbeddedSource::new("fade-led", text);
        assert_eq!(embedded.name, "fade_led");
        assert_eq!(embedded.source_length, text.len());
        assert!(embedded.source.len() > text.len());
    }
}
