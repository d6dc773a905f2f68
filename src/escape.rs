//! String escaping for literal interpolation into SQL text.

/// String delimiter shared by both backends.
pub const QUOTE: char = '\'';

/// Escapes `text` the way the MySQL server reads string literals.
///
/// With `backslash_escapes` off (the `NO_BACKSLASH_ESCAPES` SQL mode) the
/// server treats backslash as an ordinary character, so only the delimiter is
/// doubled.
pub fn escape_mysql(text: &str, backslash_escapes: bool) -> String {
    let mut out = String::with_capacity(text.len() * 2 + 1);
    if !backslash_escapes {
        push_doubling_quotes(&mut out, text);
        return out;
    }

    for ch in text.chars() {
        match ch {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\x1a' => out.push_str("\\Z"),
            other => out.push(other),
        }
    }
    out
}

/// Escapes `text` for a PostgreSQL string literal.
///
/// With `standard_conforming_strings` on only the delimiter is special. With
/// it off the server also reads backslash escapes inside `'...'`, so
/// backslashes are doubled as well.
pub fn escape_postgres(text: &str, standard_conforming_strings: bool) -> String {
    let mut out = String::with_capacity(text.len() * 2 + 1);
    if standard_conforming_strings {
        push_doubling_quotes(&mut out, text);
        return out;
    }

    for ch in text.chars() {
        if ch == QUOTE || ch == '\\' {
            out.push(ch);
        }
        out.push(ch);
    }
    out
}

/// Wraps already escaped text in the string delimiter.
pub fn quote(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len() + 2);
    out.push(QUOTE);
    out.push_str(escaped);
    out.push(QUOTE);
    out
}

fn push_doubling_quotes(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch == QUOTE {
            out.push(QUOTE);
        }
        out.push(ch);
    }
}
