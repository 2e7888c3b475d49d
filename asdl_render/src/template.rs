//! Deterministic finite-state `{identifier}` placeholder scanner (§9
//! "Template rendering"). Never evaluates expressions; unknown
//! placeholders render literally, as does an unterminated `{`.

use std::collections::BTreeMap;

enum State {
    Text,
    Brace,
}

/// Renders `template` by substituting every `{identifier}` occurrence
/// found in `bindings`, leaving anything else — including placeholders
/// with no binding — untouched.
#[must_use]
pub fn render(template: &str, bindings: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut state = State::Text;
    let mut ident = String::new();

    for ch in template.chars() {
        match state {
            State::Text => {
                if ch == '{' {
                    state = State::Brace;
                    ident.clear();
                } else {
                    out.push(ch);
                }
            }
            State::Brace => {
                if ch == '}' {
                    match bindings.get(&ident) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(&ident);
                            out.push('}');
                        }
                    }
                    state = State::Text;
                } else if ch.is_ascii_alphanumeric() || ch == '_' {
                    ident.push(ch);
                } else {
                    // Not a valid identifier char: the `{` wasn't a
                    // placeholder opener, flush it literally.
                    out.push('{');
                    out.push_str(&ident);
                    out.push(ch);
                    state = State::Text;
                }
            }
        }
    }
    if matches!(state, State::Brace) {
        out.push('{');
        out.push_str(&ident);
    }
    out
}

/// Collapses runs of blank-looking whitespace left behind when a
/// `{ports}`/`{params}` placeholder resolves to an empty string (§4.7).
#[must_use]
pub fn collapse_empty_placeholder_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch == ' ' || ch == '\t' {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim_end_matches(' ').to_string()
}
