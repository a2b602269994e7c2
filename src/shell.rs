//! POSIX shell quoting.
//!
//! `make` hands recipe lines to `/bin/sh`, so every generated argument has
//! to survive POSIX word splitting. Quoting here is the first of two passes;
//! the Makefile writer escapes the quoted result for Make afterwards.

use crate::error::{GenError, Result};
use regex::Regex;
use std::sync::LazyLock;

static BAD_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_@%+=:,./-]").expect("valid regex"));

/// Escape `s` for use inside single quotes.
///
/// Returns the escaped text and whether it must be wrapped in quotes at all.
/// An empty string always needs quoting so it survives as an argument.
pub fn escape(s: &str) -> (String, bool) {
    if s.is_empty() {
        (String::new(), true)
    } else if !BAD_CHARS.is_match(s) {
        (s.to_string(), false)
    } else {
        (s.replace('\'', r"'\''"), true)
    }
}

pub fn quote_escaped(s: &str) -> String {
    format!("'{}'", s)
}

/// Quote `s` if needed, reporting whether quoting happened.
pub fn quote_info(s: &str) -> (String, bool) {
    let (escaped, needs_quotes) = escape(s);
    if needs_quotes {
        (quote_escaped(&escaped), true)
    } else {
        (escaped, false)
    }
}

pub fn quote(s: &str) -> String {
    quote_info(s).0
}

/// Split `s` into words the way a POSIX shell would (without expansions).
pub fn split(s: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => word.push(ch),
                        None => return Err(GenError::UnterminatedQuote(s.to_string())),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('$' | '`' | '"' | '\\')) => word.push(ch),
                            Some('\n') => {}
                            Some(ch) => {
                                word.push('\\');
                                word.push(ch);
                            }
                            None => return Err(GenError::UnterminatedQuote(s.to_string())),
                        },
                        Some(ch) => word.push(ch),
                        None => return Err(GenError::UnterminatedQuote(s.to_string())),
                    }
                }
            }
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(ch) => {
                    in_word = true;
                    word.push(ch);
                }
                None => {
                    in_word = true;
                    word.push('\\');
                }
            },
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}
