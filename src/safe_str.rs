//! Escaping-aware string values.
//!
//! Text flowing into the Makefile writer is never a bare `String`: it is a
//! [`SafeStr`] that records whether it still needs escaping, so a value is
//! escaped exactly once no matter how many layers it passes through.

use crate::iterutils::tween;
use crate::path::Path;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SafeStr {
    /// Plain text. Shell-quoted in shell positions, then escaped for the
    /// surrounding syntax.
    Text(String),
    /// Already escaped; written verbatim.
    Literal(String),
    /// Raw shell syntax (redirections, pipes). Escaped for the surrounding
    /// syntax but never shell-quoted.
    ShellLiteral(String),
    /// Parts written one after another in the same syntax.
    Concat(Vec<SafeStr>),
    /// A root-relative path, resolved against the writer's root table.
    Path(Path),
}

impl SafeStr {
    pub fn text(s: impl Into<String>) -> Self {
        SafeStr::Text(s.into())
    }

    pub fn literal(s: impl Into<String>) -> Self {
        SafeStr::Literal(s.into())
    }

    pub fn shell_literal(s: impl Into<String>) -> Self {
        SafeStr::ShellLiteral(s.into())
    }

    pub fn concat<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SafeStr>,
    {
        SafeStr::Concat(parts.into_iter().map(Into::into).collect())
    }

    /// Concatenate `items` with `delim` between each pair.
    pub fn join<I, T>(items: I, delim: SafeStr) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SafeStr>,
    {
        SafeStr::Concat(tween(items.into_iter().map(Into::into), delim, None, None).collect())
    }
}

impl From<&str> for SafeStr {
    fn from(s: &str) -> Self {
        SafeStr::Text(s.to_string())
    }
}

impl From<String> for SafeStr {
    fn from(s: String) -> Self {
        SafeStr::Text(s)
    }
}

impl From<&String> for SafeStr {
    fn from(s: &String) -> Self {
        SafeStr::Text(s.clone())
    }
}

impl From<Path> for SafeStr {
    fn from(p: Path) -> Self {
        SafeStr::Path(p)
    }
}

impl From<&Path> for SafeStr {
    fn from(p: &Path) -> Self {
        SafeStr::Path(p.clone())
    }
}

impl fmt::Display for SafeStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafeStr::Text(s) | SafeStr::Literal(s) | SafeStr::ShellLiteral(s) => f.write_str(s),
            SafeStr::Concat(parts) => parts.iter().try_for_each(|p| write!(f, "{}", p)),
            SafeStr::Path(p) => write!(f, "{}", p),
        }
    }
}
