//! Make-syntax escaping.
//!
//! Writing a value is two passes in a fixed order: shell quoting first (only
//! in positions that reach `/bin/sh`), then Make escaping of the quoted
//! result. Reversing them corrupts any argument that holds both shell
//! metacharacters and Make metacharacters.

use super::entity::Variable;
use crate::error::{GenError, Result};
use crate::path::{Path, Root, SEP};
use crate::safe_str::SafeStr;
use crate::shell;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static TARGET_EX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\\*)([#?*\[\]~\s%:])").expect("valid regex"));
static DEP_EX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\\*)([#?*\[\]~\s|%:])").expect("valid regex"));
static TARGET_EX_WINDOWS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\\*)([#?*\[\]~\s%])").expect("valid regex"));
static DEP_EX_WINDOWS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\\*)([#?*\[\]~\s|%])").expect("valid regex"));

/// Where in the Makefile grammar a value is being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Target,
    Dependency,
    /// An argument of a `$(function ...)` call.
    Function,
    /// A recipe line or the value of a variable used in one.
    Shell,
    /// Like `Shell`, but values are never shell-quoted.
    Clean,
}

impl Syntax {
    fn is_shelly(&self) -> bool {
        matches!(self, Syntax::Function | Syntax::Shell)
    }
}

/// How plain text is shell-quoted in shell positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Wrap in single quotes when needed.
    Quote,
    /// Escape for single quotes, leaving the wrapping to the caller.
    Escape,
    None,
}

/// Maps path roots to the variables that stand in for them.
///
/// A root mapped to `None` is the working directory and renders as the bare
/// suffix. A root missing from the table is a configuration error.
#[derive(Debug, Clone)]
pub struct PathVars {
    roots: HashMap<Root, Option<Variable>>,
    destdir: Option<Variable>,
}

impl PathVars {
    pub fn new(destdir: bool) -> Self {
        let mut roots = HashMap::from([
            (Root::Absolute, None),
            (Root::BuildDir, None),
            (Root::SrcDir, Some(Variable::new("srcdir"))),
        ]);
        for root in Root::INSTALL_ROOTS {
            roots.insert(root, Some(Variable::new(root.name())));
        }
        Self {
            roots,
            destdir: destdir.then(|| Variable::new("DESTDIR")),
        }
    }

    /// A table with no roots at all.
    pub fn empty() -> Self {
        Self {
            roots: HashMap::new(),
            destdir: None,
        }
    }

    pub fn with_root(mut self, root: Root, var: Option<Variable>) -> Self {
        self.roots.insert(root, var);
        self
    }

    /// Replace the root of `path` with its variable.
    pub fn realize(&self, path: &Path) -> Result<SafeStr> {
        let mut parts = Vec::new();
        if path.destdir()
            && let Some(destdir) = &self.destdir
        {
            parts.push(destdir.expand());
        }

        let suffix = path.suffix();
        match path.root() {
            Root::Absolute => parts.push(SafeStr::text(if suffix.is_empty() { "." } else { suffix })),
            root => match self.roots.get(&root) {
                None => return Err(GenError::UnmappedRoot(root)),
                Some(None) => {
                    parts.push(SafeStr::text(if suffix.is_empty() { "." } else { suffix }));
                }
                Some(Some(var)) => {
                    parts.push(var.expand());
                    if !suffix.is_empty() {
                        parts.push(SafeStr::literal(SEP));
                        parts.push(SafeStr::text(suffix));
                    }
                }
            },
        }
        Ok(SafeStr::Concat(parts))
    }
}

pub struct Writer<'a> {
    out: String,
    vars: &'a PathVars,
    windows_paths: bool,
}

impl<'a> Writer<'a> {
    pub fn new(vars: &'a PathVars, windows_paths: bool) -> Self {
        Self {
            out: String::new(),
            vars,
            windows_paths,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn escape_str(&self, s: &str, syntax: Syntax) -> Result<String> {
        if s.contains('\n') {
            return Err(GenError::IllegalNewline(s.to_string()));
        }
        let result = s.replace('$', "$$");
        let repl = "${1}${1}\\${2}";

        Ok(match syntax {
            Syntax::Target if self.windows_paths => TARGET_EX_WINDOWS.replace_all(&result, repl).into_owned(),
            Syntax::Target => TARGET_EX.replace_all(&result, repl).into_owned(),
            Syntax::Dependency if self.windows_paths => DEP_EX_WINDOWS.replace_all(&result, repl).into_owned(),
            Syntax::Dependency => DEP_EX.replace_all(&result, repl).into_owned(),
            Syntax::Function => result.replace(',', "$,"),
            Syntax::Shell | Syntax::Clean => result,
        })
    }

    pub fn write_literal(&mut self, s: &str) {
        self.out.push_str(s);
    }

    /// Write `thing` in `syntax`, returning whether any part of it was
    /// escaped or quoted along the way.
    pub fn write(&mut self, thing: &SafeStr, syntax: Syntax, quoting: Quoting) -> Result<bool> {
        let shelly = syntax.is_shelly();

        let escaped = match thing {
            SafeStr::Literal(s) => {
                self.write_literal(s);
                true
            }
            SafeStr::ShellLiteral(s) => {
                let s = self.escape_str(s, syntax)?;
                self.write_literal(&s);
                true
            }
            SafeStr::Text(s) => {
                let (text, escaped) = match quoting {
                    Quoting::Quote if shelly => shell::quote_info(s),
                    Quoting::Escape if shelly => shell::escape(s),
                    _ => (s.clone(), false),
                };
                let text = self.escape_str(&text, syntax)?;
                self.write_literal(&text);
                escaped
            }
            SafeStr::Concat(parts) => {
                let mut escaped = false;
                for part in parts {
                    escaped |= self.write(part, syntax, quoting)?;
                }
                escaped
            }
            SafeStr::Path(path) => {
                let realized = self.vars.realize(path)?;
                let mut sub = Writer::new(self.vars, self.windows_paths);
                let escaped = sub.write(&realized, syntax, Quoting::Escape)?;
                let mut text = sub.finish();
                if shelly && escaped {
                    text = shell::quote_escaped(&text);
                }
                self.write_literal(&text);
                escaped
            }
        };
        Ok(escaped)
    }

    pub fn write_each<'t, I>(
        &mut self,
        things: I,
        syntax: Syntax,
        prefix: Option<&'t SafeStr>,
        quoting: Quoting,
    ) -> Result<()>
    where
        I: IntoIterator<Item = &'t SafeStr>,
    {
        let delim = SafeStr::literal(" ");
        for (i, thing) in things.into_iter().enumerate() {
            if i > 0 {
                self.write(&delim, syntax, quoting)?;
            } else if let Some(prefix) = prefix {
                self.write(prefix, syntax, quoting)?;
            }
            self.write(thing, syntax, quoting)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(thing: &SafeStr, syntax: Syntax) -> Result<String> {
        let vars = PathVars::new(true);
        let mut w = Writer::new(&vars, false);
        w.write(thing, syntax, Quoting::Quote)?;
        Ok(w.finish())
    }

    #[test]
    fn test_escape_target() {
        let vars = PathVars::new(true);
        let w = Writer::new(&vars, false);
        assert_eq!(w.escape_str("foo bar%", Syntax::Target).unwrap(), r"foo\ bar\%");
        assert_eq!(w.escape_str("$x:#", Syntax::Target).unwrap(), r"$$x\:\#");
        assert_eq!(w.escape_str("a|b", Syntax::Target).unwrap(), "a|b");
        assert_eq!(w.escape_str("a|b", Syntax::Dependency).unwrap(), r"a\|b");
    }

    #[test]
    fn test_escape_doubles_preceding_backslashes() {
        let vars = PathVars::new(true);
        let w = Writer::new(&vars, false);
        assert_eq!(w.escape_str(r"a\ b", Syntax::Target).unwrap(), r"a\\\ b");
        assert_eq!(w.escape_str(r"a\b", Syntax::Target).unwrap(), r"a\b");
    }

    #[test]
    fn test_escape_windows_keeps_colon() {
        let vars = PathVars::new(false);
        let w = Writer::new(&vars, true);
        assert_eq!(w.escape_str("C:/x y", Syntax::Target).unwrap(), r"C:/x\ y");
        assert_eq!(w.escape_str("C:/x", Syntax::Dependency).unwrap(), "C:/x");
    }

    #[test]
    fn test_escape_function_and_shell() {
        let vars = PathVars::new(true);
        let w = Writer::new(&vars, false);
        assert_eq!(w.escape_str("a,b $c", Syntax::Function).unwrap(), "a$,b $$c");
        assert_eq!(w.escape_str("a b%#", Syntax::Shell).unwrap(), "a b%#");
    }

    #[test]
    fn test_newline_is_rejected() {
        for syntax in [Syntax::Target, Syntax::Dependency, Syntax::Function, Syntax::Shell] {
            assert!(matches!(
                render(&SafeStr::text("a\nb"), syntax),
                Err(GenError::IllegalNewline(_))
            ));
        }
    }

    #[test]
    fn test_text_quotes_before_escaping() {
        let text = SafeStr::text("foo bar%");
        assert_eq!(render(&text, Syntax::Target).unwrap(), r"foo\ bar\%");
        assert_eq!(render(&text, Syntax::Shell).unwrap(), "'foo bar%'");
        assert_eq!(render(&SafeStr::text("$HOME"), Syntax::Shell).unwrap(), "'$$HOME'");
        assert_eq!(render(&SafeStr::text("plain"), Syntax::Shell).unwrap(), "plain");
    }

    #[test]
    fn test_literal_and_shell_literal() {
        assert_eq!(render(&SafeStr::literal("$(CC) %"), Syntax::Target).unwrap(), "$(CC) %");
        assert_eq!(render(&SafeStr::shell_literal("a > b"), Syntax::Shell).unwrap(), "a > b");
        assert_eq!(render(&SafeStr::shell_literal("a b"), Syntax::Target).unwrap(), r"a\ b");
    }

    #[test]
    fn test_path_rendering() {
        assert_eq!(render(&Path::build("foo.o").into(), Syntax::Target).unwrap(), "foo.o");
        assert_eq!(render(&Path::build("").into(), Syntax::Target).unwrap(), ".");
        assert_eq!(
            render(&Path::src("foo bar.c").into(), Syntax::Dependency).unwrap(),
            r"$(srcdir)/foo\ bar.c"
        );
        assert_eq!(
            render(&Path::src("foo bar.c").into(), Syntax::Shell).unwrap(),
            "'$(srcdir)/foo bar.c'"
        );
        assert_eq!(render(&Path::build("foo bar.o").into(), Syntax::Shell).unwrap(), "'foo bar.o'");
        assert_eq!(render(&Path::build("it's").into(), Syntax::Shell).unwrap(), r"'it'\''s'");
        assert_eq!(render(&Path::absolute("/usr/bin/cc").into(), Syntax::Shell).unwrap(), "/usr/bin/cc");
    }

    #[test]
    fn test_install_path_uses_destdir() {
        let installed = Path::src("foo.h").install_path(Root::IncludeDir);
        assert_eq!(
            render(&installed.clone().into(), Syntax::Dependency).unwrap(),
            "$(DESTDIR)$(includedir)/foo.h"
        );

        let vars = PathVars::new(false);
        let mut w = Writer::new(&vars, false);
        w.write(&installed.into(), Syntax::Dependency, Quoting::Quote).unwrap();
        assert_eq!(w.finish(), "$(includedir)/foo.h");
    }

    #[test]
    fn test_unmapped_root_is_an_error() {
        let vars = PathVars::empty().with_root(Root::BuildDir, None);
        let mut w = Writer::new(&vars, false);
        assert!(w.write(&Path::build("ok").into(), Syntax::Target, Quoting::Quote).is_ok());
        assert!(matches!(
            w.write(&Path::src("x").into(), Syntax::Target, Quoting::Quote),
            Err(GenError::UnmappedRoot(Root::SrcDir))
        ));
    }

    #[test]
    fn test_write_each_with_prefix() {
        let vars = PathVars::new(true);
        let mut w = Writer::new(&vars, false);
        let deps = [SafeStr::text("a"), SafeStr::text("b c")];
        let prefix = SafeStr::literal(" | ");
        w.write_each(&deps, Syntax::Dependency, Some(&prefix), Quoting::Quote).unwrap();
        w.write_each(&Vec::<SafeStr>::new(), Syntax::Dependency, Some(&prefix), Quoting::Quote).unwrap();
        assert_eq!(w.finish(), r" | a b\ c");
    }
}
