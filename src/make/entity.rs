//! Named Make entities: variables, patterns and function calls.

use super::writer::{PathVars, Quoting, Syntax, Writer};
use crate::error::{GenError, Result};
use crate::safe_str::SafeStr;
use crate::shell;
use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

static BAD_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s:#=]").expect("valid regex"));

/// A Make variable.
///
/// Names are normalized on construction, so `foo:bar` and `foo_bar` are the
/// same variable. Identity ignores the `quoted` flag.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    quoted: bool,
}

impl Variable {
    pub fn new(name: &str) -> Self {
        Self {
            name: BAD_NAME_CHARS.replace_all(name, "_").into_owned(),
            quoted: false,
        }
    }

    /// A variable whose expansion is wrapped in single quotes.
    pub fn quoted(name: &str) -> Self {
        Self {
            quoted: true,
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expand(&self) -> SafeStr {
        let reference = if self.name.chars().count() == 1 {
            format!("${}", self.name)
        } else {
            format!("$({})", self.name)
        };
        if self.quoted {
            SafeStr::literal(shell::quote_escaped(&reference))
        } else {
            SafeStr::literal(reference)
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl From<&str> for Variable {
    fn from(name: &str) -> Self {
        Variable::new(name)
    }
}

impl From<String> for Variable {
    fn from(name: String) -> Self {
        Variable::new(&name)
    }
}

impl From<&Variable> for Variable {
    fn from(v: &Variable) -> Self {
        v.clone()
    }
}

impl From<Variable> for SafeStr {
    fn from(v: Variable) -> Self {
        v.expand()
    }
}

impl From<&Variable> for SafeStr {
    fn from(v: &Variable) -> Self {
        v.expand()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A path template with exactly one unescaped `%`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    path: String,
}

impl Pattern {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if count_wildcards(&path) != 1 {
            return Err(GenError::InvalidPattern(path));
        }
        Ok(Self { path })
    }

    /// The `%` pattern matching every target.
    pub fn any() -> Self {
        Self { path: "%".into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn expand(&self) -> SafeStr {
        SafeStr::join(self.path.split('%'), SafeStr::literal("%"))
    }
}

impl From<Pattern> for SafeStr {
    fn from(p: Pattern) -> Self {
        p.expand()
    }
}

impl From<&Pattern> for SafeStr {
    fn from(p: &Pattern) -> Self {
        p.expand()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Count `%` characters not preceded by an odd run of backslashes.
fn count_wildcards(path: &str) -> usize {
    let mut count = 0;
    let mut backslashes = 0;
    for c in path.chars() {
        match c {
            '\\' => backslashes += 1,
            '%' => {
                if backslashes % 2 == 0 {
                    count += 1;
                }
                backslashes = 0;
            }
            _ => backslashes = 0,
        }
    }
    count
}

/// A Make function call such as `$(dir $@)`.
///
/// Each argument is a sequence of words joined by spaces; arguments are
/// separated by commas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    name: String,
    args: Vec<Vec<SafeStr>>,
    quoted: bool,
}

impl Function {
    pub fn new<I, A, T>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: IntoIterator<Item = T>,
        T: Into<SafeStr>,
    {
        Self {
            name: name.to_string(),
            args: args
                .into_iter()
                .map(|arg| arg.into_iter().map(Into::into).collect())
                .collect(),
            quoted: false,
        }
    }

    /// `$(call func,args...)`.
    pub fn call<I, A, T>(func: &Variable, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: IntoIterator<Item = T>,
        T: Into<SafeStr>,
    {
        let mut call = Self::new("call", args);
        call.args.insert(0, vec![SafeStr::text(func.name())]);
        call
    }

    /// Quote the whole call instead of each argument.
    pub fn quoted(mut self) -> Self {
        self.quoted = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expand(&self, vars: &PathVars) -> Result<SafeStr> {
        let quoting = if self.quoted { Quoting::None } else { Quoting::Quote };
        let mut out = Writer::new(vars, false);

        out.write_literal("$(");
        out.write_literal(&self.name);
        for (i, arg) in self.args.iter().enumerate() {
            out.write_literal(if i == 0 { " " } else { "," });
            out.write_each(arg, Syntax::Function, None, quoting)?;
        }
        out.write_literal(")");

        let result = out.finish();
        Ok(if self.quoted {
            SafeStr::literal(shell::quote_escaped(&result))
        } else {
            SafeStr::literal(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;

    #[test]
    fn test_variable_name_normalization() {
        assert_eq!(Variable::new("foo:bar baz#q=x").name(), "foo_bar_baz_q_x");
        assert_eq!(Variable::new("a:b"), Variable::new("a_b"));
        assert_eq!(Variable::new("x"), Variable::quoted("x"));
    }

    #[test]
    fn test_variable_expand() {
        assert_eq!(Variable::new("@").expand(), SafeStr::literal("$@"));
        assert_eq!(Variable::new("CC").expand(), SafeStr::literal("$(CC)"));
        assert_eq!(Variable::quoted("CC").expand(), SafeStr::literal("'$(CC)'"));
    }

    #[test]
    fn test_pattern_requires_one_wildcard() {
        assert!(Pattern::new("%").is_ok());
        assert!(Pattern::new("%/.dir").is_ok());
        assert!(Pattern::new(r"a\%b%").is_ok());
        assert!(matches!(Pattern::new("foo"), Err(GenError::InvalidPattern(_))));
        assert!(matches!(Pattern::new("%%"), Err(GenError::InvalidPattern(_))));
        assert!(matches!(Pattern::new("%/%.o"), Err(GenError::InvalidPattern(_))));
        assert!(matches!(Pattern::new(r"\%"), Err(GenError::InvalidPattern(_))));
    }

    #[test]
    fn test_pattern_renders_marker_intact() {
        let vars = PathVars::new(true);
        for text in ["%", "%/.dir", "obj/%.o", "lib%"] {
            let pattern = Pattern::new(text).unwrap();
            let mut w = Writer::new(&vars, false);
            w.write(&pattern.expand(), Syntax::Target, Quoting::Quote).unwrap();
            assert_eq!(w.finish(), text);
        }
    }

    #[test]
    fn test_function_expand() {
        let vars = PathVars::new(true);
        let dir = Function::new("dir", [[Variable::new("@")]]);
        assert_eq!(dir.expand(&vars).unwrap(), SafeStr::literal("$(dir $@)"));
    }

    #[test]
    fn test_call_joins_words_and_escapes_commas() {
        let vars = PathVars::new(true);
        let rule = Variable::new("RULE_LINK_CC");
        let call = Function::call(
            &rule,
            [vec![
                SafeStr::from(Path::build("a.o")),
                SafeStr::from(Path::build("b c.o")),
                SafeStr::text("x,y"),
            ]],
        );
        assert_eq!(
            call.expand(&vars).unwrap(),
            SafeStr::literal("$(call RULE_LINK_CC,a.o 'b c.o' x$,y)")
        );
    }

    #[test]
    fn test_quoted_function() {
        let vars = PathVars::new(true);
        let f = Function::new("subst", [vec!["a b"], vec!["c"], vec!["$x"]]).quoted();
        assert_eq!(f.expand(&vars).unwrap(), SafeStr::literal("'$(subst a b,c,$$x)'"));
    }
}
