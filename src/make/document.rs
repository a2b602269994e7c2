//! The in-memory Makefile.
//!
//! Rule handlers append to a [`Makefile`] while walking the build edges; the
//! whole document is serialized once at the end. Nothing is ever removed.

use super::entity::{Function, Pattern, Variable};
use super::writer::{PathVars, Quoting, Syntax, Writer};
use crate::error::{GenError, Result};
use crate::platform::Platform;
use crate::safe_str::SafeStr;
use crate::toolchain::Tool;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashSet};
use std::io;

/// Groups of global variables, serialized in declaration order of the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    /// Directory variables (`srcdir`, `prefix`, ...). Written without shell
    /// quoting since every use of them is itself a quoted path.
    Path,
    Command,
    Flags,
    Other,
}

/// One recipe line: shell words, optionally prefixed with `@`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub silent: bool,
    pub words: Vec<SafeStr>,
}

impl Line {
    pub fn new<I, T>(words: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SafeStr>,
    {
        Self {
            silent: false,
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn silent<I, T>(words: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SafeStr>,
    {
        Self {
            silent: true,
            ..Self::new(words)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Recipe {
    #[default]
    None,
    Lines(Vec<Line>),
    /// A single already-defined recipe, written inline after ` ; `.
    Reference(SafeStr),
}

#[derive(Debug, Clone, Default)]
pub struct Rule {
    pub targets: Vec<SafeStr>,
    pub deps: Vec<SafeStr>,
    pub order_only: Vec<SafeStr>,
    pub recipe: Recipe,
    /// Target-specific variable overrides.
    pub variables: IndexMap<Variable, Vec<SafeStr>>,
    pub phony: bool,
}

impl Rule {
    pub fn new<I, T>(targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SafeStr>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn deps<I, T>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SafeStr>,
    {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_only<I, T>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SafeStr>,
    {
        self.order_only = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn recipe(mut self, recipe: Recipe) -> Self {
        self.recipe = recipe;
        self
    }

    pub fn lines(self, lines: Vec<Line>) -> Self {
        self.recipe(Recipe::Lines(lines))
    }

    pub fn variable(mut self, name: impl Into<Variable>, value: Vec<SafeStr>) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn phony(mut self) -> Self {
        self.phony = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    pub name: SafeStr,
    pub optional: bool,
}

#[derive(Debug)]
pub struct Makefile {
    build_file: String,
    path_vars: PathVars,
    windows_paths: bool,

    var_table: HashSet<Variable>,
    global_variables: BTreeMap<Section, Vec<(Variable, Vec<SafeStr>)>>,
    target_variables: Vec<(Pattern, Variable, Vec<SafeStr>)>,
    defines: Vec<(Variable, Vec<Line>)>,

    rules: Vec<Rule>,
    targets: HashSet<SafeStr>,
    includes: Vec<Include>,
}

impl Makefile {
    /// `build_file` is named in the header comment of the output.
    pub fn new(build_file: impl Into<String>, platform: &Platform) -> Self {
        Self {
            build_file: build_file.into(),
            path_vars: PathVars::new(platform.destdir),
            windows_paths: platform.windows_paths,
            var_table: HashSet::from([comma()]),
            global_variables: BTreeMap::new(),
            target_variables: Vec::new(),
            defines: Vec::new(),
            rules: Vec::new(),
            targets: HashSet::new(),
            includes: Vec::new(),
        }
    }

    fn unique_var(&mut self, name: Variable, exist_ok: bool) -> Result<(Variable, bool)> {
        let exists = self.var_table.contains(&name);
        if exists && !exist_ok {
            return Err(GenError::DuplicateVariable(name.name().to_string()));
        }
        self.var_table.insert(name.clone());
        Ok((name, exists))
    }

    /// Declare a global variable. With `exist_ok`, an existing declaration
    /// is returned untouched.
    pub fn variable<I, T>(
        &mut self,
        name: impl Into<Variable>,
        value: I,
        section: Section,
        exist_ok: bool,
    ) -> Result<Variable>
    where
        I: IntoIterator<Item = T>,
        T: Into<SafeStr>,
    {
        let (name, exists) = self.unique_var(name.into(), exist_ok)?;
        if !exists {
            let value = value.into_iter().map(Into::into).collect();
            self.global_variables
                .entry(section)
                .or_default()
                .push((name.clone(), value));
        }
        Ok(name)
    }

    /// Declare a variable scoped to targets matching `pattern`.
    pub fn target_variable<I, T>(
        &mut self,
        name: impl Into<Variable>,
        value: I,
        pattern: &Pattern,
        exist_ok: bool,
    ) -> Result<Variable>
    where
        I: IntoIterator<Item = T>,
        T: Into<SafeStr>,
    {
        let (name, exists) = self.unique_var(name.into(), exist_ok)?;
        if !exists {
            let value = value.into_iter().map(Into::into).collect();
            self.target_variables
                .push((pattern.clone(), name.clone(), value));
        }
        Ok(name)
    }

    /// Declare a multi-line `define` block.
    pub fn define(&mut self, name: impl Into<Variable>, lines: Vec<Line>, exist_ok: bool) -> Result<Variable> {
        let (name, exists) = self.unique_var(name.into(), exist_ok)?;
        if !exists {
            self.defines.push((name.clone(), lines));
        }
        Ok(name)
    }

    /// The shared variable holding a tool's command, e.g. `CC := cc`.
    pub fn cmd_var<T: Tool + ?Sized>(&mut self, tool: &T) -> Result<Variable> {
        let name = tool.command_var().to_uppercase();
        self.variable(
            name.as_str(),
            tool.command().iter().map(SafeStr::text),
            Section::Command,
            true,
        )
    }

    pub fn has_variable(&self, name: impl Into<Variable>) -> bool {
        self.var_table.contains(&name.into())
    }

    pub fn include(&mut self, name: impl Into<SafeStr>, optional: bool) {
        self.includes.push(Include {
            name: name.into(),
            optional,
        });
    }

    pub fn rule(&mut self, rule: Rule) -> Result<()> {
        if rule.targets.is_empty() {
            return Err(GenError::EmptyTargets);
        }
        let mut seen = HashSet::new();
        for target in &rule.targets {
            if self.targets.contains(target) || !seen.insert(target) {
                return Err(GenError::DuplicateRule(target.to_string()));
            }
        }
        self.targets.extend(rule.targets.iter().cloned());
        self.rules.push(rule);
        Ok(())
    }

    pub fn has_rule(&self, target: impl Into<SafeStr>) -> bool {
        self.targets.contains(&target.into())
    }

    pub fn expand(&self, func: &Function) -> Result<SafeStr> {
        func.expand(&self.path_vars)
    }

    pub fn global_variables(&self, section: Section) -> &[(Variable, Vec<SafeStr>)] {
        self.global_variables
            .get(&section)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn target_variables(&self) -> &[(Pattern, Variable, Vec<SafeStr>)] {
        &self.target_variables
    }

    pub fn defines(&self) -> &[(Variable, Vec<Line>)] {
        &self.defines
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    pub fn render(&self) -> Result<String> {
        let mut out = Writer::new(&self.path_vars, self.windows_paths);

        out.write_literal(&format!(
            "# Do not edit this file! It was automatically generated by makegen.\n\
             # Instead, you should edit the source file that created this:\n\
             # {}\n\n",
            self.build_file
        ));

        // Don't let make use built-in suffix rules.
        out.write_literal(".SUFFIXES:\n");

        // Function arguments spell a literal comma as `$,`.
        write_variable(&mut out, &comma(), &[SafeStr::text(",")], Syntax::Shell, None)?;
        out.write_literal("\n");

        for (section, vars) in &self.global_variables {
            let syntax = match section {
                Section::Path => Syntax::Clean,
                _ => Syntax::Shell,
            };
            for (name, value) in vars {
                write_variable(&mut out, name, value, syntax, None)?;
            }
            if !vars.is_empty() {
                out.write_literal("\n");
            }
        }

        for (pattern, name, value) in &self.target_variables {
            write_variable(&mut out, name, value, Syntax::Shell, Some(&pattern.expand()))?;
        }
        if !self.target_variables.is_empty() {
            out.write_literal("\n");
        }

        for (name, lines) in &self.defines {
            out.write_literal(&format!("define {}\n", name.name()));
            for line in lines {
                write_line(&mut out, line)?;
                out.write_literal("\n");
            }
            out.write_literal("endef\n\n");
        }

        for rule in &self.rules {
            write_rule(&mut out, rule)?;
        }

        for include in &self.includes {
            out.write_literal(if include.optional { "-include " } else { "include " });
            out.write(&include.name, Syntax::Target, Quoting::Quote)?;
            out.write_literal("\n");
        }

        Ok(out.finish())
    }

    pub fn write<W: io::Write>(&self, stream: &mut W) -> Result<()> {
        stream.write_all(self.render()?.as_bytes())?;
        Ok(())
    }
}

fn comma() -> Variable {
    Variable::new(",")
}

fn write_variable(
    out: &mut Writer,
    name: &Variable,
    value: &[SafeStr],
    syntax: Syntax,
    target: Option<&SafeStr>,
) -> Result<()> {
    if let Some(target) = target {
        out.write(target, Syntax::Target, Quoting::Quote)?;
        out.write_literal(": ");
    }
    out.write_literal(&format!("{} := ", name.name()));
    out.write_each(value, syntax, None, Quoting::Quote)?;
    out.write_literal("\n");
    Ok(())
}

fn write_line(out: &mut Writer, line: &Line) -> Result<()> {
    if line.silent {
        out.write_literal("@");
    }
    out.write_each(&line.words, Syntax::Shell, None, Quoting::Quote)
}

fn write_rule(out: &mut Writer, rule: &Rule) -> Result<()> {
    for target in &rule.targets {
        for (name, value) in &rule.variables {
            write_variable(out, name, value, Syntax::Shell, Some(target))?;
        }
    }

    if rule.phony {
        out.write_literal(".PHONY: ");
        out.write_each(&rule.targets, Syntax::Dependency, None, Quoting::Quote)?;
        out.write_literal("\n");
    }

    out.write_each(&rule.targets, Syntax::Target, None, Quoting::Quote)?;
    out.write_literal(":");

    let space = SafeStr::literal(" ");
    let bar = SafeStr::literal(" | ");
    out.write_each(&rule.deps, Syntax::Dependency, Some(&space), Quoting::Quote)?;
    out.write_each(&rule.order_only, Syntax::Dependency, Some(&bar), Quoting::Quote)?;

    match &rule.recipe {
        Recipe::None => {}
        Recipe::Reference(recipe) => {
            out.write_literal(" ; ");
            out.write(recipe, Syntax::Shell, Quoting::Quote)?;
        }
        Recipe::Lines(lines) => {
            for line in lines {
                out.write_literal("\n\t");
                write_line(out, line)?;
            }
        }
    }
    out.write_literal("\n\n");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;

    const PREAMBLE: &str = "# Do not edit this file! It was automatically generated by makegen.\n\
                            # Instead, you should edit the source file that created this:\n\
                            # build.toml\n\n\
                            .SUFFIXES:\n\
                            , := ,\n\n";

    fn makefile() -> Makefile {
        Makefile::new("build.toml", &Platform::default())
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(makefile().render().unwrap(), PREAMBLE);
    }

    #[test]
    fn test_duplicate_variable() {
        let mut mk = makefile();
        mk.variable("FOO", ["a"], Section::Other, false).unwrap();
        assert!(matches!(
            mk.variable("FOO", ["b"], Section::Other, false),
            Err(GenError::DuplicateVariable(name)) if name == "FOO"
        ));
        // Names collide after normalization too.
        mk.variable("a:b", ["x"], Section::Other, false).unwrap();
        assert!(mk.variable("a_b", ["y"], Section::Flags, false).is_err());
        assert!(mk.define("FOO", vec![], false).is_err());
    }

    #[test]
    fn test_reuse_keeps_original_value() {
        let mut mk = makefile();
        let first = mk.variable("FOO", ["a"], Section::Other, false).unwrap();
        let second = mk.variable("FOO", ["b"], Section::Command, true).unwrap();
        assert_eq!(first, second);
        assert!(mk.global_variables(Section::Command).is_empty());
        assert_eq!(
            mk.global_variables(Section::Other),
            &[(Variable::new("FOO"), vec![SafeStr::text("a")])]
        );
    }

    #[test]
    fn test_rule_requires_targets() {
        let mut mk = makefile();
        assert!(matches!(
            mk.rule(Rule::new(Vec::<SafeStr>::new())),
            Err(GenError::EmptyTargets)
        ));
    }

    #[test]
    fn test_duplicate_rule_targets() {
        let mut mk = makefile();
        mk.rule(Rule::new([Path::build("a"), Path::build("b")])).unwrap();
        assert!(mk.has_rule(Path::build("b")));
        assert!(matches!(
            mk.rule(Rule::new([Path::build("c"), Path::build("b")])),
            Err(GenError::DuplicateRule(name)) if name == "b"
        ));
        assert!(!mk.has_rule(Path::build("c")));

        mk.rule(Rule::new([Path::build("solo")])).unwrap();
        assert!(mk.rule(Rule::new([Path::build("solo")])).is_err());
        assert!(mk.rule(Rule::new([Path::build("x"), Path::build("x")])).is_err());
    }

    #[test]
    fn test_sections_are_ordered() {
        let mut mk = makefile();
        mk.variable("OTHER", ["1"], Section::Other, false).unwrap();
        mk.variable("GLOBAL_CFLAGS", ["-O2", "-DX=a b"], Section::Flags, false).unwrap();
        mk.variable("CC", ["cc"], Section::Command, false).unwrap();
        mk.variable("srcdir", [Path::absolute("/src dir")], Section::Path, false).unwrap();

        let expected = format!(
            "{}srcdir := /src dir\n\n\
             CC := cc\n\n\
             GLOBAL_CFLAGS := -O2 '-DX=a b'\n\n\
             OTHER := 1\n\n",
            PREAMBLE
        );
        assert_eq!(mk.render().unwrap(), expected);
    }

    #[test]
    fn test_target_variables_and_defines() {
        let mut mk = makefile();
        let global = mk.variable("GLOBAL_CFLAGS", Vec::<SafeStr>::new(), Section::Flags, false).unwrap();
        mk.target_variable("CFLAGS", [global], &Pattern::any(), false).unwrap();
        mk.define(
            "RULE_CC",
            vec![
                Line::new([SafeStr::literal("$(CC)"), SafeStr::text("-c")]),
                Line::silent([SafeStr::shell_literal("echo $x > y")]),
            ],
            false,
        )
        .unwrap();

        let expected = format!(
            "{}GLOBAL_CFLAGS := \n\n\
             %: CFLAGS := $(GLOBAL_CFLAGS)\n\n\
             define RULE_CC\n\
             $(CC) -c\n\
             @echo $$x > y\n\
             endef\n\n",
            PREAMBLE
        );
        assert_eq!(mk.render().unwrap(), expected);
    }

    #[test]
    fn test_rule_rendering() {
        let mut mk = makefile();
        mk.rule(
            Rule::new([Path::build("sub/foo.o")])
                .deps([Path::src("foo bar.c")])
                .order_only([Path::build("sub/.dir")])
                .recipe(Recipe::Reference(Variable::new("RULE_CC").expand()))
                .variable("CFLAGS", vec![Variable::new("GLOBAL_CFLAGS").expand(), SafeStr::text("-O2")]),
        )
        .unwrap();
        mk.rule(
            Rule::new([Path::build("lint")])
                .lines(vec![Line::new(["echo", "it's"])])
                .phony(),
        )
        .unwrap();
        mk.include(Path::build("sub/foo.o.d"), true);
        mk.include(Path::src("extra.mk"), false);

        let expected = format!(
            "{}sub/foo.o: CFLAGS := $(GLOBAL_CFLAGS) -O2\n\
             sub/foo.o: $(srcdir)/foo\\ bar.c | sub/.dir ; $(RULE_CC)\n\n\
             .PHONY: lint\n\
             lint:\n\
             \techo 'it'\\''s'\n\n\
             -include sub/foo.o.d\n\
             include $(srcdir)/extra.mk\n",
            PREAMBLE
        );
        assert_eq!(mk.render().unwrap(), expected);
    }

    #[test]
    fn test_write_stream_matches_render() {
        let mut mk = makefile();
        mk.rule(Rule::new([Pattern::new("%/.dir").unwrap()])).unwrap();
        let mut buf = Vec::new();
        mk.write(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), mk.render().unwrap());
        assert!(mk.render().unwrap().ends_with("%/.dir:\n\n"));
    }

    #[test]
    fn test_newline_aborts_rendering() {
        let mut mk = makefile();
        mk.variable("BAD", ["a\nb"], Section::Other, false).unwrap();
        assert!(matches!(mk.render(), Err(GenError::IllegalNewline(_))));
    }
}
