//! Rule handlers: translate build edges into Makefile rules.

use super::document::{Line, Makefile, Recipe, Rule, Section};
use super::entity::{Function, Pattern, Variable};
use crate::build::{
    Alias, Binary, BuildEdge, BuildInputs, Command, Compile, InstallKind, InstallTargets, Library, Link,
};
use crate::env::Env;
use crate::error::Result;
use crate::path::{Path, Root};
use crate::safe_str::SafeStr;
use crate::toolchain::DepsFlavor;
use std::iter;
use tracing::debug;

/// Sentinel file touched inside every directory the build creates.
pub const DIR_SENTINEL: &str = ".dir";

pub type Handler<E> = fn(&E, &BuildInputs, &mut Makefile) -> Result<()>;

/// One handler per edge kind.
///
/// `Default` registers the built-in handlers; swap a field to override how
/// one kind of edge is emitted.
#[derive(Clone, Copy)]
pub struct RuleHandlers {
    pub compile: Handler<Compile>,
    pub link: Handler<Link>,
    pub alias: Handler<Alias>,
    pub command: Handler<Command>,
}

impl Default for RuleHandlers {
    fn default() -> Self {
        Self {
            compile: emit_object_file,
            link: emit_link,
            alias: emit_alias,
            command: emit_command,
        }
    }
}

impl RuleHandlers {
    pub fn dispatch(&self, edge: &BuildEdge, inputs: &BuildInputs, mk: &mut Makefile) -> Result<()> {
        debug!(kind = edge.kind(), target = %edge.target(), "emitting rule");
        match edge {
            BuildEdge::Compile(e) => (self.compile)(e, inputs, mk),
            BuildEdge::Link(e) => (self.link)(e, inputs, mk),
            BuildEdge::Alias(e) => (self.alias)(e, inputs, mk),
            BuildEdge::Command(e) => (self.command)(e, inputs, mk),
        }
    }
}

fn texts(words: &[String]) -> impl Iterator<Item = SafeStr> + '_ {
    words.iter().map(SafeStr::text)
}

/// The `GLOBAL_<NAME>` / `<NAME>` pair for one kind of tool flags.
///
/// The global variable is seeded with `value` the first time; the
/// per-target variable defaults to it for every target.
fn flags_vars(name: &str, value: Vec<SafeStr>, mk: &mut Makefile) -> Result<(Variable, Variable)> {
    let name = name.to_uppercase();
    let global = mk.variable(format!("GLOBAL_{}", name), value, Section::Flags, true)?;
    let flags = mk.target_variable(name, [global.expand()], &Pattern::any(), true)?;
    Ok((global, flags))
}

/// Order-only dependency on the directory `path` lives in, if any.
fn dir_sentinel(path: &Path) -> Option<Path> {
    let dir = path.parent();
    (!dir.is_empty()).then(|| dir.append(DIR_SENTINEL))
}

pub fn emit_object_file(edge: &Compile, inputs: &BuildInputs, mk: &mut Makefile) -> Result<()> {
    let compiler = edge.compiler.as_ref();
    let recipename = Variable::new(&format!("RULE_{}", compiler.name().to_uppercase()));
    let (global_cflags, cflags) = flags_vars(
        compiler.flags_var(),
        texts(compiler.global_args())
            .chain(texts(inputs.global_options(edge.file.lang)))
            .collect(),
        mk,
    )?;

    let path = &edge.target;

    let mut cflags_value = Vec::new();
    if edge.in_shared_library {
        cflags_value.extend(compiler.library_args());
    }
    for dir in &edge.include {
        cflags_value.extend(compiler.include_dir(dir));
    }
    cflags_value.extend(texts(&edge.options));

    let depfile = SafeStr::concat([Variable::new("@").expand(), SafeStr::text(".d")]);
    if compiler.deps_flavor() == DepsFlavor::Gcc {
        mk.include(path.addext(".d"), true);
    }

    if !mk.has_variable(&recipename) {
        debug!(recipe = recipename.name(), "defining compile recipe");
        let cmd = mk.cmd_var(compiler)?;

        let (deps, extra) = match compiler.deps_flavor() {
            // Turn every prerequisite in the depfile into an empty target too,
            // so deleted headers don't break the build.
            DepsFlavor::Gcc => (
                Some(depfile.clone()),
                vec![
                    Line::silent([SafeStr::concat([
                        SafeStr::shell_literal(r"sed -e 's/.*://' -e 's/\\$//' < "),
                        depfile.clone(),
                        SafeStr::shell_literal(r" | fmt -1 | \"),
                    ])]),
                    Line::new([SafeStr::concat([
                        SafeStr::shell_literal(r"  sed -e 's/^ *//' -e 's/$/:/' >> "),
                        depfile.clone(),
                    ])]),
                ],
            ),
            DepsFlavor::Msvc => (Some(depfile.clone()), Vec::new()),
            DepsFlavor::None => (None, Vec::new()),
        };

        let mut lines = vec![Line::new(compiler.compile_command(
            cmd.expand(),
            Variable::new("<").expand(),
            Variable::new("@").expand(),
            deps,
            cflags.expand(),
        ))];
        lines.extend(extra);
        mk.define(&recipename, lines, false)?;
    }

    let mut rule = Rule::new([path])
        .deps(iter::once(&edge.file.path).chain(&edge.extra_deps))
        .order_only(dir_sentinel(path))
        .recipe(Recipe::Reference(recipename.expand()));
    if !cflags_value.is_empty() {
        let mut value = vec![global_cflags.expand()];
        value.extend(cflags_value);
        rule = rule.variable(&cflags, value);
    }
    mk.rule(rule)
}

pub fn emit_link(edge: &Link, inputs: &BuildInputs, mk: &mut Makefile) -> Result<()> {
    let linker = edge.linker.as_ref();
    let recipename = Variable::new(&format!("RULE_{}", linker.name().to_uppercase()));
    let libs_var = linker.libs_var();

    let mut global_args: Vec<SafeStr> = texts(linker.global_args()).collect();
    if libs_var.is_some() {
        global_args.extend(texts(&inputs.global_link_options));
    }
    let (global_ldflags, ldflags) = flags_vars(linker.flags_var(), global_args, mk)?;

    let path = &edge.target;
    let lib_deps: Vec<&Library> = edge.libs.iter().filter(|lib| lib.built).collect();

    let mut ldflags_value = linker.mode_args();
    let mut ldlibs = None;
    let mut ldlibs_value = None;

    // Static libraries don't link against anything.
    if let Some(libs_var) = libs_var {
        ldflags_value.extend(texts(&edge.options));
        ldflags_value.extend(linker.lib_dirs(&lib_deps));
        ldflags_value.extend(linker.rpath(&lib_deps, &path.parent()));
        ldflags_value.extend(linker.import_lib(&Binary {
            path: path.clone(),
            import_lib: edge.import_lib.clone(),
        }));

        let (global_ldlibs, libs) = flags_vars(libs_var, texts(linker.global_libs()).collect(), mk)?;
        if !edge.libs.is_empty() {
            let mut value = vec![global_ldlibs.expand()];
            for lib in &edge.libs {
                value.extend(linker.link_lib(lib)?);
            }
            ldlibs_value = Some(value);
        }
        ldlibs = Some(libs);
    }

    if !mk.has_variable(&recipename) {
        debug!(recipe = recipename.name(), "defining link recipe");
        let cmd = mk.cmd_var(linker)?;
        let command = linker.link_command(
            cmd.expand(),
            Variable::new("1").expand(),
            Variable::new("@").expand(),
            ldlibs.as_ref().map(Variable::expand),
            ldflags.expand(),
        );
        mk.define(&recipename, vec![Line::new(command)], false)?;
    }

    let call = mk.expand(&Function::call(&recipename, [&edge.files]))?;
    let mut rule = Rule::new([path])
        .deps(
            edge.files
                .iter()
                .chain(lib_deps.iter().map(|lib| &lib.path))
                .chain(&edge.extra_deps),
        )
        .order_only(dir_sentinel(path))
        .recipe(Recipe::Reference(call));
    if !ldflags_value.is_empty() {
        let mut value = vec![global_ldflags.expand()];
        value.extend(ldflags_value);
        rule = rule.variable(&ldflags, value);
    }
    if let (Some(libs), Some(value)) = (ldlibs, ldlibs_value) {
        rule = rule.variable(libs, value);
    }
    mk.rule(rule)?;

    // The linker writes the import library as a side effect of the DLL.
    if let Some(import_lib) = &edge.import_lib {
        mk.rule(Rule::new([import_lib]).deps([path]))?;
    }
    Ok(())
}

pub fn emit_alias(edge: &Alias, _inputs: &BuildInputs, mk: &mut Makefile) -> Result<()> {
    mk.rule(Rule::new([&edge.target]).deps(&edge.extra_deps).phony())
}

pub fn emit_command(edge: &Command, _inputs: &BuildInputs, mk: &mut Makefile) -> Result<()> {
    let lines = edge
        .cmds
        .iter()
        .map(|cmd| Line::new(cmd.iter().cloned()))
        .collect();
    mk.rule(
        Rule::new([&edge.target])
            .deps(&edge.extra_deps)
            .lines(lines)
            .phony(),
    )
}

pub fn all_rule(default_targets: &[Path], mk: &mut Makefile) -> Result<()> {
    mk.rule(Rule::new([Path::build("all")]).deps(default_targets).phony())
}

fn install_cmd(kind: InstallKind, mk: &mut Makefile) -> Result<Variable> {
    let install = mk.variable("INSTALL", ["install"], Section::Command, true)?;
    match kind {
        InstallKind::Program => mk.variable("INSTALL_PROGRAM", [install], Section::Command, true),
        InstallKind::Data => mk.variable(
            "INSTALL_DATA",
            [install.expand(), SafeStr::text("-m"), SafeStr::text("644")],
            Section::Command,
            true,
        ),
    }
}

// TODO: Write a better `install` program to simplify this.
pub fn install_rule(install: &InstallTargets, env: &Env, mk: &mut Makefile) -> Result<()> {
    if install.is_empty() {
        return Ok(());
    }

    for root in Root::INSTALL_ROOTS {
        if let Some(dir) = env.install_dir(root) {
            mk.variable(
                root.name(),
                [Path::absolute(dir.to_string_lossy())],
                Section::Path,
                true,
            )?;
        }
    }

    let mut lines = Vec::new();
    for file in &install.files {
        let cmd = install_cmd(file.kind, mk)?;
        lines.push(Line::new([
            cmd.expand(),
            SafeStr::text("-D"),
            SafeStr::from(&file.path),
            SafeStr::from(file.install_path()),
        ]));
    }
    for dir in &install.directories {
        let dst = SafeStr::from(dir.install_path());
        lines.push(Line::new([
            SafeStr::text("mkdir"),
            SafeStr::text("-p"),
            dst.clone(),
            SafeStr::shell_literal("&&"),
            SafeStr::text("cp"),
            SafeStr::text("-r"),
            SafeStr::concat([SafeStr::from(&dir.path), SafeStr::shell_literal("/*")]),
            dst,
        ]));
    }

    mk.rule(
        Rule::new([Path::build("install")])
            .deps([Path::build("all")])
            .lines(lines)
            .phony(),
    )
}

/// The single pattern rule creating directory sentinels.
pub fn directory_rule(mk: &mut Makefile) -> Result<()> {
    let pattern = Pattern::new(format!("%/{}", DIR_SENTINEL))?;
    let target = Variable::new("@");
    let dir = mk.expand(&Function::new("dir", [[&target]]))?;

    // XXX: `mkdir -p` isn't portable to every shell make might use.
    mk.rule(Rule::new([pattern]).lines(vec![
        Line::silent([SafeStr::text("mkdir"), SafeStr::text("-p"), dir]),
        Line::silent([SafeStr::text("touch"), target.expand()]),
    ]))
}

/// Re-run the generator when the build description changes.
pub fn regenerate_rule(env: &Env, mk: &mut Makefile) -> Result<()> {
    mk.rule(
        Rule::new([Path::build("Makefile")])
            .deps([Path::src(&env.build_file)])
            .lines(vec![Line::new([
                SafeStr::from(Path::absolute(env.generator.to_string_lossy())),
                SafeStr::text("--regenerate"),
                SafeStr::text("."),
            ])]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    fn makefile() -> Makefile {
        Makefile::new("build.toml", &Platform::default())
    }

    fn body(mk: &Makefile) -> String {
        let text = mk.render().unwrap();
        text.split_once(", := ,\n\n").unwrap().1.to_string()
    }

    #[test]
    fn test_flags_vars_are_created_once() {
        let mut mk = makefile();
        let (g1, f1) = flags_vars("cflags", vec![SafeStr::text("-O2")], &mut mk).unwrap();
        let (g2, f2) = flags_vars("cflags", vec![SafeStr::text("-O3")], &mut mk).unwrap();
        assert_eq!((g1.name(), f1.name()), ("GLOBAL_CFLAGS", "CFLAGS"));
        assert_eq!((g1, f1), (g2, f2));
        assert_eq!(mk.global_variables(Section::Flags).len(), 1);
        assert_eq!(mk.global_variables(Section::Flags)[0].1, [SafeStr::text("-O2")]);
        assert_eq!(mk.target_variables().len(), 1);
    }

    #[test]
    fn test_directory_rule() {
        let mut mk = makefile();
        directory_rule(&mut mk).unwrap();
        assert_eq!(
            body(&mk),
            "%/.dir:\n\t@mkdir -p $(dir $@)\n\t@touch $@\n\n"
        );
        assert!(directory_rule(&mut mk).is_err());
    }

    #[test]
    fn test_all_rule() {
        let mut mk = makefile();
        all_rule(&[Path::build("hello"), Path::build("libinner.so")], &mut mk).unwrap();
        assert_eq!(body(&mk), ".PHONY: all\nall: hello libinner.so\n\n");
    }

    #[test]
    fn test_regenerate_rule() {
        let env = Env::new("/src", "/build");
        let mut mk = makefile();
        regenerate_rule(&env, &mut mk).unwrap();
        assert_eq!(
            body(&mk),
            "Makefile: $(srcdir)/build.toml\n\tmakegen --regenerate .\n\n"
        );
    }

    #[test]
    fn test_install_rule_skipped_without_targets() {
        let env = Env::new("/src", "/build");
        let mut mk = makefile();
        install_rule(&InstallTargets::default(), &env, &mut mk).unwrap();
        assert!(mk.rules().is_empty());
        assert!(mk.global_variables(Section::Path).is_empty());
    }

    #[test]
    fn test_alias_and_command() {
        let mut mk = makefile();
        let inputs = BuildInputs::default();
        emit_alias(
            &Alias {
                target: Path::build("everything"),
                extra_deps: vec![Path::build("hello")],
            },
            &inputs,
            &mut mk,
        )
        .unwrap();
        emit_command(
            &Command {
                target: Path::build("lint"),
                cmds: vec![vec![SafeStr::text("echo"), SafeStr::text("lint it")]],
                extra_deps: Vec::new(),
            },
            &inputs,
            &mut mk,
        )
        .unwrap();
        assert_eq!(
            body(&mk),
            ".PHONY: everything\neverything: hello\n\n\
             .PHONY: lint\nlint:\n\techo 'lint it'\n\n"
        );
    }
}
