use crate::build::{
    Alias, Binary, BuildEdge, BuildInputs, Command, Compile, InstallDirectory, InstallFile, InstallKind, Library,
    Link, SourceFile,
};
use crate::env::Env;
use crate::error::{GenError, Result};
use crate::path::{Path, Root};
use crate::safe_str::SafeStr;
use crate::toolchain::{CompilerType, Lang, LinkMode, Toolset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path as FsPath, PathBuf};
use tracing::debug;

/// Build description (`build.toml`).
#[derive(Deserialize, Debug, Default)]
pub struct BuildConfig {
    /// Default targets; every binary when omitted.
    pub default: Option<Vec<String>>,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub options: OptionsConfig,
    #[serde(default)]
    pub executable: Vec<TargetConfig>,
    #[serde(default)]
    pub shared_library: Vec<TargetConfig>,
    #[serde(default)]
    pub static_library: Vec<TargetConfig>,
    #[serde(default)]
    pub alias: Vec<AliasConfig>,
    #[serde(default)]
    pub command: Vec<CommandConfig>,
    #[serde(default)]
    pub install: InstallConfig,
}

#[derive(Deserialize, Debug, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: String,
    pub toolchain: Option<String>,
}

/// Options applied to every target.
#[derive(Deserialize, Debug, Default)]
pub struct OptionsConfig {
    #[serde(default)]
    pub c: Vec<String>,
    #[serde(default)]
    pub cxx: Vec<String>,
    #[serde(default)]
    pub link: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct TargetConfig {
    pub name: String,
    pub sources: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub link_options: Vec<String>,
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default)]
    pub extra_deps: Vec<String>,
    #[serde(default = "default_install")]
    pub install: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct AliasConfig {
    pub name: String,
    #[serde(default)]
    pub deps: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CommandConfig {
    pub name: String,
    pub cmds: Vec<Vec<String>>,
    #[serde(default)]
    pub deps: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct InstallConfig {
    /// Header files, installed into `includedir`.
    #[serde(default)]
    pub headers: Vec<String>,
    /// Directories copied recursively into `prefix`.
    #[serde(default)]
    pub directories: Vec<String>,
}

fn default_install() -> bool {
    true
}

/// A binary whose output name is known but whose edges aren't emitted yet.
struct Planned<'a> {
    mode: LinkMode,
    target: &'a TargetConfig,
    lang: Lang,
    output: Binary,
}

impl BuildConfig {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &FsPath) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// The toolchain named in `[project]`, if any.
    pub fn toolchain(&self) -> Result<Option<CompilerType>> {
        self.project.toolchain.as_deref().map(str::parse).transpose()
    }

    /// Turn the description into build edges.
    ///
    /// Libraries come first so executables can link against them, then
    /// executables, aliases and commands, each in file order.
    pub fn resolve(&self, env: &Env, tools: &Toolset) -> Result<BuildInputs> {
        let mut inputs = BuildInputs::default();
        inputs.global_options.insert(Lang::C, self.options.c.clone());
        inputs.global_options.insert(Lang::Cxx, self.options.cxx.clone());
        inputs.global_link_options = self.options.link.clone();

        let sections = [
            (LinkMode::StaticLibrary, &self.static_library),
            (LinkMode::SharedLibrary, &self.shared_library),
            (LinkMode::Executable, &self.executable),
        ];

        let mut outputs: HashMap<&str, Path> = HashMap::new();
        let mut libraries: HashMap<&str, Library> = HashMap::new();
        let mut planned = Vec::new();

        for (mode, targets) in sections {
            for target in targets {
                let lang = target_lang(target)?;
                let binary = tools.linker(mode, lang).output_file(&target.name);
                if mode.is_library() {
                    libraries.insert(&target.name, Library::built(&binary, mode == LinkMode::SharedLibrary));
                }
                outputs.insert(&target.name, binary.path.clone());
                planned.push(Planned {
                    mode,
                    target,
                    lang,
                    output: binary,
                });
            }
        }
        for name in self.alias.iter().map(|a| &a.name).chain(self.command.iter().map(|c| &c.name)) {
            outputs.insert(name, Path::build(name));
        }

        let lookup = |name: &String| {
            outputs
                .get(name.as_str())
                .cloned()
                .unwrap_or_else(|| Path::src(name))
        };

        for plan in &planned {
            let target = plan.target;
            debug!(name = %target.name, output = %plan.output.path, "resolving binary");

            let mut objects = Vec::new();
            for source in &target.sources {
                let path = Path::src(source);
                let lang = Lang::from_path(&path)?;
                let compiler = tools.compiler(lang);
                let object = Path::build(source).stripext(compiler.object_ext());
                inputs.add_edge(BuildEdge::Compile(Compile {
                    target: object.clone(),
                    file: SourceFile { path, lang },
                    compiler,
                    include: target.include.iter().map(Path::src).collect(),
                    options: target.options.clone(),
                    extra_deps: Vec::new(),
                    in_shared_library: plan.mode == LinkMode::SharedLibrary,
                }));
                objects.push(object);
            }

            let libs = target
                .libs
                .iter()
                .map(|name| match libraries.get(name.as_str()) {
                    Some(lib) => lib.clone(),
                    None => external_library(name, plan.lang, tools),
                })
                .collect();

            inputs.add_edge(BuildEdge::Link(Link {
                target: plan.output.path.clone(),
                files: objects,
                linker: tools.linker(plan.mode, plan.lang),
                libs,
                options: target.link_options.clone(),
                extra_deps: target.extra_deps.iter().map(lookup).collect(),
                import_lib: plan.output.import_lib.clone(),
            }));

            if target.install {
                inputs.install.files.push(InstallFile {
                    path: plan.output.path.clone(),
                    kind: match plan.mode {
                        LinkMode::StaticLibrary => InstallKind::Data,
                        _ => InstallKind::Program,
                    },
                    root: match plan.mode {
                        LinkMode::Executable => Root::BinDir,
                        LinkMode::SharedLibrary if env.platform.has_import_library => Root::BinDir,
                        _ => Root::LibDir,
                    },
                });
            }
        }

        for alias in &self.alias {
            inputs.add_edge(BuildEdge::Alias(Alias {
                target: Path::build(&alias.name),
                extra_deps: alias.deps.iter().map(lookup).collect(),
            }));
        }
        for command in &self.command {
            inputs.add_edge(BuildEdge::Command(Command {
                target: Path::build(&command.name),
                cmds: command
                    .cmds
                    .iter()
                    .map(|cmd| cmd.iter().map(SafeStr::text).collect())
                    .collect(),
                extra_deps: command.deps.iter().map(lookup).collect(),
            }));
        }

        inputs.default_targets = match &self.default {
            Some(names) => names
                .iter()
                .map(|name| {
                    outputs
                        .get(name.as_str())
                        .cloned()
                        .ok_or_else(|| GenError::UnknownTarget(name.clone()))
                })
                .collect::<Result<_>>()?,
            None => planned.iter().map(|p| p.output.path.clone()).collect(),
        };

        for header in &self.install.headers {
            inputs.install.files.push(InstallFile {
                path: Path::src(header),
                kind: InstallKind::Data,
                root: Root::IncludeDir,
            });
        }
        for dir in &self.install.directories {
            inputs.install.directories.push(InstallDirectory {
                path: Path::src(dir),
                root: Root::Prefix,
            });
        }

        Ok(inputs)
    }
}

/// C++ wins if any source is C++, since it needs the C++ driver to link.
fn target_lang(target: &TargetConfig) -> Result<Lang> {
    let mut lang = Lang::C;
    for source in &target.sources {
        if Lang::from_path(&Path::src(source))? == Lang::Cxx {
            lang = Lang::Cxx;
        }
    }
    Ok(lang)
}

/// A library not built here: a file name (`libz.a`) or a bare name (`z`).
fn external_library(name: &str, lang: Lang, tools: &Toolset) -> Library {
    if name.contains('.') || name.contains('/') {
        let shared = !(name.ends_with(".a") || name.ends_with(".lib"));
        return Library::external(Path::absolute(name), shared);
    }
    let binary = tools.linker(LinkMode::SharedLibrary, lang).output_file(name);
    Library {
        built: false,
        ..Library::built(&binary, true)
    }
}

/// Settings remembered in the build directory for `--regenerate`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    pub srcdir: PathBuf,
    pub prefix: PathBuf,
    pub toolchain: Option<CompilerType>,
}

impl Settings {
    pub const FILE_NAME: &str = ".makegen.toml";

    pub fn load(builddir: &FsPath) -> Result<Self> {
        let text = fs::read_to_string(builddir.join(Self::FILE_NAME))?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save(&self, builddir: &FsPath) -> Result<()> {
        fs::create_dir_all(builddir)?;
        fs::write(builddir.join(Self::FILE_NAME), toml::to_string_pretty(self)?)?;
        Ok(())
    }
}
