//! Compiler and linker models
//!
//! Tools don't run anything here: they describe how their command lines
//! are assembled so the Makefile backend can write them into recipes.
//! Commands and baseline flags come from the environment (`CC`, `CFLAGS`,
//! `LDFLAGS`, ...).

pub mod cc;
pub mod msvc;
pub mod types;

pub use types::{CompilerType, DepsFlavor, Lang, LinkMode};

use crate::build::{Binary, Library};
use crate::env::Env;
use crate::error::Result;
use crate::path::Path;
use crate::safe_str::SafeStr;
use std::collections::HashMap;
use std::rc::Rc;

/// Anything with a command the Makefile can name.
pub trait Tool {
    /// Rule name; the shared recipe is `RULE_<NAME>`.
    fn name(&self) -> &str;
    /// Lower-case name of the command variable (`cc` becomes `CC`).
    fn command_var(&self) -> &str;
    fn command(&self) -> &[String];
    fn global_args(&self) -> &[String];
    /// Lower-case name of the flags variable (`cflags`, `ldflags`, ...).
    fn flags_var(&self) -> &str;
}

pub trait Compiler: Tool {
    fn lang(&self) -> Lang;
    fn deps_flavor(&self) -> DepsFlavor;
    /// Extra flags for objects going into a shared library.
    fn library_args(&self) -> Vec<SafeStr>;
    fn include_dir(&self, dir: &Path) -> Vec<SafeStr>;
    fn object_ext(&self) -> &str;
    fn compile_command(
        &self,
        cmd: SafeStr,
        input: SafeStr,
        output: SafeStr,
        deps: Option<SafeStr>,
        args: SafeStr,
    ) -> Vec<SafeStr>;
}

pub trait Linker: Tool {
    fn mode(&self) -> LinkMode;
    /// Name of the libraries variable; static linkers take none.
    fn libs_var(&self) -> Option<&str>;
    fn global_libs(&self) -> &[String];
    fn mode_args(&self) -> Vec<SafeStr>;
    fn lib_dirs(&self, libs: &[&Library]) -> Vec<SafeStr>;
    /// Run-time search path flags for `libs`, relative to `start`.
    fn rpath(&self, libs: &[&Library], start: &Path) -> Vec<SafeStr>;
    fn link_lib(&self, lib: &Library) -> Result<Vec<SafeStr>>;
    /// Flags naming the import library written next to a DLL.
    fn import_lib(&self, binary: &Binary) -> Vec<SafeStr>;
    fn output_file(&self, name: &str) -> Binary;
    fn link_command(
        &self,
        cmd: SafeStr,
        input: SafeStr,
        output: SafeStr,
        libs: Option<SafeStr>,
        args: SafeStr,
    ) -> Vec<SafeStr>;
}

/// The compilers and linkers of one toolchain family.
pub struct Toolset {
    compilers: HashMap<Lang, Rc<dyn Compiler>>,
    linkers: HashMap<(LinkMode, Lang), Rc<dyn Linker>>,
}

impl Toolset {
    pub fn new(env: &Env, compiler_type: CompilerType) -> Result<Self> {
        let mut compilers: HashMap<Lang, Rc<dyn Compiler>> = HashMap::new();
        let mut linkers: HashMap<(LinkMode, Lang), Rc<dyn Linker>> = HashMap::new();

        let static_linker: Rc<dyn Linker> = if compiler_type.uses_msvc_flags() {
            Rc::new(msvc::MsvcStaticLinker::new(env)?)
        } else {
            Rc::new(cc::ArLinker::new(env)?)
        };

        for lang in [Lang::C, Lang::Cxx] {
            if compiler_type.uses_msvc_flags() {
                compilers.insert(lang, Rc::new(msvc::MsvcCompiler::new(env, lang)?));
                for mode in [LinkMode::Executable, LinkMode::SharedLibrary] {
                    linkers.insert((mode, lang), Rc::new(msvc::MsvcLinker::new(env, mode)?));
                }
            } else {
                compilers.insert(lang, Rc::new(cc::CcCompiler::new(env, compiler_type, lang)?));
                for mode in [LinkMode::Executable, LinkMode::SharedLibrary] {
                    linkers.insert(
                        (mode, lang),
                        Rc::new(cc::CcLinker::new(env, compiler_type, mode, lang)?),
                    );
                }
            }
            linkers.insert((LinkMode::StaticLibrary, lang), Rc::clone(&static_linker));
        }

        Ok(Self {
            compilers,
            linkers,
        })
    }

    pub fn compiler(&self, lang: Lang) -> Rc<dyn Compiler> {
        Rc::clone(&self.compilers[&lang])
    }

    pub fn linker(&self, mode: LinkMode, lang: Lang) -> Rc<dyn Linker> {
        Rc::clone(&self.linkers[&(mode, lang)])
    }
}
