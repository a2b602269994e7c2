//! Microsoft Visual C++ tools (`cl`, `link`, `lib`).

use super::cc::split_name;
use super::{Compiler, DepsFlavor, Lang, LinkMode, Linker, Tool};
use crate::build::{Binary, Library};
use crate::env::Env;
use crate::error::{GenError, Result};
use crate::iterutils::uniques;
use crate::path::Path;
use crate::platform::Platform;
use crate::safe_str::SafeStr;

fn nologo(mut flags: Vec<String>) -> Vec<String> {
    flags.insert(0, "/nologo".to_string());
    flags
}

pub struct MsvcCompiler {
    lang: Lang,
    command: Vec<String>,
    global_args: Vec<String>,
}

impl MsvcCompiler {
    pub fn new(env: &Env, lang: Lang) -> Result<Self> {
        let (var, flags) = match lang {
            Lang::C => ("CC", "CFLAGS"),
            Lang::Cxx => ("CXX", "CXXFLAGS"),
        };
        let mut global_args = env.getvar_words(flags, "")?;
        global_args.extend(env.getvar_words("CPPFLAGS", "")?);

        Ok(Self {
            lang,
            command: env.getvar_words(var, "cl")?,
            global_args: nologo(global_args),
        })
    }
}

impl Tool for MsvcCompiler {
    fn name(&self) -> &str {
        self.command_var()
    }

    fn command_var(&self) -> &str {
        match self.lang {
            Lang::C => "cc",
            Lang::Cxx => "cxx",
        }
    }

    fn command(&self) -> &[String] {
        &self.command
    }

    fn global_args(&self) -> &[String] {
        &self.global_args
    }

    fn flags_var(&self) -> &str {
        match self.lang {
            Lang::C => "cflags",
            Lang::Cxx => "cxxflags",
        }
    }
}

impl Compiler for MsvcCompiler {
    fn lang(&self) -> Lang {
        self.lang
    }

    fn deps_flavor(&self) -> DepsFlavor {
        DepsFlavor::Msvc
    }

    fn library_args(&self) -> Vec<SafeStr> {
        Vec::new()
    }

    fn include_dir(&self, dir: &Path) -> Vec<SafeStr> {
        vec![SafeStr::concat([SafeStr::text("/I"), SafeStr::from(dir)])]
    }

    fn object_ext(&self) -> &str {
        ".obj"
    }

    fn compile_command(
        &self,
        cmd: SafeStr,
        input: SafeStr,
        output: SafeStr,
        deps: Option<SafeStr>,
        args: SafeStr,
    ) -> Vec<SafeStr> {
        let mut result = vec![cmd, args];
        if deps.is_some() {
            result.push(SafeStr::text("/showIncludes"));
        }
        result.extend([
            SafeStr::text("/c"),
            input,
            SafeStr::concat([SafeStr::text("/Fo"), output]),
        ]);
        result
    }
}

pub struct MsvcLinker {
    platform: Platform,
    mode: LinkMode,
    command: Vec<String>,
    global_args: Vec<String>,
    global_libs: Vec<String>,
}

impl MsvcLinker {
    pub fn new(env: &Env, mode: LinkMode) -> Result<Self> {
        if mode == LinkMode::StaticLibrary {
            return Err(GenError::WrongLinker {
                linker: "link",
                mode,
            });
        }
        Ok(Self {
            platform: env.platform.clone(),
            mode,
            command: env.getvar_words("LD", "link")?,
            global_args: nologo(env.getvar_words("LDFLAGS", "")?),
            global_libs: env.getvar_words("LDLIBS", "")?,
        })
    }
}

impl Tool for MsvcLinker {
    fn name(&self) -> &str {
        "link"
    }

    fn command_var(&self) -> &str {
        "ld"
    }

    fn command(&self) -> &[String] {
        &self.command
    }

    fn global_args(&self) -> &[String] {
        &self.global_args
    }

    fn flags_var(&self) -> &str {
        "ldflags"
    }
}

impl Linker for MsvcLinker {
    fn mode(&self) -> LinkMode {
        self.mode
    }

    fn libs_var(&self) -> Option<&str> {
        Some("ldlibs")
    }

    fn global_libs(&self) -> &[String] {
        &self.global_libs
    }

    fn mode_args(&self) -> Vec<SafeStr> {
        match self.mode {
            LinkMode::SharedLibrary => vec![SafeStr::text("/DLL")],
            _ => Vec::new(),
        }
    }

    fn lib_dirs(&self, libs: &[&Library]) -> Vec<SafeStr> {
        uniques(libs.iter().map(|lib| lib.link_path().parent()))
            .into_iter()
            .map(|dir| SafeStr::concat([SafeStr::text("/LIBPATH:"), SafeStr::from(dir)]))
            .collect()
    }

    fn rpath(&self, _libs: &[&Library], _start: &Path) -> Vec<SafeStr> {
        Vec::new()
    }

    fn link_lib(&self, lib: &Library) -> Result<Vec<SafeStr>> {
        if lib.has_location() {
            return Ok(vec![SafeStr::from(lib.link_path())]);
        }
        Ok(vec![SafeStr::text(lib.link_path().basename())])
    }

    fn import_lib(&self, binary: &Binary) -> Vec<SafeStr> {
        match &binary.import_lib {
            Some(lib) if self.mode == LinkMode::SharedLibrary => {
                vec![SafeStr::concat([SafeStr::text("/IMPLIB:"), SafeStr::from(lib)])]
            }
            _ => Vec::new(),
        }
    }

    fn output_file(&self, name: &str) -> Binary {
        match self.mode {
            LinkMode::SharedLibrary => Binary {
                path: Path::build(format!("{}{}", name, self.platform.shared_library_ext)),
                import_lib: Some(Path::build(format!("{}.lib", name))),
            },
            _ => Binary::new(Path::build(format!("{}{}", name, self.platform.executable_ext))),
        }
    }

    fn link_command(
        &self,
        cmd: SafeStr,
        input: SafeStr,
        output: SafeStr,
        libs: Option<SafeStr>,
        args: SafeStr,
    ) -> Vec<SafeStr> {
        let mut result = vec![cmd, args, input];
        result.extend(libs);
        result.push(SafeStr::concat([SafeStr::text("/OUT:"), output]));
        result
    }
}

pub struct MsvcStaticLinker {
    command: Vec<String>,
    global_args: Vec<String>,
}

impl MsvcStaticLinker {
    pub fn new(env: &Env) -> Result<Self> {
        Ok(Self {
            command: env.getvar_words("AR", "lib")?,
            global_args: nologo(env.getvar_words("LIBFLAGS", "")?),
        })
    }
}

impl Tool for MsvcStaticLinker {
    fn name(&self) -> &str {
        "lib"
    }

    fn command_var(&self) -> &str {
        "ar"
    }

    fn command(&self) -> &[String] {
        &self.command
    }

    fn global_args(&self) -> &[String] {
        &self.global_args
    }

    fn flags_var(&self) -> &str {
        "libflags"
    }
}

impl Linker for MsvcStaticLinker {
    fn mode(&self) -> LinkMode {
        LinkMode::StaticLibrary
    }

    fn libs_var(&self) -> Option<&str> {
        None
    }

    fn global_libs(&self) -> &[String] {
        &[]
    }

    fn mode_args(&self) -> Vec<SafeStr> {
        Vec::new()
    }

    fn lib_dirs(&self, _libs: &[&Library]) -> Vec<SafeStr> {
        Vec::new()
    }

    fn rpath(&self, _libs: &[&Library], _start: &Path) -> Vec<SafeStr> {
        Vec::new()
    }

    fn link_lib(&self, _lib: &Library) -> Result<Vec<SafeStr>> {
        Ok(Vec::new())
    }

    fn import_lib(&self, _binary: &Binary) -> Vec<SafeStr> {
        Vec::new()
    }

    fn output_file(&self, name: &str) -> Binary {
        let (head, tail) = split_name(name);
        Binary::new(Path::build(format!("{}{}.lib", head, tail)))
    }

    fn link_command(
        &self,
        cmd: SafeStr,
        input: SafeStr,
        output: SafeStr,
        _libs: Option<SafeStr>,
        args: SafeStr,
    ) -> Vec<SafeStr> {
        vec![cmd, args, input, SafeStr::concat([SafeStr::text("/OUT:"), output])]
    }
}
