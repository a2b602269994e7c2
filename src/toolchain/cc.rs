//! GCC/Clang style tools (`cc`, `c++`, `ar`).

use super::{Compiler, CompilerType, DepsFlavor, Lang, LinkMode, Linker, Tool};
use crate::build::{Binary, Library};
use crate::env::Env;
use crate::error::{GenError, Result};
use crate::iterutils::uniques;
use crate::path::Path;
use crate::platform::Platform;
use crate::safe_str::SafeStr;

fn default_command(compiler_type: CompilerType, lang: Lang) -> &'static str {
    match (compiler_type, lang) {
        (CompilerType::Clang, Lang::C) => "clang",
        (CompilerType::Clang, Lang::Cxx) => "clang++",
        (_, Lang::C) => "cc",
        (_, Lang::Cxx) => "c++",
    }
}

fn command_var(lang: Lang) -> &'static str {
    match lang {
        Lang::C => "cc",
        Lang::Cxx => "cxx",
    }
}

pub struct CcCompiler {
    lang: Lang,
    command: Vec<String>,
    global_args: Vec<String>,
}

impl CcCompiler {
    pub fn new(env: &Env, compiler_type: CompilerType, lang: Lang) -> Result<Self> {
        let var = command_var(lang).to_uppercase();
        let flags = match lang {
            Lang::C => "CFLAGS",
            Lang::Cxx => "CXXFLAGS",
        };

        let mut global_args = env.getvar_words(flags, "")?;
        global_args.extend(env.getvar_words("CPPFLAGS", "")?);
        Ok(Self {
            lang,
            command: env.getvar_words(&var, default_command(compiler_type, lang))?,
            global_args,
        })
    }
}

impl Tool for CcCompiler {
    fn name(&self) -> &str {
        command_var(self.lang)
    }

    fn command_var(&self) -> &str {
        command_var(self.lang)
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

impl Compiler for CcCompiler {
    fn lang(&self) -> Lang {
        self.lang
    }

    fn deps_flavor(&self) -> DepsFlavor {
        DepsFlavor::Gcc
    }

    fn library_args(&self) -> Vec<SafeStr> {
        vec![SafeStr::text("-fPIC")]
    }

    fn include_dir(&self, dir: &Path) -> Vec<SafeStr> {
        vec![SafeStr::concat([SafeStr::text("-I"), SafeStr::from(dir)])]
    }

    fn object_ext(&self) -> &str {
        ".o"
    }

    fn compile_command(
        &self,
        cmd: SafeStr,
        input: SafeStr,
        output: SafeStr,
        deps: Option<SafeStr>,
        args: SafeStr,
    ) -> Vec<SafeStr> {
        let mut result = vec![cmd, args, SafeStr::text("-c"), input];
        if let Some(deps) = deps {
            result.extend([SafeStr::text("-MMD"), SafeStr::text("-MF"), deps]);
        }
        result.extend([SafeStr::text("-o"), output]);
        result
    }
}

/// Links executables and shared libraries through the compiler driver.
pub struct CcLinker {
    platform: Platform,
    mode: LinkMode,
    lang: Lang,
    name: String,
    command: Vec<String>,
    global_args: Vec<String>,
    global_libs: Vec<String>,
    lib_exts: Vec<String>,
}

impl CcLinker {
    pub fn new(env: &Env, compiler_type: CompilerType, mode: LinkMode, lang: Lang) -> Result<Self> {
        if mode == LinkMode::StaticLibrary {
            return Err(GenError::WrongLinker {
                linker: "cc",
                mode,
            });
        }
        let var = command_var(lang).to_uppercase();

        // DLLs are linked through their import library, never directly.
        let mut lib_exts = vec![".a".to_string()];
        if !env.platform.has_import_library {
            lib_exts.push(env.platform.shared_library_ext.clone());
        }

        Ok(Self {
            platform: env.platform.clone(),
            mode,
            lang,
            name: format!("link_{}", command_var(lang)),
            command: env.getvar_words(&var, default_command(compiler_type, lang))?,
            global_args: env.getvar_words("LDFLAGS", "")?,
            global_libs: env.getvar_words("LDLIBS", "")?,
            lib_exts,
        })
    }
}

impl Tool for CcLinker {
    fn name(&self) -> &str {
        &self.name
    }

    fn command_var(&self) -> &str {
        command_var(self.lang)
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

impl Linker for CcLinker {
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
            LinkMode::SharedLibrary => vec![SafeStr::text("-shared"), SafeStr::text("-fPIC")],
            _ => Vec::new(),
        }
    }

    fn lib_dirs(&self, libs: &[&Library]) -> Vec<SafeStr> {
        uniques(libs.iter().map(|lib| lib.link_path().parent()))
            .into_iter()
            .map(|dir| SafeStr::concat([SafeStr::text("-L"), SafeStr::from(dir)]))
            .collect()
    }

    fn rpath(&self, libs: &[&Library], start: &Path) -> Vec<SafeStr> {
        if !self.platform.has_rpath {
            return Vec::new();
        }
        let paths = uniques(
            libs.iter()
                .filter(|lib| lib.shared)
                .map(|lib| lib.path.parent().relpath(start)),
        );
        if paths.is_empty() {
            return Vec::new();
        }

        let rpaths: Vec<String> = paths
            .iter()
            .map(|p| {
                if p == "." {
                    "$ORIGIN".to_string()
                } else {
                    format!("$ORIGIN/{}", p)
                }
            })
            .collect();
        vec![SafeStr::text(format!("-Wl,-rpath={}", rpaths.join(":")))]
    }

    fn link_lib(&self, lib: &Library) -> Result<Vec<SafeStr>> {
        if lib.has_location() {
            return Ok(vec![SafeStr::from(lib.link_path())]);
        }
        let basename = lib.link_path().basename();
        let name = basename
            .strip_prefix("lib")
            .and_then(|rest| self.lib_exts.iter().find_map(|ext| rest.strip_suffix(ext.as_str())))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| GenError::InvalidLibrary(basename.to_string()))?;
        Ok(vec![SafeStr::text(format!("-l{}", name))])
    }

    fn import_lib(&self, binary: &Binary) -> Vec<SafeStr> {
        match &binary.import_lib {
            Some(lib) if self.mode == LinkMode::SharedLibrary && self.platform.has_import_library => {
                vec![SafeStr::concat([SafeStr::text("-Wl,--out-implib="), SafeStr::from(lib)])]
            }
            _ => Vec::new(),
        }
    }

    fn output_file(&self, name: &str) -> Binary {
        match self.mode {
            LinkMode::SharedLibrary => {
                let (head, tail) = split_name(name);
                let ext = &self.platform.shared_library_ext;
                if self.platform.has_import_library {
                    let prefix = if self.platform.name == "cygwin" { "cyg" } else { "lib" };
                    Binary {
                        path: Path::build(format!("{}{}{}{}", head, prefix, tail, ext)),
                        import_lib: Some(Path::build(format!("{}lib{}{}.a", head, tail, ext))),
                    }
                } else {
                    Binary::new(Path::build(format!("{}lib{}{}", head, tail, ext)))
                }
            }
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
        result.extend([SafeStr::text("-o"), output]);
        result
    }
}

/// Builds static libraries with `ar`.
pub struct ArLinker {
    command: Vec<String>,
    global_args: Vec<String>,
}

impl ArLinker {
    pub fn new(env: &Env) -> Result<Self> {
        Ok(Self {
            command: env.getvar_words("AR", "ar")?,
            global_args: env.getvar_words("ARFLAGS", "cru")?,
        })
    }
}

impl Tool for ArLinker {
    fn name(&self) -> &str {
        "ar"
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
        "arflags"
    }
}

impl Linker for ArLinker {
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
        Binary::new(Path::build(format!("{}lib{}.a", head, tail)))
    }

    fn link_command(
        &self,
        cmd: SafeStr,
        input: SafeStr,
        output: SafeStr,
        _libs: Option<SafeStr>,
        args: SafeStr,
    ) -> Vec<SafeStr> {
        vec![cmd, args, output, input]
    }
}

/// Split `dir/name` into `("dir/", "name")`.
pub(crate) fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(i) => name.split_at(i + 1),
        None => ("", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Env {
        Env::new(".", "build")
    }

    #[test]
    fn test_compiler_reads_environment() {
        let env = env()
            .with_var("CC", "ccache gcc")
            .with_var("CFLAGS", "-O2 -g")
            .with_var("CPPFLAGS", "-DNDEBUG");
        let cc = CcCompiler::new(&env, CompilerType::GCC, Lang::C).unwrap();
        assert_eq!(cc.command(), ["ccache", "gcc"]);
        assert_eq!(cc.global_args(), ["-O2", "-g", "-DNDEBUG"]);
        assert_eq!(cc.flags_var(), "cflags");

        let cxx = CcCompiler::new(&Env::new(".", "b"), CompilerType::Clang, Lang::Cxx).unwrap();
        assert_eq!(cxx.command(), ["clang++"]);
        assert_eq!(cxx.name(), "cxx");
    }

    #[test]
    fn test_compile_command_order() {
        let cc = CcCompiler::new(&env(), CompilerType::GCC, Lang::C).unwrap();
        let cmd = cc.compile_command(
            SafeStr::literal("$(CC)"),
            SafeStr::literal("$<"),
            SafeStr::literal("$@"),
            Some(SafeStr::literal("$@.d")),
            SafeStr::literal("$(CFLAGS)"),
        );
        let words: Vec<String> = cmd.iter().map(ToString::to_string).collect();
        assert_eq!(words, ["$(CC)", "$(CFLAGS)", "-c", "$<", "-MMD", "-MF", "$@.d", "-o", "$@"]);
    }

    #[test]
    fn test_link_lib_names() {
        let ld = CcLinker::new(&env(), CompilerType::GCC, LinkMode::Executable, Lang::C).unwrap();
        let shared = Library::external(Path::absolute("libz.so"), true);
        let archive = Library::built(&Binary::new(Path::build("sub/libfoo.a")), false);
        assert_eq!(ld.link_lib(&shared).unwrap(), [SafeStr::text("-lz")]);
        assert_eq!(ld.link_lib(&archive).unwrap(), [SafeStr::text("-lfoo")]);
        assert!(matches!(
            ld.link_lib(&Library::external(Path::build("foo.dll"), true)),
            Err(GenError::InvalidLibrary(name)) if name == "foo.dll"
        ));
    }

    #[test]
    fn test_located_external_library_links_by_path() {
        let ld = CcLinker::new(&env(), CompilerType::GCC, LinkMode::Executable, Lang::C).unwrap();
        let lib = Library::external(Path::absolute("/opt/foo/lib/libfoo.so"), true);
        assert_eq!(
            ld.link_lib(&lib).unwrap(),
            [SafeStr::from(Path::absolute("/opt/foo/lib/libfoo.so"))]
        );
    }

    #[test]
    fn test_wrong_linker_for_static_libraries() {
        assert!(matches!(
            CcLinker::new(&env(), CompilerType::GCC, LinkMode::StaticLibrary, Lang::C),
            Err(GenError::WrongLinker { linker: "cc", mode: LinkMode::StaticLibrary })
        ));
    }

    #[test]
    fn test_import_lib_on_dll_platforms() {
        let cygwin = env().with_platform(Platform::new("cygwin"));
        let shared = CcLinker::new(&cygwin, CompilerType::GCC, LinkMode::SharedLibrary, Lang::C).unwrap();
        let dll = shared.output_file("inner");
        assert_eq!(
            shared.import_lib(&dll),
            [SafeStr::concat([
                SafeStr::text("-Wl,--out-implib="),
                SafeStr::from(Path::build("libinner.dll.a")),
            ])]
        );

        let exe = CcLinker::new(&cygwin, CompilerType::GCC, LinkMode::Executable, Lang::C).unwrap();
        assert!(exe.import_lib(&exe.output_file("hello")).is_empty());

        let linux = CcLinker::new(&env(), CompilerType::GCC, LinkMode::SharedLibrary, Lang::C).unwrap();
        assert!(linux.import_lib(&linux.output_file("inner")).is_empty());
    }

    #[test]
    fn test_rpath_uses_origin() {
        let ld = CcLinker::new(&env(), CompilerType::GCC, LinkMode::Executable, Lang::C).unwrap();
        let here = Library::built(&Binary::new(Path::build("libinner.so")), true);
        let there = Library::built(&Binary::new(Path::build("lib/libouter.so")), true);
        let archive = Library::built(&Binary::new(Path::build("libstatic.a")), false);

        assert_eq!(
            ld.rpath(&[&here, &there, &archive], &Path::build("")),
            [SafeStr::text("-Wl,-rpath=$ORIGIN:$ORIGIN/lib")]
        );
        assert_eq!(
            ld.rpath(&[&here], &Path::build("bin")),
            [SafeStr::text("-Wl,-rpath=$ORIGIN/..")]
        );
        assert!(ld.rpath(&[&archive], &Path::build("")).is_empty());

        let darwin = env().with_platform(Platform::new("darwin"));
        let ld = CcLinker::new(&darwin, CompilerType::GCC, LinkMode::Executable, Lang::C).unwrap();
        assert!(ld.rpath(&[&here], &Path::build("")).is_empty());
    }

    #[test]
    fn test_output_files() {
        let shared = CcLinker::new(&env(), CompilerType::GCC, LinkMode::SharedLibrary, Lang::C).unwrap();
        assert_eq!(shared.output_file("sub/inner").path, Path::build("sub/libinner.so"));
        assert_eq!(shared.mode_args(), [SafeStr::text("-shared"), SafeStr::text("-fPIC")]);

        let cygwin = env().with_platform(Platform::new("cygwin"));
        let shared = CcLinker::new(&cygwin, CompilerType::GCC, LinkMode::SharedLibrary, Lang::C).unwrap();
        let out = shared.output_file("inner");
        assert_eq!(out.path, Path::build("cyginner.dll"));
        assert_eq!(out.import_lib, Some(Path::build("libinner.dll.a")));

        let ar = ArLinker::new(&env()).unwrap();
        assert_eq!(ar.output_file("inner").path, Path::build("libinner.a"));
        assert_eq!(ar.global_args(), ["cru"]);
    }

    #[test]
    fn test_lib_dirs_are_unique() {
        let ld = CcLinker::new(&env(), CompilerType::GCC, LinkMode::Executable, Lang::C).unwrap();
        let a = Library::built(&Binary::new(Path::build("lib/liba.so")), true);
        let b = Library::built(&Binary::new(Path::build("lib/libb.so")), true);
        assert_eq!(
            ld.lib_dirs(&[&a, &b]),
            [SafeStr::concat([SafeStr::text("-L"), SafeStr::from(Path::build("lib"))])]
        );
    }
}
