use crate::error::{GenError, Result};
use crate::path::Path;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported compiler families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(clippy::upper_case_acronyms)]
pub enum CompilerType {
    /// GNU Compiler Collection, or anything answering to `cc`
    #[default]
    GCC,
    /// Clang/LLVM
    Clang,
    /// Microsoft Visual C++ (cl.exe)
    MSVC,
}

impl CompilerType {
    pub fn uses_msvc_flags(&self) -> bool {
        matches!(self, CompilerType::MSVC)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerType::GCC => "gcc",
            CompilerType::Clang => "clang",
            CompilerType::MSVC => "msvc",
        }
    }
}

impl FromStr for CompilerType {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gcc" | "cc" => Ok(CompilerType::GCC),
            "clang" => Ok(CompilerType::Clang),
            "msvc" | "cl" => Ok(CompilerType::MSVC),
            _ => Err(GenError::UnknownToolchain(s.to_string())),
        }
    }
}

impl fmt::Display for CompilerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lang {
    C,
    Cxx,
}

impl Lang {
    /// Pick a language from a source file's extension.
    pub fn from_path(path: &Path) -> Result<Lang> {
        match path.ext() {
            Some("c") => Ok(Lang::C),
            Some("cc" | "cpp" | "cxx" | "c++" | "C") => Ok(Lang::Cxx),
            _ => Err(GenError::UnknownLanguage(path.suffix().to_string())),
        }
    }
}

/// What a linker produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkMode {
    Executable,
    SharedLibrary,
    StaticLibrary,
}

impl LinkMode {
    pub fn is_library(&self) -> bool {
        !matches!(self, LinkMode::Executable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkMode::Executable => "executable",
            LinkMode::SharedLibrary => "shared_library",
            LinkMode::StaticLibrary => "static_library",
        }
    }
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkMode {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "executable" => Ok(LinkMode::Executable),
            "shared_library" => Ok(LinkMode::SharedLibrary),
            "static_library" => Ok(LinkMode::StaticLibrary),
            _ => Err(GenError::UnknownLinkMode(s.to_string())),
        }
    }
}

/// Format of the dependency files a compiler can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepsFlavor {
    /// `-MMD -MF <file>` makefile fragments
    Gcc,
    /// `/showIncludes` on stdout
    Msvc,
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_type_parsing() {
        assert_eq!("GCC".parse::<CompilerType>().unwrap(), CompilerType::GCC);
        assert_eq!("clang".parse::<CompilerType>().unwrap(), CompilerType::Clang);
        assert!("msvc".parse::<CompilerType>().unwrap().uses_msvc_flags());
        assert!(matches!(
            "tcc".parse::<CompilerType>(),
            Err(GenError::UnknownToolchain(name)) if name == "tcc"
        ));
    }

    #[test]
    fn test_lang_from_extension() {
        assert_eq!(Lang::from_path(&Path::src("a/main.c")).unwrap(), Lang::C);
        assert_eq!(Lang::from_path(&Path::src("main.cpp")).unwrap(), Lang::Cxx);
        assert_eq!(Lang::from_path(&Path::src("main.C")).unwrap(), Lang::Cxx);
        assert!(matches!(
            Lang::from_path(&Path::src("README")),
            Err(GenError::UnknownLanguage(_))
        ));
    }

    #[test]
    fn test_link_mode_parsing() {
        assert_eq!("shared_library".parse::<LinkMode>().unwrap(), LinkMode::SharedLibrary);
        assert!(!LinkMode::Executable.is_library());
        assert_eq!(LinkMode::StaticLibrary.to_string(), "static_library");
        assert!(matches!(
            "plugin".parse::<LinkMode>(),
            Err(GenError::UnknownLinkMode(mode)) if mode == "plugin"
        ));
    }
}
