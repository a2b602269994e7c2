//! File nodes of the build graph.

use crate::path::{Path, Root};
use crate::toolchain::Lang;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: Path,
    pub lang: Lang,
}

/// The file(s) a linker produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub path: Path,
    /// Companion import library on DLL platforms.
    pub import_lib: Option<Path>,
}

impl Binary {
    pub fn new(path: Path) -> Self {
        Self {
            path,
            import_lib: None,
        }
    }
}

/// A library a link step depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub path: Path,
    pub shared: bool,
    pub import_lib: Option<Path>,
    /// Produced by an edge of this build rather than found on the system.
    pub built: bool,
}

impl Library {
    pub fn built(binary: &Binary, shared: bool) -> Self {
        Self {
            path: binary.path.clone(),
            shared,
            import_lib: binary.import_lib.clone(),
            built: true,
        }
    }

    pub fn external(path: Path, shared: bool) -> Self {
        Self {
            path,
            shared,
            import_lib: None,
            built: false,
        }
    }

    /// The file handed to the linker.
    pub fn link_path(&self) -> &Path {
        self.import_lib.as_ref().unwrap_or(&self.path)
    }

    /// An external library given with its directory. It is linked by full
    /// path instead of being searched for.
    pub fn has_location(&self) -> bool {
        !self.built && !self.link_path().parent().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallKind {
    /// Executables and shared libraries, installed with default permissions.
    Program,
    /// Headers, static libraries and other data, installed `-m 644`.
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFile {
    pub path: Path,
    pub kind: InstallKind,
    pub root: Root,
}

impl InstallFile {
    pub fn install_path(&self) -> Path {
        self.path.install_path(self.root)
    }
}

/// A directory whose contents are copied recursively on install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallDirectory {
    pub path: Path,
    pub root: Root,
}

impl InstallDirectory {
    pub fn install_path(&self) -> Path {
        self.path.install_path(self.root)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallTargets {
    pub files: Vec<InstallFile>,
    pub directories: Vec<InstallDirectory>,
}

impl InstallTargets {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_path_prefers_import_lib() {
        let dll = Binary {
            path: Path::build("foo.dll"),
            import_lib: Some(Path::build("foo.lib")),
        };
        let lib = Library::built(&dll, true);
        assert_eq!(lib.link_path(), &Path::build("foo.lib"));

        let so = Library::external(Path::absolute("/usr/lib/libz.so"), true);
        assert_eq!(so.link_path().basename(), "libz.so");
        assert!(!so.built);
    }

    #[test]
    fn test_has_location() {
        assert!(Library::external(Path::absolute("/opt/foo/lib/libfoo.so"), true).has_location());
        assert!(!Library::external(Path::absolute("libz.a"), false).has_location());
        let built = Library::built(&Binary::new(Path::build("lib/libinner.so")), true);
        assert!(!built.has_location());
    }

    #[test]
    fn test_install_targets() {
        let mut targets = InstallTargets::default();
        assert!(targets.is_empty());
        targets.files.push(InstallFile {
            path: Path::src("include/hello.h"),
            kind: InstallKind::Data,
            root: Root::IncludeDir,
        });
        assert!(!targets.is_empty());
        assert_eq!(targets.files[0].install_path().to_string(), "$(DESTDIR)$(includedir)/hello.h");
    }
}
