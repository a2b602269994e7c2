//! Target platform descriptor.

/// Facts about the platform the generated Makefile builds for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub name: String,
    pub executable_ext: String,
    pub shared_library_ext: String,
    /// Shared libraries can find their siblings through `$ORIGIN`.
    pub has_rpath: bool,
    /// Shared libraries come with a separate import library (DLL platforms).
    pub has_import_library: bool,
    /// `$(DESTDIR)` staging is supported for installs.
    pub destdir: bool,
    /// Native paths use drive letters, so `:` must stay unescaped.
    pub windows_paths: bool,
}

impl Platform {
    pub fn new(name: &str) -> Self {
        match name {
            "windows" => Self {
                name: name.to_string(),
                executable_ext: ".exe".into(),
                shared_library_ext: ".dll".into(),
                has_rpath: false,
                has_import_library: true,
                destdir: false,
                windows_paths: true,
            },
            "cygwin" => Self {
                name: name.to_string(),
                executable_ext: ".exe".into(),
                shared_library_ext: ".dll".into(),
                has_rpath: false,
                has_import_library: true,
                destdir: true,
                windows_paths: false,
            },
            "darwin" => Self {
                name: name.to_string(),
                executable_ext: String::new(),
                shared_library_ext: ".dylib".into(),
                has_rpath: false,
                has_import_library: false,
                destdir: true,
                windows_paths: false,
            },
            _ => Self {
                name: name.to_string(),
                executable_ext: String::new(),
                shared_library_ext: ".so".into(),
                has_rpath: true,
                has_import_library: false,
                destdir: true,
                windows_paths: false,
            },
        }
    }

    /// The platform this binary was compiled for.
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            Self::new("windows")
        } else if cfg!(target_os = "macos") {
            Self::new("darwin")
        } else {
            Self::new("linux")
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new("linux")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_defaults() {
        let p = Platform::default();
        assert_eq!(p.shared_library_ext, ".so");
        assert!(p.has_rpath);
        assert!(p.destdir);
        assert!(!p.windows_paths);
    }

    #[test]
    fn test_windows_has_no_destdir() {
        let p = Platform::new("windows");
        assert!(!p.destdir);
        assert!(p.windows_paths);
        assert_eq!(p.executable_ext, ".exe");
    }
}
