//! Generation environment: directories, platform and tool variables.

use crate::error::Result;
use crate::path::Root;
use crate::platform::Platform;
use crate::shell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

pub const DEFAULT_BUILD_FILE: &str = "build.toml";
pub const DEFAULT_PREFIX: &str = "/usr/local";

#[derive(Debug, Clone)]
pub struct Env {
    pub srcdir: PathBuf,
    pub builddir: PathBuf,
    pub install_dirs: BTreeMap<Root, PathBuf>,
    pub platform: Platform,
    /// The generator executable, re-invoked by the `Makefile` regenerate rule.
    pub generator: PathBuf,
    /// Name of the build description inside `srcdir`.
    pub build_file: String,
    /// Environment variables tools read their commands and flags from.
    pub variables: HashMap<String, String>,
}

impl Env {
    /// A hermetic environment: no environment variables, Linux platform.
    pub fn new(srcdir: impl Into<PathBuf>, builddir: impl Into<PathBuf>) -> Self {
        Self {
            srcdir: srcdir.into(),
            builddir: builddir.into(),
            install_dirs: install_dirs_for(Path::new(DEFAULT_PREFIX)),
            platform: Platform::default(),
            generator: PathBuf::from("makegen"),
            build_file: DEFAULT_BUILD_FILE.to_string(),
            variables: HashMap::new(),
        }
    }

    /// An environment seeded from the running process.
    pub fn from_process(srcdir: impl Into<PathBuf>, builddir: impl Into<PathBuf>) -> Self {
        let mut env = Self::new(srcdir, builddir);
        env.platform = Platform::host();
        env.variables = std::env::vars().collect();
        if let Ok(exe) = std::env::current_exe() {
            env.generator = exe;
        }
        env
    }

    pub fn with_prefix(mut self, prefix: impl AsRef<Path>) -> Self {
        self.install_dirs = install_dirs_for(prefix.as_ref());
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.variables.insert(name.to_string(), value.to_string());
        self
    }

    pub fn getvar(&self, name: &str, default: &str) -> String {
        self.variables
            .get(name)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Read a variable and split it into shell words.
    pub fn getvar_words(&self, name: &str, default: &str) -> Result<Vec<String>> {
        shell::split(&self.getvar(name, default))
    }

    pub fn install_dir(&self, root: Root) -> Option<&Path> {
        self.install_dirs.get(&root).map(PathBuf::as_path)
    }
}

fn install_dirs_for(prefix: &Path) -> BTreeMap<Root, PathBuf> {
    BTreeMap::from([
        (Root::Prefix, prefix.to_path_buf()),
        (Root::ExecPrefix, prefix.to_path_buf()),
        (Root::BinDir, prefix.join("bin")),
        (Root::LibDir, prefix.join("lib")),
        (Root::IncludeDir, prefix.join("include")),
    ])
}
