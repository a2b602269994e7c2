//! The build graph handed to a backend.
//!
//! Edges are produced upstream (see [`crate::config`]) and consumed in
//! order by the Makefile rule handlers.

pub mod files;

pub use files::{Binary, InstallDirectory, InstallFile, InstallKind, InstallTargets, Library, SourceFile};

use crate::path::Path;
use crate::safe_str::SafeStr;
use crate::toolchain::{Compiler, Lang, Linker};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Compile one source file into an object file.
#[derive(Clone)]
pub struct Compile {
    pub target: Path,
    pub file: SourceFile,
    pub compiler: Rc<dyn Compiler>,
    pub include: Vec<Path>,
    pub options: Vec<String>,
    pub extra_deps: Vec<Path>,
    /// The object ends up in a shared library and needs PIC.
    pub in_shared_library: bool,
}

/// Link object files (and libraries) into a binary.
#[derive(Clone)]
pub struct Link {
    pub target: Path,
    pub files: Vec<Path>,
    pub linker: Rc<dyn Linker>,
    pub libs: Vec<Library>,
    pub options: Vec<String>,
    pub extra_deps: Vec<Path>,
    /// Import library written alongside a DLL.
    pub import_lib: Option<Path>,
}

/// A named group of other targets.
#[derive(Debug, Clone)]
pub struct Alias {
    pub target: Path,
    pub extra_deps: Vec<Path>,
}

/// A named target running arbitrary commands.
#[derive(Debug, Clone)]
pub struct Command {
    pub target: Path,
    pub cmds: Vec<Vec<SafeStr>>,
    pub extra_deps: Vec<Path>,
}

#[derive(Clone)]
pub enum BuildEdge {
    Compile(Compile),
    Link(Link),
    Alias(Alias),
    Command(Command),
}

impl BuildEdge {
    pub fn target(&self) -> &Path {
        match self {
            BuildEdge::Compile(e) => &e.target,
            BuildEdge::Link(e) => &e.target,
            BuildEdge::Alias(e) => &e.target,
            BuildEdge::Command(e) => &e.target,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BuildEdge::Compile(_) => "compile",
            BuildEdge::Link(_) => "link",
            BuildEdge::Alias(_) => "alias",
            BuildEdge::Command(_) => "command",
        }
    }
}

impl fmt::Debug for BuildEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.target())
    }
}

/// Everything a backend needs to write a build file.
#[derive(Debug, Clone, Default)]
pub struct BuildInputs {
    pub edges: Vec<BuildEdge>,
    pub default_targets: Vec<Path>,
    pub install: InstallTargets,
    /// Environment-wide compile options, per language.
    pub global_options: HashMap<Lang, Vec<String>>,
    pub global_link_options: Vec<String>,
}

impl BuildInputs {
    pub fn add_edge(&mut self, edge: BuildEdge) {
        self.edges.push(edge);
    }

    pub fn global_options(&self, lang: Lang) -> &[String] {
        self.global_options
            .get(&lang)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
