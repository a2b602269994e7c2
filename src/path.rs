//! Root-relative paths.
//!
//! Every file the generator talks about is a [`Path`]: a `/`-separated
//! suffix anchored at a [`Root`]. Roots are resolved only when a path is
//! written out, so the same path renders as `$(srcdir)/foo.c` in a Makefile
//! without the generator ever knowing where the source tree lives.

use std::fmt;

/// Separator used in every emitted path.
pub const SEP: &str = "/";

/// The directory a [`Path`] is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Root {
    /// An absolute path; the suffix carries the whole path.
    Absolute,
    SrcDir,
    /// The build directory, which is also the working directory of `make`.
    BuildDir,
    Prefix,
    ExecPrefix,
    BinDir,
    LibDir,
    IncludeDir,
}

impl Root {
    /// All installation roots, in declaration order.
    pub const INSTALL_ROOTS: [Root; 5] = [
        Root::Prefix,
        Root::ExecPrefix,
        Root::BinDir,
        Root::LibDir,
        Root::IncludeDir,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Root::Absolute => "absolute",
            Root::SrcDir => "srcdir",
            Root::BuildDir => "builddir",
            Root::Prefix => "prefix",
            Root::ExecPrefix => "exec_prefix",
            Root::BinDir => "bindir",
            Root::LibDir => "libdir",
            Root::IncludeDir => "includedir",
        }
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    root: Root,
    suffix: String,
    destdir: bool,
}

impl Path {
    pub fn new(suffix: impl AsRef<str>, root: Root) -> Self {
        Self {
            root,
            suffix: normalize(suffix.as_ref(), root),
            destdir: false,
        }
    }

    pub fn src(suffix: impl AsRef<str>) -> Self {
        Self::new(suffix, Root::SrcDir)
    }

    pub fn build(suffix: impl AsRef<str>) -> Self {
        Self::new(suffix, Root::BuildDir)
    }

    pub fn absolute(path: impl AsRef<str>) -> Self {
        Self::new(path, Root::Absolute)
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Whether `$(DESTDIR)` is prepended when this path is written.
    pub fn destdir(&self) -> bool {
        self.destdir
    }

    pub fn is_empty(&self) -> bool {
        self.suffix.is_empty()
    }

    pub fn parent(&self) -> Path {
        let suffix = match self.suffix.rfind('/') {
            Some(0) if self.root == Root::Absolute => "/",
            Some(i) => &self.suffix[..i],
            None => "",
        };
        Path {
            root: self.root,
            suffix: suffix.to_string(),
            destdir: self.destdir,
        }
    }

    pub fn append(&self, name: &str) -> Path {
        let joined = if self.suffix.is_empty() {
            name.to_string()
        } else if self.suffix.ends_with('/') {
            format!("{}{}", self.suffix, name)
        } else {
            format!("{}/{}", self.suffix, name)
        };
        Path {
            root: self.root,
            suffix: normalize(&joined, self.root),
            destdir: self.destdir,
        }
    }

    pub fn addext(&self, ext: &str) -> Path {
        Path {
            root: self.root,
            suffix: format!("{}{}", self.suffix, ext),
            destdir: self.destdir,
        }
    }

    /// Replace the extension of the last component (if any) with `ext`.
    pub fn stripext(&self, ext: &str) -> Path {
        let base_start = self.suffix.rfind('/').map_or(0, |i| i + 1);
        let stem_end = match self.suffix[base_start..].rfind('.') {
            Some(0) | None => self.suffix.len(),
            Some(i) => base_start + i,
        };
        Path {
            root: self.root,
            suffix: format!("{}{}", &self.suffix[..stem_end], ext),
            destdir: self.destdir,
        }
    }

    pub fn basename(&self) -> &str {
        self.suffix.rsplit('/').next().unwrap_or("")
    }

    /// The extension of the last component, without the dot.
    pub fn ext(&self) -> Option<&str> {
        let base = self.basename();
        match base.rfind('.') {
            Some(0) | None => None,
            Some(i) => Some(&base[i + 1..]),
        }
    }

    /// Relative path from `start` to this path. Both must share a root.
    pub fn relpath(&self, start: &Path) -> String {
        let ours: Vec<&str> = components(&self.suffix).collect();
        let theirs: Vec<&str> = components(&start.suffix).collect();
        let common = ours
            .iter()
            .zip(theirs.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let parts: Vec<&str> = std::iter::repeat_n("..", theirs.len() - common)
            .chain(ours[common..].iter().copied())
            .collect();
        if parts.is_empty() {
            ".".to_string()
        } else {
            parts.join(SEP)
        }
    }

    /// Where this file lands under `root` once installed.
    ///
    /// Files from the source tree keep only their basename; built files
    /// keep their full suffix.
    pub fn install_path(&self, root: Root) -> Path {
        let suffix = if self.root == Root::SrcDir {
            self.basename()
        } else {
            &self.suffix
        };
        Path {
            root,
            suffix: normalize(suffix, root),
            destdir: true,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.destdir {
            f.write_str("$(DESTDIR)")?;
        }
        match self.root {
            Root::Absolute | Root::BuildDir => f.write_str(&self.suffix),
            root if self.suffix.is_empty() => write!(f, "$({})", root),
            root => write!(f, "$({}){}{}", root, SEP, self.suffix),
        }
    }
}

fn components(suffix: &str) -> impl Iterator<Item = &str> {
    suffix.split('/').filter(|c| !c.is_empty())
}

fn normalize(suffix: &str, root: Root) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in suffix.split('/') {
        match part {
            "" | "." => {}
            ".." if parts.last().is_some_and(|p| *p != "..") => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join(SEP);
    if root == Root::Absolute && suffix.starts_with('/') {
        format!("/{}", joined)
    } else {
        joined
    }
}
