//! GNU Make backend.
//!
//! - [`writer`] - escaping engine for each position in the Make grammar
//! - [`entity`] - variables, patterns and function calls
//! - [`document`] - the Makefile being built and its serialization
//! - [`rules`] - handlers turning build edges into rules

pub mod document;
pub mod entity;
pub mod rules;
pub mod writer;

pub use document::{Include, Line, Makefile, Recipe, Rule, Section};
pub use entity::{Function, Pattern, Variable};
pub use rules::RuleHandlers;
pub use writer::{PathVars, Quoting, Syntax, Writer};

use crate::build::BuildInputs;
use crate::env::Env;
use crate::error::Result;
use crate::path::Path;
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub const MAKEFILE: &str = "Makefile";

/// Build the whole Makefile for `inputs` in memory.
pub fn generate(env: &Env, inputs: &BuildInputs, handlers: &RuleHandlers) -> Result<Makefile> {
    let build_file = env.srcdir.join(&env.build_file);
    let mut mk = Makefile::new(build_file.display().to_string(), &env.platform);
    mk.variable(
        "srcdir",
        [Path::absolute(env.srcdir.to_string_lossy())],
        Section::Path,
        false,
    )?;

    rules::all_rule(&inputs.default_targets, &mut mk)?;
    rules::install_rule(&inputs.install, env, &mut mk)?;
    for edge in &inputs.edges {
        handlers.dispatch(edge, inputs, &mut mk)?;
    }
    rules::directory_rule(&mut mk)?;
    rules::regenerate_rule(env, &mut mk)?;
    Ok(mk)
}

/// Generate and write `<builddir>/Makefile`.
///
/// The file is rendered fully and written to a temporary sibling first, so
/// a failed run leaves any previous Makefile in place.
pub fn write(env: &Env, inputs: &BuildInputs) -> Result<PathBuf> {
    let mk = generate(env, inputs, &RuleHandlers::default())?;
    let contents = mk.render()?;

    fs::create_dir_all(&env.builddir)?;
    let path = env.builddir.join(MAKEFILE);
    let tmp = env.builddir.join(format!("{}.tmp", MAKEFILE));
    if let Err(err) = fs::write(&tmp, contents).and_then(|()| fs::rename(&tmp, &path)) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }

    info!(path = %path.display(), rules = mk.rules().len(), "wrote Makefile");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_rename_removes_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let builddir = dir.path().join("build");
        fs::create_dir_all(builddir.join(MAKEFILE).join("occupied")).unwrap();
        let env = Env::new("/src", builddir.clone());

        assert!(write(&env, &BuildInputs::default()).is_err());
        assert!(!builddir.join("Makefile.tmp").exists());
        assert!(builddir.join(MAKEFILE).is_dir());
    }
}
