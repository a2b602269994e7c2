//! Error types for Makefile generation

use crate::path::Root;
use crate::toolchain::LinkMode;
use thiserror::Error;

/// Errors that abort a generation run.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("exactly one % required in pattern '{0}'")]
    InvalidPattern(String),

    #[error("must have at least one target")]
    EmptyTargets,

    #[error("variable '{0}' already exists")]
    DuplicateVariable(String),

    #[error("rule for '{0}' already exists")]
    DuplicateRule(String),

    #[error("unknown link mode '{0}'")]
    UnknownLinkMode(String),

    #[error("the {linker} linker cannot produce a {mode}")]
    WrongLinker { linker: &'static str, mode: LinkMode },

    #[error("'{0}' is not a valid library")]
    InvalidLibrary(String),

    #[error("no variable is mapped for path root '{0}'")]
    UnmappedRoot(Root),

    #[error("unknown toolchain '{0}'")]
    UnknownToolchain(String),

    #[error("unknown source language for '{0}'")]
    UnknownLanguage(String),

    #[error("unknown target '{0}'")]
    UnknownTarget(String),

    #[error("invalid build description: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unterminated quote in '{0}'")]
    UnterminatedQuote(String),

    #[error("illegal newline in '{0}'")]
    IllegalNewline(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = GenError> = std::result::Result<T, E>;
