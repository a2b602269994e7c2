//! # makegen - Makefile generator for C/C++ projects
//!
//! makegen reads a declarative build description (`build.toml`) and writes a
//! GNU Makefile into a separate build directory. Every file name, flag and
//! command that ends up in the Makefile is escaped for the exact position it
//! occupies, so paths with spaces, `$`, `#` or `%` survive both Make and the
//! shell.
//!
//! ## Quick Start
//!
//! ```bash
//! # Generate build/Makefile from ./build.toml
//! makegen build
//!
//! # Build it
//! make -C build
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - build description parsing (`build.toml`)
//! - [`build`] - the build graph handed to a backend
//! - [`toolchain`] - compilers and linkers (cc-style and MSVC)
//! - [`make`] - escaping engine and Makefile writer

/// Build graph: edges, files and install targets.
pub mod build;

/// Build description parsing (`build.toml`) and saved settings.
pub mod config;

/// Generation environment (directories, platform, variables).
pub mod env;

pub mod error;

/// Small iterator helpers.
pub mod iterutils;

/// GNU Make backend.
pub mod make;

/// Root-relative paths.
pub mod path;

pub mod platform;

/// Safe strings: text, literals and concatenations.
pub mod safe_str;

/// POSIX shell quoting and splitting.
pub mod shell;

/// Compiler and linker abstractions.
pub mod toolchain;

pub use error::{GenError, Result};
