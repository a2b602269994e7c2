//! # makegen CLI Entry Point
//!
//! Parses the command line, loads `build.toml` from the source directory and
//! writes a Makefile into the build directory. The generated Makefile calls
//! back into `makegen --regenerate` when the build description changes.

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use makegen::config::{BuildConfig, Settings};
use makegen::env::{DEFAULT_PREFIX, Env};
use makegen::make;
use makegen::toolchain::{CompilerType, Toolset};

#[derive(Parser)]
#[command(name = "makegen")]
#[command(about = "Generate a GNU Makefile from build.toml", version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
struct Cli {
    /// Directory to write the Makefile into
    builddir: PathBuf,
    /// Directory containing build.toml
    #[arg(long, default_value = ".")]
    srcdir: PathBuf,
    /// Installation prefix [default: /usr/local]
    #[arg(long)]
    prefix: Option<PathBuf>,
    /// Toolchain (gcc, clang, msvc) [default: from build.toml, else gcc]
    #[arg(long)]
    toolchain: Option<String>,
    /// Regenerate using the settings saved in the build directory
    #[arg(long)]
    regenerate: bool,
    /// Show generation details
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "makegen=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn settings(cli: &Cli, builddir: &std::path::Path) -> Result<Settings> {
    if cli.regenerate {
        return Settings::load(builddir)
            .with_context(|| format!("No saved settings in {}; run makegen without --regenerate first", builddir.display()));
    }

    let srcdir = cli
        .srcdir
        .canonicalize()
        .with_context(|| format!("Source directory {} not found", cli.srcdir.display()))?;
    let toolchain = cli
        .toolchain
        .as_deref()
        .map(str::parse::<CompilerType>)
        .transpose()?;

    Ok(Settings {
        srcdir,
        prefix: cli.prefix.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_PREFIX)),
        toolchain,
    })
}

fn configure(cli: &Cli) -> Result<PathBuf> {
    let builddir = std::path::absolute(&cli.builddir)
        .with_context(|| format!("Invalid build directory {}", cli.builddir.display()))?;
    let settings = settings(cli, &builddir)?;
    if builddir.canonicalize().is_ok_and(|dir| dir == settings.srcdir) {
        bail!("Build directory must be different from the source directory");
    }

    let env = Env::from_process(settings.srcdir.clone(), builddir.clone()).with_prefix(&settings.prefix);
    let build_file = settings.srcdir.join(&env.build_file);
    let config =
        BuildConfig::load(&build_file).with_context(|| format!("Failed to load {}", build_file.display()))?;

    let compiler_type = match settings.toolchain {
        Some(toolchain) => toolchain,
        None => config.toolchain()?.unwrap_or_default(),
    };
    let tools = Toolset::new(&env, compiler_type).context("Failed to set up toolchain")?;
    let inputs = config
        .resolve(&env, &tools)
        .with_context(|| format!("Invalid build description {}", build_file.display()))?;

    let path = make::write(&env, &inputs).context("Failed to write Makefile")?;
    settings
        .save(&builddir)
        .context("Failed to save settings")?;
    Ok(path)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match configure(&cli) {
        Ok(path) => {
            println!("{} Wrote {}", "✓".green(), path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{} {:#}", "x".red(), err);
            ExitCode::FAILURE
        }
    }
}
