//! # appbuild
//!
//! Build driver for a native application that links against the engine
//! library.
//!
//! ## Usage
//!
//! ```bash
//! appbuild -d                 # Debug build into build/debug
//! appbuild -r --engine        # Rebuild the engine, then release build
//! appbuild -r --engine-full   # Full engine rebuild, then release build
//! ```
//!
//! ## Exit codes
//!
//! - 0: success
//! - 2: configuration error (no variant, missing flags file, bad or missing
//!   config, unbalanced quotes in the flags)
//! - 3: engine artifact could not be moved into the output directory
//! - 4: an external tool failed to start or exited non-zero
//! - 5: another build holds the output directory lock

use anyhow::{Context, Result};
use clap::{Args, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

mod builder;
mod config;

#[derive(Parser, Debug)]
#[command(name = "appbuild", about = "Build the engine library and the application")]
struct Cli {
    #[command(flatten)]
    variant: VariantArgs,

    #[command(flatten)]
    engine: EngineArgs,

    /// Project root (defaults to the current directory)
    #[arg(short = 'C', long)]
    root: Option<PathBuf>,

    /// Config file, relative to the root (defaults to <root>/appbuild.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct VariantArgs {
    /// Debug build (takes precedence over -r)
    #[arg(short = 'd')]
    debug: bool,

    /// Release build
    #[arg(short = 'r')]
    release: bool,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Rebuild the engine before the application
    #[arg(long)]
    engine: bool,

    /// Rebuild the engine from scratch before the application
    #[arg(long)]
    engine_full: bool,
}

impl Cli {
    fn into_request(self) -> Result<builder::BuildRequest> {
        let root = match self.root {
            Some(root) => root,
            None => std::env::current_dir().context("Failed to read current directory")?,
        };
        let root = root
            .canonicalize()
            .with_context(|| format!("Project root {} not found", root.display()))?;
        let config_file = self.config.map(|path| root.join(path));

        Ok(builder::BuildRequest {
            root,
            config_file,
            selectors: builder::VariantSelectors {
                debug: self.variant.debug,
                release: self.variant.release,
            },
            engine: self.engine.engine,
            engine_full: self.engine.engine_full,
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    match cli
        .into_request()
        .and_then(|request| builder::run(&request, &builder::SystemRunner))
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(builder::exit_code(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("appbuild").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_selectors_are_order_independent() {
        for args in [["--engine", "-r"], ["-r", "--engine"]] {
            let cli = parse(&args);
            assert!(cli.variant.release && !cli.variant.debug);
            assert!(cli.engine.engine && !cli.engine.engine_full);
        }
    }

    #[test]
    fn test_engine_full_flag() {
        let cli = parse(&["-d", "--engine-full"]);
        assert!(cli.variant.debug && cli.engine.engine_full && !cli.engine.engine);
    }

    #[test]
    fn test_unknown_argument_rejected() {
        assert!(Cli::try_parse_from(["appbuild", "-d", "--bogus"]).is_err());
    }

    #[test]
    fn test_request_resolves_relative_config_against_root() {
        let root = tempfile::tempdir().unwrap();
        let mut cli = parse(&["-d", "--config", "cfg/custom.toml"]);
        cli.root = Some(root.path().to_path_buf());

        let request = cli.into_request().unwrap();
        let canonical = root.path().canonicalize().unwrap();
        assert_eq!(request.root, canonical);
        assert_eq!(request.config_file, Some(canonical.join("cfg/custom.toml")));
        assert!(request.selectors.debug);
    }

    #[test]
    fn test_request_without_config_leaves_it_implicit() {
        let root = tempfile::tempdir().unwrap();
        let mut cli = parse(&["-r"]);
        cli.root = Some(root.path().to_path_buf());

        let request = cli.into_request().unwrap();
        assert_eq!(request.config_file, None);
    }

    #[test]
    fn test_request_rejects_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let mut cli = parse(&["-d"]);
        cli.root = Some(root.path().join("nope"));
        assert!(cli.into_request().is_err());
    }
}
