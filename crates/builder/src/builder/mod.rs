//! Two-stage application build.
//!
//! Structure:
//! - `variant` - debug/release selection and output directories
//! - `flags` - compiler flags file loader
//! - `engine` - engine sub-build and artifact relocation
//! - `compile` - final compiler invocation
//! - `process` - external tool runner
//! - `lock` - per-output-directory build lock
//!
//! Flow: resolve variant, load config and flags, take the lock, optionally
//! rebuild the engine, then always compile the application. Any error stops
//! the sequence.

pub mod compile;
pub mod engine;
pub mod error;
pub mod flags;
pub mod lock;
pub mod process;
pub mod variant;

pub use error::{exit_code, BuildError};
pub use process::{SystemRunner, ToolRunner};
pub use variant::{BuildVariant, VariantSelectors};

use crate::config::{ProjectConfig, CONFIG_FILE};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// What the user asked for on the command line.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Absolute project root.
    pub root: PathBuf,
    /// Config file named on the command line. `None` means the optional
    /// `<root>/appbuild.toml`.
    pub config_file: Option<PathBuf>,
    pub selectors: VariantSelectors,
    pub engine: bool,
    pub engine_full: bool,
}

/// Resolved settings shared by both build steps.
#[derive(Debug)]
pub struct BuildConfig {
    pub root: PathBuf,
    pub variant: BuildVariant,
    pub output_dir: PathBuf,
    /// Joined contents of the flags file.
    pub flags: String,
    pub engine_requested: bool,
    pub engine_full_rebuild: bool,
    pub project: ProjectConfig,
}

impl BuildConfig {
    /// Engine library inside the output directory; the link step uses this one.
    pub fn artifact_path(&self) -> PathBuf {
        self.output_dir.join(&self.project.engine.artifact)
    }

    pub fn exe_path(&self) -> PathBuf {
        self.output_dir.join(self.project.exe_file_name())
    }

    pub fn engine_root(&self) -> PathBuf {
        self.root.join(&self.project.engine.root)
    }
}

/// Run the whole build.
pub fn run(request: &BuildRequest, runner: &dyn ToolRunner) -> Result<()> {
    let variant = variant::resolve(request.selectors)?;
    let project = match &request.config_file {
        Some(path) => ProjectConfig::load(path)?,
        None => ProjectConfig::load_or_default(&request.root.join(CONFIG_FILE))?,
    };
    let output_dir = variant::ensure_output_dir(&request.root, variant)?;
    let flags = flags::load(&request.root.join(&project.project.flags_file))?;

    let config = BuildConfig {
        root: request.root.clone(),
        variant,
        output_dir,
        flags,
        engine_requested: request.engine || request.engine_full,
        engine_full_rebuild: request.engine_full,
        project,
    };
    log::info!(
        "Building {} into {} (engine: {})",
        config.variant,
        config.output_dir.display(),
        match (config.engine_requested, config.engine_full_rebuild) {
            (false, _) => "skip",
            (true, false) => "incremental",
            (true, true) => "full",
        }
    );

    let lock = lock::BuildLock::acquire(&config.output_dir)?;
    log::debug!("Holding {}", lock.path().display());

    if config.engine_requested {
        engine::build(&config, runner).context("Engine build failed")?;
    } else {
        log::debug!(
            "Skipping engine build, linking against {}",
            config.artifact_path().display()
        );
    }

    compile::build(&config, runner).context("Project build failed")?;
    Ok(())
}
