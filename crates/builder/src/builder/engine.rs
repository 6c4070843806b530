//! Engine sub-build and artifact relocation.
//!
//! The engine builds itself with its own script, leaving the library at
//! `<engine>/build/<variant>/<artifact>`. We move it into the output
//! directory so the link step always sees exactly one copy.

use super::process::{Invocation, ToolRunner};
use super::{BuildConfig, BuildError};
use anyhow::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Command line for the engine's own build script.
pub fn invocation(config: &BuildConfig) -> Invocation {
    let engine = &config.project.engine;
    let mut invocation = Invocation::new(&engine.program, config.engine_root())
        .args(&engine.args)
        .arg(config.variant.engine_selector());
    if config.engine_full_rebuild {
        invocation = invocation.arg(&engine.full_flag);
    }
    invocation
}

/// Where the engine leaves its artifact for the current variant.
pub fn built_artifact(config: &BuildConfig) -> PathBuf {
    config
        .engine_root()
        .join("build")
        .join(config.variant.engine_dir_name())
        .join(&config.project.engine.artifact)
}

/// Run the engine sub-build and move its artifact into the output directory.
///
/// A failing sub-build aborts before any artifact is touched, even if an old
/// artifact is still sitting in the engine tree.
pub fn build(config: &BuildConfig, runner: &dyn ToolRunner) -> Result<()> {
    let mode = if config.engine_full_rebuild {
        "full"
    } else {
        "incremental"
    };
    println!("=== Building engine ({}, {mode}) ===", config.variant);

    let invocation = invocation(config);
    log::info!("{}", invocation.command_line());
    let output = runner.run(&invocation)?.check(&invocation.program)?;
    log::debug!("Engine build took {:.2?}", output.duration);

    let from = built_artifact(config);
    let to = config.artifact_path();
    relocate(&from, &to)?;

    println!("  Engine artifact: {}", to.display());
    Ok(())
}

/// Replace `to` with `from`: delete any existing file at `to`, then rename.
pub fn relocate(from: &Path, to: &Path) -> Result<(), BuildError> {
    let transfer_error = |source| BuildError::ArtifactTransfer {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    match std::fs::remove_file(to) {
        Ok(()) => log::debug!("Removed previous artifact {}", to.display()),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(transfer_error(err)),
    }

    std::fs::rename(from, to).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            BuildError::ArtifactMissing(from.to_path_buf())
        } else {
            transfer_error(err)
        }
    })?;

    log::debug!("Moved {} -> {}", from.display(), to.display());
    Ok(())
}
