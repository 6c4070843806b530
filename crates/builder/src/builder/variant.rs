//! Build variant selection and the per-variant output directory.

use super::BuildError;
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Debug or release build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildVariant {
    Debug,
    Release,
}

impl BuildVariant {
    /// Output directory, relative to the project root.
    pub fn output_dir(self) -> &'static str {
        match self {
            BuildVariant::Debug => "build/debug",
            BuildVariant::Release => "build/release",
        }
    }

    /// Selector passed to the engine sub-build (`-d` / `-r`).
    pub fn engine_selector(self) -> &'static str {
        match self {
            BuildVariant::Debug => "-d",
            BuildVariant::Release => "-r",
        }
    }

    /// Directory name used by the engine's own build tree.
    pub fn engine_dir_name(self) -> &'static str {
        match self {
            BuildVariant::Debug => "debug",
            BuildVariant::Release => "release",
        }
    }

    /// Optimization flags appended after the base compiler flags.
    pub fn compiler_flags(self) -> &'static [&'static str] {
        match self {
            BuildVariant::Debug => &["--debug", "-O0"],
            BuildVariant::Release => &["-Ofast"],
        }
    }
}

impl fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.engine_dir_name())
    }
}

/// Variant selectors as given on the command line.
#[derive(Clone, Copy, Debug, Default)]
pub struct VariantSelectors {
    pub debug: bool,
    pub release: bool,
}

/// Resolve the selectors to a variant. Debug is checked first, so `-d -r`
/// builds debug.
pub fn resolve(selectors: VariantSelectors) -> Result<BuildVariant, BuildError> {
    if selectors.debug {
        Ok(BuildVariant::Debug)
    } else if selectors.release {
        Ok(BuildVariant::Release)
    } else {
        Err(BuildError::NoVariant)
    }
}

/// Create `<root>/<variant output dir>` if needed and return its path.
pub fn ensure_output_dir(root: &Path, variant: BuildVariant) -> Result<PathBuf> {
    let dir = root.join(variant.output_dir());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    log::debug!("Output directory: {}", dir.display());
    Ok(dir)
}
