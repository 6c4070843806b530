//! Typed failure causes for the build steps.
//!
//! Steps return `anyhow::Result` and attach context freely; the root cause is
//! always one of these variants so `main` can pick an exit code.

use std::path::PathBuf;

/// Failure classes, each with its own process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad or missing input detected before any external tool runs.
    Configuration,
    /// The engine artifact could not be moved into the output directory.
    ArtifactTransfer,
    /// An external tool could not be started or exited unsuccessfully.
    ExternalTool,
    /// Another build owns the output directory.
    Lock,
}

impl ErrorClass {
    pub const fn exit_code(self) -> u8 {
        match self {
            ErrorClass::Configuration => 2,
            ErrorClass::ArtifactTransfer => 3,
            ErrorClass::ExternalTool => 4,
            ErrorClass::Lock => 5,
        }
    }
}

/// Exit code for errors that carry no [`BuildError`].
pub const UNCLASSIFIED_EXIT_CODE: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no build variant selected (pass -d for debug or -r for release)")]
    NoVariant,

    #[error("compiler flags file not found: {}", .0.display())]
    FlagsFileMissing(PathBuf),

    #[error("compiler flags contain an unterminated quote: {0}")]
    InvalidFlags(String),

    #[error("configuration file not found: {}", .0.display())]
    ConfigMissing(PathBuf),

    #[error("invalid configuration in {}: {reason}", .path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("engine artifact not found at {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("failed to move {} to {}", .from.display(), .to.display())]
    ArtifactTransfer {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run {program}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} {}", describe_exit(.code))]
    ToolFailed { program: String, code: Option<i32> },

    #[error("build directory {} is locked by running process {pid} (lock file: {})", .dir.display(), .lock_file.display())]
    Locked {
        dir: PathBuf,
        pid: u32,
        lock_file: PathBuf,
    },
}

impl BuildError {
    pub fn class(&self) -> ErrorClass {
        match self {
            BuildError::NoVariant
            | BuildError::FlagsFileMissing(_)
            | BuildError::InvalidFlags(_)
            | BuildError::ConfigMissing(_)
            | BuildError::InvalidConfig { .. } => ErrorClass::Configuration,
            BuildError::ArtifactMissing(_) | BuildError::ArtifactTransfer { .. } => {
                ErrorClass::ArtifactTransfer
            }
            BuildError::ToolSpawn { .. } | BuildError::ToolFailed { .. } => {
                ErrorClass::ExternalTool
            }
            BuildError::Locked { .. } => ErrorClass::Lock,
        }
    }
}

// thiserror hands fields to format arguments by reference
#[allow(clippy::ref_option, clippy::trivially_copy_pass_by_ref)]
fn describe_exit(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

/// Map an error chain to the process exit code of its first [`BuildError`].
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BuildError>())
        .map_or(UNCLASSIFIED_EXIT_CODE, |build_err| {
            build_err.class().exit_code()
        })
}
