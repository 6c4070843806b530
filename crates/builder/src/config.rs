//! Project configuration (`appbuild.toml`).
//!
//! Every key is optional. Without a config file the build behaves like the
//! stock app layout: `app/main.cpp` linked against the engine's
//! `ty.lib`, compiled with clang. A file named with `--config` has to exist;
//! only the implicit `<root>/appbuild.toml` may be absent.

use crate::builder::BuildError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "appbuild.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub compiler: CompilerSection,

    #[serde(default)]
    pub engine: EngineSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Executable name without the platform suffix.
    #[serde(default = "default_exe_name")]
    pub exe_name: String,

    /// Source entry point handed to the compiler.
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// One compiler flag per line.
    #[serde(default = "default_flags_file")]
    pub flags_file: PathBuf,
}

impl Default for ProjectSection {
    fn default() -> Self {
        ProjectSection {
            exe_name: default_exe_name(),
            source: default_source(),
            flags_file: default_flags_file(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerSection {
    #[serde(default = "default_compiler")]
    pub program: String,
}

impl Default for CompilerSection {
    fn default() -> Self {
        CompilerSection {
            program: default_compiler(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Engine checkout, relative to the project root.
    #[serde(default = "default_engine_root")]
    pub root: PathBuf,

    #[serde(default = "default_engine_program")]
    pub program: String,

    /// Arguments placed before the variant selector.
    #[serde(default = "default_engine_args")]
    pub args: Vec<String>,

    #[serde(default = "default_full_flag")]
    pub full_flag: String,

    /// Library file name, both inside the engine tree and in the output dir.
    #[serde(default = "default_artifact")]
    pub artifact: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        EngineSection {
            root: default_engine_root(),
            program: default_engine_program(),
            args: default_engine_args(),
            full_flag: default_full_flag(),
            artifact: default_artifact(),
        }
    }
}

fn default_exe_name() -> String {
    "app".to_string()
}
fn default_source() -> PathBuf {
    PathBuf::from("app/main.cpp")
}
fn default_flags_file() -> PathBuf {
    PathBuf::from("compile_flags.txt")
}
fn default_compiler() -> String {
    "clang".to_string()
}
fn default_engine_root() -> PathBuf {
    PathBuf::from("engine")
}
fn default_engine_program() -> String {
    "python".to_string()
}
fn default_engine_args() -> Vec<String> {
    vec!["build.py".to_string()]
}
fn default_full_flag() -> String {
    "--full".to_string()
}
fn default_artifact() -> String {
    "ty.lib".to_string()
}

impl ProjectConfig {
    /// Load a config file that must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(BuildError::ConfigMissing(path.to_path_buf()).into());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        let config: ProjectConfig =
            toml::from_str(&content).map_err(|err| BuildError::InvalidConfig {
                path: path.to_path_buf(),
                reason: err.message().to_string(),
            })?;

        log::debug!("Loaded {}", path.display());
        Ok(config)
    }

    /// Load the project's default config file, or defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No {} found, using defaults", path.display());
            return Ok(ProjectConfig::default());
        }
        Self::load(path)
    }

    /// Executable file name with the platform suffix.
    pub fn exe_file_name(&self) -> String {
        format!("{}{}", self.project.exe_name, std::env::consts::EXE_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::error::ErrorClass;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load_or_default(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.project.exe_name, "app");
        assert_eq!(config.project.source, PathBuf::from("app/main.cpp"));
        assert_eq!(config.project.flags_file, PathBuf::from("compile_flags.txt"));
        assert_eq!(config.compiler.program, "clang");
        assert_eq!(config.engine.root, PathBuf::from("engine"));
        assert_eq!(config.engine.args, vec!["build.py".to_string()]);
        assert_eq!(config.engine.artifact, "ty.lib");
    }

    #[test]
    fn test_partial_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "[compiler]\nprogram = \"clang++\"\n\n[engine]\nartifact = \"libty.a\"\n",
        )
        .unwrap();

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.compiler.program, "clang++");
        assert_eq!(config.engine.artifact, "libty.a");
        // Untouched keys keep their defaults
        assert_eq!(config.engine.program, "python");
        assert_eq!(config.project.exe_name, "app");
    }

    #[test]
    fn test_malformed_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[engine]\nartefact = \"typo.lib\"\n").unwrap();

        let err = ProjectConfig::load(&path).unwrap_err();
        let build_err = err.downcast_ref::<BuildError>().unwrap();
        assert_eq!(build_err.class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_missing_explicit_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appbuild.tmol");

        let err = ProjectConfig::load(&path).unwrap_err();
        let build_err = err.downcast_ref::<BuildError>().unwrap();
        assert!(matches!(build_err, BuildError::ConfigMissing(p) if *p == path));
        assert_eq!(build_err.class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_existing_file_is_read_by_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[project]\nexe_name = \"grass\"\n").unwrap();

        let config = ProjectConfig::load_or_default(&path).unwrap();
        assert_eq!(config.project.exe_name, "grass");
    }

    #[test]
    fn test_exe_file_name_has_platform_suffix() {
        let config = ProjectConfig::default();
        assert_eq!(
            config.exe_file_name(),
            format!("app{}", std::env::consts::EXE_SUFFIX)
        );
    }
}
