//! Compiler flags file loader.

use super::BuildError;
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::Path;

/// Read one flag per line and join them with single spaces.
///
/// Blank lines and surrounding whitespace are dropped. The joined string is
/// checked for balanced quotes here so a bad file fails before any tool runs.
pub fn load(path: &Path) -> Result<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(BuildError::FlagsFileMissing(path.to_path_buf()).into());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let flags = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    split(&flags).with_context(|| format!("Bad flags in {}", path.display()))?;
    log::debug!("Compiler flags from {}: {flags}", path.display());
    Ok(flags)
}

/// Split a flag string into arguments with POSIX shell quoting rules.
pub fn split(flags: &str) -> Result<Vec<String>, BuildError> {
    shlex::split(flags).ok_or_else(|| BuildError::InvalidFlags(flags.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::error::ErrorClass;

    #[test]
    fn test_joins_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compile_flags.txt");
        std::fs::write(&path, "-Wall\n-std=c++20\n").unwrap();
        assert_eq!(load(&path).unwrap(), "-Wall -std=c++20");
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compile_flags.txt");
        std::fs::write(&path, "-Wall\r\n\r\n-Iengine/src\r\n").unwrap();
        assert_eq!(load(&path).unwrap(), "-Wall -Iengine/src");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("compile_flags.txt")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::FlagsFileMissing(_))
        ));
    }

    #[test]
    fn test_split_honours_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compile_flags.txt");
        std::fs::write(
            &path,
            "-DAPP_NAME=\"Grass Demo\"\n\"-IC:/Program Files/inc\"\n-Wall\n",
        )
        .unwrap();

        let flags = load(&path).unwrap();
        assert_eq!(
            split(&flags).unwrap(),
            ["-DAPP_NAME=Grass Demo", "-IC:/Program Files/inc", "-Wall"]
        );
    }

    #[test]
    fn test_unterminated_quote_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compile_flags.txt");
        std::fs::write(&path, "-Wall\n-DAPP_NAME=\"Grass\n").unwrap();

        let err = load(&path).unwrap_err();
        let build_err = err.downcast_ref::<BuildError>().unwrap();
        assert!(matches!(build_err, BuildError::InvalidFlags(_)));
        assert_eq!(build_err.class(), ErrorClass::Configuration);
    }
}
