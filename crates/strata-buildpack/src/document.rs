//! TOML document helpers shared by the descriptor, order, group and plan
//! readers and writers.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use strata_common::error::{Result, StrataError};

/// Reads and decodes the TOML document at `path`.
///
/// # Errors
///
/// Returns [`StrataError::Io`] if the file cannot be read and
/// [`StrataError::Parse`] if it is not a valid document of type `T`.
pub fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| StrataError::io(path, e))?;
    parse(path, &content)
}

/// Decodes `content`, attributing failures to `path`.
///
/// # Errors
///
/// Returns [`StrataError::Parse`] on malformed input.
pub fn parse<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| StrataError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Encodes `value` and writes it to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`StrataError::Encode`] if the value cannot be represented as
/// TOML, or [`StrataError::Io`] if the file cannot be written.
pub fn write<T: Serialize>(path: &Path, document: &'static str, value: &T) -> Result<()> {
    let content = toml::to_string(value).map_err(|e| StrataError::Encode {
        document,
        message: e.to_string(),
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StrataError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| StrataError::io(path, e))?;
    tracing::debug!(path = %path.display(), document, "wrote document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read::<Doc>(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, StrataError::Io { .. }));
    }

    #[test]
    fn malformed_content_is_parse_error() {
        let err = parse::<Doc>(Path::new("doc.toml"), "name = [").unwrap_err();
        assert!(matches!(err, StrataError::Parse { .. }), "got: {err}");
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("doc.toml");
        let doc = Doc { name: "x".into() };
        write(&path, "doc", &doc).expect("write");
        assert_eq!(read::<Doc>(&path).expect("read"), doc);
    }
}
