//! File-system layer: reading documents, backups and atomic writes

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::EngineError;

/// A document's identity and its full text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Read a UTF-8 document. Anything else is an input error.
pub fn read_document(path: &Path) -> Result<SourceDocument, EngineError> {
    let document = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| EngineError::Input {
        document: document.clone(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|e| EngineError::Input {
        document: document.clone(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })?;

    Ok(SourceDocument { id: document, text })
}

/// Copy `path` to `<name>.<YYYYmmdd-HHMMSS>.bak` beside it
pub fn create_backup(path: &Path) -> Result<PathBuf, EngineError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let backup = path.with_file_name(format!(
        "{}.{}.bak",
        name,
        Utc::now().format("%Y%m%d-%H%M%S")
    ));

    std::fs::copy(path, &backup).map_err(|source| EngineError::Write {
        path: backup.clone(),
        source,
    })?;
    tracing::info!("Backed up {} to {}", path.display(), backup.display());
    Ok(backup)
}

/// Write through a temporary file in the destination directory, then rename.
/// The destination is either fully replaced or left untouched.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), EngineError> {
    let write_error = |source| EngineError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(contents.as_bytes()).map_err(write_error)?;
    tmp.flush().map_err(write_error)?;
    tmp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_document_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ch1.md");
        std::fs::write(&path, "Water—first.").unwrap();

        let doc = read_document(&path).unwrap();
        assert_eq!(doc.text, "Water—first.");
        assert_eq!(doc.id, path.display().to_string());
    }

    #[test]
    fn test_read_document_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_document(&dir.path().join("absent.md")),
            Err(EngineError::Input { .. })
        ));

        let path = dir.path().join("latin1.md");
        std::fs::write(&path, [b'c', b'a', b'f', 0xe9]).unwrap();
        assert!(matches!(
            read_document(&path),
            Err(EngineError::Input { .. })
        ));
    }

    #[test]
    fn test_backup_is_a_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ch1.md");
        std::fs::write(&path, "original").unwrap();

        let backup = create_backup(&path).unwrap();
        assert_ne!(backup, path);
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("ch1.md."));
        assert!(backup.extension().is_some_and(|e| e == "bak"));
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "original");
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, "new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        // no temp files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.md");
        assert!(matches!(
            write_atomic(&path, "x"),
            Err(EngineError::Write { .. })
        ));
    }
}
