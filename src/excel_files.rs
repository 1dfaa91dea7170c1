//! Directory of automation query spreadsheets managed through the API.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const MAX_FILE_NAME_LEN: usize = 255;

static SAFE_FILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_\-.\s]+$").expect("valid file name regex"));

#[derive(Debug, Error)]
pub enum ExcelFileError {
    #[error("Invalid filename: {0}")]
    InvalidName(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Plain `.xlsx` file name without any path component or leading dot.
pub fn check_file_name(name: &str) -> Result<&str, ExcelFileError> {
    let invalid = || {
        warn!("Rejected spreadsheet file name: {:?}", name);
        ExcelFileError::InvalidName(name.to_string())
    };

    if name.is_empty() || name.len() > MAX_FILE_NAME_LEN || name.starts_with('.') {
        return Err(invalid());
    }
    // Separators are outside the allowed set, so the name cannot leave the directory
    if !SAFE_FILE_NAME.is_match(name) {
        return Err(invalid());
    }
    let is_xlsx = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if !is_xlsx {
        return Err(invalid());
    }
    Ok(name)
}

#[derive(Debug, Clone)]
pub struct ExcelFileStore {
    dir: PathBuf,
}

impl ExcelFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, ExcelFileError> {
        Ok(self.dir.join(check_file_name(name)?))
    }

    /// Names of the `.xlsx` files in the directory, sorted
    pub async fn list(&self) -> Result<Vec<String>, ExcelFileError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".xlsx") {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>, ExcelFileError> {
        let path = self.path_for(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ExcelFileError::NotFound(name.to_string()))
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Store `bytes` under `name`, replacing any existing file.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), ExcelFileError> {
        let path = self.path_for(name)?;
        tokio::fs::write(&path, bytes).await?;
        info!("Saved spreadsheet {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_file_name() {
        for name in ["queries.xlsx", "Weekly Queries 2026-10.XLSX", "a_b-c.d.xlsx"] {
            assert!(check_file_name(name).is_ok(), "{}", name);
        }
        let too_long = format!("{}.xlsx", "a".repeat(MAX_FILE_NAME_LEN));
        for name in [
            "",
            ".hidden.xlsx",
            "../queries.xlsx",
            "nested/queries.xlsx",
            "nested\\queries.xlsx",
            "queries.csv",
            "queries",
            "quer;ies.xlsx",
            too_long.as_str(),
        ] {
            assert!(check_file_name(name).is_err(), "{}", name);
        }
    }

    #[tokio::test]
    async fn test_store_round_trip_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ExcelFileStore::new(dir.path());

        store.write("b.xlsx", b"second").await.unwrap();
        store.write("a.xlsx", b"first").await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        std::fs::create_dir(dir.path().join("folder.xlsx")).unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["a.xlsx", "b.xlsx"]);
        assert_eq!(store.read("a.xlsx").await.unwrap(), b"first");
        assert!(matches!(store.read("missing.xlsx").await, Err(ExcelFileError::NotFound(_))));
        assert!(matches!(store.write("../escape.xlsx", b"x").await, Err(ExcelFileError::InvalidName(_))));
    }
}
