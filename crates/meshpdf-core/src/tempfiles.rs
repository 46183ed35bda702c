//! Temporary PDF files owned by the session
//!
//! Merged documents and print copies live in the system temp directory until
//! the next open/combine or until the session ends.

use crate::error::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

#[derive(Debug, Default)]
pub struct TempFiles {
    paths: Vec<TempPath>,
}

impl TempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `bytes` to a new `<prefix>*.pdf` file and track it.
    pub fn create(&mut self, prefix: &str, bytes: &[u8]) -> Result<PathBuf> {
        let mut temp_file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".pdf")
            .tempfile()?;
        temp_file.write_all(bytes)?;
        temp_file.flush()?;

        let path = temp_file.into_temp_path();
        let owned = path.to_path_buf();
        tracing::debug!("Created temp file: {}", owned.display());
        self.paths.push(path);
        Ok(owned)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| &**p == path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove every tracked file. Failures are logged and otherwise ignored.
    pub fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            let shown = path.to_path_buf();
            match path.close() {
                Ok(()) => tracing::debug!("Cleaned up temp file: {}", shown.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Could not delete temp file {}: {}", shown.display(), e)
                }
            }
        }
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        self.cleanup();
    }
}
