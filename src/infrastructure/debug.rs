use crate::domain::ports::DebugDataCollector;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Serves a debug archive that was already written to disk by the host.
#[derive(Debug, Clone)]
pub struct FileDebugDataCollector {
    path: PathBuf,
}

impl FileDebugDataCollector {
    /// Creates a collector serving the archive at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DebugDataCollector for FileDebugDataCollector {
    fn debug_data_file_path(&self) -> Result<PathBuf> {
        // Surfaces a missing archive as an IO error instead of an empty download.
        std::fs::metadata(&self.path)?;
        Ok(self.path.clone())
    }
}
