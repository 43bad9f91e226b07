//! Recording persistence.
//!
//! The logical schema is the serde form of [`Recording`]; [`JsonStorage`]
//! writes it as a pretty-printed JSON document.

use std::path::{Path, PathBuf};

use crate::recording::Recording;

/// File extension appended when a save path has none.
pub const DEFAULT_EXTENSION: &str = "mkmacro";

/// Backend that persists recordings.
pub trait RecordingStorage: Send + Sync {
    /// Save a recording, returning the path actually written.
    fn save(&self, recording: &Recording, path: &Path) -> Result<PathBuf, StorageError>;

    /// Load a recording from disk.
    fn load(&self, path: &Path) -> Result<Recording, StorageError>;
}

/// Stores recordings as JSON documents.
#[derive(Debug, Clone, Default)]
pub struct JsonStorage;

impl JsonStorage {
    pub fn new() -> Self {
        Self
    }
}

impl RecordingStorage for JsonStorage {
    fn save(&self, recording: &Recording, path: &Path) -> Result<PathBuf, StorageError> {
        let path = with_default_extension(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut finalized = recording.clone();
        finalized.finalize();

        let json = serde_json::to_string_pretty(&finalized).map_err(|e| StorageError::Parse {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(&path, json).map_err(|e| StorageError::Io {
            path: path.clone(),
            source: e,
        })?;

        Ok(path)
    }

    fn load(&self, path: &Path) -> Result<Recording, StorageError> {
        let path = if !path.exists() && path.extension().is_none() {
            path.with_extension(DEFAULT_EXTENSION)
        } else {
            path.to_path_buf()
        };

        let json = std::fs::read_to_string(&path).map_err(|e| StorageError::Io {
            path: path.clone(),
            source: e,
        })?;
        let recording: Recording =
            serde_json::from_str(&json).map_err(|e| StorageError::Parse {
                path: path.clone(),
                source: e,
            })?;

        let problems = recording.validate();
        if !problems.is_empty() {
            return Err(StorageError::Invalid {
                message: problems.join("; "),
            });
        }

        Ok(recording)
    }
}

fn with_default_extension(path: &Path) -> PathBuf {
    if path.extension().is_none() {
        path.with_extension(DEFAULT_EXTENSION)
    } else {
        path.to_path_buf()
    }
}

/// Errors that can occur when reading or writing recordings.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid recording: {message}")]
    Invalid { message: String },
}
