//! The persistence collaborator seam.
//!
//! The core does not own a storage format; it exposes the [`ModelStore`]
//! trait and ships one straightforward backend, a directory of JSON
//! documents, which is enough for local sessions and for tests of anything
//! that needs a store.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::model::Model;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("model '{name}' not found")]
    NotFound { name: String },

    #[error("model name '{name}' is not storable")]
    InvalidName { name: String },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Load/save models by name.
pub trait ModelStore {
    fn load(&self, name: &str) -> Result<Model, StoreError>;
    fn save(&self, model: &Model) -> Result<(), StoreError>;
    fn list(&self) -> Result<Vec<String>, StoreError>;
    fn delete(&self, name: &str) -> Result<(), StoreError>;
}

/// One pretty-printed JSON document per model under a base directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> JsonFileStore {
        JsonFileStore { root: root.into() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        // Model names become file names; reject anything that would
        // escape the store directory.
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StoreError::InvalidName { name: name.to_string() });
        }
        Ok(self.root.join(format!("{name}.json")))
    }
}

impl ModelStore for JsonFileStore {
    fn load(&self, name: &str) -> Result<Model, StoreError> {
        let path = self.path_for(name)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { name: name.to_string() })
            }
            Err(error) => return Err(error.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, model: &Model) -> Result<(), StoreError> {
        let path = self.path_for(&model.name)?;
        fs::create_dir_all(&self.root)?;
        let contents = serde_json::to_string_pretty(model)?;
        fs::write(&path, contents)?;
        debug!(model = %model.name, path = %path.display(), "model saved");
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound { name: name.to_string() })
            }
            Err(error) => Err(error.into()),
        }
    }
}
