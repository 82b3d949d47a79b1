//! Training example files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::trainer::TrainError;

/// One labelled position: board encoding in, one-hot best move out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub input: Vec<f64>,
    pub target: Vec<f64>,
}

impl TrainingExample {
    pub fn new(input: Vec<f64>, target: Vec<f64>) -> Self {
        Self { input, target }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn load(path: &Path) -> Result<Self, TrainError> {
        let data = fs::read(path).map_err(|source| TrainError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| TrainError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), TrainError> {
        let data = self.to_json().map_err(|source| TrainError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, data).map_err(|source| TrainError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check that the vectors fit a network with the given input and output sizes.
    pub fn check_shape(
        &self,
        path: &Path,
        inputs: usize,
        outputs: usize,
    ) -> Result<(), TrainError> {
        if self.input.len() != inputs || self.target.len() != outputs {
            return Err(TrainError::InvalidExample {
                path: path.to_path_buf(),
                reason: format!(
                    "expected {} inputs and {} targets, got {} and {}",
                    inputs,
                    outputs,
                    self.input.len(),
                    self.target.len()
                ),
            });
        }
        Ok(())
    }
}

/// Regular files directly inside `dir`, sorted by name.
pub fn list_example_files(dir: &Path) -> Result<Vec<PathBuf>, TrainError> {
    let io_err = |source| TrainError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
