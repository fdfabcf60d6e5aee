//! Generation-boundary checkpoints.
//!
//! A checkpoint is the JSON-serialized [`RunState`] tagged with a format
//! version. Writes go to a sibling temporary file that is renamed into place,
//! so an interrupted write never leaves a truncated checkpoint behind.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AbcError, Result};
use crate::metaheuristics::abc::RunState;

/// Current checkpoint layout version.
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// Versioned run state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub format_version: u32,
    pub state: RunState,
}

#[derive(Serialize)]
struct CheckpointRef<'a> {
    format_version: u32,
    state: &'a RunState,
}

impl Checkpoint {
    #[must_use]
    pub fn new(state: RunState) -> Self {
        Self {
            format_version: CHECKPOINT_FORMAT_VERSION,
            state,
        }
    }

    /// Write this checkpoint to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        Self::save_state(&self.state, path)
    }

    /// Write `state` to `path` without taking ownership of it.
    pub fn save_state(state: &RunState, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp = temp_path(path);
        {
            let file = fs::File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(
                &mut writer,
                &CheckpointRef {
                    format_version: CHECKPOINT_FORMAT_VERSION,
                    state,
                },
            )?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read and version-check a checkpoint.
    ///
    /// # Errors
    ///
    /// [`AbcError::InvalidCheckpoint`] for an unsupported format version,
    /// I/O and JSON errors otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let checkpoint: Self = serde_json::from_str(&content)?;
        if checkpoint.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(AbcError::InvalidCheckpoint {
                message: format!(
                    "format version {} is not supported (expected {})",
                    checkpoint.format_version, CHECKPOINT_FORMAT_VERSION
                ),
            });
        }
        Ok(checkpoint)
    }

    #[must_use]
    pub fn into_state(self) -> RunState {
        self.state
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
