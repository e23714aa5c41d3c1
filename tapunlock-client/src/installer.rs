//! Installing confirmed patterns
//!
//! The recording client hands a confirmed pattern to a [`PatternInstaller`].
//! [`FileInstaller`] stores it as JSON for the unlock side to pick up.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use tapunlock_protocol::TapPattern;
use tapunlock_utils::{Result, TapUnlockError};

/// Makes a confirmed pattern the active unlock pattern
pub trait PatternInstaller: Send {
    fn install(&mut self, pattern: &TapPattern) -> Result<()>;
}

/// Stores the pattern as a JSON file, replacing it atomically
#[derive(Debug, Clone)]
pub struct FileInstaller {
    path: PathBuf,
}

impl FileInstaller {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back the installed pattern, if any
    pub fn load(&self) -> Result<Option<TapPattern>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TapUnlockError::FileRead {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            TapUnlockError::InvalidMessage(format!(
                "{} holds no valid pattern: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write_err(&self, source: std::io::Error) -> TapUnlockError {
        TapUnlockError::FileWrite {
            path: self.path.clone(),
            source,
        }
    }
}

impl PatternInstaller for FileInstaller {
    fn install(&mut self, pattern: &TapPattern) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tapunlock_utils::paths::ensure_dir(parent).map_err(|e| self.write_err(e))?;
        }

        let data = serde_json::to_vec_pretty(pattern)
            .map_err(|e| TapUnlockError::internal(format!("Failed to encode pattern: {}", e)))?;

        // Readers never see a half written file
        let temp_path = self.path.with_extension("tmp");
        let file = File::create(&temp_path).map_err(|e| self.write_err(e))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&data).map_err(|e| self.write_err(e))?;
        writer
            .into_inner()
            .map_err(|e| self.write_err(e.into_error()))?
            .sync_all()
            .map_err(|e| self.write_err(e))?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(self.write_err(e));
        }

        debug!("Wrote pattern to {}", self.path.display());
        info!("Installed pattern with {} taps", pattern.size());
        Ok(())
    }
}
