//! Durable slot — the single persisted location of the serialized actor
//!
//! Local to the running process and synchronous. Absence is a value
//! (`Ok(None)`), not an error.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::config::IdentityConfig;
use crate::error::Result;

/// A named key holding one serialized value, or nothing
pub trait DurableSlot: Send + Sync {
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, value: &str) -> Result<()>;
    /// Removing an absent value succeeds
    fn delete(&self) -> Result<()>;
}

/// Slot stored as a file; writes go through a temp file and a rename
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `<slot_dir>/<slot_key>.json`
    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(config.slot_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DurableSlot for FileSlot {
    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "Session slot written");
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Slot held in memory; share one `Arc<MemorySlot>` across actors to
/// simulate a process restart
#[derive(Debug, Default)]
pub struct MemorySlot {
    value: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }

    pub fn peek(&self) -> Option<String> {
        self.value.lock().clone()
    }
}

impl DurableSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.value.lock().clone())
    }

    fn write(&self, value: &str) -> Result<()> {
        *self.value.lock() = Some(value.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        self.value.lock().take();
        Ok(())
    }
}
