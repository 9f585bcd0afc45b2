//! Session storage adapters
//!
//! - `FileSessionStorage` keeps the identity in `session.json` so a login
//!   survives separate CLI invocations
//! - `MemorySessionStorage` keeps it for the life of the process

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use fs2::FileExt;

use crate::domain::result::Result;
use crate::domain::Identity;
use crate::ports::SessionStorage;

const SESSION_FILE: &str = "session.json";

/// Session storage backed by a JSON file in the data directory
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn put(&self, identity: &Identity) -> Result<()> {
        let content = serde_json::to_vec_pretty(identity)?;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?;

        // Truncate only once we hold the lock
        file.lock_exclusive()?;
        file.set_len(0)?;
        file.write_all(&content)?;
        file.sync_all()?;
        file.unlock()?;
        Ok(())
    }

    fn get(&self) -> Result<Option<Identity>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process session storage
#[derive(Default)]
pub struct MemorySessionStorage {
    identity: Mutex<Option<Identity>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn put(&self, identity: &Identity) -> Result<()> {
        *self.identity.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity.clone());
        Ok(())
    }

    fn get(&self) -> Result<Option<Identity>> {
        Ok(self
            .identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn clear(&self) -> Result<()> {
        *self.identity.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
