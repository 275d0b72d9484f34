//! Durable per-replica cursors.
//!
//! The cursor is the dispatcher's only mutable state; it must survive
//! crashes and never move backwards. The filesystem implementation keeps
//! one small TOML file per replica, replaced atomically.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{Cursor, Timestamp};
use crate::error::Transience;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("cursor read failed for {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cursor write failed for {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
    #[error("cursor file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl CursorError {
    pub fn transience(&self) -> Transience {
        match self {
            CursorError::Read { .. } | CursorError::Write { .. } => Transience::Retryable,
            CursorError::Corrupt { .. } => Transience::Permanent,
        }
    }
}

/// Durable storage for per-replica cursors, keyed by replica name.
pub trait CursorStore: Send + Sync {
    /// Last confirmed cursor for `replica`; `Cursor::ZERO` if it has
    /// never synced.
    fn load(&self, replica: &str) -> Result<Cursor, CursorError>;

    /// Record `cursor` durably; must be visible to `load` across
    /// process restarts before this returns.
    fn store(&self, replica: &str, cursor: Cursor) -> Result<(), CursorError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CursorFile {
    last_synced: u64,
}

/// One TOML file per replica under `dir`. Replica names are validated
/// by the registry to be filename-safe.
pub struct FsCursorStore {
    dir: PathBuf,
}

impl FsCursorStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, replica: &str) -> PathBuf {
        self.dir.join(format!("{replica}.cursor.toml"))
    }
}

impl CursorStore for FsCursorStore {
    fn load(&self, replica: &str) -> Result<Cursor, CursorError> {
        let path = self.path_for(replica);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Cursor::ZERO);
            }
            Err(source) => return Err(CursorError::Read { path, source }),
        };
        let file: CursorFile =
            toml::from_str(&contents).map_err(|source| CursorError::Corrupt { path, source })?;
        Ok(Cursor::at(Timestamp::new(file.last_synced)))
    }

    fn store(&self, replica: &str, cursor: Cursor) -> Result<(), CursorError> {
        let path = self.path_for(replica);
        fs::create_dir_all(&self.dir).map_err(|err| CursorError::Write {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        let file = CursorFile {
            last_synced: cursor.timestamp().get(),
        };
        let contents = toml::to_string(&file).map_err(|err| CursorError::Write {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        atomic_write(&path, contents.as_bytes())
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), CursorError> {
    let dir = path.parent().ok_or_else(|| CursorError::Write {
        path: path.to_path_buf(),
        reason: "cursor path missing parent directory".to_string(),
    })?;
    let temp = tempfile::NamedTempFile::new_in(dir).map_err(|err| CursorError::Write {
        path: path.to_path_buf(),
        reason: format!("failed to create temp file: {err}"),
    })?;
    fs::write(temp.path(), data).map_err(|err| CursorError::Write {
        path: path.to_path_buf(),
        reason: format!("failed to write temp file: {err}"),
    })?;
    temp.persist(path).map_err(|err| CursorError::Write {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    Ok(())
}
