//! Per-chapter state directory: lock file, stage checkpoints and the
//! discovery output cache.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use bf_core::{Error, Result};
use chrono::Utc;

const LOCK_FILE: &str = ".lock";
const CACHE_DIR: &str = "cache";
const PENDING_TERMS_FILE: &str = "pending_terms.tsv";

/// Stages that record completion on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    Discovery,
    Translation,
    Reading,
    GlobalReading,
}

impl Checkpoint {
    pub const ALL: [Checkpoint; 4] = [
        Checkpoint::Discovery,
        Checkpoint::Translation,
        Checkpoint::Reading,
        Checkpoint::GlobalReading,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Translation => "translation",
            Self::Reading => "reading",
            Self::GlobalReading => "global_reading",
        }
    }

    fn file_name(&self) -> String {
        format!(".stage_{}_complete", self.name())
    }
}

impl From<bf_core::Stage> for Checkpoint {
    fn from(stage: bf_core::Stage) -> Self {
        match stage {
            bf_core::Stage::Discovery => Self::Discovery,
            bf_core::Stage::Translation => Self::Translation,
            bf_core::Stage::Reading => Self::Reading,
        }
    }
}

/// Handle on `<volume>/.state/<chapter>/`.
#[derive(Debug, Clone)]
pub struct ChapterState {
    dir: PathBuf,
}

impl ChapterState {
    /// Open the state directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dir.join(CACHE_DIR)
    }

    pub fn pending_terms_path(&self) -> PathBuf {
        self.dir.join(PENDING_TERMS_FILE)
    }

    /// Take the chapter lock, writing our pid into it.
    ///
    /// An existing lock is an error unless `resume` is set, in which case
    /// the stale lock is taken over. The lock is removed when the returned
    /// guard drops.
    pub fn acquire_lock(&self, resume: bool) -> Result<LockGuard> {
        let path = self.lock_path();
        let pid = std::process::id().to_string();

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                let guard = write_owner(LockGuard { path }, file, &pid)?;
                tracing::debug!(path = %guard.path.display(), "Acquired chapter lock");
                Ok(guard)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let owner = std::fs::read_to_string(&path).unwrap_or_default();
                if !resume {
                    return Err(Error::Locked {
                        path,
                        owner: owner.trim().to_string(),
                    });
                }
                tracing::warn!(owner = %owner.trim(), "Taking over existing lock for resume");
                let guard = LockGuard { path };
                std::fs::write(&guard.path, &pid)?;
                tracing::debug!(path = %guard.path.display(), "Acquired chapter lock");
                Ok(guard)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_complete(&self, checkpoint: Checkpoint) -> bool {
        self.dir.join(checkpoint.file_name()).exists()
    }

    pub fn mark_complete(&self, checkpoint: Checkpoint) -> Result<()> {
        std::fs::write(
            self.dir.join(checkpoint.file_name()),
            Utc::now().to_rfc3339(),
        )?;
        tracing::info!(checkpoint = checkpoint.name(), "Stage checkpoint written");
        Ok(())
    }

    /// Remove all checkpoints, the discovery cache and the approval buffer.
    pub fn reset(&self) -> Result<()> {
        for checkpoint in Checkpoint::ALL {
            remove_if_exists(&self.dir.join(checkpoint.file_name()))?;
        }
        remove_if_exists(&self.pending_terms_path())?;
        match std::fs::remove_dir_all(self.cache_dir()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Store the raw discovery response for a chunk.
    pub fn write_discovery(&self, chunk_index: i64, raw: &str) -> Result<()> {
        let dir = self.cache_dir();
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(format!("chunk_{chunk_index}.json")), raw)?;
        Ok(())
    }

    /// All cached discovery responses, ordered by chunk index.
    pub fn read_discoveries(&self) -> Result<Vec<(i64, String)>> {
        let dir = self.cache_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let index = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("chunk_"))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<i64>().ok());
            if let Some(index) = index {
                out.push((index, std::fs::read_to_string(&path)?));
            }
        }
        out.sort_by_key(|(index, _)| *index);
        Ok(out)
    }
}

/// Record the owning pid. On failure the guard drops and the lock goes with it.
fn write_owner(guard: LockGuard, mut out: impl Write, pid: &str) -> Result<LockGuard> {
    out.write_all(pid.as_bytes())?;
    Ok(guard)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Removes the chapter lock on drop.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), "Failed to remove lock file: {e}");
        } else {
            tracing::debug!(path = %self.path.display(), "Released chapter lock");
        }
    }
}
