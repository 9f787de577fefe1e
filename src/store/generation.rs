//! On-disk generations of a knowledge base.
//!
//! Every persist writes a complete `gen-<uuid>` directory and then swaps the
//! `CURRENT` pointer file with a single rename, so readers only ever resolve
//! a fully written vectors/chunks pair. An advisory lock on `.lock` keeps
//! writers exclusive and lets readers share.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{KnowledgeError, Result};

const CURRENT_FILE: &str = "CURRENT";
const LOCK_FILE: &str = ".lock";
const GENERATION_PREFIX: &str = "gen-";

/// Summary of a persisted knowledge base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBaseInfo {
    pub path: PathBuf,
    pub generation: String,
    pub chunk_count: usize,
    pub dimension: usize,
}

/// Advisory lock over a knowledge base directory, released on drop
pub(super) struct KnowledgeBaseLock {
    file: File,
}

impl KnowledgeBaseLock {
    pub(super) fn exclusive(dir: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }

    /// Shared lock for readers; `None` when no writer has ever locked `dir`
    pub(super) fn shared(dir: &Path) -> io::Result<Option<Self>> {
        let file = match File::open(dir.join(LOCK_FILE)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        file.lock_shared()?;
        Ok(Some(Self { file }))
    }
}

impl Drop for KnowledgeBaseLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release knowledge base lock: {}", e);
        }
    }
}

pub(super) fn new_generation_name() -> String {
    format!("{}{}", GENERATION_PREFIX, Uuid::new_v4().simple())
}

pub(super) fn has_current(dir: &Path) -> bool {
    dir.join(CURRENT_FILE).is_file()
}

/// Name of the generation `CURRENT` points at
pub(super) fn read_current(dir: &Path) -> Result<String> {
    let content = match fs::read_to_string(dir.join(CURRENT_FILE)) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(KnowledgeError::KnowledgeBaseNotFound(dir.to_path_buf()));
        }
        Err(e) => {
            return Err(KnowledgeError::CorruptIndex(format!(
                "unreadable generation pointer: {}",
                e
            )));
        }
    };

    let generation = content.trim();
    if !is_generation_name(generation) {
        return Err(KnowledgeError::CorruptIndex(format!(
            "invalid generation pointer {:?}",
            generation
        )));
    }
    Ok(generation.to_string())
}

/// Atomically point `CURRENT` at `generation`
pub(super) fn publish(dir: &Path, generation: &str) -> Result<()> {
    let mut pointer = NamedTempFile::new_in(dir)?;
    pointer.write_all(generation.as_bytes())?;
    pointer.as_file().sync_all()?;
    pointer
        .persist(dir.join(CURRENT_FILE))
        .map_err(|e| KnowledgeError::Io(e.error))?;
    sync_dir(dir)?;
    debug!("Published generation {} in {}", generation, dir.display());
    Ok(())
}

/// Flush the directory entries of `dir` so renames and new files inside it
/// survive a crash
#[cfg(unix)]
pub(super) fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub(super) fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Best-effort removal of every generation directory except `keep`
pub(super) fn remove_stale(dir: &Path, keep: &str) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not list {} for cleanup: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name == keep || !is_generation_name(name) {
            continue;
        }
        match fs::remove_dir_all(entry.path()) {
            Ok(()) => debug!("Removed stale generation {}", name),
            Err(e) => warn!("Failed to remove stale generation {}: {}", name, e),
        }
    }
}

fn is_generation_name(name: &str) -> bool {
    name.strip_prefix(GENERATION_PREFIX)
        .is_some_and(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit()))
}
