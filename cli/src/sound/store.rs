use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config;

#[derive(Debug, Error)]
pub enum SoundStoreError {
    #[error("could not create the sound directory")]
    CannotCreateDirectory(#[source] io::Error),
    #[error("could not clear the previous sound")]
    CannotClearDirectory(#[source] io::Error),
    #[error("could not save the sound file")]
    CannotSaveFile(#[source] io::Error),
}

/// Single-slot store for the custom alert sound.
///
/// The slot is a directory holding at most one file, kept under the
/// source's original file name.
pub struct SoundStore {
    dir: PathBuf,
}

impl SoundStore {
    pub fn new() -> Self {
        Self::at(config::sound_dir())
    }

    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Replaces the stored sound with the file at `source`.
    ///
    /// The previous occupant is cleared before the copy, so a failed copy
    /// leaves the slot empty rather than holding a stale sound.
    pub fn save(&self, source: &Path) -> Result<PathBuf, SoundStoreError> {
        self.prepare_dir()?;

        let name = source.file_name().ok_or_else(|| {
            SoundStoreError::CannotSaveFile(io::Error::new(
                io::ErrorKind::InvalidInput,
                "source has no file name",
            ))
        })?;
        let target = self.dir.join(name);
        fs::copy(source, &target).map_err(SoundStoreError::CannotSaveFile)?;
        debug!(target = %target.display(), "sound saved");
        Ok(target)
    }

    /// Drops the stored sound. A missing slot is not an error.
    pub fn reset(&self) {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(dir = %self.dir.display(), "sound slot cleared"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => debug!(error = %e, "sound slot reset skipped"),
        }
    }

    /// Path of the stored sound, if one is present.
    ///
    /// Last entry returned by the directory listing, not guaranteed stable
    /// across filesystems; by invariant the slot holds at most one file.
    pub fn stored_path(&self) -> Option<PathBuf> {
        fs::read_dir(&self.dir)
            .ok()?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .last()
    }

    fn prepare_dir(&self) -> Result<(), SoundStoreError> {
        if self.dir.exists() {
            self.clear_dir()
                .map_err(SoundStoreError::CannotClearDirectory)
        } else {
            fs::create_dir_all(&self.dir).map_err(SoundStoreError::CannotCreateDirectory)
        }
    }

    fn clear_dir(&self) -> io::Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            fs::remove_file(entry?.path())?;
        }
        Ok(())
    }
}

impl Default for SoundStore {
    fn default() -> Self {
        Self::new()
    }
}
