use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rodio::Source;
use tracing::debug;

/// An alert sound held in memory: the raw file bytes plus the playable
/// duration probed from them.
#[derive(Debug, Clone)]
pub struct SoundAsset {
    path: PathBuf,
    bytes: Arc<[u8]>,
    duration: Option<Duration>,
}

impl SoundAsset {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let bytes: Arc<[u8]> = std::fs::read(path)?.into();
        let duration = probe_duration(&bytes);
        if duration.is_none() {
            debug!(path = %path.display(), "could not probe sound duration");
        }
        Ok(Self {
            path: path.to_path_buf(),
            bytes,
            duration,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    #[cfg(test)]
    pub(crate) fn with_duration(name: &str, duration: Option<Duration>) -> Self {
        Self {
            path: PathBuf::from(name),
            bytes: Vec::new().into(),
            duration,
        }
    }
}

fn probe_duration(bytes: &Arc<[u8]>) -> Option<Duration> {
    let cursor = Cursor::new(Arc::clone(bytes));
    let decoder = rodio::Decoder::new(cursor).ok()?;
    decoder.total_duration()
}
