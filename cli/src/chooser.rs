use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChooserError {
    #[error("could not read selection: {0}")]
    Io(#[from] io::Error),
}

/// Source of the user's pick for a custom alert sound.
///
/// `Ok(None)` means the selection was dismissed, which is not an error.
pub trait SoundChooser {
    fn choose(&mut self) -> Result<Option<PathBuf>, ChooserError>;
}

/// Asks for a path on the terminal.
pub struct PromptChooser;

impl SoundChooser for PromptChooser {
    fn choose(&mut self) -> Result<Option<PathBuf>, ChooserError> {
        print!("Path to a sound file (empty to cancel): ");
        io::stdout().flush()?;

        let mut line = String::new();
        let bytes = io::stdin().read_line(&mut line)?;
        if bytes == 0 {
            return Ok(None);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        Ok(Some(expand_home(trimmed)))
    }
}

/// Hands out a fixed path once, for paths given on the command line.
pub struct PresetChooser {
    path: Option<PathBuf>,
}

impl PresetChooser {
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }
}

impl SoundChooser for PresetChooser {
    fn choose(&mut self) -> Result<Option<PathBuf>, ChooserError> {
        Ok(self.path.take())
    }
}

pub(crate) fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
