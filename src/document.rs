//! Loading and writing the target file.
//!
//! A [`Document`] holds the whole file in memory as LF-normalized UTF-8 text.
//! Writes go through tempfile + fsync + rename so a crash mid-write leaves the
//! original file intact.

use crate::error::PatchError;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Line-ending style detected on load and restored on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    /// A file counts as CRLF only when every line break is `\r\n`.
    ///
    /// Mixed files stay in LF mode so lone `\n` breaks survive the write.
    pub fn detect(text: &str) -> Self {
        let breaks = text.matches('\n').count();
        if breaks > 0 && text.matches("\r\n").count() == breaks {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }
}

/// Full text of the target file for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    text: String,
    line_ending: LineEnding,
}

impl Document {
    /// Build a document from text that did not come from disk.
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_ending = LineEnding::detect(&text);
        let text = match line_ending {
            LineEnding::CrLf => text.replace("\r\n", "\n"),
            LineEnding::Lf => text,
        };
        Self {
            path: path.into(),
            text,
            line_ending,
        }
    }

    /// Read `path` as UTF-8.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PatchError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => PatchError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => PatchError::FileReadError {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let text = String::from_utf8(bytes).map_err(|source| PatchError::DecodeError {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), bytes = text.len(), "document loaded");
        Ok(Self::from_text(path, text))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// LF-normalized text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Swap in transformed text. Line-ending style is kept from the load.
    pub fn replace_text(&mut self, text: String) {
        self.text = text;
    }

    /// Text as it will land on disk.
    pub fn rendered(&self) -> String {
        match self.line_ending {
            LineEnding::Lf => self.text.clone(),
            LineEnding::CrLf => self.text.replace('\n', "\r\n"),
        }
    }

    /// Overwrite the source path with the current text.
    pub fn write(&self) -> Result<(), PatchError> {
        atomic_write(&self.path, self.rendered().as_bytes()).map_err(|source| {
            PatchError::FileWriteError {
                path: self.path.clone(),
                source,
            }
        })?;
        tracing::info!(path = %self.path.display(), "document written");
        Ok(())
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The tempfile lives in the target's directory so the rename never crosses
/// filesystems. Permissions of an existing target are carried over.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
