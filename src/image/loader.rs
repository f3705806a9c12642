//! Image loading.

use crate::cpu::{Cpu, MemoryError};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Image file run when no path is given.
pub const DEFAULT_IMAGE: &str = "out.obj";

/// Decode raw image bytes into words (big-endian).
///
/// A trailing odd byte cannot form a word and is dropped.
pub fn parse_image(bytes: &[u8]) -> Vec<u16> {
    let chunks = bytes.chunks_exact(2);
    if !chunks.remainder().is_empty() {
        warn!(len = bytes.len(), "image has an odd number of bytes; trailing byte ignored");
    }
    chunks.map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect()
}

/// Read an image file from disk.
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<Vec<u16>, ImageError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ImageError::NotFound { path: path.to_path_buf() },
        _ => ImageError::Io { path: path.to_path_buf(), source },
    })?;
    Ok(parse_image(&bytes))
}

/// Read an image file and copy it into the CPU's memory.
///
/// Returns the number of words loaded.
pub fn load_image<P: AsRef<Path>>(cpu: &mut Cpu, path: P) -> Result<usize, ImageError> {
    let words = read_image(path.as_ref())?;
    cpu.load_program(&words)?;
    debug!(path = %path.as_ref().display(), words = words.len(), "image loaded");
    Ok(words.len())
}

/// Errors that can occur while loading an image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("{}: file not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Memory(#[from] MemoryError),
}
