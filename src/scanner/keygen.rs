//! Content key generation.
//!
//! # Overview
//!
//! A content key is a string that identifies file content well enough for
//! duplicate grouping. The search engine only depends on the
//! [`KeyGenerator`] trait; any closure `Fn(&Path) -> Result<String, KeyError>`
//! is a generator too.
//!
//! Built-in strategies, all BLAKE3-based:
//!
//! | Strategy | Reads | Accuracy |
//! |----------|-------|----------|
//! | [`PartialHashKey`] | size + first and last [`PREHASH_SIZE`] bytes | high, fast |
//! | [`FullHashKey`] | whole file | exact up to hash collisions |
//! | [`SizeKey`] | metadata only | coarse |

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::KeyError;

/// Bytes read from each end of a file by [`PartialHashKey`].
pub const PREHASH_SIZE: usize = 4096;

/// Produces a content key for a file.
///
/// Implementations must be deterministic for identical content and return
/// a non-empty key on success. They may perform arbitrary I/O.
///
/// # Example
///
/// ```
/// use dupescout::scanner::{KeyError, KeyGenerator};
/// use std::path::Path;
///
/// // Group files by name, ignoring content
/// let by_name = |path: &Path| -> Result<String, KeyError> {
///     path.file_name()
///         .map(|n| n.to_string_lossy().into_owned())
///         .ok_or_else(|| KeyError::failed(path, "no file name"))
/// };
///
/// assert_eq!(by_name.generate(Path::new("/a/b.txt")).unwrap(), "b.txt");
/// ```
pub trait KeyGenerator: Send + Sync {
    /// Generate the key for the file at `path`.
    fn generate(&self, path: &Path) -> Result<String, KeyError>;
}

impl<F> KeyGenerator for F
where
    F: Fn(&Path) -> Result<String, KeyError> + Send + Sync,
{
    fn generate(&self, path: &Path) -> Result<String, KeyError> {
        self(path)
    }
}

/// BLAKE3 over the file size and its first and last [`PREHASH_SIZE`] bytes.
///
/// Files of up to twice the chunk size are hashed in full.
#[derive(Debug, Clone, Copy)]
pub struct PartialHashKey {
    chunk_size: usize,
}

impl PartialHashKey {
    /// Create a partial hasher with the default chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: PREHASH_SIZE,
        }
    }

    /// Use a custom chunk size (minimum 1 byte).
    #[must_use]
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    fn hash(&self, path: &Path) -> std::io::Result<blake3::Hash> {
        let mut file = File::open(path)?;
        let size = file.metadata()?.len();

        let mut hasher = blake3::Hasher::new();
        hasher.update(&size.to_le_bytes());

        let chunk = self.chunk_size as u64;
        if size <= chunk * 2 {
            hasher.update_reader(&mut file)?;
            return Ok(hasher.finalize());
        }

        let mut buffer = vec![0u8; self.chunk_size];
        file.read_exact(&mut buffer)?;
        hasher.update(&buffer);

        file.seek(SeekFrom::End(-(chunk as i64)))?;
        file.read_exact(&mut buffer)?;
        hasher.update(&buffer);

        Ok(hasher.finalize())
    }
}

impl Default for PartialHashKey {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyGenerator for PartialHashKey {
    fn generate(&self, path: &Path) -> Result<String, KeyError> {
        let hash = self.hash(path).map_err(|e| KeyError::from_io(path, e))?;
        log::trace!("Partial key computed: {}", path.display());
        Ok(hash.to_hex().to_string())
    }
}

/// BLAKE3 over the entire file content.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullHashKey;

impl KeyGenerator for FullHashKey {
    fn generate(&self, path: &Path) -> Result<String, KeyError> {
        let mut file = File::open(path).map_err(|e| KeyError::from_io(path, e))?;
        let mut hasher = blake3::Hasher::new();
        hasher
            .update_reader(&mut file)
            .map_err(|e| KeyError::from_io(path, e))?;
        log::trace!("Full key computed: {}", path.display());
        Ok(hasher.finalize().to_hex().to_string())
    }
}

/// The file length in bytes, as a decimal string.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeKey;

impl KeyGenerator for SizeKey {
    fn generate(&self, path: &Path) -> Result<String, KeyError> {
        let metadata = std::fs::metadata(path).map_err(|e| KeyError::from_io(path, e))?;
        Ok(metadata.len().to_string())
    }
}

/// Selectable built-in key strategy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// Size plus the first and last 4 KiB
    #[default]
    Partial,
    /// Whole-file hash
    Full,
    /// File size only
    Size,
}

impl KeyStrategy {
    /// Instantiate the generator for this strategy.
    #[must_use]
    pub fn generator(self) -> Arc<dyn KeyGenerator> {
        match self {
            Self::Partial => Arc::new(PartialHashKey::new()),
            Self::Full => Arc::new(FullHashKey),
            Self::Size => Arc::new(SizeKey),
        }
    }
}

impl std::fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyStrategy::Partial => write!(f, "partial"),
            KeyStrategy::Full => write!(f, "full"),
            KeyStrategy::Size => write!(f, "size"),
        }
    }
}
