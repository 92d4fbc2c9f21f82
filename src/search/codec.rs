//! Binary serialization and compression of stored blobs
//!
//! Document tries, document text and whole-index snapshots all go through
//! the same two steps: a compact `bincode` encoding followed by a
//! general-purpose compressor. The compressor sits behind [`Compressor`] so
//! the at-rest format can change without touching the index structures.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::search::error::{SearchError, SearchResult};

/// General-purpose byte compressor
pub trait Compressor: Send + Sync + fmt::Debug {
    /// Compress a buffer
    fn compress(&self, data: &[u8]) -> SearchResult<Vec<u8>>;

    /// Reverse [`Compressor::compress`]
    fn decompress(&self, data: &[u8]) -> SearchResult<Vec<u8>>;
}

/// zlib compressor backed by `flate2`
#[derive(Debug, Clone, Copy)]
pub struct ZlibCompressor {
    level: Compression,
}

impl ZlibCompressor {
    /// Create a compressor at the given level (clamped to 0-9)
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for ZlibCompressor {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl Compressor for ZlibCompressor {
    fn compress(&self, data: &[u8]) -> SearchResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), self.level);
        encoder
            .write_all(data)
            .map_err(|e| SearchError::Codec(format!("Failed to compress: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| SearchError::Codec(format!("Failed to finish compression: {}", e)))
    }

    fn decompress(&self, data: &[u8]) -> SearchResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut out = Vec::with_capacity(data.len() * 4);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| SearchError::Codec(format!("Failed to decompress: {}", e)))?;
        Ok(out)
    }
}

/// Serialize-then-compress codec shared by every document of an index
#[derive(Debug, Clone)]
pub struct DocumentCodec {
    compressor: Arc<dyn Compressor>,
}

impl DocumentCodec {
    pub fn new(compressor: Arc<dyn Compressor>) -> Self {
        Self { compressor }
    }

    /// zlib codec at the given compression level
    pub fn zlib(level: u32) -> Self {
        Self::new(Arc::new(ZlibCompressor::new(level)))
    }

    /// Encode a value and compress the result
    pub fn pack<T: Serialize + ?Sized>(&self, value: &T) -> SearchResult<Vec<u8>> {
        let encoded = bincode::serialize(value)
            .map_err(|e| SearchError::Codec(format!("Failed to serialize: {}", e)))?;
        self.compressor.compress(&encoded)
    }

    /// Decompress a buffer and decode the value it holds
    pub fn unpack<T: DeserializeOwned>(&self, data: &[u8]) -> SearchResult<T> {
        let decoded = self.compressor.decompress(data)?;
        bincode::deserialize(&decoded)
            .map_err(|e| SearchError::Codec(format!("Failed to deserialize: {}", e)))
    }
}

impl Default for DocumentCodec {
    fn default() -> Self {
        Self::new(Arc::new(ZlibCompressor::default()))
    }
}
