/*!
Optional compression of whole bean documents.

Documents are compressed after the header has been written, so the envelope a
format produces is unaware of it. Readers can sniff the gzip magic bytes with
[`is_gzip`] to pick an adapter without being told.
*/

use crate::{PersistError, Result};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{Read, Write};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Byte-level envelope applied to a finished document.
pub trait CompressionAdapter {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>>;

    /// Short name recorded in logs.
    fn algorithm_name(&self) -> &str;
}

/// Gzip (DEFLATE) envelope.
///
/// ```rust
/// use refgraph_core::{CompressionAdapter, GzipCompressor};
///
/// let gzip = GzipCompressor::with_level(9);
/// let packed = gzip.compress(br#"{"header":{},"body":{}}"#)?;
/// assert_eq!(gzip.decompress(&packed)?, br#"{"header":{},"body":{}}"#);
/// # Ok::<(), refgraph_core::PersistError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GzipCompressor {
    level: Compression,
}

impl GzipCompressor {
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
        }
    }

    /// Level 0 (store only) to 9 (smallest output); larger values are clamped.
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }

    pub fn level(&self) -> u32 {
        self.level.level()
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionAdapter for GzipCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 4), self.level);
        encoder
            .write_all(data)
            .map_err(|e| PersistError::compression(format!("failed to deflate document: {e}")))?;
        encoder
            .finish()
            .map_err(|e| PersistError::compression(format!("failed to finish gzip stream: {e}")))
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(compressed_data);
        let mut document = Vec::new();
        decoder
            .read_to_end(&mut document)
            .map_err(|e| PersistError::compression(format!("failed to inflate document: {e}")))?;
        Ok(document)
    }

    fn algorithm_name(&self) -> &str {
        "gzip"
    }
}

/// Pass-through envelope for plain documents.
#[derive(Debug, Clone, Default)]
pub struct NoCompression;

impl CompressionAdapter for NoCompression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        Ok(compressed_data.to_vec())
    }

    fn algorithm_name(&self) -> &str {
        "none"
    }
}

/// True if `data` starts with the gzip magic bytes.
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Adapter matching `data`: gzip when the magic bytes are present.
pub fn detect(data: &[u8]) -> Box<dyn CompressionAdapter> {
    if is_gzip(data) {
        Box::new(GzipCompressor::new())
    } else {
        Box::new(NoCompression)
    }
}
