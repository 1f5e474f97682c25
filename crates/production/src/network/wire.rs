//! LZ4 frame compression.
//!
//! Compressed bodies carry their decompressed length as a 4-byte
//! little-endian prefix. The prefix is checked against a limit before any
//! allocation so a hostile peer cannot make us reserve arbitrary memory.

use thiserror::Error;

/// Errors from decompressing a frame body.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("Compressed body too short")]
    Truncated,

    #[error("Declared size {declared} exceeds limit {limit}")]
    TooLarge { declared: usize, limit: usize },

    #[error("LZ4 error: {0}")]
    Lz4(#[from] lz4_flex::block::DecompressError),
}

/// Compress a serialized message body.
pub fn compress(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

/// Decompress a body produced by [`compress`], refusing anything that
/// claims to expand beyond `limit` bytes.
pub fn decompress(data: &[u8], limit: usize) -> Result<Vec<u8>, WireError> {
    let prefix: [u8; 4] = data
        .get(..4)
        .and_then(|p| p.try_into().ok())
        .ok_or(WireError::Truncated)?;
    let declared = u32::from_le_bytes(prefix) as usize;
    if declared > limit {
        return Err(WireError::TooLarge { declared, limit });
    }
    Ok(lz4_flex::decompress_size_prepended(data)?)
}
