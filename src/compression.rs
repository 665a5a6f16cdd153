//! Frame body compression.
//!
//! The wire format only cares about two algorithm names, `"lz4"` and
//! `"snappy"`, negotiated during STARTUP. Real codecs back both, feature
//! gated, rather than a stub — `lz4_flex` and `snap` are the crates the
//! pack's other drivers reach for.
use std::fmt;

/// A negotiated compression algorithm for frame bodies.
pub trait Compressor: Send + Sync + fmt::Debug {
    /// The `COMPRESSION` STARTUP option value, e.g. `"lz4"`.
    fn name(&self) -> &'static str;

    fn compress(&self, body: &[u8]) -> Vec<u8>;

    fn decompress(&self, body: &[u8]) -> Result<Vec<u8>, DecompressError>;
}

#[derive(Debug, thiserror::Error)]
#[error("frame decompression failed")]
pub struct DecompressError(#[source] pub(crate) crate::common::BoxError);

#[cfg(feature = "compression-lz4")]
#[derive(Debug, Default)]
pub struct Lz4Compressor;

#[cfg(feature = "compression-lz4")]
impl Compressor for Lz4Compressor {
    fn name(&self) -> &'static str {
        "lz4"
    }

    /// CQL's lz4 framing prefixes the block with a 4-byte big-endian
    /// uncompressed length, which `lz4_flex`'s raw block API doesn't add.
    fn compress(&self, body: &[u8]) -> Vec<u8> {
        let compressed = lz4_flex::block::compress(body);
        let mut out = Vec::with_capacity(4 + compressed.len());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&compressed);
        out
    }

    fn decompress(&self, body: &[u8]) -> Result<Vec<u8>, DecompressError> {
        if body.len() < 4 {
            return Err(DecompressError(Box::new(crate::common::general!(
                "lz4 frame shorter than its length prefix"
            ))));
        }
        let uncompressed_len = u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as usize;
        lz4_flex::block::decompress(&body[4..], uncompressed_len)
            .map_err(|e| DecompressError(Box::new(e)))
    }
}

#[cfg(feature = "compression-snappy")]
#[derive(Debug, Default)]
pub struct SnappyCompressor;

#[cfg(feature = "compression-snappy")]
impl Compressor for SnappyCompressor {
    fn name(&self) -> &'static str {
        "snappy"
    }

    fn compress(&self, body: &[u8]) -> Vec<u8> {
        snap::raw::Encoder::new().compress_vec(body).expect("snappy compression is infallible for in-memory buffers")
    }

    fn decompress(&self, body: &[u8]) -> Result<Vec<u8>, DecompressError> {
        snap::raw::Decoder::new().decompress_vec(body).map_err(|e| DecompressError(Box::new(e)))
    }
}

#[cfg(all(test, feature = "compression-lz4"))]
mod lz4_tests {
    use super::*;

    #[test]
    fn round_trips() {
        let c = Lz4Compressor;
        let body = b"the quick brown fox jumps over the lazy dog, repeated a few times to compress well, \
                     the quick brown fox jumps over the lazy dog";
        let compressed = c.compress(body);
        let decompressed = c.decompress(&compressed).unwrap();
        assert_eq!(decompressed, body);
    }
}
