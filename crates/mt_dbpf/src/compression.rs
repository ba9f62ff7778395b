use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::Error;

pub const UNCOMPRESSED: u16 = 0x0000;
pub const STREAMABLE: u16 = 0xFFFE;
pub const INTERNAL: u16 = 0xFFFF;
pub const DELETED: u16 = 0xFFE0;
pub const ZLIB: u16 = 0x5A42;

/// Inflates a zlib-compressed resource payload, per the `compressionType`
/// recorded in its index entry.
pub fn decompress(compression_type: u16, compressed: &[u8], decompressed_size: u32) -> Result<Vec<u8>, Error> {
    match compression_type {
        DELETED => Ok(Vec::new()),
        ZLIB => {
            let mut out = Vec::with_capacity(decompressed_size as usize);
            ZlibDecoder::new(compressed).read_to_end(&mut out)?;
            Ok(out)
        }
        UNCOMPRESSED | STREAMABLE | INTERNAL => Ok(compressed.to_vec()),
        other => Err(Error::UnsupportedCompression(other)),
    }
}

/// Deflates a resource payload for writing; this toolkit only ever *writes*
/// zlib-compressed entries, matching the save path's documented behaviour.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
