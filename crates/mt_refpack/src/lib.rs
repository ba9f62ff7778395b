//! Decoder for the game's refpack-style LZ77 stream.
//!
//! This predates the zlib compression DBPF packages normally use today, but
//! some archives (and most old mods) still carry refpack-compressed
//! resources, so decode support stays in the toolkit. Only decoding is
//! implemented: the format is read-only here, matching upstream's own
//! scope (the compressor was a closed tool, never reverse-engineered well
//! enough to reproduce byte-for-byte).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("refpack stream truncated")]
    Truncated,
    #[error("refpack stream malformed: {0}")]
    MalformedStream(String),
}

type Result<T> = std::result::Result<T, Error>;

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn byte(&mut self) -> Result<u8> {
        let b = *self.bytes.get(self.pos).ok_or(Error::Truncated)?;
        self.pos += 1;
        Ok(b)
    }
}

/// Decompresses a full refpack stream, including its header.
///
/// The header's first byte determines its shape: if its high bit is set,
/// the decompressed size is a big-endian `u32` at offset 2 and packets
/// start at offset 6; otherwise the size is a big-endian 24-bit value at
/// offset 2 and packets start at offset 5.
pub fn decompress(source: &[u8]) -> Result<Vec<u8>> {
    if source.len() < 2 {
        return Err(Error::Truncated);
    }

    let (size, packet_start) = if source[0] & 0x80 != 0 {
        if source.len() < 6 {
            return Err(Error::Truncated);
        }
        let size = u32::from_be_bytes([source[2], source[3], source[4], source[5]]);
        (size as usize, 6)
    } else {
        if source.len() < 5 {
            return Err(Error::Truncated);
        }
        let size = u32::from_be_bytes([0, source[2], source[3], source[4]]);
        (size as usize, 5)
    };

    let mut out = vec![0u8; size];
    decode_packets(source, packet_start, &mut out)?;
    Ok(out)
}

fn decode_packets(source: &[u8], start: usize, out: &mut [u8]) -> Result<()> {
    let mut cur = Cursor {
        bytes: source,
        pos: start,
    };
    let mut dp = 0usize;

    loop {
        let b0 = cur.byte()? as usize;

        let (sn, dn, do_raw, terminate) = if b0 < 0x80 {
            let b1 = cur.byte()? as usize;
            let sn = b0 & 0x03;
            let dn = ((b0 & 0x1C) >> 2) + 3;
            let do_raw = ((b0 & 0x60) << 3) + b1;
            (sn, dn, do_raw, false)
        } else if b0 < 0xC0 {
            let b1 = cur.byte()? as usize;
            let b2 = cur.byte()? as usize;
            let sn = (b1 >> 6) & 0x03;
            let dn = (b0 & 0x3F) + 4;
            let do_raw = ((b1 & 0x3F) << 8) + b2;
            (sn, dn, do_raw, false)
        } else if b0 < 0xE0 {
            let b1 = cur.byte()? as usize;
            let b2 = cur.byte()? as usize;
            let b3 = cur.byte()? as usize;
            let sn = b0 & 0x03;
            let dn = ((b0 & 0x0C) << 6) + b3 + 5;
            let do_raw = ((b0 & 0x10) << 12) + (b1 << 8) + b2;
            (sn, dn, do_raw, false)
        } else if b0 < 0xFC {
            let sn = ((b0 & 0x1F) << 2) + 4;
            (sn, 0, 0, false)
        } else {
            let sn = b0 & 0x03;
            (sn, 0, 0, true)
        };

        for _ in 0..sn {
            let b = cur.byte()?;
            if dp >= out.len() {
                return Err(Error::MalformedStream(
                    "literal copy overruns declared output size".into(),
                ));
            }
            out[dp] = b;
            dp += 1;
        }

        if dn > 0 {
            let offset = do_raw + 1;
            if offset > dp {
                return Err(Error::MalformedStream(format!(
                    "copy offset {offset} exceeds emitted length {dp}"
                )));
            }
            let mut src = dp - offset;
            for _ in 0..dn {
                if dp >= out.len() {
                    return Err(Error::MalformedStream(
                        "back-reference copy overruns declared output size".into(),
                    ));
                }
                out[dp] = out[src];
                dp += 1;
                src += 1;
            }
        }

        if terminate {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hello() {
        let stream = [
            0x10, 0xFB, 0x00, 0x00, 0x05, 0xE4, b'H', b'e', b'l', b'l', b'o', 0xFC,
        ];
        let out = decompress(&stream).unwrap();
        assert_eq!(out, b"Hello");
    }

    #[test]
    fn terminator_with_three_trailing_literals() {
        // header: 24-bit size form, decompressed length = 3
        // packet: 0xFC | 0x03 = 0xFF -> sn=3, terminate
        let stream = [0x00, 0xFB, 0x00, 0x00, 0x03, 0xFF, b'a', b'b', b'c'];
        let out = decompress(&stream).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn long_copy_opcode_range_matches_the_dn_do_formula() {
        // Exercises the 0xC0..0xE0 "long copy" opcode, flagged in the design
        // notes as unusual and worth a dedicated corpus test: packet one
        // seeds 4 literal bytes via the 0xE0..0xFC literal-only opcode,
        // packet two copies 5 bytes from 2 bytes back using the long-copy
        // opcode, packet three terminates.
        let mut stream = vec![0x00, 0xFB, 0x00, 0x00, 0x09]; // 24-bit size header, declared len=9
        stream.push(0xE0); // sn=((0x00)<<2)+4=4, dn=0
        stream.extend_from_slice(b"abcd");
        stream.extend_from_slice(&[0xC0, 0x00, 0x01, 0x00]); // sn=0, dn=0+0+5=5, do=0+1=1 -> offset=2
        stream.push(0xFC); // terminate, sn=0
        let out = decompress(&stream).unwrap();
        assert_eq!(out, b"abcdcdcdc");
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let stream = [0x00, 0xFB, 0x00, 0x00, 0x05];
        assert!(decompress(&stream).is_err());
    }
}
