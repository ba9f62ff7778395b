use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{Read, Seek, SeekFrom, Write};

use crate::Error;

pub const IDENTIFIER: [u8; 4] = *b"DBPF";
pub const HEADER_SIZE: u64 = 96;

/// A major/minor version pair, as stamped on both the file format and the
/// "user version" fields of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const SIMS4: Version = Version { major: 2, minor: 1 };
}

/// The 96-byte DBPF header. Only the fields called out in the format design
/// are load-bearing; the rest are reserved and round-tripped as zero.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub file_version: Version,
    pub user_version: Version,
    pub creation_time: u32,
    pub update_time: u32,
    pub entry_count: u32,
    pub record_size: u32,
    pub record_position: u64,
}

impl Header {
    pub fn new(version: Version) -> Self {
        Self {
            file_version: version,
            user_version: Version { major: 0, minor: 0 },
            creation_time: 0,
            update_time: 0,
            entry_count: 0,
            record_size: 4,
            record_position: HEADER_SIZE,
        }
    }

    pub fn read<R: Read + Seek>(r: &mut R) -> Result<Self, Error> {
        let mut ident = [0u8; 4];
        r.read_exact(&mut ident)?;
        if ident != IDENTIFIER {
            return Err(Error::BadMagic);
        }

        let file_version = Version {
            major: r.read_u32::<LE>()?,
            minor: r.read_u32::<LE>()?,
        };
        let user_version = Version {
            major: r.read_u32::<LE>()?,
            minor: r.read_u32::<LE>()?,
        };
        let _reserved = r.read_u32::<LE>()?;
        let creation_time = r.read_u32::<LE>()?;
        let update_time = r.read_u32::<LE>()?;
        let _reserved = r.read_u32::<LE>()?;
        let entry_count = r.read_u32::<LE>()?;
        let _record_position_low = r.read_u32::<LE>()?;
        let record_size = r.read_u32::<LE>()?;
        for _ in 0..3 {
            r.read_u32::<LE>()?;
        }
        let _unused = r.read_u32::<LE>()?;
        let record_position = r.read_u64::<LE>()?;
        for _ in 0..6 {
            r.read_u32::<LE>()?;
        }

        Ok(Self {
            file_version,
            user_version,
            creation_time,
            update_time,
            entry_count,
            record_size,
            record_position,
        })
    }

    pub fn write<W: Write + Seek>(&self, w: &mut W) -> Result<(), Error> {
        w.write_all(&IDENTIFIER)?;
        w.write_u32::<LE>(self.file_version.major)?;
        w.write_u32::<LE>(self.file_version.minor)?;
        w.write_u32::<LE>(self.user_version.major)?;
        w.write_u32::<LE>(self.user_version.minor)?;
        w.write_u32::<LE>(0)?;
        w.write_u32::<LE>(self.creation_time)?;
        w.write_u32::<LE>(self.update_time)?;
        w.write_u32::<LE>(0)?;
        w.write_u32::<LE>(self.entry_count)?;
        w.write_u32::<LE>(self.record_position as u32)?;
        w.write_u32::<LE>(self.record_size)?;
        for _ in 0..3 {
            w.write_u32::<LE>(0)?;
        }
        w.write_u32::<LE>(3)?; // `Unused`, always 3 per the on-disk format
        w.write_u64::<LE>(self.record_position)?;
        for _ in 0..6 {
            w.write_u32::<LE>(0)?;
        }
        Ok(())
    }

    pub fn seek_to_record<R: Seek>(&self, r: &mut R) -> Result<(), Error> {
        r.seek(SeekFrom::Start(self.record_position))?;
        Ok(())
    }
}
