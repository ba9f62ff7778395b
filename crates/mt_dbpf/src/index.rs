use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{Read, Seek, Write};

use crate::Error;

pub const CONSTANT_TYPE: u32 = 1 << 0;
pub const CONSTANT_GROUP: u32 = 1 << 1;
pub const CONSTANT_INSTANCE_EX: u32 = 1 << 2;
pub const EXTENDED_COMPRESSION_TYPE: u32 = 1 << 31;

/// One on-disk index entry, already normalised to always carry all three
/// identity fields regardless of which ones were constant-folded on the
/// wire — [`super::package::Package`] re-derives the constancy flags and
/// omits the appropriate fields when writing.
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub type_id: u32,
    pub group: u32,
    pub instance_ex: u32,
    pub instance_lo: u32,
    pub position: u32,
    pub compressed_size: u32,
    pub decompressed_size: u32,
    pub compression_type: u16,
    pub committed: u16,
}

impl Entry {
    pub fn is_extended(&self) -> bool {
        self.compressed_size & EXTENDED_COMPRESSION_TYPE != 0
    }

    pub fn compressed_len(&self) -> u32 {
        self.compressed_size & !EXTENDED_COMPRESSION_TYPE
    }
}

/// The flag word plus whichever constant fields it implies, as read or
/// about to be written just ahead of the entry list.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordHeader {
    pub flags: u32,
    pub type_id: u32,
    pub group: u32,
    pub instance_ex: u32,
}

pub fn read_record_header<R: Read>(r: &mut R) -> Result<RecordHeader, Error> {
    let flags = r.read_u32::<LE>()?;
    let type_id = if flags & CONSTANT_TYPE != 0 {
        r.read_u32::<LE>()?
    } else {
        0
    };
    let group = if flags & CONSTANT_GROUP != 0 {
        r.read_u32::<LE>()?
    } else {
        0
    };
    let instance_ex = if flags & CONSTANT_INSTANCE_EX != 0 {
        r.read_u32::<LE>()?
    } else {
        0
    };
    Ok(RecordHeader {
        flags,
        type_id,
        group,
        instance_ex,
    })
}

pub fn write_record_header<W: Write>(w: &mut W, header: &RecordHeader) -> Result<(), Error> {
    w.write_u32::<LE>(header.flags)?;
    if header.flags & CONSTANT_TYPE != 0 {
        w.write_u32::<LE>(header.type_id)?;
    }
    if header.flags & CONSTANT_GROUP != 0 {
        w.write_u32::<LE>(header.group)?;
    }
    if header.flags & CONSTANT_INSTANCE_EX != 0 {
        w.write_u32::<LE>(header.instance_ex)?;
    }
    Ok(())
}

pub fn read_entry<R: Read + Seek>(r: &mut R, record: &RecordHeader) -> Result<Entry, Error> {
    let type_id = if record.flags & CONSTANT_TYPE == 0 {
        r.read_u32::<LE>()?
    } else {
        record.type_id
    };
    let group = if record.flags & CONSTANT_GROUP == 0 {
        r.read_u32::<LE>()?
    } else {
        record.group
    };
    let instance_ex = if record.flags & CONSTANT_INSTANCE_EX == 0 {
        r.read_u32::<LE>()?
    } else {
        record.instance_ex
    };

    let instance_lo = r.read_u32::<LE>()?;
    let position = r.read_u32::<LE>()?;
    let compressed_size = r.read_u32::<LE>()?;
    let decompressed_size = r.read_u32::<LE>()?;

    let (compression_type, committed) = if compressed_size & EXTENDED_COMPRESSION_TYPE != 0 {
        (r.read_u16::<LE>()?, r.read_u16::<LE>()?)
    } else {
        (0, 0)
    };

    Ok(Entry {
        type_id,
        group,
        instance_ex,
        instance_lo,
        position,
        compressed_size,
        decompressed_size,
        compression_type,
        committed,
    })
}

pub fn write_entry<W: Write>(w: &mut W, record: &RecordHeader, entry: &Entry) -> Result<(), Error> {
    if record.flags & CONSTANT_TYPE == 0 {
        w.write_u32::<LE>(entry.type_id)?;
    }
    if record.flags & CONSTANT_GROUP == 0 {
        w.write_u32::<LE>(entry.group)?;
    }
    if record.flags & CONSTANT_INSTANCE_EX == 0 {
        w.write_u32::<LE>(entry.instance_ex)?;
    }
    w.write_u32::<LE>(entry.instance_lo)?;
    w.write_u32::<LE>(entry.position)?;
    w.write_u32::<LE>(entry.compressed_size)?;
    w.write_u32::<LE>(entry.decompressed_size)?;
    if entry.compressed_size & EXTENDED_COMPRESSION_TYPE != 0 {
        w.write_u16::<LE>(entry.compression_type)?;
        w.write_u16::<LE>(entry.committed)?;
    }
    Ok(())
}
