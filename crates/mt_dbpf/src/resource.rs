use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

use mt_keys::Key;

use crate::compression;
use crate::Error;

/// A package's file handle, shared (not owned) by every lazily-backed
/// [`Resource`] that still needs to read its payload from disk.
///
/// This is the "non-owning index/handle" the design notes call for: the
/// handle points at the file, never back at the owning `Package`, so there
/// is no ownership cycle to break on drop.
pub type FileHandle = Rc<RefCell<File>>;

/// `compressed_size` here is already masked — the extended-compression-type
/// bit lives only on the wire, in [`crate::index::Entry`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct OnDiskLocation {
    pub position: u32,
    pub compressed_size: u32,
    pub decompressed_size: u32,
    pub compression_type: u16,
}

#[derive(Clone)]
pub(crate) enum ResourceData {
    /// Freshly added or mutated: the decoded bytes live in memory until the
    /// next save.
    Pending(Vec<u8>),
    /// Backed by the package's file; read lazily and on demand.
    Lazy(OnDiskLocation, FileHandle),
}

/// One entry in a [`crate::Package`]: an identity key plus either decoded
/// bytes or a handle into the backing file.
#[derive(Clone)]
pub struct Resource {
    pub key: Key,
    pub(crate) data: ResourceData,
}

impl Resource {
    pub fn new(key: Key, bytes: Vec<u8>) -> Self {
        Self {
            key,
            data: ResourceData::Pending(bytes),
        }
    }

    pub(crate) fn from_disk(key: Key, location: OnDiskLocation, file: FileHandle) -> Self {
        Self {
            key,
            data: ResourceData::Lazy(location, file),
        }
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn set_key(&mut self, key: Key) {
        self.key = key;
    }

    /// Decodes this resource's payload, reading and inflating it from the
    /// backing file if it hasn't been loaded into memory yet.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        match &self.data {
            ResourceData::Pending(bytes) => Ok(bytes.clone()),
            ResourceData::Lazy(location, file) => {
                if location.compression_type == compression::DELETED {
                    return Ok(Vec::new());
                }
                let mut file = file.borrow_mut();
                file.seek(SeekFrom::Start(location.position as u64))?;
                let mut compressed = vec![0u8; location.compressed_size as usize];
                file.read_exact(&mut compressed)?;
                compression::decompress(
                    location.compression_type,
                    &compressed,
                    location.decompressed_size,
                )
            }
        }
    }

    /// Loads this resource into memory, so later mutation or re-save
    /// doesn't depend on the file handle staying valid.
    pub fn materialize(&mut self) -> Result<(), Error> {
        if let ResourceData::Lazy(..) = &self.data {
            let bytes = self.to_bytes()?;
            self.data = ResourceData::Pending(bytes);
        }
        Ok(())
    }
}
