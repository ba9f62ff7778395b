use std::cell::RefCell;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::rc::Rc;

use mt_keys::{Filter, Key};

use crate::compression;
use crate::header::{Header, Version, HEADER_SIZE};
use crate::index::{self, RecordHeader, CONSTANT_GROUP, CONSTANT_INSTANCE_EX, CONSTANT_TYPE, EXTENDED_COMPRESSION_TYPE};
use crate::resource::{FileHandle, OnDiskLocation, Resource};
use crate::Error;

/// An open (or freshly-created) DBPF package: a header, an index-constancy
/// record, and the resources it currently holds — some backed by the file,
/// some pending in memory.
pub struct Package {
    header: Header,
    record: RecordHeader,
    file: Option<FileHandle>,
    path: Option<std::path::PathBuf>,
    resources: Vec<Resource>,
}

impl Package {
    /// Creates a new, empty, in-memory package (no backing file yet).
    pub fn new() -> Self {
        Self {
            header: Header::new(Version::SIMS4),
            record: RecordHeader::default(),
            file: None,
            path: None,
            resources: Vec::new(),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        log::debug!("opening package {}", path.display());
        let mut file = File::open(path)?;
        let header = Header::read(&mut file)?;
        header.seek_to_record(&mut file)?;
        let record = index::read_record_header(&mut file)?;

        let file = Rc::new(RefCell::new(file));
        let mut resources = Vec::with_capacity(header.entry_count as usize);
        for _ in 0..header.entry_count {
            let entry = {
                let mut f = file.borrow_mut();
                index::read_entry(&mut *f, &record)?
            };
            let instance = ((entry.instance_ex as u64) << 32) | entry.instance_lo as u64;
            let key = Key::new(entry.type_id, entry.group, instance);
            let location = OnDiskLocation {
                position: entry.position,
                compressed_size: entry.compressed_len(),
                decompressed_size: entry.decompressed_size,
                compression_type: if entry.is_extended() {
                    entry.compression_type
                } else {
                    compression::ZLIB
                },
            };
            resources.push(Resource::from_disk(key, location, Rc::clone(&file)));
        }

        Ok(Self {
            header,
            record,
            file: Some(file),
            path: Some(path.to_path_buf()),
            resources,
        })
    }

    pub fn add_resource(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Drops this package's file handle. Resources still holding a clone of
    /// the handle (via [`crate::resource::ResourceData::Lazy`]) keep working
    /// until they too are dropped — the handle is reference-counted, not
    /// owned exclusively by the package.
    pub fn close(&mut self) {
        self.file = None;
    }

    /// Returns the resources passing `filter` (or all of them if `filter`
    /// is `None`), matching the order they're stored in — enumeration order
    /// across merged packages is explicitly unspecified by the DSL's
    /// contract, so callers must not rely on it.
    pub fn list_resources(&self, filter: Option<&Filter>) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| filter.map(|f| f.includes(&r.key)).unwrap_or(true))
            .collect()
    }

    pub fn save(&mut self) -> Result<(), Error> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| Error::Io("no file associated with package".into()))?;
        self.save_as(&path)
    }

    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        log::debug!("saving package to {}", path.display());

        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut temp = match dir {
            Some(dir) => tempfile::Builder::new().prefix("dbpf-").tempfile_in(dir)?,
            None => tempfile::Builder::new().prefix("dbpf-").tempfile()?,
        };

        self.write_to(temp.as_file_mut())?;

        // Drop the old backing handle before renaming over it, matching the
        // original's temp-file-then-rename discipline: write fully, then
        // swap, restoring the previous handle on failure.
        let old_file = self.file.take();
        match temp.persist(path) {
            Ok(file) => {
                self.file = Some(Rc::new(RefCell::new(file)));
                self.path = Some(path.to_path_buf());
                Ok(())
            }
            Err(err) => {
                self.file = old_file;
                Err(Error::Io(err.to_string()))
            }
        }
    }

    fn write_to(&mut self, file: &mut File) -> Result<(), Error> {
        // Decode every resource into memory and re-compress up front so
        // that constancy detection and payload layout see final sizes.
        let mut compressed: Vec<(Key, u32, Vec<u8>)> = Vec::with_capacity(self.resources.len());
        for resource in &self.resources {
            let bytes = resource.to_bytes()?;
            let payload = compression::compress(&bytes)?;
            compressed.push((resource.key, bytes.len() as u32, payload));
        }

        let keys: Vec<Key> = compressed.iter().map(|(k, _, _)| *k).collect();
        let (record, entries_meta) = derive_constancy(&keys);

        let mut position = HEADER_SIZE as u32;
        let mut entries = Vec::with_capacity(compressed.len());
        for ((key, decompressed_size, payload), meta) in compressed.iter().zip(entries_meta.iter()) {
            entries.push(index::Entry {
                type_id: key.type_id,
                group: key.group,
                instance_ex: meta.instance_ex,
                instance_lo: meta.instance_lo,
                position,
                compressed_size: payload.len() as u32 | EXTENDED_COMPRESSION_TYPE,
                decompressed_size: *decompressed_size,
                compression_type: compression::ZLIB,
                committed: 1,
            });
            position += payload.len() as u32;
        }

        let constant_count = record_constant_count(&record);
        let header_len = 4 + constant_count * 4;
        let body_len = entries.len() as u32 * 4 * (8 - constant_count);

        self.header.entry_count = entries.len() as u32;
        self.header.record_position = position as u64;
        self.header.record_size = header_len + body_len;
        self.record = record;

        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        for (_, _, payload) in &compressed {
            file.write_all(payload)?;
        }

        file.seek(SeekFrom::Start(0))?;
        self.header.write(file)?;

        file.seek(SeekFrom::Start(self.header.record_position))?;
        index::write_record_header(file, &self.record)?;
        for entry in &entries {
            index::write_entry(file, &self.record, entry)?;
        }

        Ok(())
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}

struct EntryConstancy {
    instance_ex: u32,
    instance_lo: u32,
}

fn derive_constancy(keys: &[Key]) -> (RecordHeader, Vec<EntryConstancy>) {
    let metas: Vec<EntryConstancy> = keys
        .iter()
        .map(|key| EntryConstancy {
            instance_ex: (key.instance >> 32) as u32,
            instance_lo: key.instance as u32,
        })
        .collect();

    if keys.is_empty() {
        return (RecordHeader::default(), metas);
    }

    let first_type = keys[0].type_id;
    let first_group = keys[0].group;
    let first_instance_ex = metas[0].instance_ex;

    let const_type = keys.iter().all(|k| k.type_id == first_type);
    let const_group = keys.iter().all(|k| k.group == first_group);
    let const_instance_ex = metas.iter().all(|m| m.instance_ex == first_instance_ex);

    let mut flags = 0;
    if const_type {
        flags |= CONSTANT_TYPE;
    }
    if const_group {
        flags |= CONSTANT_GROUP;
    }
    if const_instance_ex {
        flags |= CONSTANT_INSTANCE_EX;
    }

    (
        RecordHeader {
            flags,
            type_id: if const_type { first_type } else { 0 },
            group: if const_group { first_group } else { 0 },
            instance_ex: if const_instance_ex { first_instance_ex } else { 0 },
        },
        metas,
    )
}

fn record_constant_count(record: &RecordHeader) -> u32 {
    [CONSTANT_TYPE, CONSTANT_GROUP, CONSTANT_INSTANCE_EX]
        .iter()
        .filter(|&&bit| record.flags & bit != 0)
        .count() as u32
}

