//! The DBPF package container: a variable-shape index over zlib-compressed
//! resource payloads.

mod compression;
mod header;
mod index;
mod package;
mod resource;

pub use header::{Header, Version};
pub use package::Package;
pub use resource::Resource;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not a DBPF file (bad magic)")]
    BadMagic,
    #[error("unsupported compression type {0:#06x}")]
    UnsupportedCompression(u16),
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_keys::Key;

    #[test]
    fn round_trips_a_single_entry_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.package");

        let mut pkg = Package::new();
        pkg.add_resource(Resource::new(Key::new(0x034A_EECB, 0, 1), b"hello cas part".to_vec()));
        pkg.save_as(&path).unwrap();

        let mut reopened = Package::open(&path).unwrap();
        let resources: Vec<_> = reopened.list_resources(None).into_iter().cloned().collect();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].key().type_id, 0x034A_EECB);
        assert_eq!(resources[0].to_bytes().unwrap(), b"hello cas part");

        reopened.close();
    }

    #[test]
    fn empty_package_saves_with_minimal_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.package");

        let mut pkg = Package::new();
        pkg.save_as(&path).unwrap();

        let reopened = Package::open(&path).unwrap();
        assert_eq!(reopened.list_resources(None).len(), 0);
    }
}
