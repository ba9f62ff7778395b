//! The CAS Part resource: a linear fixed-layout binary record interleaved
//! with variable-length runs (presets, tags, swatch colors, LODs, ...).

mod codec;
mod types;

pub use codec::{read, write};
pub use types::{
    CasPart, Chunk1, Chunk2, Chunk3, Chunk4, Chunk5, Chunk6, Chunk7, Lod, LodAsset, Override,
    ParamFlags, Preset, ResourceKeyEntry, Tag,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    #[error("malformed CAS part: {0}")]
    Malformed(&'static str),
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CasPart {
        CasPart {
            chunk1: Chunk1 {
                version: 30,
                data_size: 0,
            },
            name: "bottom".into(),
            chunk2: Chunk2 {
                param_flags: ParamFlags::SHOW_IN_UI | ParamFlags::ALLOW_FOR_RANDOM,
                ..Chunk2::default()
            },
            tags: vec![Tag {
                category: 0x0201,
                value: 0x000A,
            }],
            chunk3: Chunk3 {
                body_type: 4,
                unused2: 0,
                ..Chunk3::default()
            },
            swatch_colors: vec![0xFFAACC00, 0x11223344],
            chunk4: Chunk4::default(),
            chunk5: Chunk5::default(),
            lods: vec![Lod {
                level: 0,
                unused: 0,
                assets: vec![LodAsset {
                    sorting: 0,
                    spec_level: 1,
                    cast_shadow: 1,
                }],
                lod_keys: vec![0],
            }],
            chunk6: Chunk6::default(),
            chunk7: Chunk7::default(),
            resource_keys: vec![ResourceKeyEntry {
                instance: 0x1122_3344_5566_7788,
                group: 0,
                type_id: 0x034A_EECB,
            }],
            ..CasPart::default()
        }
    }

    #[test]
    fn round_trips_through_write_and_read() {
        let part = sample();
        let bytes = write(&part).unwrap();
        let decoded = read(&bytes).unwrap();

        assert_eq!(decoded.name, "bottom");
        assert_eq!(decoded.chunk1.version, 30);
        assert_eq!(decoded.swatch_colors, part.swatch_colors);
        assert!(decoded.show_in_ui());
        assert_eq!(decoded.lods.len(), 1);
        assert_eq!(decoded.resource_keys[0].key().type_id, 0x034A_EECB);
    }

    #[test]
    fn write_is_byte_identical_across_two_runs() {
        let part = sample();
        assert_eq!(write(&part).unwrap(), write(&part).unwrap());
    }

    #[test]
    fn nonzero_preset_param_count_is_unsupported() {
        // Byte-hand-build a single preset with NumParams=1, which the
        // format never resolves further.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&30u32.to_le_bytes()); // version
        bytes.extend_from_slice(&0u32.to_le_bytes()); // data_size
        bytes.extend_from_slice(&1u32.to_le_bytes()); // num_presets
        bytes.extend_from_slice(&0u64.to_le_bytes()); // preset.complete_id
        bytes.push(1); // preset.num_params != 0

        assert!(matches!(read(&bytes), Err(Error::Unsupported(_))));
    }

    #[test]
    fn long_name_uses_the_two_byte_continuation_form() {
        let long_name: String = "a".repeat(80);
        let mut part = CasPart::default();
        part.name = long_name.clone();
        let bytes = write(&part).unwrap();
        let decoded = read(&bytes).unwrap();
        assert_eq!(decoded.name, long_name);
    }
}
