//! The SimData binary tuning format: a schema-indexed table of objects,
//! addressed throughout by offsets relative to the field that stores them
//! rather than to the start of the file.

mod read;
mod types;
mod write;

pub use read::read;
pub use types::{Column, DataType, ObjectRow, Schema, SimData, Table, Value};
pub use write::write;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not a SimData document (bad magic)")]
    BadMagic,
    #[error("unsupported SimData version {0:#06x}")]
    UnsupportedVersion(u32),
    #[error("unknown SimData type code {0}")]
    UnknownDataType(u32),
    #[error("object table has no bound schema")]
    SchemaMissing,
    #[error("malformed SimData stream: {0}")]
    MalformedStream(String),
    #[error("{0} is not supported by this writer")]
    NotImplemented(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
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
    use std::rc::Rc;

    fn flat_schema() -> Rc<Schema> {
        Rc::new(Schema {
            name: Some("cas_part_tuning".into()),
            name_hash: mt_hash::fnv32("cas_part_tuning"),
            schema_hash: 0x1234_5678,
            size: 12,
            columns: vec![
                Column {
                    name: Some("price".into()),
                    data_type: DataType::Int32,
                    flags: 0,
                    offset: 0,
                    sub_schema: None,
                },
                Column {
                    name: Some("swatch_count".into()),
                    data_type: DataType::Int32,
                    flags: 0,
                    offset: 4,
                    sub_schema: None,
                },
                Column {
                    name: Some("body_type".into()),
                    data_type: DataType::Int32,
                    flags: 0,
                    offset: 8,
                    sub_schema: None,
                },
            ],
        })
    }

    fn flat_document() -> SimData {
        let schema = flat_schema();
        let row = Rc::new(ObjectRow {
            schema: Rc::clone(&schema),
            name: None,
            fields: vec![
                ("price".into(), Value::Int32(500)),
                ("swatch_count".into(), Value::Int32(3)),
                ("body_type".into(), Value::Int32(17)),
            ],
        });
        SimData {
            schemas: vec![Rc::clone(&schema)],
            tables: vec![Table {
                name: Some("cas_part_tuning".into()),
                data_type: DataType::Object,
                schema: Some(schema),
                rows: vec![Value::Object(Some(row))],
            }],
        }
    }

    #[test]
    fn round_trips_a_flat_scalar_object() {
        let data = flat_document();
        let bytes = write(&data).unwrap();
        let decoded = read(&bytes).unwrap();

        assert_eq!(decoded.tables.len(), 1);
        let value = decoded.get_variable("price");
        assert!(matches!(value, Some(Value::Int32(500))));
        assert!(matches!(decoded.get_variable("swatch_count"), Some(Value::Int32(3))));
        assert!(matches!(decoded.get_variable("body_type"), Some(Value::Int32(17))));
    }

    #[test]
    fn every_column_offset_fits_within_its_schema_size() {
        let schema = flat_schema();
        for column in &schema.columns {
            let width = column.data_type.wire_size().unwrap();
            assert!(column.offset + width <= schema.size);
        }
    }

    #[test]
    fn write_refuses_object_schemas_with_a_string_column() {
        let schema = Rc::new(Schema {
            name: None,
            name_hash: 0,
            schema_hash: 0,
            size: 4,
            columns: vec![Column {
                name: Some("display_name".into()),
                data_type: DataType::String8,
                flags: 0,
                offset: 0,
                sub_schema: None,
            }],
        });
        let row = Rc::new(ObjectRow {
            schema: Rc::clone(&schema),
            name: None,
            fields: vec![("display_name".into(), Value::String8(Some("x".into())))],
        });
        let data = SimData {
            schemas: vec![Rc::clone(&schema)],
            tables: vec![Table {
                name: None,
                data_type: DataType::Object,
                schema: Some(schema),
                rows: vec![Value::Object(Some(row))],
            }],
        };

        assert!(matches!(write(&data), Err(Error::NotImplemented(_))));
    }

    #[test]
    fn read_rejects_bad_magic() {
        assert!(matches!(read(&[0u8; 32]), Err(Error::BadMagic)));
    }
}
