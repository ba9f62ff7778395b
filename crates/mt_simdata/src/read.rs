use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::rc::Rc;

use byteorder::{ReadBytesExt, LE};
use mt_keys::Key;

use crate::types::{Column, DataType, ObjectRow, Schema, SimData, Table, Value};
use crate::Error;

const NULL_OFFSET: i32 = i32::MIN;
const IDENTIFIER: [u8; 4] = *b"DATA";
const VERSION: u32 = 0x0100;

struct RawColumn {
    name: Option<String>,
    data_type: DataType,
    flags: u16,
    offset: u32,
    sub_schema_target: Option<u64>,
}

struct RawSchema {
    abs_start: u64,
    name: Option<String>,
    name_hash: u32,
    schema_hash: u32,
    size: u32,
    raw_columns: Vec<RawColumn>,
}

struct RawTableInfo {
    name: Option<String>,
    schema_target: Option<u64>,
    data_type_code: u32,
    row_size: u32,
    row_offset: u64,
    row_count: u32,
}

/// Decodes a complete SimData document from its raw bytes, following the
/// format's two-pass structure: schemas and table-info are fully indexed
/// before any row data is touched, since offsets throughout are relative to
/// the field that stored them rather than to the start of the file.
pub fn read(bytes: &[u8]) -> Result<SimData, Error> {
    let mut r = Cursor::new(bytes);

    let mut ident = [0u8; 4];
    r.read_exact(&mut ident)?;
    if ident != IDENTIFIER {
        return Err(Error::BadMagic);
    }
    let version = r.read_u32::<LE>()?;
    if version != VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    let table_info_offset = read_field_relative(&mut r)?.ok_or_else(|| {
        Error::MalformedStream("table-info offset must not be null".into())
    })?;
    let table_info_count = r.read_i32::<LE>()? as u32;
    let schema_offset = read_field_relative(&mut r)?
        .ok_or_else(|| Error::MalformedStream("schema offset must not be null".into()))?;
    let schema_count = r.read_i32::<LE>()? as u32;

    // Pass 1: schemas (and their columns).
    r.seek(SeekFrom::Start(schema_offset))?;
    let mut raw_schemas = Vec::with_capacity(schema_count as usize);
    for _ in 0..schema_count {
        raw_schemas.push(read_raw_schema(&mut r)?);
    }
    let schema_by_offset: HashMap<u64, usize> = raw_schemas
        .iter()
        .enumerate()
        .map(|(i, s)| (s.abs_start, i))
        .collect();

    let schemas = build_schemas(&raw_schemas, &schema_by_offset)?;

    // Pass 2: table-info array.
    r.seek(SeekFrom::Start(table_info_offset))?;
    let mut raw_tables = Vec::with_capacity(table_info_count as usize);
    for _ in 0..table_info_count {
        raw_tables.push(read_raw_table_info(&mut r)?);
    }

    let table_schemas: Vec<Option<Rc<Schema>>> = raw_tables
        .iter()
        .map(|t| {
            t.schema_target
                .and_then(|off| schema_by_offset.get(&off))
                .map(|&i| Rc::clone(&schemas[i]))
        })
        .collect();

    // Walk tables in descending row-offset order so any table referenced by
    // an Object/Vector pointer is decoded (and registered in `pointers`)
    // before the table that references it.
    let mut order: Vec<usize> = (0..raw_tables.len()).collect();
    order.sort_by(|&a, &b| raw_tables[b].row_offset.cmp(&raw_tables[a].row_offset));

    let mut pointers: HashMap<u64, Value> = HashMap::new();
    let mut tables: Vec<Option<Table>> = (0..raw_tables.len()).map(|_| None).collect();

    // Non-object (leaf, scalar-array) tables carry no forward references of
    // their own, so they can all be pre-materialised before any object row
    // that might point at them.
    for &i in &order {
        let data_type = DataType::from_code(raw_tables[i].data_type_code)?;
        if data_type == DataType::Object {
            continue;
        }
        let info = &raw_tables[i];
        let mut rows = Vec::with_capacity(info.row_count as usize);
        for row_idx in 0..info.row_count as u64 {
            let row_abs = info.row_offset + row_idx * info.row_size as u64;
            r.seek(SeekFrom::Start(row_abs))?;
            let value = read_value(&mut r, data_type, &pointers, &raw_tables)?;
            pointers.insert(row_abs, value.clone());
            rows.push(value);
        }
        tables[i] = Some(Table {
            name: info.name.clone(),
            data_type,
            schema: None,
            rows,
        });
    }

    for &i in &order {
        let data_type = DataType::from_code(raw_tables[i].data_type_code)?;
        if data_type != DataType::Object {
            continue;
        }
        let info = &raw_tables[i];
        let schema = table_schemas[i].clone().ok_or(Error::SchemaMissing)?;
        let mut rows = Vec::with_capacity(info.row_count as usize);
        for row_idx in 0..info.row_count as u64 {
            let row_abs = info.row_offset + row_idx * info.row_size as u64;
            let mut fields = Vec::with_capacity(schema.columns.len());
            for column in &schema.columns {
                r.seek(SeekFrom::Start(row_abs + column.offset as u64))?;
                let value = read_value(&mut r, column.data_type, &pointers, &raw_tables)?;
                fields.push((column.name.clone().unwrap_or_default(), value));
            }
            let row = Rc::new(ObjectRow {
                schema: Rc::clone(&schema),
                name: info.name.clone(),
                fields,
            });
            let value = Value::Object(Some(row));
            pointers.insert(row_abs, value.clone());
            rows.push(value);
        }
        tables[i] = Some(Table {
            name: info.name.clone(),
            data_type,
            schema: Some(schema),
            rows,
        });
    }

    let tables = tables
        .into_iter()
        .map(|t| t.expect("every table index is visited by exactly one of the two passes above"))
        .collect();

    Ok(SimData { schemas, tables })
}

fn read_value<R: Read + Seek>(
    r: &mut R,
    data_type: DataType,
    pointers: &HashMap<u64, Value>,
    raw_tables: &[RawTableInfo],
) -> Result<Value, Error> {
    Ok(match data_type {
        DataType::Bool => Value::Bool(r.read_u8()? != 0),
        DataType::Char8 => Value::Char8(r.read_u8()?),
        DataType::Int32 => Value::Int32(r.read_i32::<LE>()?),
        DataType::Int64 => Value::Int64(r.read_i64::<LE>()?),
        DataType::Float => Value::Float(r.read_f32::<LE>()?),
        DataType::Float3 => Value::Float3([
            r.read_f32::<LE>()?,
            r.read_f32::<LE>()?,
            r.read_f32::<LE>()?,
        ]),
        DataType::TableSetReference => Value::TableSetReference(r.read_u64::<LE>()?),
        DataType::ResourceKey => {
            let instance = r.read_u64::<LE>()?;
            let type_id = r.read_u32::<LE>()?;
            let group = r.read_u32::<LE>()?;
            Value::ResourceKey(Key::new(type_id, group, instance))
        }
        DataType::LocKey => Value::LocKey(r.read_u32::<LE>()?),
        DataType::String8 => {
            let target = read_field_relative(r)?;
            match target {
                None => Value::String8(None),
                Some(target) => {
                    let resume = r.stream_position()?;
                    r.seek(SeekFrom::Start(target))?;
                    let s = read_cstring(r)?;
                    r.seek(SeekFrom::Start(resume))?;
                    Value::String8(Some(s))
                }
            }
        }
        DataType::Object => {
            let target = read_field_relative(r)?;
            match target {
                None => Value::Object(None),
                Some(target) => match pointers.get(&target) {
                    Some(Value::Object(obj)) => Value::Object(obj.clone()),
                    _ => {
                        return Err(Error::MalformedStream(format!(
                            "object pointer at {target:#x} has no registered row"
                        )))
                    }
                },
            }
        }
        DataType::Vector => {
            let field_start = r.stream_position()?;
            let raw = r.read_i32::<LE>()?;
            let count = r.read_u32::<LE>()?;
            if raw == NULL_OFFSET || count == 0 {
                Value::Vector(Vec::new())
            } else {
                let target = (field_start as i64 + raw as i64) as u64;
                let (elem_type, elem_size) = find_table_for_offset(target, raw_tables)?;
                let mut elems = Vec::with_capacity(count as usize);
                for i in 0..count as u64 {
                    let elem_abs = target + i * elem_size as u64;
                    match pointers.get(&elem_abs) {
                        Some(v) => elems.push(v.clone()),
                        None => {
                            return Err(Error::MalformedStream(format!(
                                "vector element at {elem_abs:#x} ({elem_type:?}) was not pre-materialised"
                            )))
                        }
                    }
                }
                Value::Vector(elems)
            }
        }
    })
}

fn find_table_for_offset(target: u64, raw_tables: &[RawTableInfo]) -> Result<(DataType, u32), Error> {
    for t in raw_tables {
        let dt = DataType::from_code(t.data_type_code)?;
        let span = t.row_size as u64 * t.row_count as u64;
        if target >= t.row_offset && target < t.row_offset + span {
            return Ok((dt, t.row_size));
        }
    }
    Err(Error::MalformedStream(format!(
        "vector target {target:#x} did not match any table's row range"
    )))
}

fn build_schemas(
    raw_schemas: &[RawSchema],
    by_offset: &HashMap<u64, usize>,
) -> Result<Vec<Rc<Schema>>, Error> {
    let mut cache: Vec<Option<Rc<Schema>>> = (0..raw_schemas.len()).map(|_| None).collect();
    let mut visiting = vec![false; raw_schemas.len()];
    for i in 0..raw_schemas.len() {
        build_schema(i, raw_schemas, by_offset, &mut cache, &mut visiting)?;
    }
    Ok(cache.into_iter().map(|s| s.unwrap()).collect())
}

fn build_schema(
    idx: usize,
    raw_schemas: &[RawSchema],
    by_offset: &HashMap<u64, usize>,
    cache: &mut [Option<Rc<Schema>>],
    visiting: &mut [bool],
) -> Result<Rc<Schema>, Error> {
    if let Some(s) = &cache[idx] {
        return Ok(Rc::clone(s));
    }
    if visiting[idx] {
        return Err(Error::MalformedStream("cyclic schema reference".into()));
    }
    visiting[idx] = true;

    let raw = &raw_schemas[idx];
    let mut columns = Vec::with_capacity(raw.raw_columns.len());
    for rc in &raw.raw_columns {
        let sub_schema = match rc.sub_schema_target {
            None => None,
            Some(target) => match by_offset.get(&target) {
                Some(&sub_idx) => Some(build_schema(sub_idx, raw_schemas, by_offset, cache, visiting)?),
                None => None,
            },
        };
        columns.push(Column {
            name: rc.name.clone(),
            data_type: rc.data_type,
            flags: rc.flags,
            offset: rc.offset,
            sub_schema,
        });
    }

    let schema = Rc::new(Schema {
        name: raw.name.clone(),
        name_hash: raw.name_hash,
        schema_hash: raw.schema_hash,
        size: raw.size,
        columns,
    });
    visiting[idx] = false;
    cache[idx] = Some(Rc::clone(&schema));
    Ok(schema)
}

fn read_raw_schema<R: Read + Seek>(r: &mut R) -> Result<RawSchema, Error> {
    let abs_start = r.stream_position()?;
    let (name, name_hash) = read_name(r)?;
    let schema_hash = r.read_u32::<LE>()?;
    let size = r.read_u32::<LE>()?;

    let column_offset_field_start = r.stream_position()?;
    let column_offset_raw = r.read_i32::<LE>()?;
    let column_count = r.read_u32::<LE>()?;
    let resume = r.stream_position()?;

    let mut raw_columns = Vec::with_capacity(column_count as usize);
    if column_offset_raw != NULL_OFFSET {
        let target = (column_offset_field_start as i64 + column_offset_raw as i64) as u64;
        r.seek(SeekFrom::Start(target))?;
        for _ in 0..column_count {
            raw_columns.push(read_raw_column(r)?);
        }
    }
    r.seek(SeekFrom::Start(resume))?;

    Ok(RawSchema {
        abs_start,
        name,
        name_hash,
        schema_hash,
        size,
        raw_columns,
    })
}

fn read_raw_column<R: Read + Seek>(r: &mut R) -> Result<RawColumn, Error> {
    let (name, _hash) = read_name(r)?;
    let data_type_code = r.read_u16::<LE>()? as u32;
    let flags = r.read_u16::<LE>()?;
    let offset = r.read_u32::<LE>()?;
    let sub_schema_target = read_field_relative(r)?;
    let data_type = DataType::from_code(data_type_code)?;
    Ok(RawColumn {
        name,
        data_type,
        flags,
        offset,
        sub_schema_target,
    })
}

fn read_raw_table_info<R: Read + Seek>(r: &mut R) -> Result<RawTableInfo, Error> {
    let (name, _hash) = read_name(r)?;
    let schema_target = read_field_relative(r)?;
    let data_type_code = r.read_u32::<LE>()?;
    let row_size = r.read_u32::<LE>()?;
    let row_offset = read_field_relative(r)?
        .ok_or_else(|| Error::MalformedStream("table row offset must not be null".into()))?;
    let row_count = r.read_u32::<LE>()?;
    Ok(RawTableInfo {
        name,
        schema_target,
        data_type_code,
        row_size,
        row_offset,
        row_count,
    })
}

fn read_name<R: Read + Seek>(r: &mut R) -> Result<(Option<String>, u32), Error> {
    let field_start = r.stream_position()?;
    let offset = r.read_i32::<LE>()?;
    let hash = r.read_u32::<LE>()?;
    if offset == NULL_OFFSET {
        return Ok((None, hash));
    }
    let target = (field_start as i64 + offset as i64) as u64;
    let resume = r.stream_position()?;
    r.seek(SeekFrom::Start(target))?;
    let s = read_cstring(r)?;
    r.seek(SeekFrom::Start(resume))?;
    Ok((Some(s), hash))
}

fn read_field_relative<R: Read + Seek>(r: &mut R) -> Result<Option<u64>, Error> {
    let field_start = r.stream_position()?;
    let raw = r.read_i32::<LE>()?;
    if raw == NULL_OFFSET {
        return Ok(None);
    }
    Ok(Some((field_start as i64 + raw as i64) as u64))
}

fn read_cstring<R: Read>(r: &mut R) -> Result<String, Error> {
    let mut bytes = Vec::new();
    loop {
        let b = r.read_u8()?;
        if b == 0 {
            break;
        }
        bytes.push(b);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        let bytes = [0u8; 16];
        assert!(matches!(read(&bytes), Err(Error::BadMagic)));
    }
}
