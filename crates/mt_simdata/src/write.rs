use std::io::{Cursor, Write};
use std::rc::Rc;

use byteorder::{WriteBytesExt, LE};

use crate::types::{Column, DataType, ObjectRow, Schema, SimData, Table, Value};
use crate::Error;

const NULL_OFFSET: i32 = i32::MIN;
const HEADER_TOTAL: u64 = 32;
const TABLE_INFO_SIZE: u64 = 28;
const SCHEMA_HEADER_SIZE: u64 = 24;
const COLUMN_SIZE: u64 = 20;
const ALIGNMENT: u64 = 16;

struct Layout {
    table_info_offset: u64,
    schema_offset: u64,
    table_row_offset: Vec<u64>,
    schema_abs_offset: Vec<u64>,
    name_pool_offset: u64,
    name_order: Vec<String>,
    name_abs_offset: Vec<u64>,
}

/// Encodes a SimData document back to bytes.
///
/// This writer only supports object tables whose schema columns are all
/// fixed-size scalars (no `String8`, `Object`, or `Vector` columns): those
/// types need a name pool and/or nested-row allocator this encoder doesn't
/// build, since every object tree this tool round-trips is a flat tuning
/// record. Any column using one of the unsupported types yields
/// [`Error::NotImplemented`] before any bytes are written.
pub fn write(data: &SimData) -> Result<Vec<u8>, Error> {
    let object_tables: Vec<&Table> = data.tables.iter().collect();
    for table in &object_tables {
        if table.data_type != DataType::Object {
            return Err(Error::NotImplemented(
                "writing non-object (scalar-array) tables".into(),
            ));
        }
    }

    let schemas: Vec<Rc<Schema>> = object_tables
        .iter()
        .map(|t| t.schema.clone().ok_or(Error::SchemaMissing))
        .collect::<Result<_, _>>()?;

    for schema in &schemas {
        for column in &schema.columns {
            if !matches!(
                column.data_type,
                DataType::String8 | DataType::Object | DataType::Vector
            ) {
                continue;
            }
            return Err(Error::NotImplemented(format!(
                "writing column \"{}\" of type {:?}",
                column.name.as_deref().unwrap_or(""),
                column.data_type
            )));
        }
    }

    let layout = compute_layout(&object_tables, &schemas);
    emit(&object_tables, &schemas, &layout)
}

fn compute_layout(object_tables: &[&Table], schemas: &[Rc<Schema>]) -> Layout {
    let table_info_offset = HEADER_TOTAL;
    let table_info_size = object_tables.len() as u64 * TABLE_INFO_SIZE;
    let rows_start = align(table_info_offset + table_info_size);

    let mut table_row_offset = Vec::with_capacity(object_tables.len());
    let mut running = rows_start;
    for table in object_tables {
        table_row_offset.push(running);
        let schema = table.schema.as_ref().expect("validated above");
        let block_len = table.rows.len() as u64 * schema.size as u64;
        running += align(block_len);
    }
    let schema_offset = running;

    let mut schema_abs_offset = Vec::with_capacity(schemas.len());
    let mut running2 = schema_offset;
    for schema in schemas {
        schema_abs_offset.push(running2);
        running2 += SCHEMA_HEADER_SIZE + schema.columns.len() as u64 * COLUMN_SIZE;
    }
    let name_pool_offset = running2;

    let mut name_order = Vec::new();
    for table in object_tables {
        if let Some(name) = &table.name {
            name_order.push(name.clone());
        }
    }
    for schema in schemas {
        if let Some(name) = &schema.name {
            name_order.push(name.clone());
        }
        for column in &schema.columns {
            if let Some(name) = &column.name {
                name_order.push(name.clone());
            }
        }
    }

    let mut name_abs_offset = Vec::with_capacity(name_order.len());
    let mut acc = name_pool_offset;
    for name in &name_order {
        name_abs_offset.push(acc);
        acc += name.len() as u64 + 1;
    }

    Layout {
        table_info_offset,
        schema_offset,
        table_row_offset,
        schema_abs_offset,
        name_pool_offset,
        name_order,
        name_abs_offset,
    }
}

fn align(n: u64) -> u64 {
    (n + ALIGNMENT - 1) / ALIGNMENT * ALIGNMENT
}

fn emit(object_tables: &[&Table], schemas: &[Rc<Schema>], layout: &Layout) -> Result<Vec<u8>, Error> {
    let mut w = Cursor::new(Vec::new());
    let mut name_cursor = 0usize;

    w.write_all(b"DATA")?;
    w.write_u32::<LE>(0x0100)?;
    write_relative(&mut w, layout.table_info_offset)?;
    w.write_i32::<LE>(object_tables.len() as i32)?;
    write_relative(&mut w, layout.schema_offset)?;
    w.write_i32::<LE>(schemas.len() as i32)?;
    w.write_all(&[0u8; 8])?;

    for (i, table) in object_tables.iter().enumerate() {
        write_name_ref(&mut w, table.name.as_deref(), layout, &mut name_cursor)?;
        let schema_field_start = w.position();
        let schema_value = layout.schema_abs_offset[schema_index(schemas, table)] as i64
            - schema_field_start as i64;
        w.write_i32::<LE>(schema_value as i32)?;
        w.write_u32::<LE>(13)?; // DataType::Object wire code.
        let schema = table.schema.as_ref().expect("validated above");
        w.write_u32::<LE>(schema.size)?;
        let row_field_start = w.position();
        w.write_i32::<LE>((layout.table_row_offset[i] as i64 - row_field_start as i64) as i32)?;
        w.write_u32::<LE>(table.rows.len() as u32)?;
    }

    pad_to(&mut w, layout.table_row_offset.first().copied().unwrap_or(w.position()))?;

    for (i, table) in object_tables.iter().enumerate() {
        let schema = table.schema.as_ref().expect("validated above");
        let block_start = w.position();
        debug_assert_eq!(block_start, layout.table_row_offset[i]);
        for row in &table.rows {
            let obj = match row {
                Value::Object(Some(obj)) => obj,
                _ => {
                    return Err(Error::TypeMismatch(
                        "object table contained a non-object row value".into(),
                    ))
                }
            };
            write_row(&mut w, schema, obj)?;
        }
        let block_len = table.rows.len() as u64 * schema.size as u64;
        pad_to(&mut w, block_start + align(block_len))?;
    }

    debug_assert_eq!(w.position(), layout.schema_offset);

    for (i, schema) in schemas.iter().enumerate() {
        let schema_start = w.position();
        debug_assert_eq!(schema_start, layout.schema_abs_offset[i]);
        write_name_ref(&mut w, schema.name.as_deref(), layout, &mut name_cursor)?;
        w.write_u32::<LE>(schema.schema_hash)?;
        w.write_u32::<LE>(schema.size)?;
        let column_offset_field_start = w.position();
        let columns_start = schema_start + SCHEMA_HEADER_SIZE;
        w.write_i32::<LE>((columns_start as i64 - column_offset_field_start as i64) as i32)?;
        w.write_u32::<LE>(schema.columns.len() as u32)?;

        for column in &schema.columns {
            write_name_ref(&mut w, column.name.as_deref(), layout, &mut name_cursor)?;
            w.write_u16::<LE>(wire_code(column.data_type))?;
            w.write_u16::<LE>(column.flags)?;
            w.write_u32::<LE>(column.offset)?;
            w.write_i32::<LE>(NULL_OFFSET)?; // sub-schema: never used by scalar columns.
        }
    }

    debug_assert_eq!(w.position(), layout.name_pool_offset);
    for name in &layout.name_order {
        w.write_all(name.as_bytes())?;
        w.write_u8(0)?;
    }

    Ok(w.into_inner())
}

fn schema_index(schemas: &[Rc<Schema>], table: &Table) -> usize {
    let target = table.schema.as_ref().expect("validated above");
    schemas
        .iter()
        .position(|s| Rc::ptr_eq(s, target))
        .expect("every table's schema is in the schemas list by construction")
}

fn write_relative(w: &mut Cursor<Vec<u8>>, target: u64) -> Result<(), Error> {
    let field_start = w.position();
    w.write_i32::<LE>((target as i64 - field_start as i64) as i32)?;
    Ok(())
}

fn write_name_ref(
    w: &mut Cursor<Vec<u8>>,
    name: Option<&str>,
    layout: &Layout,
    cursor: &mut usize,
) -> Result<(), Error> {
    match name {
        None => {
            w.write_i32::<LE>(NULL_OFFSET)?;
            w.write_u32::<LE>(0)?;
        }
        Some(n) => {
            let field_start = w.position();
            let abs = layout.name_abs_offset[*cursor];
            debug_assert_eq!(layout.name_order[*cursor], n);
            *cursor += 1;
            w.write_i32::<LE>((abs as i64 - field_start as i64) as i32)?;
            w.write_u32::<LE>(mt_hash::fnv32(n))?;
        }
    }
    Ok(())
}

fn pad_to(w: &mut Cursor<Vec<u8>>, target: u64) -> Result<(), Error> {
    let here = w.position();
    if target > here {
        let zeros = vec![0u8; (target - here) as usize];
        w.write_all(&zeros)?;
    }
    Ok(())
}

fn write_row(w: &mut Cursor<Vec<u8>>, schema: &Schema, obj: &ObjectRow) -> Result<(), Error> {
    let mut buf = vec![0u8; schema.size as usize];
    for column in &schema.columns {
        let value = obj
            .field(column.name.as_deref().unwrap_or(""))
            .ok_or_else(|| Error::MalformedStream(format!(
                "row for schema \"{}\" is missing field \"{}\"",
                schema.name.as_deref().unwrap_or(""),
                column.name.as_deref().unwrap_or("")
            )))?;
        write_scalar(&mut buf, column, value)?;
    }
    w.write_all(&buf)?;
    Ok(())
}

fn write_scalar(buf: &mut [u8], column: &Column, value: &Value) -> Result<(), Error> {
    let at = column.offset as usize;
    match (column.data_type, value) {
        (DataType::Bool, Value::Bool(b)) => buf[at] = *b as u8,
        (DataType::Char8, Value::Char8(c)) => buf[at] = *c,
        (DataType::Int32, Value::Int32(v)) => buf[at..at + 4].copy_from_slice(&v.to_le_bytes()),
        (DataType::Int64, Value::Int64(v)) => buf[at..at + 8].copy_from_slice(&v.to_le_bytes()),
        (DataType::Float, Value::Float(v)) => buf[at..at + 4].copy_from_slice(&v.to_le_bytes()),
        (DataType::Float3, Value::Float3(v)) => {
            for (i, f) in v.iter().enumerate() {
                let o = at + i * 4;
                buf[o..o + 4].copy_from_slice(&f.to_le_bytes());
            }
        }
        (DataType::TableSetReference, Value::TableSetReference(v)) => {
            buf[at..at + 8].copy_from_slice(&v.to_le_bytes())
        }
        (DataType::ResourceKey, Value::ResourceKey(k)) => {
            buf[at..at + 8].copy_from_slice(&k.instance.to_le_bytes());
            buf[at + 8..at + 12].copy_from_slice(&k.type_id.to_le_bytes());
            buf[at + 12..at + 16].copy_from_slice(&k.group.to_le_bytes());
        }
        (DataType::LocKey, Value::LocKey(v)) => buf[at..at + 4].copy_from_slice(&v.to_le_bytes()),
        (dt, _) => {
            return Err(Error::TypeMismatch(format!(
                "column declared as {dt:?} but row value has a different type"
            )))
        }
    }
    Ok(())
}

fn wire_code(data_type: DataType) -> u16 {
    match data_type {
        DataType::Bool => 0,
        DataType::Char8 => 1,
        DataType::Int32 => 6,
        DataType::Int64 => 8,
        DataType::Float => 10,
        DataType::String8 => 11,
        DataType::Object => 13,
        DataType::Vector => 14,
        DataType::Float3 => 16,
        DataType::TableSetReference => 18,
        DataType::ResourceKey => 19,
        DataType::LocKey => 20,
    }
}
