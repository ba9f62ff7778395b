use std::rc::Rc;

use mt_keys::Key;

use crate::Error;

/// The wire type code stored in a [`Column`] and a non-object [`Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Bool,
    Char8,
    Int32,
    Int64,
    Float,
    String8,
    Object,
    Vector,
    Float3,
    TableSetReference,
    ResourceKey,
    LocKey,
}

impl DataType {
    pub fn from_code(code: u32) -> Result<Self, Error> {
        Ok(match code {
            0 => DataType::Bool,
            1 => DataType::Char8,
            6 => DataType::Int32,
            8 => DataType::Int64,
            10 => DataType::Float,
            11 => DataType::String8,
            13 => DataType::Object,
            14 => DataType::Vector,
            16 => DataType::Float3,
            18 => DataType::TableSetReference,
            19 => DataType::ResourceKey,
            20 => DataType::LocKey,
            other => return Err(Error::UnknownDataType(other)),
        })
    }

    /// Byte size of a single element on the wire, for the scalar types this
    /// codec can step through without further indirection. `Object` and
    /// `String8` are pointer-shaped (4-byte offsets) but their *referent*
    /// has no fixed size, so they're excluded — callers resolve those via
    /// the schema/table index instead of raw byte arithmetic.
    pub fn wire_size(self) -> Option<u32> {
        match self {
            DataType::Bool | DataType::Char8 => Some(1),
            DataType::Int32 => Some(4),
            DataType::Int64 => Some(8),
            DataType::Float => Some(4),
            DataType::String8 | DataType::Object => Some(4),
            DataType::Vector => Some(8),
            DataType::Float3 => Some(12),
            DataType::TableSetReference => Some(8),
            DataType::ResourceKey => Some(16),
            DataType::LocKey => Some(4),
        }
    }
}

/// A decoded field value. `Null` covers every pointer-shaped type whose
/// offset sentinel (`0x80000000`) was read.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Char8(u8),
    Int32(i32),
    Int64(i64),
    Float(f32),
    String8(Option<String>),
    Object(Option<Rc<ObjectRow>>),
    Vector(Vec<Value>),
    Float3([f32; 3]),
    TableSetReference(u64),
    ResourceKey(Key),
    LocKey(u32),
    Null,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: Option<String>,
    pub data_type: DataType,
    pub flags: u16,
    pub offset: u32,
    pub sub_schema: Option<Rc<Schema>>,
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub name: Option<String>,
    pub name_hash: u32,
    pub schema_hash: u32,
    pub size: u32,
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.as_deref() == Some(name))
    }
}

/// One decoded row of an object table: its schema plus a name-keyed map of
/// field values, matching the attribute-access surface the script engine
/// exposes over `simdata.<column-name>`.
#[derive(Debug, Clone)]
pub struct ObjectRow {
    pub schema: Rc<Schema>,
    pub name: Option<String>,
    pub fields: Vec<(String, Value)>,
}

impl ObjectRow {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: Option<String>,
    pub data_type: DataType,
    pub schema: Option<Rc<Schema>>,
    pub rows: Vec<Value>,
}

/// A fully decoded SimData document: every schema it declares, and every
/// table (object or scalar) it holds.
#[derive(Debug, Clone, Default)]
pub struct SimData {
    pub schemas: Vec<Rc<Schema>>,
    pub tables: Vec<Table>,
}

impl SimData {
    /// Mirrors the original engine's `GetValue`: scans every named table's
    /// object rows for a field called `name`, returning the first match.
    /// This is what backs the script DSL's `simdata.<column-name>` access.
    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        for table in &self.tables {
            if table.name.is_none() {
                continue;
            }
            for row in &table.rows {
                if let Value::Object(Some(obj)) = row {
                    if let Some(value) = obj.field(name) {
                        return Some(value);
                    }
                }
            }
        }
        None
    }
}
