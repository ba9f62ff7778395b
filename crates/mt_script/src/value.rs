use std::cell::RefCell;
use std::rc::Rc;

use mt_caspart::CasPart;
use mt_combined::{Combined, Instance, Tunable};
use mt_dbpf::{Package, Resource};
use mt_keys::{Filter, Key};
use mt_simdata::SimData;

use crate::ast::{Action, Predicate};
use crate::Error;

/// The dynamically-typed value every expression evaluates to. Matches the
/// runtime value set the attribute-access and `is` surfaces dispatch over.
#[derive(Clone)]
pub enum Value {
    String(String),
    I64(i64),
    U32(u32),
    U64(u64),
    Bool(bool),
    Key(Key),
    Filter(Filter),
    Package(Rc<RefCell<Package>>),
    Resource(Resource),
    SimData(Rc<SimData>),
    CasPart(Rc<CasPart>),
    Combined(Rc<Combined>),
    Instance(Rc<Instance>),
    Tunable(Rc<Tunable>),
    List(Vec<Value>),
    ActionBlock(Rc<Action>),
    Predicate(Rc<Predicate>),
}

impl Value {
    /// The name used by the `is` predicate and in type-mismatch messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::I64(_) => "int",
            Value::U32(_) => "uint32",
            Value::U64(_) => "uint64",
            Value::Bool(_) => "bool",
            Value::Key(_) => "key",
            Value::Filter(_) => "filter",
            Value::Package(_) => "package",
            Value::Resource(_) => "resource",
            Value::SimData(_) => "simdata",
            Value::CasPart(_) => "caspart",
            Value::Combined(_) => "combined",
            Value::Instance(_) => "instance",
            Value::Tunable(_) => "tunable",
            Value::List(_) => "list",
            Value::ActionBlock(_) => "action",
            Value::Predicate(_) => "predicate",
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::TypeMismatch(format!("expected a {expected}, found a {}", self.type_name()))
    }

    pub fn into_string(self) -> Result<String, Error> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn into_package(self) -> Result<Rc<RefCell<Package>>, Error> {
        match self {
            Value::Package(p) => Ok(p),
            other => Err(other.mismatch("package")),
        }
    }

    pub fn into_resource(self) -> Result<Resource, Error> {
        match self {
            Value::Resource(r) => Ok(r),
            other => Err(other.mismatch("resource")),
        }
    }

    pub fn into_filter(self) -> Result<Filter, Error> {
        match self {
            Value::Filter(f) => Ok(f),
            other => Err(other.mismatch("filter")),
        }
    }

    pub fn into_key(self) -> Result<Key, Error> {
        match self {
            Value::Key(k) => Ok(k),
            other => Err(other.mismatch("key")),
        }
    }

    pub fn into_action(self) -> Result<Rc<Action>, Error> {
        match self {
            Value::ActionBlock(a) => Ok(a),
            other => Err(other.mismatch("action block")),
        }
    }

    pub fn into_predicate(self) -> Result<Rc<Predicate>, Error> {
        match self {
            Value::Predicate(p) => Ok(p),
            other => Err(other.mismatch("predicate")),
        }
    }
}
