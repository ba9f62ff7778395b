use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use mt_dbpf::{Package, Resource};
use mt_keys::{Filter, Key};

use crate::ast::{Action, Construction, Expr, Predicate, Stmt};
use crate::value::Value;
use crate::Error;

/// Packages have no natural `Hash`/`Eq`; sessions key their merge/filter
/// bookkeeping on the `Rc` pointer identity instead, the same way the
/// source keys its maps on a Go `*Package`.
type PackageId = usize;

fn package_id(pkg: &Rc<RefCell<Package>>) -> PackageId {
    Rc::as_ptr(pkg) as PackageId
}

/// One nesting level of the script's scope chain: variables visible only
/// within it, plus the merge/filter bookkeeping accumulated by statements
/// run at this level. A child session starts empty — it does not inherit
/// its parent's merges/filters, only contributes its own back on close.
#[derive(Default)]
struct Session {
    vars: HashMap<String, Value>,
    merges: HashMap<PackageId, Vec<Rc<RefCell<Package>>>>,
    includes: HashMap<PackageId, Filter>,
    excludes: HashMap<PackageId, Filter>,
}

/// Walks a compiled action tree against a stack of nested sessions, one
/// frame pushed per `for` iteration and per `if` body.
pub struct Interpreter {
    stack: Vec<Session>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            stack: vec![Session::default()],
        }
    }

    /// Runs a whole program to completion, then closes the root session.
    /// Every nested session opened along the way is closed during unwind
    /// regardless of whether execution succeeded.
    pub fn run(&mut self, program: &Action) -> Result<(), Error> {
        let result = self.exec_block(program);
        let root = self.stack.pop().expect("root session missing at end of run");
        debug_assert!(self.stack.is_empty());
        close_session(root);
        result
    }

    fn current(&self) -> &Session {
        self.stack.last().expect("session stack is never empty")
    }

    fn current_mut(&mut self) -> &mut Session {
        self.stack.last_mut().expect("session stack is never empty")
    }

    fn push_child(&mut self) {
        self.stack.push(Session::default());
    }

    fn pop_child(&mut self) {
        let child = self.stack.pop().expect("pop_child called without a matching push");
        if let Some(parent) = self.stack.last_mut() {
            transfer(&child, parent);
        }
        close_session(child);
    }

    fn introduce(&mut self, name: &str, value: Value) -> Result<(), Error> {
        let session = self.current_mut();
        if session.vars.contains_key(name) {
            return Err(Error::Redefined(name.to_string()));
        }
        session.vars.insert(name.to_string(), value);
        Ok(())
    }

    fn set(&mut self, name: &str, value: Value) -> Result<(), Error> {
        if !name.contains('.') {
            self.current_mut().vars.insert(name.to_string(), value);
            return Ok(());
        }
        let mut parts = name.split('.');
        let root = parts.next().unwrap();
        let rest: Vec<&str> = parts.collect();
        let var = self
            .current_mut()
            .vars
            .get_mut(root)
            .ok_or_else(|| Error::Undefined(root.to_string()))?;
        set_attribute(var, &rest, value)
    }

    fn lookup(&self, root: &str) -> Result<Value, Error> {
        for session in self.stack.iter().rev() {
            if let Some(v) = session.vars.get(root) {
                return Ok(v.clone());
            }
        }
        Err(Error::Undefined(root.to_string()))
    }

    fn fetch(&self, name: &str) -> Result<Value, Error> {
        let mut parts = name.split('.');
        let root = parts.next().unwrap();
        let mut value = self.lookup(root)?;
        for attr in parts {
            value = fetch_attribute(&value, attr)?;
        }
        Ok(value)
    }

    fn exec_block(&mut self, stmts: &Action) -> Result<(), Error> {
        for stmt in stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<(), Error> {
        match stmt {
            Stmt::Set { name, value } => {
                let value = self.eval_expr(value)?;
                self.set(name, value)
            }

            Stmt::Open { path, name } => {
                let path = self.eval_expr(path)?.into_string()?;
                log::debug!("opening {name}");
                let pack = Package::open(&path).map_err(Error::codec)?;
                self.introduce(name, Value::Package(Rc::new(RefCell::new(pack))))
            }

            Stmt::Create { name } => {
                log::debug!("creating {name}");
                self.introduce(name, Value::Package(Rc::new(RefCell::new(Package::new()))))
            }

            Stmt::New { kind, name } => {
                log::debug!("new {kind} {name}");
                let resource = match kind.as_str() {
                    "empty" => Resource::new(Key::new(0, 0, 0), Vec::new()),
                    other => return Err(Error::Unsupported(format!("resource kind '{other}' is not recognized"))),
                };
                self.introduce(name, Value::Resource(resource))
            }

            Stmt::Merge { path, target } => {
                let path = self.eval_expr(path)?.into_string()?;
                let pack = self.eval_expr(target)?.into_package()?;
                log::debug!("merging {path}");
                let merge = Package::open(&path).map_err(Error::codec)?;
                let id = package_id(&pack);
                self.current_mut()
                    .merges
                    .entry(id)
                    .or_default()
                    .push(Rc::new(RefCell::new(merge)));
                Ok(())
            }

            Stmt::Include { filter, target } => {
                let filter = self.eval_expr(filter)?.into_filter()?;
                let pack = self.eval_expr(target)?.into_package()?;
                let id = package_id(&pack);
                merge_filter_into(&mut self.current_mut().includes, id, filter);
                Ok(())
            }

            Stmt::Exclude { filter, target } => {
                let filter = self.eval_expr(filter)?.into_filter()?;
                let pack = self.eval_expr(target)?.into_package()?;
                let id = package_id(&pack);
                merge_filter_into(&mut self.current_mut().excludes, id, filter);
                Ok(())
            }

            Stmt::Save { value, path } => {
                let pack = self.eval_expr(value)?.into_package()?;
                let path = self.eval_expr(path)?.into_string()?;
                log::debug!("saving to {path}");
                pack.borrow_mut().save_as(&path).map_err(Error::codec)
            }

            Stmt::Parse { resource, kind, name } => {
                let resource = self.eval_expr(resource)?.into_resource()?;
                log::debug!("parsing {kind} as {name}");
                let bytes = resource.to_bytes().map_err(Error::codec)?;
                let value = match kind.as_str() {
                    "simdata" => Value::SimData(Rc::new(mt_simdata::read(&bytes).map_err(Error::codec)?)),
                    "caspart" => Value::CasPart(Rc::new(mt_caspart::read(&bytes).map_err(Error::codec)?)),
                    "combined" => Value::Combined(Rc::new(mt_combined::parse(&bytes).map_err(Error::codec)?)),
                    other => return Err(Error::Unsupported(format!("resource kind '{other}' is not recognized"))),
                };
                self.introduce(name, value)
            }

            Stmt::Unparse { value, name } => {
                let value = self.eval_expr(value)?;
                log::debug!("unparsing to {name}");
                let bytes = match &value {
                    Value::SimData(data) => mt_simdata::write(data).map_err(Error::codec)?,
                    Value::CasPart(part) => mt_caspart::write(part).map_err(Error::codec)?,
                    other => {
                        return Err(Error::TypeMismatch(format!(
                            "a {} cannot be unparsed back into a resource",
                            other.type_name()
                        )))
                    }
                };
                self.introduce(name, Value::Resource(Resource::new(Key::new(0, 0, 0), bytes)))
            }

            Stmt::Add { resource, target } => {
                let resource = self.eval_expr(resource)?.into_resource()?;
                let pack = self.eval_expr(target)?.into_package()?;
                pack.borrow_mut().add_resource(resource);
                Ok(())
            }

            Stmt::For { var, list, body } => {
                let list_value = self.eval_expr(list)?;
                let action = self.eval_expr(body)?.into_action()?;
                let items = self.list(list_value)?;
                for item in items {
                    self.push_child();
                    self.current_mut().vars.insert(var.clone(), item);
                    let result = self.exec_block(&action);
                    self.pop_child();
                    result?;
                }
                Ok(())
            }

            Stmt::If { predicate, body } => {
                let predicate = self.eval_expr(predicate)?.into_predicate()?;
                let action = self.eval_expr(body)?.into_action()?;
                if self.eval_predicate(&predicate)? {
                    self.push_child();
                    let result = self.exec_block(&action);
                    self.pop_child();
                    result?;
                }
                Ok(())
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, Error> {
        match expr {
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Num(n) => Ok(Value::I64(*n)),
            Expr::Name(n) => self.fetch(n),
            Expr::Construction(c) => self.eval_construction(c),
            Expr::Action(a) => Ok(Value::ActionBlock(Rc::clone(a))),
            Expr::Predicate(p) => Ok(Value::Predicate(Rc::clone(p))),
        }
    }

    fn eval_construction(&mut self, construction: &Construction) -> Result<Value, Error> {
        match construction {
            Construction::Key { type_id, group, instance } => {
                let type_id = to_hash32(self.eval_expr(type_id)?)?;
                let group = to_hash32(self.eval_expr(group)?)?;
                let instance = to_hash64(self.eval_expr(instance)?)?;
                Ok(Value::Key(Key::new(type_id, group, instance)))
            }
            Construction::Group(expr) => {
                let group = to_hash32(self.eval_expr(expr)?)?;
                Ok(Value::Filter(Filter::with_groups(vec![group])))
            }
            Construction::Instance(expr) => {
                let instance = to_hash64(self.eval_expr(expr)?)?;
                Ok(Value::Filter(Filter::with_instances(vec![instance])))
            }
        }
    }

    fn eval_predicate(&mut self, predicate: &Predicate) -> Result<bool, Error> {
        let value = self.eval_expr(&predicate.value)?;
        Ok(value.type_name() == predicate.kind)
    }

    /// Resolves a listable value for `for`: a package (its filtered and
    /// merged resources), an explicit list, or a tunable (its children).
    fn list(&self, value: Value) -> Result<Vec<Value>, Error> {
        match value {
            Value::Package(pack) => Ok(self.list_resources(&pack).into_iter().map(Value::Resource).collect()),
            Value::List(items) => Ok(items),
            Value::Tunable(t) => Ok(t.tunables.iter().map(|c| Value::Tunable(Rc::new(c.clone()))).collect()),
            other => Err(Error::TypeMismatch(format!("a {} is not listable", other.type_name()))),
        }
    }

    /// Mirrors the source's `listResources`: the package's own resources,
    /// unioned with every merge-source package's resources (later entries
    /// winning on key collision, since it's a map keyed by resource key),
    /// filtered by the current session's include set, then its exclude set.
    fn list_resources(&self, pack: &Rc<RefCell<Package>>) -> Vec<Resource> {
        let id = package_id(pack);
        let include = self.current().includes.get(&id).cloned();
        let exclude = self.current().excludes.get(&id).cloned();
        let merges = self.current().merges.get(&id).cloned().unwrap_or_default();

        let mut seen: HashMap<Key, Resource> = HashMap::new();
        for resource in pack.borrow().list_resources(include.as_ref()) {
            seen.insert(resource.key(), resource.clone());
        }
        for merge in &merges {
            for resource in merge.borrow().list_resources(include.as_ref()) {
                seen.insert(resource.key(), resource.clone());
            }
        }
        if let Some(exclude) = exclude {
            seen.retain(|k, _| !exclude.includes(k));
        }
        seen.into_values().collect()
    }
}

fn merge_filter_into(map: &mut HashMap<PackageId, Filter>, id: PackageId, filter: Filter) {
    let merged = match map.get(&id) {
        Some(existing) => existing.merge(&filter),
        None => filter,
    };
    map.insert(id, merged);
}

/// Propagates a closing child's merges/filters up into its parent, per the
/// session lifecycle rule: a child's contributions become visible to its
/// parent only once the child closes, never before.
fn transfer(child: &Session, parent: &mut Session) {
    for (id, merges) in &child.merges {
        parent.merges.entry(*id).or_default().extend(merges.iter().cloned());
    }
    for (id, filter) in &child.includes {
        let merged = match parent.includes.get(id) {
            Some(existing) => existing.merge(filter),
            None => filter.clone(),
        };
        parent.includes.insert(*id, merged);
    }
    for (id, filter) in &child.excludes {
        let merged = match parent.excludes.get(id) {
            Some(existing) => existing.merge(filter),
            None => filter.clone(),
        };
        parent.excludes.insert(*id, merged);
    }
}

/// Closes every package this session owns directly: packages it bound as a
/// variable, and every merge-source package it introduced via `merge`.
fn close_session(session: Session) {
    for value in session.vars.into_values() {
        if let Value::Package(pack) = value {
            pack.borrow_mut().close();
        }
    }
    for merges in session.merges.into_values() {
        for pack in merges {
            pack.borrow_mut().close();
        }
    }
}

fn to_hash32(value: Value) -> Result<u32, Error> {
    match value {
        Value::U32(v) => Ok(v),
        Value::I64(v) => Ok(v as u32),
        Value::U64(v) => Ok(v as u32),
        Value::String(s) => Ok(mt_hash::fnv32(&s)),
        other => Err(Error::TypeMismatch(format!("cannot convert a {} to a hash", other.type_name()))),
    }
}

fn to_hash64(value: Value) -> Result<u64, Error> {
    match value {
        Value::U64(v) => Ok(v),
        Value::I64(v) => Ok(v as u64),
        Value::U32(v) => Ok(v as u64),
        Value::String(s) => Ok(mt_hash::fnv64_high_bit(&s)),
        other => Err(Error::TypeMismatch(format!("cannot convert a {} to a hash", other.type_name()))),
    }
}

fn fetch_attribute(value: &Value, attr: &str) -> Result<Value, Error> {
    match value {
        Value::Key(key) => match attr {
            "type" => Ok(Value::U32(key.type_id)),
            "group" => Ok(Value::U32(key.group)),
            "instance" => Ok(Value::U64(key.instance)),
            other => Err(Error::AttributeMissing(format!("a key has no attribute '{other}'"))),
        },

        Value::Resource(resource) => match attr {
            "key" => Ok(Value::Key(resource.key())),
            other => Err(Error::AttributeMissing(format!("a resource has no attribute '{other}'"))),
        },

        Value::SimData(data) => data
            .get_variable(attr)
            .map(simdata_field_to_value)
            .ok_or_else(|| Error::AttributeMissing(format!("simdata has no field '{attr}'"))),

        Value::CasPart(part) => match attr {
            "name" => Ok(Value::String(part.name.clone())),
            "showInUI" => Ok(Value::Bool(part.show_in_ui())),
            other => Err(Error::AttributeMissing(format!("a caspart has no attribute '{other}'"))),
        },

        Value::Combined(combined) => combined
            .entry(attr)
            .map(|entry| Value::List(entry.all_instances().map(|i| Value::Instance(Rc::new(i.clone()))).collect()))
            .ok_or_else(|| Error::AttributeMissing(format!("combined document has no entry '{attr}'"))),

        Value::Instance(instance) => instance
            .tunable(attr)
            .map(|t| Value::Tunable(Rc::new(t.clone())))
            .ok_or_else(|| Error::AttributeMissing(format!("instance has no tunable '{attr}'"))),

        Value::Tunable(tunable) => match attr {
            "name" => Ok(Value::String(tunable.name.clone().unwrap_or_default())),
            "value" => Ok(Value::String(tunable.chardata.clone())),
            other => tunable
                .tunable(other)
                .map(|t| Value::Tunable(Rc::new(t.clone())))
                .ok_or_else(|| Error::AttributeMissing(format!("tunable has no attribute '{other}'"))),
        },

        other => Err(Error::TypeMismatch(format!("a {} does not have attributes", other.type_name()))),
    }
}

fn set_attribute(var: &mut Value, path: &[&str], value: Value) -> Result<(), Error> {
    match (var, path) {
        (Value::Resource(resource), ["key"]) => {
            resource.set_key(value.into_key()?);
            Ok(())
        }
        (Value::Resource(_), [other]) => Err(Error::AttributeMissing(format!("a resource has no attribute '{other}'"))),
        (var, _) if path.len() == 1 => Err(Error::TypeMismatch(format!(
            "a {} does not support attribute assignment",
            var.type_name()
        ))),
        _ => Err(Error::TypeMismatch("nested attribute assignment is not supported".into())),
    }
}

/// `simdata.<column-name>` reads through to a decoded field; this maps the
/// codec's own value representation onto the script's narrower value set.
/// There's no dedicated float variant in [`Value`], so floats render as
/// their decimal string form — the same thing a script would do with them
/// (interpolate into a name, compare as a string) has no need for arithmetic.
fn simdata_field_to_value(value: &mt_simdata::Value) -> Value {
    use mt_simdata::Value as V;
    match value {
        V::Bool(b) => Value::Bool(*b),
        V::Char8(c) => Value::String((*c as char).to_string()),
        V::Int32(i) => Value::I64(*i as i64),
        V::Int64(i) => Value::I64(*i),
        V::Float(f) => Value::String(f.to_string()),
        V::Float3(f) => Value::List(f.iter().map(|x| Value::String(x.to_string())).collect()),
        V::String8(s) => Value::String(s.clone().unwrap_or_default()),
        V::Object(Some(row)) => Value::String(row.name.clone().unwrap_or_default()),
        V::Object(None) => Value::Bool(false),
        V::Vector(items) => Value::List(items.iter().map(simdata_field_to_value).collect()),
        V::TableSetReference(v) => Value::U64(*v),
        V::ResourceKey(k) => Value::Key(*k),
        V::LocKey(v) => Value::U32(*v),
        V::Null => Value::Bool(false),
    }
}
