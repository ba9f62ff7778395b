/// A fully parsed and reference-expanded Combined tuning document.
#[derive(Debug, Clone, Default)]
pub struct Combined {
    pub entries: Vec<Entry>,
}

impl Combined {
    pub fn entry(&self, type_name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.type_name == type_name)
    }
}

/// One `<R n="TypeName">` block: every `<I>` instance plus any optional
/// `<M>` module siblings it carries.
#[derive(Debug, Clone)]
pub struct Entry {
    pub type_name: String,
    pub instances: Vec<Instance>,
    pub modules: Vec<Instance>,
}

impl Entry {
    pub fn all_instances(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter().chain(self.modules.iter())
    }
}

/// An `<I>` or `<M>` element: the `c`/`i`/`m`/`n`/`s` attributes plus its
/// top-level tunables.
#[derive(Debug, Clone)]
pub struct Instance {
    pub xml_tag: String,
    pub class: Option<String>,
    pub instance_type: Option<String>,
    pub module: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    pub tunables: Vec<Tunable>,
}

impl Instance {
    pub fn tunable(&self, name: &str) -> Option<&Tunable> {
        self.tunables.iter().find(|t| t.name.as_deref() == Some(name))
    }
}

/// A generic tunable node: any element nested inside an instance, after
/// `<r>` reference placeholders have been expanded into deep copies of
/// their registered target.
#[derive(Debug, Clone)]
pub struct Tunable {
    pub xml_tag: String,
    pub type_attr: Option<String>,
    pub path: Option<String>,
    pub enum_value: Option<String>,
    pub name: Option<String>,
    pub reference_id: Option<i64>,
    pub tunables: Vec<Tunable>,
    pub chardata: String,
}

impl Tunable {
    pub fn tunable(&self, name: &str) -> Option<&Tunable> {
        self.tunables.iter().find(|t| t.name.as_deref() == Some(name))
    }
}
