use std::rc::Rc;

/// A parsed action block: a sequence of statements, shared by `Rc` once
/// captured inside a `{...}` expression so evaluating that expression
/// multiple times (once per `for` iteration) is a cheap clone.
pub type Action = Vec<Stmt>;

#[derive(Debug, Clone)]
pub enum Stmt {
    Set { name: String, value: Expr },
    Open { path: Expr, name: String },
    Create { name: String },
    New { kind: String, name: String },
    Merge { path: Expr, target: Expr },
    Include { filter: Expr, target: Expr },
    Exclude { filter: Expr, target: Expr },
    Save { value: Expr, path: Expr },
    Parse { resource: Expr, kind: String, name: String },
    Unparse { value: Expr, name: String },
    Add { resource: Expr, target: Expr },
    For { var: String, list: Expr, body: Expr },
    If { predicate: Expr, body: Expr },
}

#[derive(Debug, Clone)]
pub enum Expr {
    Str(String),
    Num(i64),
    Name(String),
    Construction(Box<Construction>),
    Action(Rc<Action>),
    Predicate(Rc<Predicate>),
}

#[derive(Debug, Clone)]
pub enum Construction {
    Key { type_id: Expr, group: Expr, instance: Expr },
    Group(Expr),
    Instance(Expr),
}

#[derive(Debug, Clone)]
pub struct Predicate {
    pub value: Expr,
    pub kind: String,
}
