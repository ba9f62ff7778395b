//! A small line-oriented DSL for batch DBPF package operations: open/create
//! packages, merge and filter their resources, parse individual resources
//! into typed documents (SimData, CAS Part, Combined tuning), edit them, and
//! write the results back out.

mod ast;
mod compile;
mod interpreter;
mod parser;
mod value;

pub use ast::{Action, Construction, Expr, Predicate, Stmt};
pub use value::Value;

use std::fs;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{line}:{col}: {message}")]
    ParseError { line: usize, col: usize, message: String },

    #[error("'{0}' is already defined in this scope")]
    Redefined(String),

    #[error("'{0}' is not defined")]
    Undefined(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("{0}")]
    AttributeMissing(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("codec error: {0}")]
    Codec(anyhow::Error),

    #[error("io error: {0}")]
    Io(String),
}

impl Error {
    /// Wraps any codec crate's own error type (mt_dbpf, mt_simdata,
    /// mt_caspart, mt_combined all define their own via thiserror) into the
    /// catch-all `Codec` variant, so the interpreter doesn't need a `From`
    /// impl per dependency.
    pub fn codec<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
        Error::Codec(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Compiles and runs a script file from start to finish, mirroring the
/// original engine's `RunFile`: read, compile, execute, close the root
/// session's packages.
pub fn run_file(path: impl AsRef<Path>) -> Result<(), Error> {
    let bytes = fs::read(path)?;
    let program = compile::compile(&bytes)?;
    let mut interp = interpreter::Interpreter::new();
    interp.run(&program)
}

/// Compiles and runs a script already in memory, useful for embedding and
/// for tests that don't want to touch the filesystem.
pub fn run(bytes: &[u8]) -> Result<(), Error> {
    let program = compile::compile(bytes)?;
    let mut interp = interpreter::Interpreter::new();
    interp.run(&program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_a_script_that_only_creates_and_sets_variables() {
        let script = b"create pkg\nset name to \"hello\"\n";
        run(script).unwrap();
    }

    #[test]
    fn rejects_redefining_a_variable_in_the_same_scope() {
        let script = b"create pkg\ncreate pkg\n";
        let err = run(script).unwrap_err();
        assert!(matches!(err, Error::Redefined(name) if name == "pkg"));
    }

    #[test]
    fn rejects_referencing_an_undefined_variable() {
        let script = b"save missing as \"out.package\"\n";
        let err = run(script).unwrap_err();
        assert!(matches!(err, Error::Undefined(name) if name == "missing"));
    }

    #[test]
    fn reports_parse_errors_with_position() {
        let script = b"create a\nbogus thing\n";
        let err = run(script).unwrap_err();
        match err {
            Error::ParseError { line, .. } => assert_eq!(line, 2),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn key_construction_round_trips_through_attribute_access() {
        let script = b"set k to [key <0x01> <0x02> <0x03>]\nif (k is key) {\n}\n";
        run(script).unwrap();
    }
}
