use std::rc::Rc;

use crate::ast::{Action, Construction, Expr, Predicate, Stmt};
use crate::parser::Parser;
use crate::Error;

/// Parses a whole script into an action block.
pub fn compile(bytes: &[u8]) -> Result<Action, Error> {
    let mut p = Parser::new(bytes);
    parse_block(&mut p)
}

fn parse_block(p: &mut Parser) -> Result<Action, Error> {
    let mut stmts = Vec::new();
    while p.has_more() {
        if let Some(stmt) = parse_stmt(p)? {
            stmts.push(stmt);
        }
    }
    Ok(stmts)
}

fn parse_stmt(p: &mut Parser) -> Result<Option<Stmt>, Error> {
    let word = p.word()?;
    match word.as_str() {
        "" => {
            p.end()?;
            Ok(None)
        }

        "if" => {
            let predicate = parse_expr(p)?;
            let body = parse_expr(p)?;
            p.end()?;
            Ok(Some(Stmt::If { predicate, body }))
        }

        "for" => {
            let var = p.word()?;
            p.ensure("in")?;
            let list = parse_expr(p)?;
            let body = parse_expr(p)?;
            p.end()?;
            Ok(Some(Stmt::For { var, list, body }))
        }

        "set" => {
            let name = p.name()?;
            p.ensure("to")?;
            let value = parse_expr(p)?;
            p.end()?;
            Ok(Some(Stmt::Set { name, value }))
        }

        "open" => {
            let path = parse_expr(p)?;
            p.ensure("as")?;
            let name = p.word()?;
            p.end()?;
            Ok(Some(Stmt::Open { path, name }))
        }

        "create" => {
            let name = p.word()?;
            p.end()?;
            Ok(Some(Stmt::Create { name }))
        }

        "new" => {
            let kind = p.word()?;
            p.ensure("as")?;
            let name = p.word()?;
            p.end()?;
            Ok(Some(Stmt::New { kind, name }))
        }

        "merge" => {
            let path = parse_expr(p)?;
            p.ensure("with")?;
            let target = parse_expr(p)?;
            p.end()?;
            Ok(Some(Stmt::Merge { path, target }))
        }

        "include" => {
            let filter = parse_expr(p)?;
            p.ensure("from")?;
            let target = parse_expr(p)?;
            p.end()?;
            Ok(Some(Stmt::Include { filter, target }))
        }

        "exclude" => {
            let filter = parse_expr(p)?;
            p.ensure("from")?;
            let target = parse_expr(p)?;
            p.end()?;
            Ok(Some(Stmt::Exclude { filter, target }))
        }

        "save" => {
            let value = parse_expr(p)?;
            p.ensure("as")?;
            let path = parse_expr(p)?;
            p.end()?;
            Ok(Some(Stmt::Save { value, path }))
        }

        "parse" => {
            let resource = parse_expr(p)?;
            p.ensure("to")?;
            let kind = p.word()?;
            p.ensure("as")?;
            let name = p.word()?;
            p.end()?;
            Ok(Some(Stmt::Parse { resource, kind, name }))
        }

        "unparse" => {
            let value = parse_expr(p)?;
            p.ensure("as")?;
            let name = p.word()?;
            p.end()?;
            Ok(Some(Stmt::Unparse { value, name }))
        }

        "add" => {
            let resource = parse_expr(p)?;
            p.ensure("to")?;
            let target = parse_expr(p)?;
            p.end()?;
            Ok(Some(Stmt::Add { resource, target }))
        }

        other => Err(p.err(format!("action '{other}' not recognized"))),
    }
}

fn parse_expr(p: &mut Parser) -> Result<Expr, Error> {
    if !p.has_more() {
        return Err(p.err("expected an expression"));
    }
    match p.peek_byte() {
        b'"' => Ok(Expr::Str(p.string_literal()?)),
        b'(' => {
            let mut group = p.group(b'(', b')')?;
            let predicate = parse_predicate(&mut group)?;
            Ok(Expr::Predicate(Rc::new(predicate)))
        }
        b'[' => {
            let mut group = p.group(b'[', b']')?;
            let construction = parse_construction(&mut group)?;
            Ok(Expr::Construction(Box::new(construction)))
        }
        b'{' => {
            let mut group = p.group(b'{', b'}')?;
            let action = parse_block(&mut group)?;
            Ok(Expr::Action(Rc::new(action)))
        }
        b'<' => Ok(Expr::Num(p.number()?)),
        _ => Ok(Expr::Name(p.name()?)),
    }
}

fn parse_predicate(p: &mut Parser) -> Result<Predicate, Error> {
    let value = parse_expr(p)?;
    let word = p.word()?;
    match word.as_str() {
        "is" => {
            let kind = p.word()?;
            p.end()?;
            Ok(Predicate { value, kind })
        }
        other => Err(p.err(format!("predicate '{other}' not recognized"))),
    }
}

fn parse_construction(p: &mut Parser) -> Result<Construction, Error> {
    let word = p.word()?;
    match word.as_str() {
        "key" => {
            let type_id = parse_expr(p)?;
            let group = parse_expr(p)?;
            let instance = parse_expr(p)?;
            p.end()?;
            Ok(Construction::Key { type_id, group, instance })
        }
        "group" => {
            let hash = parse_expr(p)?;
            p.end()?;
            Ok(Construction::Group(hash))
        }
        "instance" => {
            let hash = parse_expr(p)?;
            p.end()?;
            Ok(Construction::Instance(hash))
        }
        other => Err(p.err(format!("construction '{other}' not recognized"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_open_create_and_save() {
        let script = b"open \"a.package\" as p\ncreate q\nsave q as \"b.package\"\n";
        let action = compile(script).unwrap();
        assert_eq!(action.len(), 3);
        assert!(matches!(action[0], Stmt::Open { .. }));
        assert!(matches!(action[1], Stmt::Create { .. }));
        assert!(matches!(action[2], Stmt::Save { .. }));
    }

    #[test]
    fn compiles_nested_for_with_include_filter() {
        let script = b"include [group <0x1>] from p\nfor r in p {\n}\n";
        let action = compile(script).unwrap();
        assert_eq!(action.len(), 2);
        match &action[1] {
            Stmt::For { var, body, .. } => {
                assert_eq!(var, "r");
                assert!(matches!(body, Expr::Action(_)));
            }
            other => panic!("expected a for statement, got {other:?}"),
        }
    }

    #[test]
    fn reports_line_and_column_on_unknown_action() {
        let script = b"bogus\n";
        let err = compile(script).unwrap_err();
        match err {
            Error::ParseError { line, col, .. } => {
                assert_eq!(line, 1);
                assert_eq!(col, 1);
            }
            other => panic!("expected a ParseError, got {other:?}"),
        }
    }

    #[test]
    fn compiles_if_with_predicate_and_key_construction() {
        let script = b"set k to [key <1> <2> <3>]\nif (k is key) {\n}\n";
        let action = compile(script).unwrap();
        assert!(matches!(action[0], Stmt::Set { .. }));
        assert!(matches!(action[1], Stmt::If { .. }));
    }
}
