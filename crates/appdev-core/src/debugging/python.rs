//! Python syntax checking on the CPython grammar
//!
//! The parser rejects what the grammar rejects. Targets of assignment
//! and `del` are checked afterwards, since the grammar alone accepts
//! statements such as `del f()`.

use crate::debugging::SourceParser;
use appdev_shared::{ParseFault, SyntaxFault};
use rustpython_parser::ast::{self, Ranged};
use rustpython_parser::{Mode, parse};

/// Parser for Python 3 source
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonParser;

impl PythonParser {
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for PythonParser {
    fn parse(&self, source: &str) -> Result<(), ParseFault> {
        let module = parse(source, Mode::Module, "<string>").map_err(|e| {
            ParseFault::Syntax(fault_at(source, u32::from(e.offset) as usize, e.error.to_string()))
        })?;

        let body = match module {
            ast::Mod::Module(module) => module.body,
            _ => return Ok(()),
        };

        match invalid_target(&body) {
            Some((offset, message)) => Err(ParseFault::Syntax(fault_at(source, offset, message))),
            None => Ok(()),
        }
    }
}

/// Why a target cannot be assigned to or deleted
#[derive(Debug, Clone, Copy, PartialEq)]
enum TargetUse {
    Assign,
    AugAssign,
    Delete,
}

impl TargetUse {
    fn verb(self) -> &'static str {
        match self {
            TargetUse::Assign | TargetUse::AugAssign => "assign to",
            TargetUse::Delete => "delete",
        }
    }
}

/// First invalid target in a block, with its byte offset
fn invalid_target(body: &[ast::Stmt]) -> Option<(usize, String)> {
    body.iter().find_map(invalid_target_in_stmt)
}

fn invalid_target_in_stmt(stmt: &ast::Stmt) -> Option<(usize, String)> {
    match stmt {
        ast::Stmt::Delete(node) => node
            .targets
            .iter()
            .find_map(|target| check_target(target, TargetUse::Delete)),
        ast::Stmt::Assign(node) => node
            .targets
            .iter()
            .find_map(|target| check_target(target, TargetUse::Assign)),
        ast::Stmt::AugAssign(node) => check_target(&node.target, TargetUse::AugAssign),
        ast::Stmt::AnnAssign(node) => check_target(&node.target, TargetUse::AugAssign),
        ast::Stmt::For(node) => check_target(&node.target, TargetUse::Assign)
            .or_else(|| invalid_target(&node.body))
            .or_else(|| invalid_target(&node.orelse)),
        ast::Stmt::AsyncFor(node) => check_target(&node.target, TargetUse::Assign)
            .or_else(|| invalid_target(&node.body))
            .or_else(|| invalid_target(&node.orelse)),
        ast::Stmt::With(node) => node
            .items
            .iter()
            .filter_map(|item| item.optional_vars.as_deref())
            .find_map(|target| check_target(target, TargetUse::Assign))
            .or_else(|| invalid_target(&node.body)),
        ast::Stmt::AsyncWith(node) => node
            .items
            .iter()
            .filter_map(|item| item.optional_vars.as_deref())
            .find_map(|target| check_target(target, TargetUse::Assign))
            .or_else(|| invalid_target(&node.body)),
        ast::Stmt::FunctionDef(node) => invalid_target(&node.body),
        ast::Stmt::AsyncFunctionDef(node) => invalid_target(&node.body),
        ast::Stmt::ClassDef(node) => invalid_target(&node.body),
        ast::Stmt::While(node) => invalid_target(&node.body).or_else(|| invalid_target(&node.orelse)),
        ast::Stmt::If(node) => invalid_target(&node.body).or_else(|| invalid_target(&node.orelse)),
        ast::Stmt::Try(node) => invalid_target(&node.body)
            .or_else(|| {
                node.handlers.iter().find_map(|handler| match handler {
                    ast::ExceptHandler::ExceptHandler(handler) => invalid_target(&handler.body),
                })
            })
            .or_else(|| invalid_target(&node.orelse))
            .or_else(|| invalid_target(&node.finalbody)),
        ast::Stmt::TryStar(node) => invalid_target(&node.body)
            .or_else(|| {
                node.handlers.iter().find_map(|handler| match handler {
                    ast::ExceptHandler::ExceptHandler(handler) => invalid_target(&handler.body),
                })
            })
            .or_else(|| invalid_target(&node.orelse))
            .or_else(|| invalid_target(&node.finalbody)),
        ast::Stmt::Match(node) => node.cases.iter().find_map(|case| invalid_target(&case.body)),
        _ => None,
    }
}

fn check_target(target: &ast::Expr, usage: TargetUse) -> Option<(usize, String)> {
    match target {
        ast::Expr::Name(_) | ast::Expr::Attribute(_) | ast::Expr::Subscript(_) => None,
        ast::Expr::Tuple(node) if usage != TargetUse::AugAssign => {
            node.elts.iter().find_map(|elt| check_target(elt, usage))
        }
        ast::Expr::List(node) if usage != TargetUse::AugAssign => {
            node.elts.iter().find_map(|elt| check_target(elt, usage))
        }
        ast::Expr::Starred(node) if usage == TargetUse::Assign => check_target(&node.value, usage),
        other => Some((
            u32::from(other.range().start()) as usize,
            format!("cannot {} {}", usage.verb(), describe(other)),
        )),
    }
}

fn describe(expr: &ast::Expr) -> &'static str {
    match expr {
        ast::Expr::Call(_) => "function call",
        ast::Expr::Constant(_) => "literal",
        ast::Expr::Compare(_) => "comparison",
        ast::Expr::Lambda(_) => "lambda",
        ast::Expr::Tuple(_) => "tuple",
        ast::Expr::List(_) => "list",
        ast::Expr::Starred(_) => "starred",
        _ => "expression",
    }
}

/// Build a fault from a byte offset into `source`
fn fault_at(source: &str, offset: usize, message: String) -> SyntaxFault {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |tail| tail.chars().count()) + 1;

    SyntaxFault {
        message,
        line,
        column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(source: &str) -> Result<(), ParseFault> {
        PythonParser::new().parse(source)
    }

    fn syntax_fault(source: &str) -> SyntaxFault {
        match check(source) {
            Err(ParseFault::Syntax(fault)) => fault,
            other => panic!("expected syntax fault for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn test_valid_python() {
        for source in [
            "",
            "def add(a, b):\n    return a + b",
            "print('Hello, World!')",
            "a, *rest = [1, 2, 3]\ndel a, rest\nx = y = 1\nx += 1",
            "with open('f') as fh:\n    data = fh.read()",
            "async def f():\n    async for x in y:\n        pass",
        ] {
            assert_eq!(check(source), Ok(()), "{:?}", source);
        }
    }

    #[test]
    fn test_python_missing_colon() {
        assert_eq!(syntax_fault("def add(a, b)\n    return a + b").line, 1);
    }

    #[test]
    fn test_inputs_the_cpython_grammar_rejects() {
        for source in [
            "print \"hello\"",
            "exec \"x = 1\"",
            "def f(a=1, b):\n    pass",
            "f(x for x in y, 1)",
            "del f()",
            "async = 1",
            "x = 1\n  y = 2",
        ] {
            syntax_fault(source);
        }
    }

    #[test]
    fn test_invalid_targets() {
        assert_eq!(syntax_fault("del f()").message, "cannot delete function call");
        for source in [
            "1 = x",
            "(a, f()) = 1, 2",
            "a, b += 1",
            "for f() in y:\n    pass",
            "with open('f') as g():\n    pass",
        ] {
            syntax_fault(source);
        }
    }

    #[test]
    fn test_nested_invalid_target_location() {
        let fault = syntax_fault("def g():\n    if x:\n        del f()\n");
        assert_eq!(fault.line, 3);
    }

    #[test]
    fn test_fault_location_from_offset() {
        let fault = fault_at("x = 1\nyé = (", 10, "boom".to_string());
        assert_eq!(fault.line, 2);
        assert_eq!(fault.column, 4);
    }
}
