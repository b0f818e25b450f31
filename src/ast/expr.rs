//! Expression nodes of the source AST.
//!
//! A tagged `enum` plus exhaustive pattern matching, in place of the
//! original compiler's inheritance-and-visitor hierarchy (see the design
//! notes on why: the compiler enforces match exhaustiveness for us, so
//! there is no need for the `any`-typed `accept`/`visit` plumbing).

use std::cell::Cell;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnaryOp {
    Negate,
    Complement,
    Not,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Assign {
        lvalue: Box<Expr>,
        value: Box<Expr>,
        line: u32,
    },
    Conditional {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        right: Box<Expr>,
    },
    Literal {
        value: i32,
    },
    /// `scope_level` starts at `-1` and is stamped by the resolver once the
    /// declaring scope is found; `Cell` lets the resolver mutate the AST
    /// through a shared reference while walking it.
    Variable {
        name: String,
        line: u32,
        scope_level: Cell<i32>,
    },
}

impl Expr {
    pub fn variable(name: impl Into<String>, line: u32) -> Expr {
        Expr::Variable {
            name: name.into(),
            line,
            scope_level: Cell::new(-1),
        }
    }
}
