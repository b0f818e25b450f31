//! Statement nodes of the source AST.

use std::cell::Cell;

use super::expr::Expr;

#[derive(Clone, Debug)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Expression(Expr),
    Function {
        name: String,
        line: u32,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Return {
        line: u32,
        value: Option<Expr>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        loop_id: Cell<u32>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
        loop_id: Cell<u32>,
    },
    For {
        /// Either a `Decl` or an `Expression` statement, never anything else.
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Expr>,
        body: Box<Stmt>,
        loop_id: Cell<u32>,
    },
    Decl {
        name: String,
        line: u32,
        init: Option<Expr>,
        /// Stamped by the resolver with the declaring scope's depth, just
        /// like `Expr::Variable::scope_level`; lets `TackyGen` route the
        /// initializer's write through the same unique IR name every read
        /// of this variable uses.
        scope_level: Cell<i32>,
    },
    Null,
    Break {
        line: u32,
        loop_id: Cell<u32>,
    },
    Continue {
        line: u32,
        loop_id: Cell<u32>,
    },
}

impl Stmt {
    pub fn while_loop(cond: Expr, body: Stmt) -> Stmt {
        Stmt::While {
            cond,
            body: Box::new(body),
            loop_id: Cell::new(0),
        }
    }

    pub fn do_while_loop(body: Stmt, cond: Expr) -> Stmt {
        Stmt::DoWhile {
            body: Box::new(body),
            cond,
            loop_id: Cell::new(0),
        }
    }

    pub fn for_loop(
        init: Option<Stmt>,
        cond: Option<Expr>,
        post: Option<Expr>,
        body: Stmt,
    ) -> Stmt {
        Stmt::For {
            init: init.map(Box::new),
            cond,
            post,
            body: Box::new(body),
            loop_id: Cell::new(0),
        }
    }

    pub fn break_stmt(line: u32) -> Stmt {
        Stmt::Break {
            line,
            loop_id: Cell::new(0),
        }
    }

    pub fn continue_stmt(line: u32) -> Stmt {
        Stmt::Continue {
            line,
            loop_id: Cell::new(0),
        }
    }
}
