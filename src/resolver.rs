//! Variable-scope and loop-nesting resolution over the source AST.
//!
//! Grounded on the original compiler's `Resolver`: a stack of block scopes
//! stamps each `Variable` reference with the nesting depth of its
//! declaration, and a stack of freshly minted loop ids stamps every loop
//! body and the `break`/`continue` statements inside it. Both stamps are
//! written back into the AST's `Cell` fields so later stages (`tackygen`)
//! can read them without a second traversal. Diagnostics are pushed, never
//! fatal here - the driver stops after this stage only if any were raised.

use std::collections::HashSet;

use crate::ast::{Expr, Stmt};
use crate::diagnostics::Diagnostics;

pub struct Resolver<'a> {
    scopes: Vec<HashSet<String>>,
    loop_stack: Vec<u32>,
    next_loop_id: u32,
    functions: HashSet<String>,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Resolver<'a> {
    pub fn new(diagnostics: &'a mut Diagnostics) -> Resolver<'a> {
        Resolver {
            scopes: Vec::new(),
            loop_stack: Vec::new(),
            next_loop_id: 0,
            functions: HashSet::new(),
            diagnostics,
        }
    }

    pub fn resolve(&mut self, program: &[Stmt]) {
        for function in program {
            self.resolve_function(function);
        }
    }

    fn resolve_function(&mut self, function: &Stmt) {
        if let Stmt::Function { name, line, body, .. } = function {
            if !self.functions.insert(name.clone()) {
                self.diagnostics
                    .add(*line, "", format!("Function '{}' already declared.", name));
            }
            self.begin_scope();
            for stmt in body {
                self.resolve_stmt(stmt);
            }
            self.end_scope();
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => {
                self.begin_scope();
                for s in stmts {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::Function { .. } => {}
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(cond);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Stmt::While { cond, body, loop_id } => {
                self.resolve_expr(cond);
                let id = self.begin_loop();
                loop_id.set(id);
                self.resolve_stmt(body);
                self.end_loop();
            }
            Stmt::DoWhile { body, cond, loop_id } => {
                let id = self.begin_loop();
                loop_id.set(id);
                self.resolve_stmt(body);
                self.end_loop();
                self.resolve_expr(cond);
            }
            Stmt::For {
                init,
                cond,
                post,
                body,
                loop_id,
            } => {
                self.begin_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                if let Some(cond) = cond {
                    self.resolve_expr(cond);
                }
                if let Some(post) = post {
                    self.resolve_expr(post);
                }
                let id = self.begin_loop();
                loop_id.set(id);
                self.resolve_stmt(body);
                self.end_loop();
                self.end_scope();
            }
            Stmt::Decl {
                name,
                line,
                init,
                scope_level,
            } => {
                if let Some(init) = init {
                    self.resolve_expr(init);
                }
                scope_level.set(self.declare(name, *line));
            }
            Stmt::Null => {}
            Stmt::Break { line, loop_id } => match self.current_loop() {
                Some(id) => loop_id.set(id),
                None => self
                    .diagnostics
                    .add(*line, "", "'break' statement not in a loop."),
            },
            Stmt::Continue { line, loop_id } => match self.current_loop() {
                Some(id) => loop_id.set(id),
                None => self
                    .diagnostics
                    .add(*line, "", "'continue' statement not in a loop."),
            },
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign { lvalue, value, line } => {
                if !matches!(**lvalue, Expr::Variable { .. }) {
                    self.diagnostics.add(*line, "", "Invalid assignment target.");
                } else {
                    self.resolve_expr(lvalue);
                }
                self.resolve_expr(value);
            }
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(cond);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            Expr::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Literal { .. } => {}
            Expr::Variable {
                name,
                line,
                scope_level,
            } => match self.lookup(name) {
                Some(level) => scope_level.set(level),
                None => self
                    .diagnostics
                    .add(*line, "", format!("Undefined variable '{}'.", name)),
            },
        }
    }

    /// Declares `name` in the innermost scope and returns that scope's
    /// depth (the count of scopes currently open, innermost counted as 1),
    /// the same level `Variable` lookups resolve to.
    fn declare(&mut self, name: &str, line: u32) -> i32 {
        let level = self.scopes.len() as i32;
        let scope = self.scopes.last_mut().expect("declaration outside any scope");
        if !scope.insert(name.to_string()) {
            self.diagnostics.add(
                line,
                "",
                format!("Variable '{}' already declared in this scope.", name),
            );
        }
        level
    }

    fn lookup(&self, name: &str) -> Option<i32> {
        for (index, scope) in self.scopes.iter().enumerate().rev() {
            if scope.contains(name) {
                return Some(index as i32 + 1);
            }
        }
        None
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashSet::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn begin_loop(&mut self) -> u32 {
        let id = self.next_loop_id;
        self.next_loop_id += 1;
        self.loop_stack.push(id);
        id
    }

    fn end_loop(&mut self) {
        self.loop_stack.pop();
    }

    fn current_loop(&self) -> Option<u32> {
        self.loop_stack.last().copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve(source: &str) -> Diagnostics {
        let mut scan_diag = Diagnostics::new();
        let tokens = Scanner::new(source, &mut scan_diag).scan_tokens();
        let mut parse_diag = Diagnostics::new();
        let program = Parser::new(tokens, &mut parse_diag).parse();
        let mut diagnostics = Diagnostics::new();
        Resolver::new(&mut diagnostics).resolve(&program);
        diagnostics
    }

    #[test]
    fn accepts_well_scoped_program() {
        let diagnostics = resolve("int main(void) { int a = 1; { int b = a + 1; } return a; }");
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn rejects_duplicate_declaration_in_same_scope() {
        let diagnostics = resolve("int main(void) { int a = 1; int a = 2; return a; }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn allows_shadowing_in_nested_scope() {
        let diagnostics = resolve("int main(void) { int a = 1; { int a = 2; return a; } return a; }");
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn rejects_undefined_variable() {
        let diagnostics = resolve("int main(void) { return x; }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn rejects_invalid_assignment_target() {
        let diagnostics = resolve("int main(void) { 1 = 2; return 0; }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn rejects_break_outside_loop() {
        let diagnostics = resolve("int main(void) { break; return 0; }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn accepts_break_inside_loop() {
        let diagnostics = resolve("int main(void) { while (1) { break; } return 0; }");
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn rejects_duplicate_function_declaration() {
        let diagnostics = resolve(
            "int main(void) { return 1; } int main(void) { return 2; }",
        );
        assert!(diagnostics.had_error());
    }

    #[test]
    fn for_loop_header_is_its_own_scope() {
        let diagnostics = resolve("int main(void) { for (int i = 0; i < 10; i = i + 1) continue; return 0; }");
        assert!(!diagnostics.had_error());
    }
}
