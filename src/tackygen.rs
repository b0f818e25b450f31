//! Lowers the resolved source AST to the flat three-address Tacky IR.
//!
//! Emit-while-evaluate style: `gen_expr` returns the [`tacky::Operand`]
//! holding an expression's result, pushing any side-effecting instructions
//! onto the current function's buffer as it goes. Grounded on the original
//! compiler's `TackyGen` (final revision, the only one with full control
//! flow): one emitter method per AST node kind, two monotone counters for
//! fresh names, and resolver-assigned loop ids for `break`/`continue`.

use crate::ast::{BinaryOp, Expr, Stmt, UnaryOp};
use crate::namegen::{break_label, continue_label, NameGen};
use crate::tacky::{Function, Instruction, Operand, Program};

pub struct TackyGen<'a> {
    names: &'a mut NameGen,
    instructions: Vec<Instruction>,
}

impl<'a> TackyGen<'a> {
    pub fn new(names: &'a mut NameGen) -> TackyGen<'a> {
        TackyGen {
            names,
            instructions: Vec::new(),
        }
    }

    pub fn gen(mut self, program: &[Stmt]) -> Program {
        let functions = program
            .iter()
            .filter_map(|stmt| self.gen_function(stmt))
            .collect();
        Program { functions }
    }

    fn gen_function(&mut self, stmt: &Stmt) -> Option<Function> {
        let (name, body) = match stmt {
            Stmt::Function { name, body, .. } => (name.clone(), body),
            _ => return None,
        };
        self.instructions.clear();
        for s in body {
            self.gen_stmt(s);
        }
        self.emit(Instruction::Return(Operand::Constant(0)));
        Some(Function {
            name,
            instructions: std::mem::take(&mut self.instructions),
        })
    }

    fn gen_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.gen_stmt(s);
                }
            }
            Stmt::Expression(expr) => {
                self.gen_expr(expr);
            }
            Stmt::Function { .. } => {}
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => self.gen_if(cond, then_branch, else_branch.as_deref()),
            Stmt::Return { value, .. } => {
                let v = match value {
                    Some(expr) => self.gen_expr(expr),
                    None => Operand::Constant(0),
                };
                self.emit(Instruction::Return(v));
            }
            Stmt::While { cond, body, loop_id } => self.gen_while(cond, body, loop_id.get()),
            Stmt::DoWhile { body, cond, loop_id } => self.gen_do_while(body, cond, loop_id.get()),
            Stmt::For {
                init,
                cond,
                post,
                body,
                loop_id,
            } => self.gen_for(init.as_deref(), cond.as_ref(), post.as_ref(), body, loop_id.get()),
            Stmt::Decl {
                name,
                init,
                scope_level,
                ..
            } => {
                if let Some(init) = init {
                    let value = self.gen_expr(init);
                    self.emit(Instruction::Copy {
                        src: value,
                        dst: Operand::Var(unique_var_name(name, scope_level.get())),
                    });
                }
            }
            Stmt::Null => {}
            Stmt::Break { loop_id, .. } => self.emit(Instruction::Jump {
                target: break_label(loop_id.get()),
            }),
            Stmt::Continue { loop_id, .. } => self.emit(Instruction::Jump {
                target: continue_label(loop_id.get()),
            }),
        }
    }

    fn gen_if(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) {
        let cv = self.gen_expr(cond);
        match else_branch {
            None => {
                let end = self.names.label("if_end");
                self.emit(Instruction::JumpIfZero {
                    cond: cv,
                    target: end.clone(),
                });
                self.gen_stmt(then_branch);
                self.emit(Instruction::Label(end));
            }
            Some(else_branch) => {
                let else_label = self.names.label("if_else");
                let end = self.names.label("if_end");
                self.emit(Instruction::JumpIfZero {
                    cond: cv,
                    target: else_label.clone(),
                });
                self.gen_stmt(then_branch);
                self.emit(Instruction::Jump { target: end.clone() });
                self.emit(Instruction::Label(else_label));
                self.gen_stmt(else_branch);
                self.emit(Instruction::Label(end));
            }
        }
    }

    fn gen_while(&mut self, cond: &Expr, body: &Stmt, loop_id: u32) {
        let continue_lbl = continue_label(loop_id);
        let break_lbl = break_label(loop_id);
        self.emit(Instruction::Label(continue_lbl.clone()));
        let cv = self.gen_expr(cond);
        self.emit(Instruction::JumpIfZero {
            cond: cv,
            target: break_lbl.clone(),
        });
        self.gen_stmt(body);
        self.emit(Instruction::Jump { target: continue_lbl });
        self.emit(Instruction::Label(break_lbl));
    }

    fn gen_do_while(&mut self, body: &Stmt, cond: &Expr, loop_id: u32) {
        let start = self.names.label("do_start");
        let continue_lbl = continue_label(loop_id);
        let break_lbl = break_label(loop_id);
        self.emit(Instruction::Label(start.clone()));
        self.gen_stmt(body);
        self.emit(Instruction::Label(continue_lbl));
        let cv = self.gen_expr(cond);
        self.emit(Instruction::JumpIfNotZero {
            cond: cv,
            target: start,
        });
        self.emit(Instruction::Label(break_lbl));
    }

    fn gen_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        post: Option<&Expr>,
        body: &Stmt,
        loop_id: u32,
    ) {
        if let Some(init) = init {
            self.gen_stmt(init);
        }
        let start = self.names.label("for_start");
        let continue_lbl = continue_label(loop_id);
        let break_lbl = break_label(loop_id);
        self.emit(Instruction::Label(start.clone()));
        if let Some(cond) = cond {
            let cv = self.gen_expr(cond);
            self.emit(Instruction::JumpIfZero {
                cond: cv,
                target: break_lbl.clone(),
            });
        }
        self.gen_stmt(body);
        self.emit(Instruction::Label(continue_lbl));
        if let Some(post) = post {
            self.gen_expr(post);
        }
        self.emit(Instruction::Jump { target: start });
        self.emit(Instruction::Label(break_lbl));
    }

    fn gen_expr(&mut self, expr: &Expr) -> Operand {
        match expr {
            Expr::Literal { value } => Operand::Constant(*value),
            Expr::Variable { name, scope_level, .. } => {
                Operand::Var(unique_var_name(name, scope_level.get()))
            }
            Expr::Unary { op, right } => self.gen_unary(*op, right),
            Expr::Binary { op, left, right } if op.is_logical() => {
                self.gen_logical(*op, left, right)
            }
            Expr::Binary { op, left, right } => self.gen_binary(*op, left, right),
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => self.gen_conditional(cond, then_branch, else_branch),
            Expr::Assign { lvalue, value, .. } => self.gen_assign(lvalue, value),
        }
    }

    fn gen_unary(&mut self, op: UnaryOp, right: &Expr) -> Operand {
        let src = self.gen_expr(right);
        let dst = Operand::Var(self.names.tmp());
        self.emit(Instruction::Unary {
            op,
            src,
            dst: dst.clone(),
        });
        dst
    }

    fn gen_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Operand {
        let src1 = self.gen_expr(left);
        let src2 = self.gen_expr(right);
        let dst = Operand::Var(self.names.tmp());
        self.emit(Instruction::Binary {
            op,
            src1,
            src2,
            dst: dst.clone(),
        });
        dst
    }

    /// `&&`/`||` must not evaluate the RHS once the LHS already determines
    /// the result.
    fn gen_logical(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Operand {
        let is_and = op == BinaryOp::And;
        let success = if is_and { 1 } else { 0 };
        let short_circuit = self.names.label(if is_and { "and_false" } else { "or_true" });
        let end = self.names.label(if is_and { "and_end" } else { "or_end" });
        let result = Operand::Var(self.names.tmp());

        let v1 = self.gen_expr(left);
        self.emit(short_circuit_jump(is_and, v1, short_circuit.clone()));
        let v2 = self.gen_expr(right);
        self.emit(short_circuit_jump(is_and, v2, short_circuit.clone()));
        self.emit(Instruction::Copy {
            src: Operand::Constant(success),
            dst: result.clone(),
        });
        self.emit(Instruction::Jump { target: end.clone() });
        self.emit(Instruction::Label(short_circuit));
        self.emit(Instruction::Copy {
            src: Operand::Constant(1 - success),
            dst: result.clone(),
        });
        self.emit(Instruction::Label(end));
        result
    }

    fn gen_conditional(&mut self, cond: &Expr, then_branch: &Expr, else_branch: &Expr) -> Operand {
        let else_label = self.names.label("cond_else");
        let end = self.names.label("cond_end");
        let result = Operand::Var(self.names.tmp());

        let cv = self.gen_expr(cond);
        self.emit(Instruction::JumpIfZero {
            cond: cv,
            target: else_label.clone(),
        });
        let av = self.gen_expr(then_branch);
        self.emit(Instruction::Copy {
            src: av,
            dst: result.clone(),
        });
        self.emit(Instruction::Jump { target: end.clone() });
        self.emit(Instruction::Label(else_label));
        let bv = self.gen_expr(else_branch);
        self.emit(Instruction::Copy {
            src: bv,
            dst: result.clone(),
        });
        self.emit(Instruction::Label(end));
        result
    }

    fn gen_assign(&mut self, lvalue: &Expr, value: &Expr) -> Operand {
        let v = self.gen_expr(value);
        let dst = match lvalue {
            Expr::Variable { name, scope_level, .. } => {
                Operand::Var(unique_var_name(name, scope_level.get()))
            }
            _ => unreachable!("resolver rejects non-Variable assignment targets"),
        };
        self.emit(Instruction::Copy {
            src: v,
            dst: dst.clone(),
        });
        dst
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }
}

fn short_circuit_jump(is_and: bool, cond: Operand, target: String) -> Instruction {
    if is_and {
        Instruction::JumpIfZero { cond, target }
    } else {
        Instruction::JumpIfNotZero { cond, target }
    }
}

/// Composes a user variable's name with its declaring scope level, giving a
/// collision-free Tacky identifier across nested blocks that shadow it.
fn unique_var_name(name: &str, scope_level: i32) -> String {
    format!("{}_scope_level{}", name, scope_level)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;
    use crate::diagnostics::Diagnostics;

    fn lower(source: &str) -> Program {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(source, &mut diagnostics).scan_tokens();
        let program = Parser::new(tokens, &mut diagnostics).parse();
        Resolver::new(&mut diagnostics).resolve(&program);
        assert!(!diagnostics.had_error());
        let mut names = NameGen::new();
        TackyGen::new(&mut names).gen(&program)
    }

    #[test]
    fn missing_return_gets_implicit_zero() {
        let program = lower("int main(void) { int a = 1; }");
        let last = program.functions[0].instructions.last().unwrap();
        assert!(matches!(last, Instruction::Return(Operand::Constant(0))));
    }

    #[test]
    fn explicit_return_is_preserved() {
        // Every function gets a trailing `Return(Constant 0)` regardless of
        // whether the body already returns (mirrors the original compiler's
        // unconditional append in `TackyGen::operator()(const Function&)`),
        // so the explicit return must appear before that trailer, not as
        // the very last instruction.
        let program = lower("int main(void) { return 2; }");
        let instructions = &program.functions[0].instructions;
        assert!(instructions
            .iter()
            .any(|i| matches!(i, Instruction::Return(Operand::Constant(2)))));
        assert!(matches!(
            instructions.last(),
            Some(Instruction::Return(Operand::Constant(0)))
        ));
    }

    #[test]
    fn logical_and_short_circuits() {
        let program = lower("int main(void) { int a = 0; int b = 0; return (a = 1) && (b = 2); }");
        let instructions = &program.functions[0].instructions;
        let jump_pos = instructions
            .iter()
            .position(|i| matches!(i, Instruction::JumpIfZero { .. }))
            .expect("expected a JumpIfZero for the LHS check");
        let rhs_assigns_b = instructions
            .iter()
            .skip(jump_pos + 1)
            .any(|i| matches!(i, Instruction::Copy { dst: Operand::Var(n), .. } if n.contains('b')));
        assert!(rhs_assigns_b);
    }

    #[test]
    fn loop_break_and_continue_target_shared_labels() {
        let program = lower(
            "int main(void) { int r = 0; for (int i = 0; i < 5; i = i + 1) { if (i == 3) break; r = r + i; } return r; }",
        );
        let instructions = &program.functions[0].instructions;
        let labels: Vec<&str> = instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Label(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert!(labels.iter().any(|l| l.starts_with("break.")));
        assert!(labels.iter().any(|l| l.starts_with("continue.")));
    }

    #[test]
    fn variables_are_named_with_scope_level() {
        let program = lower("int main(void) { int a = 1; { int a = 2; return a; } return a; }");
        let instructions = &program.functions[0].instructions;
        let names: Vec<&str> = instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Copy { dst: Operand::Var(n), .. } => Some(n.as_str()),
                _ => None,
            })
            .collect();
        assert!(names.iter().any(|n| *n == "a_scope_level1"));
        assert!(names.iter().any(|n| *n == "a_scope_level2"));
    }
}
