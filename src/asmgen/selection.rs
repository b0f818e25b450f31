//! Instruction selection: one Tacky instruction maps to a short burst of
//! assembly instructions carrying `Pseudo` operands for every Tacky
//! temporary and variable.

use crate::asm::{self, CondCode};
use crate::ast::{BinaryOp as AstBinaryOp, UnaryOp as AstUnaryOp};
use crate::tacky;

pub fn select(program: &tacky::Program) -> asm::Program {
    let functions = program.functions.iter().map(select_function).collect();
    asm::Program { functions }
}

fn select_function(function: &tacky::Function) -> asm::Function {
    let mut instructions = Vec::new();
    for instruction in &function.instructions {
        select_instruction(instruction, &mut instructions);
    }
    asm::Function {
        name: function.name.clone(),
        instructions,
    }
}

fn select_instruction(instruction: &tacky::Instruction, out: &mut Vec<asm::Instruction>) {
    match instruction {
        tacky::Instruction::Copy { src, dst } => out.push(asm::Instruction::Mov {
            src: operand(src),
            dst: operand(dst),
        }),
        tacky::Instruction::Unary {
            op: AstUnaryOp::Not,
            src,
            dst,
        } => {
            out.push(asm::Instruction::Cmp {
                src: asm::Operand::Imm(0),
                dst: operand(src),
            });
            out.push(asm::Instruction::Mov {
                src: asm::Operand::Imm(0),
                dst: operand(dst),
            });
            out.push(asm::Instruction::SetCC {
                cc: CondCode::E,
                operand: operand(dst),
            });
        }
        tacky::Instruction::Unary { op, src, dst } => {
            out.push(asm::Instruction::Mov {
                src: operand(src),
                dst: operand(dst),
            });
            out.push(asm::Instruction::Unary {
                op: unary_op(*op),
                operand: operand(dst),
            });
        }
        tacky::Instruction::Binary { op, .. } if op.is_logical() => {
            unreachable!("&&/|| are lowered to jumps by tackygen, not Binary")
        }
        tacky::Instruction::Binary {
            op: AstBinaryOp::Divide,
            src1,
            src2,
            dst,
        } => {
            out.push(asm::Instruction::Mov {
                src: operand(src1),
                dst: asm::Operand::Register(asm::Register::Ax),
            });
            out.push(asm::Instruction::Cdq);
            out.push(asm::Instruction::Idiv(operand(src2)));
            out.push(asm::Instruction::Mov {
                src: asm::Operand::Register(asm::Register::Ax),
                dst: operand(dst),
            });
        }
        tacky::Instruction::Binary {
            op: AstBinaryOp::Remainder,
            src1,
            src2,
            dst,
        } => {
            out.push(asm::Instruction::Mov {
                src: operand(src1),
                dst: asm::Operand::Register(asm::Register::Ax),
            });
            out.push(asm::Instruction::Cdq);
            out.push(asm::Instruction::Idiv(operand(src2)));
            out.push(asm::Instruction::Mov {
                src: asm::Operand::Register(asm::Register::Dx),
                dst: operand(dst),
            });
        }
        tacky::Instruction::Binary { op, src1, src2, dst } if is_relational(*op) => {
            out.push(asm::Instruction::Cmp {
                src: operand(src2),
                dst: operand(src1),
            });
            out.push(asm::Instruction::Mov {
                src: asm::Operand::Imm(0),
                dst: operand(dst),
            });
            out.push(asm::Instruction::SetCC {
                cc: cond_code(*op),
                operand: operand(dst),
            });
        }
        tacky::Instruction::Binary { op, src1, src2, dst } => {
            out.push(asm::Instruction::Mov {
                src: operand(src1),
                dst: operand(dst),
            });
            out.push(asm::Instruction::Binary {
                op: binary_op(*op),
                src: operand(src2),
                dst: operand(dst),
            });
        }
        tacky::Instruction::Jump { target } => out.push(asm::Instruction::Jmp(target.clone())),
        tacky::Instruction::JumpIfZero { cond, target } => {
            out.push(asm::Instruction::Cmp {
                src: asm::Operand::Imm(0),
                dst: operand(cond),
            });
            out.push(asm::Instruction::JmpCC {
                cc: CondCode::E,
                target: target.clone(),
            });
        }
        tacky::Instruction::JumpIfNotZero { cond, target } => {
            out.push(asm::Instruction::Cmp {
                src: asm::Operand::Imm(0),
                dst: operand(cond),
            });
            out.push(asm::Instruction::JmpCC {
                cc: CondCode::Ne,
                target: target.clone(),
            });
        }
        tacky::Instruction::Label(name) => out.push(asm::Instruction::Label(name.clone())),
        tacky::Instruction::Return(value) => {
            out.push(asm::Instruction::Mov {
                src: operand(value),
                dst: asm::Operand::Register(asm::Register::Ax),
            });
            out.push(asm::Instruction::Return);
        }
    }
}

fn operand(value: &tacky::Operand) -> asm::Operand {
    match value {
        tacky::Operand::Constant(k) => asm::Operand::Imm(*k),
        tacky::Operand::Var(name) => asm::Operand::Pseudo(name.clone()),
    }
}

fn unary_op(op: AstUnaryOp) -> asm::UnaryOp {
    match op {
        AstUnaryOp::Complement => asm::UnaryOp::Notl,
        AstUnaryOp::Negate => asm::UnaryOp::Negl,
        AstUnaryOp::Not => unreachable!("handled directly in select_instruction"),
    }
}

fn binary_op(op: AstBinaryOp) -> asm::BinaryOp {
    match op {
        AstBinaryOp::Add => asm::BinaryOp::Addl,
        AstBinaryOp::Subtract => asm::BinaryOp::Subl,
        AstBinaryOp::Multiply => asm::BinaryOp::Imull,
        _ => unreachable!("not a plain arithmetic op: {:?}", op),
    }
}

fn is_relational(op: AstBinaryOp) -> bool {
    matches!(
        op,
        AstBinaryOp::Equal
            | AstBinaryOp::NotEqual
            | AstBinaryOp::Less
            | AstBinaryOp::LessEqual
            | AstBinaryOp::Greater
            | AstBinaryOp::GreaterEqual
    )
}

fn cond_code(op: AstBinaryOp) -> CondCode {
    match op {
        AstBinaryOp::Equal => CondCode::E,
        AstBinaryOp::NotEqual => CondCode::Ne,
        AstBinaryOp::Less => CondCode::L,
        AstBinaryOp::LessEqual => CondCode::Le,
        AstBinaryOp::Greater => CondCode::G,
        AstBinaryOp::GreaterEqual => CondCode::Ge,
        _ => unreachable!("not a relational op: {:?}", op),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::namegen::NameGen;
    use crate::tackygen::TackyGen;
    use crate::{parser::Parser, resolver::Resolver, scanner::Scanner};
    use crate::diagnostics::Diagnostics;

    fn select_source(source: &str) -> asm::Program {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(source, &mut diagnostics).scan_tokens();
        let program = Parser::new(tokens, &mut diagnostics).parse();
        Resolver::new(&mut diagnostics).resolve(&program);
        let mut names = NameGen::new();
        let tacky_program = TackyGen::new(&mut names).gen(&program);
        select(&tacky_program)
    }

    #[test]
    fn division_uses_cdq_and_idiv() {
        let program = select_source("int main(void) { return 10 / 3; }");
        let instructions = &program.functions[0].instructions;
        assert!(instructions.iter().any(|i| matches!(i, asm::Instruction::Cdq)));
        assert!(instructions.iter().any(|i| matches!(i, asm::Instruction::Idiv(_))));
    }

    #[test]
    fn relational_uses_cmp_and_setcc() {
        let program = select_source("int main(void) { return 1 < 2; }");
        let instructions = &program.functions[0].instructions;
        assert!(instructions
            .iter()
            .any(|i| matches!(i, asm::Instruction::SetCC { cc: CondCode::L, .. })));
    }

    #[test]
    fn pseudo_operands_are_introduced_for_variables() {
        let program = select_source("int main(void) { int a = 1; return a; }");
        let instructions = &program.functions[0].instructions;
        assert!(instructions.iter().any(|i| matches!(
            i,
            asm::Instruction::Mov { dst: asm::Operand::Pseudo(_), .. }
        )));
    }
}
