//! Pseudo elimination and ISA-operand fixups.
//!
//! One pass per function: every `Pseudo` operand is replaced by a `Stack`
//! slot (first sight of a name claims the next 4-byte offset), then each
//! instruction is re-checked against the operand-form constraints the ISA
//! imposes, expanding illegal forms through the `R10`/`R11` scratch
//! registers. `AllocateStack(total_frame_size)` is finally prepended.

use std::collections::HashMap;

use crate::asm::{BinaryOp, Function, Instruction, Operand, Program, Register};

pub fn rewrite(program: Program) -> Program {
    Program {
        functions: program.functions.into_iter().map(rewrite_function).collect(),
    }
}

fn rewrite_function(function: Function) -> Function {
    let mut offsets: HashMap<String, i32> = HashMap::new();
    let mut frame_size = 0;

    let replaced: Vec<Instruction> = function
        .instructions
        .into_iter()
        .map(|instruction| replace_pseudos(instruction, &mut offsets, &mut frame_size))
        .collect();

    let mut instructions = Vec::with_capacity(replaced.len() + 1);
    instructions.push(Instruction::AllocateStack(frame_size));
    for instruction in replaced {
        fixup(instruction, &mut instructions);
    }

    Function {
        name: function.name,
        instructions,
    }
}

fn replace_pseudos(
    instruction: Instruction,
    offsets: &mut HashMap<String, i32>,
    frame_size: &mut i32,
) -> Instruction {
    let mut resolve = |operand: Operand| -> Operand {
        match operand {
            Operand::Pseudo(name) => {
                let offset = *offsets.entry(name).or_insert_with(|| {
                    *frame_size += 4;
                    *frame_size
                });
                Operand::Stack(offset)
            }
            other => other,
        }
    };

    match instruction {
        Instruction::Mov { src, dst } => Instruction::Mov {
            src: resolve(src),
            dst: resolve(dst),
        },
        Instruction::Unary { op, operand } => Instruction::Unary {
            op,
            operand: resolve(operand),
        },
        Instruction::Binary { op, src, dst } => Instruction::Binary {
            op,
            src: resolve(src),
            dst: resolve(dst),
        },
        Instruction::Cmp { src, dst } => Instruction::Cmp {
            src: resolve(src),
            dst: resolve(dst),
        },
        Instruction::Idiv(operand) => Instruction::Idiv(resolve(operand)),
        Instruction::SetCC { cc, operand } => Instruction::SetCC {
            cc,
            operand: resolve(operand),
        },
        other @ (Instruction::Cdq
        | Instruction::Jmp(_)
        | Instruction::JmpCC { .. }
        | Instruction::Label(_)
        | Instruction::Return) => other,
        Instruction::AllocateStack(_) => {
            unreachable!("AllocateStack must not appear as rewrite-pass input")
        }
    }
}

fn is_stack(operand: &Operand) -> bool {
    matches!(operand, Operand::Stack(_))
}

fn is_imm(operand: &Operand) -> bool {
    matches!(operand, Operand::Imm(_))
}

fn fixup(instruction: Instruction, out: &mut Vec<Instruction>) {
    match instruction {
        Instruction::Mov { src, dst } if is_stack(&src) && is_stack(&dst) => {
            out.push(Instruction::Mov {
                src,
                dst: Operand::Register(Register::R10),
            });
            out.push(Instruction::Mov {
                src: Operand::Register(Register::R10),
                dst,
            });
        }
        Instruction::Cmp { src, dst } if is_stack(&src) && is_stack(&dst) => {
            out.push(Instruction::Mov {
                src,
                dst: Operand::Register(Register::R10),
            });
            out.push(Instruction::Cmp {
                src: Operand::Register(Register::R10),
                dst,
            });
        }
        Instruction::Cmp { src, dst } if is_imm(&dst) => {
            out.push(Instruction::Mov {
                src: dst,
                dst: Operand::Register(Register::R11),
            });
            out.push(Instruction::Cmp {
                src,
                dst: Operand::Register(Register::R11),
            });
        }
        Instruction::Binary { op, src, dst }
            if matches!(op, BinaryOp::Addl | BinaryOp::Subl) && is_stack(&src) && is_stack(&dst) =>
        {
            out.push(Instruction::Mov {
                src,
                dst: Operand::Register(Register::R10),
            });
            out.push(Instruction::Binary {
                op,
                src: Operand::Register(Register::R10),
                dst,
            });
        }
        Instruction::Binary {
            op: BinaryOp::Imull,
            src,
            dst,
        } if is_stack(&dst) => {
            out.push(Instruction::Mov {
                src: dst.clone(),
                dst: Operand::Register(Register::R11),
            });
            out.push(Instruction::Binary {
                op: BinaryOp::Imull,
                src,
                dst: Operand::Register(Register::R11),
            });
            out.push(Instruction::Mov {
                src: Operand::Register(Register::R11),
                dst,
            });
        }
        Instruction::Idiv(operand) if is_imm(&operand) => {
            out.push(Instruction::Mov {
                src: operand,
                dst: Operand::Register(Register::R10),
            });
            out.push(Instruction::Idiv(Operand::Register(Register::R10)));
        }
        other => out.push(other),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::asm::Instruction as I;

    fn stack_fn(instructions: Vec<Instruction>) -> Function {
        Function {
            name: "main".to_string(),
            instructions,
        }
    }

    #[test]
    fn allocates_distinct_offsets_per_pseudo() {
        let function = stack_fn(vec![
            I::Mov {
                src: Operand::Imm(1),
                dst: Operand::Pseudo("a".to_string()),
            },
            I::Mov {
                src: Operand::Imm(2),
                dst: Operand::Pseudo("b".to_string()),
            },
            I::Mov {
                src: Operand::Pseudo("a".to_string()),
                dst: Operand::Register(Register::Ax),
            },
        ]);
        let rewritten = rewrite_function(function);
        assert!(matches!(rewritten.instructions[0], I::AllocateStack(8)));
        let offsets: Vec<i32> = rewritten
            .instructions
            .iter()
            .filter_map(|i| match i {
                I::Mov { dst: Operand::Stack(n), .. } => Some(*n),
                _ => None,
            })
            .collect();
        assert!(offsets.contains(&4));
        assert!(offsets.contains(&8));
    }

    #[test]
    fn stack_to_stack_mov_goes_through_r10() {
        let function = stack_fn(vec![I::Mov {
            src: Operand::Pseudo("a".to_string()),
            dst: Operand::Pseudo("b".to_string()),
        }]);
        let rewritten = rewrite_function(function);
        let instructions = &rewritten.instructions[1..];
        assert!(matches!(
            instructions[0],
            I::Mov { dst: Operand::Register(Register::R10), .. }
        ));
        assert!(matches!(
            instructions[1],
            I::Mov { src: Operand::Register(Register::R10), .. }
        ));
    }

    #[test]
    fn imul_with_stack_destination_routes_through_r11() {
        let function = stack_fn(vec![I::Binary {
            op: BinaryOp::Imull,
            src: Operand::Imm(3),
            dst: Operand::Pseudo("a".to_string()),
        }]);
        let rewritten = rewrite_function(function);
        let instructions = &rewritten.instructions[1..];
        assert!(matches!(
            instructions[1],
            I::Binary { op: BinaryOp::Imull, dst: Operand::Register(Register::R11), .. }
        ));
        assert!(matches!(
            instructions[2],
            I::Mov { src: Operand::Register(Register::R11), dst: Operand::Stack(_) }
        ));
    }

    #[test]
    fn idiv_immediate_routes_through_r10() {
        let function = stack_fn(vec![I::Idiv(Operand::Imm(3))]);
        let rewritten = rewrite_function(function);
        assert!(matches!(rewritten.instructions[0], I::AllocateStack(0)));
        assert!(matches!(
            rewritten.instructions[1],
            I::Mov { dst: Operand::Register(Register::R10), .. }
        ));
        assert!(matches!(rewritten.instructions[2], I::Idiv(Operand::Register(Register::R10))));
    }
}
