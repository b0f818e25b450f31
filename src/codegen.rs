//! Assembly IR -> text: GNU assembler, AT&T syntax, x86-64, System V ABI
//! prologue/epilogue.

use std::fmt::Write;

use crate::asm::{BinaryOp, CondCode, Instruction, Operand, Program, Register, UnaryOp};

pub fn emit(program: &Program) -> String {
    let mut text = String::new();
    for function in &program.functions {
        emit_function(function, &mut text);
    }
    writeln!(text, ".section .note.GNU-stack,\"\",@progbits").unwrap();
    text
}

fn emit_function(function: &crate::asm::Function, out: &mut String) {
    writeln!(out, ".globl {}", function.name).unwrap();
    writeln!(out, "{}:", function.name).unwrap();
    writeln!(out, "  pushq %rbp").unwrap();
    writeln!(out, "  movq %rsp, %rbp").unwrap();
    for instruction in &function.instructions {
        emit_instruction(instruction, out);
    }
}

fn emit_instruction(instruction: &Instruction, out: &mut String) {
    match instruction {
        Instruction::Mov { src, dst } => {
            writeln!(out, "  movl {}, {}", operand(src), operand(dst)).unwrap();
        }
        Instruction::Unary { op, operand: o } => {
            writeln!(out, "  {} {}", unary_mnemonic(*op), operand(o)).unwrap();
        }
        Instruction::Binary { op, src, dst } => {
            writeln!(out, "  {} {}, {}", binary_mnemonic(*op), operand(src), operand(dst)).unwrap();
        }
        Instruction::Cmp { src, dst } => {
            writeln!(out, "  cmpl {}, {}", operand(src), operand(dst)).unwrap();
        }
        Instruction::Idiv(o) => {
            writeln!(out, "  idivl {}", operand(o)).unwrap();
        }
        Instruction::Cdq => {
            writeln!(out, "  cdq").unwrap();
        }
        Instruction::Jmp(label) => {
            writeln!(out, "  jmp .L_{}", label).unwrap();
        }
        Instruction::JmpCC { cc, target } => {
            writeln!(out, "  j{} .L_{}", cc_mnemonic(*cc), target).unwrap();
        }
        Instruction::SetCC { cc, operand: o } => {
            writeln!(out, "  set{} {}", cc_mnemonic(*cc), operand(o)).unwrap();
        }
        Instruction::Label(label) => {
            writeln!(out, ".L_{}:", label).unwrap();
        }
        Instruction::AllocateStack(size) => {
            writeln!(out, "  subq ${}, %rsp", size).unwrap();
        }
        Instruction::Return => {
            writeln!(out, "  movq %rbp, %rsp").unwrap();
            writeln!(out, "  popq %rbp").unwrap();
            writeln!(out, "  ret").unwrap();
        }
    }
}

fn operand(operand: &Operand) -> String {
    match operand {
        Operand::Imm(k) => format!("${}", k),
        Operand::Stack(n) => format!("-{}(%rbp)", n),
        Operand::Register(reg) => register(*reg).to_string(),
        Operand::Pseudo(_) => unreachable!("Pseudo operand reached codegen"),
    }
}

fn register(reg: Register) -> &'static str {
    match reg {
        Register::Ax => "%eax",
        Register::Dx => "%edx",
        Register::R10 => "%r10d",
        Register::R11 => "%r11d",
    }
}

fn unary_mnemonic(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Negl => "negl",
        UnaryOp::Notl => "notl",
    }
}

fn binary_mnemonic(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Addl => "addl",
        BinaryOp::Subl => "subl",
        BinaryOp::Imull => "imull",
    }
}

fn cc_mnemonic(cc: CondCode) -> &'static str {
    match cc {
        CondCode::E => "e",
        CondCode::Ne => "ne",
        CondCode::L => "l",
        CondCode::Le => "le",
        CondCode::G => "g",
        CondCode::Ge => "ge",
    }
}
