//! A small ahead-of-time compiler for a restricted subset of C, lowering
//! source text to GNU-syntax x86-64 assembly.
//!
//! The pipeline is, leaves first: [`scanner`] -> [`parser`] -> [`resolver`]
//! -> [`tackygen`] (source AST -> three-address IR) -> [`asmgen`]
//! (three-address IR -> target assembly IR) -> [`codegen`] (assembly IR ->
//! text). [`compile_source`] drives all stages; the `cli` binary in this
//! workspace wraps it with preprocessing and assembler/linker invocation.

pub mod ast;
pub mod asm;
pub mod asmgen;
pub mod codegen;
pub mod diagnostics;
pub mod namegen;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod tacky;
pub mod tackygen;
pub mod token;

use diagnostics::Diagnostics;

/// Every way [`compile_source`] can fail to produce assembly text.
///
/// Each variant carries the accumulated diagnostics from the stage that
/// found them; lowering never runs on a seen-error state (matching the
/// distilled spec's stage-by-stage stop rule).
#[derive(Debug)]
pub enum CompileError {
    Lex(Diagnostics),
    Parse(Diagnostics),
    Resolve(Diagnostics),
}

impl CompileError {
    pub fn diagnostics(&self) -> &Diagnostics {
        match self {
            CompileError::Lex(d) | CompileError::Parse(d) | CompileError::Resolve(d) => d,
        }
    }
}

/// The result of running one prefix of the pipeline, used by the CLI's
/// `--lex`/`--parse`/`--tacky`/`--codegen` stop-flags.
#[derive(Debug)]
pub enum Stage {
    Tokens(Vec<token::Token>),
    Ast(Vec<ast::Stmt>),
    Tacky(tacky::Program),
    Asm(String),
}

/// Runs the pipeline through the stage named by `stop_after` (or to
/// completion if `None`), consuming `source`.
///
/// `stop_after` is one of `"lex"`, `"parse"`, `"tacky"`, `"codegen"`; any
/// other value (including `None`) runs the full pipeline.
pub fn compile_source(source: &str, stop_after: Option<&str>) -> Result<Stage, CompileError> {
    let mut diagnostics = Diagnostics::new();

    let tokens = scanner::Scanner::new(source, &mut diagnostics).scan_tokens();
    if diagnostics.had_error() {
        return Err(CompileError::Lex(diagnostics));
    }
    if stop_after == Some("lex") {
        return Ok(Stage::Tokens(tokens));
    }

    let program = parser::Parser::new(tokens, &mut diagnostics).parse();
    if diagnostics.had_error() {
        return Err(CompileError::Parse(diagnostics));
    }
    if stop_after == Some("parse") {
        return Ok(Stage::Ast(program));
    }

    resolver::Resolver::new(&mut diagnostics).resolve(&program);
    if diagnostics.had_error() {
        return Err(CompileError::Resolve(diagnostics));
    }

    let mut names = namegen::NameGen::new();
    let tacky_program = tackygen::TackyGen::new(&mut names).gen(&program);
    if stop_after == Some("tacky") {
        return Ok(Stage::Tacky(tacky_program));
    }

    let asm_program = asmgen::gen(&tacky_program);
    let text = codegen::emit(&asm_program);
    Ok(Stage::Asm(text))
}
