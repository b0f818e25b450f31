//! Driver binary: wraps [`ccomp::compile_source`] with preprocessing and
//! assembler/linker invocation, mirroring the original `main.cc`'s
//! `PHASE_LEX`/`PHASE_PARSE`/`PHASE_TACKY`/`PHASE_CODEGEN` stop points.

#[macro_use]
extern crate clap;

use std::path::{Path, PathBuf};
use std::process::Command;

use clap::Arg;

use ccomp::{compile_source, CompileError, Stage};

#[derive(Debug)]
enum IOErrorContext {
    ReadInput,
    WriteOutput,
    Preprocess,
    Assemble,
}

#[derive(Debug)]
enum Error {
    Io(std::io::Error, IOErrorContext, PathBuf),
    Subprocess(IOErrorContext, PathBuf),
    Compile(CompileError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => write!(
                f,
                "{} file \"{}\" failed: {}",
                context_label(context),
                path.display(),
                err
            ),
            Error::Subprocess(context, path) => {
                write!(f, "{} \"{}\" failed", context_label(context), path.display())
            }
            Error::Compile(err) => {
                for diagnostic in err.diagnostics().iter() {
                    writeln!(f, "{}", diagnostic)?;
                }
                Ok(())
            }
        }
    }
}

fn context_label(context: &IOErrorContext) -> &'static str {
    match context {
        IOErrorContext::ReadInput => "Reading input",
        IOErrorContext::WriteOutput => "Writing output",
        IOErrorContext::Preprocess => "Preprocessing",
        IOErrorContext::Assemble => "Assembling/linking",
    }
}

/// Exit code of a finished, possibly-unsuccessful run.
impl Error {
    fn exit_code(&self) -> i32 {
        match self {
            Error::Compile(_) => 65,
            Error::Io(..) | Error::Subprocess(..) => 70,
        }
    }
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("FILE")
                .help("Sets the C source file to compile")
                .required(true)
                .index(1),
        )
        .arg(Arg::with_name("lex").long("lex").help("Stop after lexing"))
        .arg(Arg::with_name("parse").long("parse").help("Stop after parsing"))
        .arg(Arg::with_name("tacky").long("tacky").help("Stop after Tacky generation"))
        .arg(
            Arg::with_name("codegen")
                .long("codegen")
                .help("Stop after assembly emission; do not invoke the assembler"),
        )
        .get_matches();

    let input = matches.value_of("FILE").unwrap();
    let stop_after = if matches.is_present("lex") {
        Some("lex")
    } else if matches.is_present("parse") {
        Some("parse")
    } else if matches.is_present("tacky") {
        Some("tacky")
    } else if matches.is_present("codegen") {
        Some("codegen")
    } else {
        None
    };

    match run(input, stop_after) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(err.exit_code());
        }
    }
}

fn run(input: &str, stop_after: Option<&str>) -> Result<(), Error> {
    let input_path = Path::new(input);
    let preprocessed_path = input_path.with_extension("pre");

    preprocess(input_path, &preprocessed_path)?;

    let source = std::fs::read_to_string(&preprocessed_path)
        .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, preprocessed_path.clone()))?;

    let stage = compile_source(&source, stop_after).map_err(Error::Compile)?;

    let text = match stage {
        Stage::Asm(text) => text,
        Stage::Tokens(tokens) => {
            eprintln!("{:#?}", tokens);
            return Ok(());
        }
        Stage::Ast(program) => {
            eprintln!("{:#?}", program);
            return Ok(());
        }
        Stage::Tacky(program) => {
            eprintln!("{:#?}", program);
            return Ok(());
        }
    };

    let assembly_path = input_path.with_extension("s");
    std::fs::write(&assembly_path, &text)
        .map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, assembly_path.clone()))?;

    if stop_after == Some("codegen") {
        return Ok(());
    }

    assemble(&assembly_path, &input_path.with_extension(""))
}

fn preprocess(input_path: &Path, preprocessed_path: &Path) -> Result<(), Error> {
    let status = Command::new("cc")
        .arg("-E")
        .arg("-P")
        .arg(input_path)
        .arg("-o")
        .arg(preprocessed_path)
        .status()
        .map_err(|_| Error::Subprocess(IOErrorContext::Preprocess, input_path.to_owned()))?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Subprocess(IOErrorContext::Preprocess, input_path.to_owned()))
    }
}

fn assemble(assembly_path: &Path, output_path: &Path) -> Result<(), Error> {
    let status = Command::new("cc")
        .arg(assembly_path)
        .arg("-o")
        .arg(output_path)
        .status()
        .map_err(|_| Error::Subprocess(IOErrorContext::Assemble, assembly_path.to_owned()))?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Subprocess(IOErrorContext::Assemble, assembly_path.to_owned()))
    }
}
