//! The diagnostic sink non-fatal lowering errors are pushed to.
//!
//! Grounded on the original compiler's `ErrorHandler`: a flat list of
//! `{line, where, message}` records plus a sticky "did we see an error"
//! flag the driver polls between stages.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub where_: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error{}: {}", self.line, self.where_, self.message)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn add(&mut self, line: u32, where_: impl Into<String>, message: impl Into<String>) {
        self.errors.push(Diagnostic {
            line,
            where_: where_.into(),
            message: message.into(),
        });
    }

    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter()
    }

    pub fn report(&self) {
        for error in &self.errors {
            eprintln!("{}", error);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn starts_clean() {
        let diagnostics = Diagnostics::new();
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn add_marks_error() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add(3, " at 'x'", "undefined variable");
        assert!(diagnostics.had_error());
        assert_eq!(diagnostics.iter().count(), 1);
    }
}
