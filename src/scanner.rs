//! Turns a preprocessed source string into a flat token stream.
//!
//! A single left-to-right pass using "maximal munch" for identifiers and
//! two-character operators, grounded on the original compiler's `Scanner`.
//! Unknown characters and malformed numbers push a diagnostic and scanning
//! continues, so a single run can surface more than one lexical error.

use crate::diagnostics::Diagnostics;
use crate::token::{keyword, Token, TokenKind};

pub struct Scanner<'a> {
    source: Vec<char>,
    start: usize,
    current: usize,
    line: u32,
    tokens: Vec<Token>,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &str, diagnostics: &'a mut Diagnostics) -> Scanner<'a> {
        Scanner {
            source: source.chars().collect(),
            start: 0,
            current: 0,
            line: 1,
            tokens: Vec::new(),
            diagnostics,
        }
    }

    pub fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }
        self.tokens.push(Token::new(TokenKind::Eof, "", self.line));
        self.tokens
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add(TokenKind::LeftParen),
            ')' => self.add(TokenKind::RightParen),
            '{' => self.add(TokenKind::LeftBrace),
            '}' => self.add(TokenKind::RightBrace),
            ',' => self.add(TokenKind::Comma),
            ';' => self.add(TokenKind::Semicolon),
            '?' => self.add(TokenKind::Question),
            ':' => self.add(TokenKind::Colon),
            '+' => self.add(TokenKind::Plus),
            '*' => self.add(TokenKind::Star),
            '%' => self.add(TokenKind::Percent),
            '~' => self.add(TokenKind::Tilde),
            '-' => self.add(TokenKind::Minus),
            '!' => {
                let kind = if self.match_next('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.add(kind);
            }
            '=' => {
                let kind = if self.match_next('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add(kind);
            }
            '<' => {
                let kind = if self.match_next('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.add(kind);
            }
            '>' => {
                let kind = if self.match_next('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.add(kind);
            }
            '&' => {
                if self.match_next('&') {
                    self.add(TokenKind::AmpAmp);
                } else {
                    self.error("Expected '&&'.");
                }
            }
            '|' => {
                if self.match_next('|') {
                    self.add(TokenKind::PipePipe);
                } else {
                    self.error("Expected '||'.");
                }
            }
            '/' => {
                if self.match_next('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_next('*') {
                    self.block_comment();
                } else {
                    self.add(TokenKind::Slash);
                }
            }
            c if c.is_whitespace() => {
                if c == '\n' {
                    self.line += 1;
                }
            }
            c if c.is_ascii_digit() => self.number(),
            c if is_alpha(c) => self.identifier(),
            c => self.error(&format!("Unexpected character: '{}'.", c)),
        }
    }

    fn block_comment(&mut self) {
        while !self.is_at_end() {
            if self.peek() == '*' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                return;
            }
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }
        self.error("Unterminated block comment.");
    }

    fn identifier(&mut self) {
        while is_alphanumeric(self.peek()) {
            self.advance();
        }
        let text = self.lexeme();
        match keyword(&text) {
            Some(kind) => self.add(kind),
            None => self.add(TokenKind::Identifier),
        }
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if is_alpha(self.peek()) {
            let text = self.lexeme();
            self.error(&format!("Malformed number: {}.", text));
            return;
        }
        let text = self.lexeme();
        match text.parse::<i32>() {
            Ok(value) => {
                self.tokens.push(Token::number(text, value, self.line));
            }
            Err(_) => self.error(&format!("Integer literal out of range: {}.", text)),
        }
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn add(&mut self, kind: TokenKind) {
        let lexeme = self.lexeme();
        self.tokens.push(Token::new(kind, lexeme, self.line));
    }

    fn error(&mut self, message: &str) {
        self.diagnostics.add(self.line, "", message);
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn peek(&self) -> char {
        *self.source.get(self.current).unwrap_or(&'\0')
    }

    fn peek_next(&self) -> char {
        *self.source.get(self.current + 1).unwrap_or(&'\0')
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alphanumeric(c: char) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod test {
    use super::*;

    fn scan(source: &str) -> (Vec<TokenKind>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let kinds = {
            let scanner = Scanner::new(source, &mut diagnostics);
            scanner.scan_tokens().into_iter().map(|t| t.kind).collect()
        };
        (kinds, diagnostics)
    }

    #[test]
    fn punctuation_and_keywords() {
        let (kinds, diagnostics) = scan("int main(void) { return 0; }");
        assert!(!diagnostics.had_error());
        assert_eq!(
            kinds,
            vec![
                TokenKind::Int,
                TokenKind::Identifier,
                TokenKind::LeftParen,
                TokenKind::Void,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::Return,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::RightBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn two_character_operators() {
        let (kinds, _) = scan("a == b && c != d || e <= f");
        assert!(kinds.contains(&TokenKind::EqualEqual));
        assert!(kinds.contains(&TokenKind::AmpAmp));
        assert!(kinds.contains(&TokenKind::BangEqual));
        assert!(kinds.contains(&TokenKind::PipePipe));
        assert!(kinds.contains(&TokenKind::LessEqual));
    }

    #[test]
    fn number_literal_value() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("42", &mut diagnostics).scan_tokens();
        assert_eq!(tokens[0].value, 42);
    }

    #[test]
    fn line_comments_are_skipped() {
        let (kinds, diagnostics) = scan("// comment\nint x;");
        assert!(!diagnostics.had_error());
        assert_eq!(kinds[0], TokenKind::Int);
    }

    #[test]
    fn block_comments_are_skipped() {
        let (kinds, diagnostics) = scan("/* a \n b */ int x;");
        assert!(!diagnostics.had_error());
        assert_eq!(kinds[0], TokenKind::Int);
    }

    #[test]
    fn unexpected_character_is_reported() {
        let (_, diagnostics) = scan("int x = 1 @ 2;");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn line_tracking_across_newlines() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("int\nx;", &mut diagnostics).scan_tokens();
        let semicolon = tokens.iter().find(|t| t.kind == TokenKind::Semicolon).unwrap();
        assert_eq!(semicolon.line, 2);
    }
}
