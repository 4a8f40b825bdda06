pub mod token;

use std::fmt;

use logos::Logos;

use token::{Token, TokenKind};

/// An unrecognized character, recorded with the line it was found on.
///
/// Scanning skips the character and keeps going so every lexical error in the
/// input is surfaced in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexicalError {
    pub character: char,
    pub line: usize,
}

impl fmt::Display for LexicalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "illegal character '{}' at line {}",
            self.character, self.line
        )
    }
}

impl std::error::Error for LexicalError {}

/// Result of scanning a whole source text.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutput {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexicalError>,
}

impl ScanOutput {
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Scan `source` into the token stream consumed by the parser.
///
/// Whitespace and `$ … $` comments are skipped; newlines inside skipped text
/// still advance the line counter.
pub fn scan(source: &str) -> ScanOutput {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut line = 1;
    let mut consumed = 0;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        line += source[consumed..span.start].matches('\n').count();
        consumed = span.start;

        match result {
            Ok(kind) => tokens.push(Token::new(kind, lexer.slice().to_string(), line)),
            Err(()) => {
                if let Some(character) = source[span.start..span.end].chars().next() {
                    errors.push(LexicalError { character, line });
                }
            }
        }
    }

    ScanOutput { tokens, errors }
}
