use std::fmt;

use logos::Logos;

/// Lexical categories of the Pascalina language.
///
/// Keywords are matched before identifiers; the relational and arithmetic
/// operators form one category each, the concrete operator being recoverable
/// from the token's lexeme.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"\$[^$]*\$")]
pub enum TokenKind {
    #[token("program")]
    Program,
    #[token("const")]
    Const,
    #[token("type")]
    Type,
    #[token("var")]
    Var,
    #[token("function")]
    Function,
    #[token("integer")]
    Integer,
    #[token("real")]
    Real,
    #[token("array")]
    Array,
    #[token("of")]
    Of,
    #[token("record")]
    Record,
    #[token("begin")]
    Begin,
    #[token("end")]
    End,
    #[token("while")]
    While,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("write")]
    Write,
    #[token("read")]
    Read,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Id,
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,
    #[regex(r#""[^"]*""#)]
    StringLit,

    #[token(":=")]
    Assign,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,

    #[regex(r"[<>=!]")]
    RelOp,
    #[regex(r"[+*/-]")]
    MathOp,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Program => "'program'",
            TokenKind::Const => "'const'",
            TokenKind::Type => "'type'",
            TokenKind::Var => "'var'",
            TokenKind::Function => "'function'",
            TokenKind::Integer => "'integer'",
            TokenKind::Real => "'real'",
            TokenKind::Array => "'array'",
            TokenKind::Of => "'of'",
            TokenKind::Record => "'record'",
            TokenKind::Begin => "'begin'",
            TokenKind::End => "'end'",
            TokenKind::While => "'while'",
            TokenKind::If => "'if'",
            TokenKind::Then => "'then'",
            TokenKind::Else => "'else'",
            TokenKind::Write => "'write'",
            TokenKind::Read => "'read'",
            TokenKind::Id => "identifier",
            TokenKind::Number => "number",
            TokenKind::StringLit => "string literal",
            TokenKind::Assign => "':='",
            TokenKind::Colon => "':'",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::LeftBracket => "'['",
            TokenKind::RightBracket => "']'",
            TokenKind::RelOp => "relational operator",
            TokenKind::MathOp => "arithmetic operator",
        };
        f.write_str(text)
    }
}

/// One scanned token: category, source text and the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: String, line: usize) -> Self {
        Self { kind, lexeme, line }
    }
}
