//! Quadriga - middle end of the Pascalina compiler.
//!
//! Consumes the syntax tree produced and checked by the `pascalina` front
//! end, lowers it to a quadruple list and optionally runs the optimization
//! pipeline over it.

pub mod codegen;
pub mod ir;
pub mod optimize;

use pascalina::lexer;
use pascalina::lexer::LexicalError;
use pascalina::parser;
use pascalina::semantic::Analyzer;

use ir::Quad;

/// Whole-pipeline facade: scan, parse, analyze, generate, optimize.
pub struct Compiler {
    /// Whether the optimization pipeline runs over the generated code.
    pub optimize: bool,
}

impl Compiler {
    pub fn new() -> Self {
        Self { optimize: true }
    }

    /// Compile a source text to a quadruple list.
    ///
    /// The stages gate each other: lexical errors stop the run before
    /// parsing, syntax errors before semantic analysis, semantic errors
    /// before code generation.
    pub fn compile_source(&self, source: &str) -> Result<Vec<Quad>, CompileError> {
        let scanned = lexer::scan(source);
        if scanned.has_error() {
            return Err(CompileError::Lexical(scanned.errors));
        }

        let parsed = parser::parse(scanned.tokens);
        if parsed.has_error() {
            return Err(CompileError::Syntax(parsed.errors));
        }

        let mut tree = parsed.tree;
        let mut analyzer = Analyzer::new();
        analyzer.analyze(&mut tree);
        if analyzer.has_error() {
            return Err(CompileError::Semantic(analyzer.errors().to_vec()));
        }

        let mut code = codegen::generate(&tree);
        if self.optimize {
            optimize::optimize(&mut code);
        }
        Ok(code)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors of the three pipeline stages, each carrying everything the failed
/// stage collected.
#[derive(Debug)]
pub enum CompileError {
    Lexical(Vec<LexicalError>),
    Syntax(Vec<String>),
    Semantic(Vec<String>),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Lexical(errors) => {
                let rendered = errors
                    .iter()
                    .map(LexicalError::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "lexical errors: {}", rendered)
            }
            CompileError::Syntax(errors) => write!(f, "syntax errors: {}", errors.join("; ")),
            CompileError::Semantic(errors) => {
                write!(f, "semantic errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for CompileError {}
