use std::env;
use std::fs;
use std::process;

use pascalina::errors::pretty;
use pascalina::lexer;
use pascalina::lexer::token::Token;
use pascalina::parser;
use pascalina::semantic::Analyzer;
use quadriga::codegen;
use quadriga::optimize;

#[derive(Debug, Default)]
struct DumpFlags {
    tokens: bool,
    tree: bool,
    ir: bool,
    optimized: bool,
}

fn main() {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let (path, flags) = match parse_cli(args) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(1);
        }
    };

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("failed to read '{}': {}", path, err);
            process::exit(1);
        }
    };

    let scanned = lexer::scan(&source);
    if scanned.has_error() {
        for error in &scanned.errors {
            eprintln!("{}", pretty::error_line(&error.to_string()));
        }
        process::exit(1);
    }
    let tokens_dump = flags.tokens.then(|| scanned.tokens.clone());

    let parsed = parser::parse(scanned.tokens);
    if parsed.has_error() {
        for error in &parsed.errors {
            eprintln!("{}", pretty::error_line(error));
        }
        process::exit(1);
    }

    let mut tree = parsed.tree;
    let mut analyzer = Analyzer::new();
    analyzer.analyze(&mut tree);
    if analyzer.has_error() {
        eprintln!("semantic errors found:");
        for error in analyzer.errors() {
            eprintln!("{}", pretty::error_line(&format!("- {}", error)));
        }
        process::exit(1);
    }

    let code = codegen::generate(&tree);

    if let Some(tokens) = tokens_dump {
        print_tokens(&tokens);
    }
    if flags.tree {
        print!("{}", tree);
    }
    if flags.ir {
        for quad in &code {
            println!("{}", quad);
        }
    }
    if flags.optimized {
        let mut optimized = code.clone();
        optimize::optimize(&mut optimized);
        for quad in &optimized {
            println!("{}", quad);
        }
    }

    println!("{}", pretty::success_line(&format!("check passed: {}", path)));
}

fn parse_cli(args: Vec<String>) -> Result<(String, DumpFlags), String> {
    let mut path = None;
    let mut flags = DumpFlags::default();

    for arg in args {
        match arg.as_str() {
            "--show-tokens" => flags.tokens = true,
            "--show-tree" => flags.tree = true,
            "--show-ir" => flags.ir = true,
            "--show-opt" => flags.optimized = true,
            "--show-all" => {
                flags.tokens = true;
                flags.tree = true;
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown flag '{}'", other));
            }
            other => {
                if path.is_none() {
                    path = Some(other.to_string());
                } else {
                    return Err("multiple source paths provided".to_string());
                }
            }
        }
    }

    match path {
        Some(path) => Ok((path, flags)),
        None => Err(
            "usage: pascalinac <file> [--show-tokens] [--show-tree] [--show-ir] [--show-opt] [--show-all]"
                .to_string(),
        ),
    }
}

fn print_tokens(tokens: &[Token]) {
    for token in tokens {
        println!(
            "{:<14} {:<18} line {}",
            format!("{:?}", token.kind),
            token.lexeme,
            token.line
        );
    }
}
