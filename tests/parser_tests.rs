use pascalina::lexer;
use pascalina::lexer::token::TokenKind;
use pascalina::parser;
use pascalina::parser::ast::{Node, NodeKind};
use pascalina::parser::ParseOutput;

fn parse(source: &str) -> ParseOutput {
    let scanned = lexer::scan(source);
    assert!(!scanned.has_error(), "lex should succeed: {:?}", scanned.errors);
    parser::parse(scanned.tokens)
}

fn commands(stmt_list: &Node) -> Vec<&Node> {
    let mut found = Vec::new();
    collect_commands(stmt_list, &mut found);
    found
}

fn collect_commands<'a>(node: &'a Node, found: &mut Vec<&'a Node>) {
    for child in &node.children {
        match child.kind {
            NodeKind::Command => found.push(child),
            NodeKind::StmtList => collect_commands(child, found),
            _ => {}
        }
    }
}

fn contains_error_node(node: &Node) -> bool {
    node.kind == NodeKind::Error || node.children.iter().any(contains_error_node)
}

#[test]
fn parses_minimal_program() {
    let output = parse("program p; begin end");
    assert!(!output.has_error());
    assert_eq!(output.tree.kind, NodeKind::Program);
    let body = output.tree.find_child(NodeKind::Body).expect("body");
    assert!(body.find_child(NodeKind::StmtList).is_some());
}

#[test]
fn parses_all_declaration_sections() {
    let output = parse(
        "program p;\n\
         const limite := 10;\n\
         type vetor := array[5] of integer;\n\
         var a: integer;\n\
         function f(n: integer): integer\n\
           begin result := n; end\n\
         begin a := 1; end",
    );
    assert!(!output.has_error(), "errors: {:?}", output.errors);

    let body = output.tree.find_child(NodeKind::Body).expect("body");
    let declarations = body.find_child(NodeKind::Declarations).expect("declarations");
    let section_kinds: Vec<NodeKind> = declarations.children.iter().map(|c| c.kind).collect();
    assert_eq!(
        section_kinds,
        vec![
            NodeKind::ConstSection,
            NodeKind::TypeSection,
            NodeKind::VarSection,
            NodeKind::FuncList
        ]
    );

    let functions = declarations.find_child(NodeKind::FuncList).expect("functions");
    let function = functions.find_child(NodeKind::Function).expect("function");
    assert!(function.find_child(NodeKind::FuncHeader).is_some());
    assert!(function.find_child(NodeKind::FuncBody).is_some());
}

#[test]
fn parses_every_statement_form() {
    let output = parse(
        "program p; var a: integer; begin\n\
         a := 1;\n\
         while a < 10 a := a + 1;\n\
         if a = 2 then a := 3 else a := 4;\n\
         write \"ola\";\n\
         read a;\n\
         end",
    );
    assert!(!output.has_error(), "errors: {:?}", output.errors);

    let body = output.tree.find_child(NodeKind::Body).expect("body");
    let statements = body.find_child(NodeKind::StmtList).expect("statements");
    let found = commands(statements);
    assert_eq!(found.len(), 5);

    let first_kinds: Vec<NodeKind> = found
        .iter()
        .map(|command| command.children[0].kind)
        .collect();
    assert_eq!(
        first_kinds,
        vec![
            NodeKind::Name,
            NodeKind::Terminal(TokenKind::While),
            NodeKind::Terminal(TokenKind::If),
            NodeKind::Terminal(TokenKind::Write),
            NodeKind::Terminal(TokenKind::Read)
        ]
    );

    let if_command = found[2];
    let else_clause = if_command
        .find_child(NodeKind::ElseClause)
        .expect("else clause");
    assert!(else_clause.find_child(NodeKind::Block).is_some());
}

#[test]
fn parses_member_and_index_suffixes() {
    let output = parse("program p; begin v[2] := 3; r.campo := 4; end");
    assert!(!output.has_error(), "errors: {:?}", output.errors);

    let body = output.tree.find_child(NodeKind::Body).expect("body");
    let found = commands(body.find_child(NodeKind::StmtList).expect("statements"));

    let index_tail = found[0].children[0]
        .find_child(NodeKind::NameTail)
        .expect("index tail");
    assert!(index_tail.children[0].is_terminal(TokenKind::LeftBracket));
    assert!(index_tail.find_child(NodeKind::Operand).is_some());

    let member_tail = found[1].children[0]
        .find_child(NodeKind::NameTail)
        .expect("member tail");
    assert!(member_tail.children[0].is_terminal(TokenKind::Dot));
    assert!(member_tail.find_child(NodeKind::Name).is_some());
}

#[test]
fn parses_call_with_argument_list() {
    let output = parse("program p; begin b := soma(a, 2); end");
    assert!(!output.has_error(), "errors: {:?}", output.errors);

    let body = output.tree.find_child(NodeKind::Body).expect("body");
    let found = commands(body.find_child(NodeKind::StmtList).expect("statements"));
    let value = found[0].find_child(NodeKind::Value).expect("value");
    let tail = value.find_child(NodeKind::ValueTail).expect("value tail");
    let args = tail.find_child(NodeKind::ArgList).expect("argument list");
    let list = args.find_child(NodeKind::NameList).expect("name list");
    assert!(list.find_child(NodeKind::Operand).is_some());
    assert!(list.find_child(NodeKind::NameListTail).is_some());
}

#[test]
fn missing_semicolon_is_reported_and_parse_finishes() {
    let output = parse("program p; begin a := 1 end");
    assert!(output.has_error());
    assert!(
        output.errors[0].contains("expected ';'"),
        "unexpected message: {:?}",
        output.errors
    );
    assert_eq!(output.tree.kind, NodeKind::Program);
}

#[test]
fn truncated_input_reports_unexpected_end() {
    let output = parse("program p;");
    assert!(output.has_error());
    assert!(
        output
            .errors
            .iter()
            .any(|error| error.contains("end of input") || error.contains("ended unexpectedly")),
        "unexpected messages: {:?}",
        output.errors
    );
    assert!(contains_error_node(&output.tree));
}

#[test]
fn error_nodes_carry_the_offending_token() {
    let output = parse("program p; begin := 1; end");
    assert!(output.has_error());
    let body = output.tree.find_child(NodeKind::Body).expect("body");
    let error = body
        .children
        .iter()
        .find(|child| child.kind == NodeKind::Error)
        .expect("error node");
    assert!(
        error.value.as_deref().unwrap_or("").contains(":="),
        "error value: {:?}",
        error.value
    );
}

#[test]
fn recovery_surfaces_multiple_errors_in_one_run() {
    let output = parse("program p; const x := ; var a : integer; begin a := 1; end");
    assert!(output.has_error());
    assert!(
        output.errors.len() >= 2,
        "expected several errors, got {:?}",
        output.errors
    );
    assert_eq!(output.tree.kind, NodeKind::Program);
}
