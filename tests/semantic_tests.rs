use pascalina::lexer;
use pascalina::parser;
use pascalina::semantic::symbol_table::Classification;
use pascalina::semantic::types::Type;
use pascalina::semantic::Analyzer;

fn analyze(source: &str) -> Analyzer {
    let scanned = lexer::scan(source);
    assert!(!scanned.has_error(), "lex should succeed: {:?}", scanned.errors);
    let parsed = parser::parse(scanned.tokens);
    assert!(!parsed.has_error(), "parse should succeed: {:?}", parsed.errors);
    let mut tree = parsed.tree;
    let mut analyzer = Analyzer::new();
    analyzer.analyze(&mut tree);
    analyzer
}

fn errors_of(source: &str) -> Vec<String> {
    analyze(source).errors().to_vec()
}

const VALID_PROGRAM: &str = "\
program exemplo;
const
  limite := 10;
  saudacao := \"ola\";
type
  vetor := array[5] of integer;
  pessoa := record
    idade: integer;
    altura: real
  end;
var
  a, b: integer;
  x: real;
  v: vetor;
  p: pessoa;
function identidade(n: integer): integer
  begin
    result := n;
  end
begin
  a := 1;
  b := identidade(a);
  v[1] := 2;
  p.idade := 3;
  while a < limite
    a := a + 1;
  if a = b then
    write \"igual\"
  else
    write saudacao;
  read x;
end";

#[test]
fn valid_program_reports_no_errors() {
    let analyzer = analyze(VALID_PROGRAM);
    assert!(
        analyzer.errors().is_empty(),
        "unexpected errors: {:?}",
        analyzer.errors()
    );
}

#[test]
fn symbol_table_records_declarations_per_scope() {
    let analyzer = analyze(
        "program p;\n\
         var a: integer;\n\
         function soma(x, y: integer): integer\n\
           begin result := x + y; end\n\
         begin a := soma(1, 2); end",
    );
    assert!(analyzer.errors().is_empty(), "{:?}", analyzer.errors());
    let table = analyzer.table();

    let paths: Vec<String> = table.scope_ids().map(|id| table.scope_path(id)).collect();
    assert_eq!(paths, vec!["global", "p", "p.soma"]);

    let program_scope = table
        .scope_ids()
        .find(|&id| table.scope_path(id) == "p")
        .expect("program scope");
    let entries = table.entries_in(program_scope);
    let soma = entries
        .iter()
        .find(|entry| entry.name == "soma")
        .expect("function entry");
    assert_eq!(soma.classification, Classification::Function);
    assert_eq!(soma.ty, Some(Type::Integer));
    let param_names: Vec<&str> = soma.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(param_names, vec!["x", "y"]);
    assert_eq!(soma.params[0].ty, Some(Type::Integer));

    let function_scope = table
        .scope_ids()
        .find(|&id| table.scope_path(id) == "p.soma")
        .expect("function scope");
    let inner = table.entries_in(function_scope);
    let x = inner.iter().find(|entry| entry.name == "x").expect("param x");
    assert_eq!(x.classification, Classification::Parameter);
    let result = inner
        .iter()
        .find(|entry| entry.name == "result")
        .expect("result pseudo-variable");
    assert_eq!(result.classification, Classification::Variable);
    assert_eq!(result.ty, Some(Type::Integer));
}

#[test]
fn constants_and_aliases_get_structural_types() {
    let analyzer = analyze(
        "program p;\n\
         const limite := 10; nome := \"ana\";\n\
         type vetor := array[3] of real;\n\
         var v: vetor; x: real;\n\
         begin x := v[1]; end",
    );
    assert!(analyzer.errors().is_empty(), "{:?}", analyzer.errors());
    let table = analyzer.table();
    let scope = table
        .scope_ids()
        .find(|&id| table.scope_path(id) == "p")
        .expect("program scope");
    let entries = table.entries_in(scope);

    let limite = entries.iter().find(|e| e.name == "limite").expect("limite");
    assert_eq!(limite.classification, Classification::Constant);
    assert_eq!(limite.ty, Some(Type::Integer));

    let nome = entries.iter().find(|e| e.name == "nome").expect("nome");
    assert_eq!(nome.ty, Some(Type::Str));

    let vetor = entries.iter().find(|e| e.name == "vetor").expect("vetor");
    assert_eq!(vetor.classification, Classification::TypeAlias);
    assert_eq!(vetor.ty, Some(Type::array(Type::Real, 3)));

    // Structural equality: the variable's type equals the alias's.
    let v = entries.iter().find(|e| e.name == "v").expect("v");
    assert_eq!(v.ty, vetor.ty);
}

#[test]
fn duplicate_declaration_reports_exactly_one_error() {
    let errors = errors_of("program p; var a: integer; a: real; begin a := 1; end");
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].contains("identifier 'a' already declared in scope 'p'"));
}

#[test]
fn use_before_declaration_is_reported() {
    let errors = errors_of("program p; begin a := 1; end");
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].contains("identifier 'a' not declared before use"));
}

#[test]
fn assignment_type_mismatch_is_reported() {
    let errors = errors_of("program p; var a: integer; x: real; begin a := x; end");
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].contains("incompatible types in assignment: 'integer' and 'real'"));
}

#[test]
fn calling_a_non_function_is_reported() {
    let errors = errors_of("program p; var a, b: integer; begin b := a(1); end");
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].contains("'a' is not a function to receive parameters"));
}

#[test]
fn parameter_count_mismatch_is_reported() {
    let errors = errors_of(
        "program p;\n\
         var b: integer;\n\
         function identidade(n: integer): integer\n\
           begin result := n; end\n\
         begin b := identidade(1, 2); end",
    );
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].contains("parameter count mismatch in 'identidade': expected 1, received 2"));
}

#[test]
fn argument_type_mismatch_is_reported() {
    let errors = errors_of(
        "program p;\n\
         var b: integer; x: real;\n\
         function identidade(n: integer): integer\n\
           begin result := n; end\n\
         begin b := identidade(x); end",
    );
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0]
        .contains("argument 1 type mismatch in 'identidade': expected 'integer', received 'real'"));
}

#[test]
fn return_type_mismatch_is_reported() {
    let errors = errors_of(
        "program p;\n\
         function f(): integer\n\
           var x: real;\n\
           begin result := x; end\n\
         begin end",
    );
    assert!(
        errors
            .iter()
            .any(|e| e.contains("return type 'real' differs from function type 'integer'")),
        "errors: {:?}",
        errors
    );
}

#[test]
fn indexing_a_non_array_is_reported() {
    let errors = errors_of("program p; var a, i: integer; begin a := i[1]; end");
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].contains("index only usable on array-typed variables"));
}

#[test]
fn member_access_on_non_record_is_reported() {
    let errors = errors_of("program p; var a, b: integer; begin a := b.c; end");
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].contains("member access only allowed for record types"));
}

#[test]
fn missing_record_member_is_reported() {
    let errors = errors_of(
        "program p;\n\
         type pessoa := record nome: integer end;\n\
         var p2: pessoa; a: integer;\n\
         begin a := p2.idade; end",
    );
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].contains("member 'idade' not declared in type"));
}

#[test]
fn logical_expression_type_mismatch_is_reported() {
    let errors = errors_of(
        "program p; var a: integer; x: real; b: integer;\n\
         begin while a < x b := 1; end",
    );
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].contains("incompatible types in logical expression"));
}

#[test]
fn arithmetic_expression_type_mismatch_is_reported() {
    let errors = errors_of(
        "program p; var a: integer; x: real; b: integer;\n\
         begin while a + x < 1 b := 1; end",
    );
    assert_eq!(errors.len(), 1, "errors: {:?}", errors);
    assert!(errors[0].contains("incompatible types in arithmetic expression"));
}

#[test]
fn recursive_calls_resolve_against_the_enclosing_scope() {
    let errors = errors_of(
        "program p;\n\
         var b: integer;\n\
         function fat(n: integer): integer\n\
           begin result := fat(n); end\n\
         begin b := fat(1); end",
    );
    assert!(errors.is_empty(), "errors: {:?}", errors);
}

#[test]
fn sibling_function_scopes_are_isolated() {
    let errors = errors_of(
        "program p;\n\
         function f(n: integer): integer\n\
           begin result := n; end\n\
         function g(n: real): real\n\
           begin result := n; end\n\
         begin end",
    );
    assert!(errors.is_empty(), "errors: {:?}", errors);
}
