pub mod symbol_table;
pub mod types;

use std::collections::BTreeMap;

use crate::lexer::token::TokenKind;
use crate::parser::ast::{Node, NodeKind};
use symbol_table::{Classification, ParamInfo, ScopeId, SymbolTable};
use types::Type;

/// Traversal context, rebuilt by value at every recursive step so sibling
/// subtrees never observe each other's transient state.
#[derive(Debug, Clone)]
pub struct Context {
    pub scope: ScopeId,
    pub in_declaration: bool,
    pub declared_type: Option<Type>,
    pub classification: Option<Classification>,
    /// True for the name to the right of a `.`: it resolves against record
    /// fields, not against the symbol table.
    pub selector: bool,
    /// True inside a `record` type specification, where variable declarations
    /// contribute fields instead of symbols.
    pub in_record: bool,
}

impl Context {
    fn new() -> Self {
        Self {
            scope: 0,
            in_declaration: false,
            declared_type: None,
            classification: None,
            selector: false,
            in_record: false,
        }
    }

    fn with_scope(&self, scope: ScopeId) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    fn with_declaration(&self, in_declaration: bool) -> Self {
        Self {
            in_declaration,
            ..self.clone()
        }
    }

    fn with_type(&self, declared_type: Option<Type>) -> Self {
        Self {
            declared_type,
            ..self.clone()
        }
    }

    fn with_classification(&self, classification: Option<Classification>) -> Self {
        Self {
            classification,
            ..self.clone()
        }
    }

    fn with_selector(&self, selector: bool) -> Self {
        Self {
            selector,
            ..self.clone()
        }
    }

    fn with_record(&self, in_record: bool) -> Self {
        Self {
            in_record,
            ..self.clone()
        }
    }
}

/// Single-pass semantic analyzer.
///
/// Walks the tree depth first, populates the symbol table, writes type
/// annotations onto the nodes and accumulates error messages. The walk never
/// aborts: unknown types degrade to `None` so one defect does not cascade.
pub struct Analyzer {
    table: SymbolTable,
    errors: Vec<String>,
    current_function: Option<String>,
    pending_scope: Option<String>,
    defining_params: bool,
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            table: SymbolTable::new(),
            errors: Vec::new(),
            current_function: None,
            pending_scope: None,
            defining_params: false,
        }
    }

    pub fn analyze(&mut self, tree: &mut Node) -> &SymbolTable {
        self.walk(tree, Context::new());
        &self.table
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    fn report(&mut self, message: String) {
        self.errors.push(message);
    }

    fn report_duplicate(&mut self, id: &str) {
        let path = self.table.scope_path(self.table.current_scope());
        self.report(format!(
            "identifier '{}' already declared in scope '{}'",
            id, path
        ));
    }

    fn walk(&mut self, node: &mut Node, ctx: Context) {
        if node.kind == NodeKind::Function {
            self.register_function_header(node.children.first());
        }

        let saved_function = self.current_function.clone();
        let saved_defining = self.defining_params;
        let mut ctx = ctx;
        let mut entered = false;

        if matches!(node.kind, NodeKind::Program | NodeKind::Function) {
            let scope_name = self.scope_name_for(node);
            let scope = self.table.enter_scope(&scope_name);
            ctx = ctx.with_scope(scope);
            entered = true;
            if node.kind == NodeKind::Function {
                self.current_function = Some(self.pending_scope.clone().unwrap_or(scope_name));
                self.defining_params = true;
            } else {
                self.defining_params = false;
            }
        }

        let child_ctx = self.derive_context(node, &ctx);
        for child in &mut node.children {
            self.walk(child, child_ctx.clone());
        }
        self.process(node, &ctx);

        if entered {
            self.table.leave_scope();
            self.current_function = saved_function;
            self.defining_params = saved_defining;
        }
        self.pending_scope = None;
    }

    /// Derive the context handed to a node's children from the node's own.
    fn derive_context(&self, node: &Node, ctx: &Context) -> Context {
        let declaring = ctx.in_declaration
            || matches!(
                node.kind,
                NodeKind::ConstDef | NodeKind::TypeDef | NodeKind::VarDecl | NodeKind::FuncHeader
            );
        let mut next = ctx.with_declaration(declaring);

        match node.kind {
            NodeKind::Terminal(TokenKind::Integer) => {
                next = next.with_type(Some(Type::Integer));
            }
            NodeKind::Terminal(TokenKind::Real) => {
                next = next.with_type(Some(Type::Real));
            }
            NodeKind::Terminal(TokenKind::Function) => {
                next = next.with_classification(Some(Classification::Function));
            }
            NodeKind::Operand => {
                next = next.with_classification(Some(Classification::Parameter));
            }
            NodeKind::VarSection | NodeKind::VarList => {
                next = next.with_classification(Some(Classification::Variable));
            }
            _ => {}
        }

        let selector = node.kind == NodeKind::NameTail
            && node
                .children
                .first()
                .map(|child| child.is_terminal(TokenKind::Dot))
                .unwrap_or(false);
        next = next.with_selector(selector);

        let opens_record = node.kind == NodeKind::TypeSpec
            && node
                .children
                .first()
                .map(|child| child.is_terminal(TokenKind::Record))
                .unwrap_or(false);
        if opens_record {
            next = next.with_record(true);
        }

        next
    }

    /// The function name is registered in the *enclosing* scope before the
    /// body is walked, so recursive calls resolve.
    fn register_function_header(&mut self, header: Option<&Node>) {
        let Some(name) = header.and_then(Node::first_id).map(str::to_string) else {
            return;
        };
        self.pending_scope = Some(name.clone());
        if self.table.declared_here(&name) {
            self.report_duplicate(&name);
            return;
        }
        self.table.insert(&name, Classification::Function, None);
    }

    fn scope_name_for(&self, node: &Node) -> String {
        match node.kind {
            NodeKind::Function => self
                .pending_scope
                .clone()
                .unwrap_or_else(|| "function".to_string()),
            _ => node
                .first_id()
                .map(str::to_string)
                .unwrap_or_else(|| "program".to_string()),
        }
    }

    fn process(&mut self, node: &mut Node, ctx: &Context) {
        match node.kind {
            NodeKind::ConstDef => self.process_const_def(node),
            NodeKind::TypeSpec => {
                node.inferred_type = self.type_of_spec(node);
            }
            NodeKind::TypeDef => self.process_type_def(node),
            NodeKind::VarDecl => self.process_var_decl(node, ctx),
            NodeKind::FuncHeader => {
                self.process_func_header(node);
                self.defining_params = false;
            }
            NodeKind::Command => self.process_command(node),
            NodeKind::Value => {
                node.inferred_type = self.eval_value(node);
            }
            NodeKind::NameList => {
                node.argument_types = Some(collect_argument_types(node));
            }
            NodeKind::LogicExpr => {
                node.inferred_type = self.eval_logic_expr(node);
            }
            NodeKind::MathExpr => {
                node.inferred_type = self.eval_math_expr(node);
            }
            NodeKind::Operand => {
                node.inferred_type = operand_type(node);
            }
            NodeKind::Name => {
                if !ctx.selector {
                    node.inferred_type = self.eval_name(node);
                }
            }
            _ => {}
        }
    }

    fn process_const_def(&mut self, node: &Node) {
        let Some(id) = node.first_id().map(str::to_string) else {
            return;
        };
        if self.table.declared_here(&id) {
            self.report_duplicate(&id);
            return;
        }
        let ty = match node.children.get(2) {
            Some(value) if value.kind == NodeKind::ConstValue => {
                let is_string = value
                    .children
                    .first()
                    .map(|child| child.is_terminal(TokenKind::StringLit))
                    .unwrap_or(false);
                if is_string {
                    Some(Type::Str)
                } else {
                    value
                        .children
                        .first()
                        .and_then(|child| child.inferred_type.clone())
                        .or(Some(Type::Integer))
                }
            }
            _ => None,
        };
        self.table.insert(&id, Classification::Constant, ty);
    }

    fn process_type_def(&mut self, node: &Node) {
        let Some(id) = node.first_id().map(str::to_string) else {
            return;
        };
        if self.table.declared_here(&id) {
            self.report_duplicate(&id);
            return;
        }
        let ty = node
            .children
            .last()
            .filter(|child| child.kind == NodeKind::TypeSpec)
            .and_then(|child| child.inferred_type.clone());
        self.table.insert(&id, Classification::TypeAlias, ty);
    }

    fn type_of_spec(&mut self, node: &Node) -> Option<Type> {
        let first = node.children.first()?;
        match first.kind {
            NodeKind::Terminal(TokenKind::Integer) => Some(Type::Integer),
            NodeKind::Terminal(TokenKind::Real) => Some(Type::Real),
            NodeKind::Terminal(TokenKind::Array) => {
                let size = node
                    .children
                    .get(2)
                    .and_then(|child| child.value.as_deref())
                    .and_then(|lexeme| lexeme.parse::<i64>().ok())
                    .unwrap_or(0);
                let element = node
                    .children
                    .last()
                    .and_then(|child| child.inferred_type.clone())?;
                Some(Type::array(element, size))
            }
            NodeKind::Terminal(TokenKind::Record) => {
                let mut fields = BTreeMap::new();
                if let Some(var_list) = node.find_child(NodeKind::VarList) {
                    collect_record_fields(var_list, &mut fields);
                }
                Some(Type::record(fields))
            }
            NodeKind::Terminal(TokenKind::Id) => {
                let id = first.value.clone().unwrap_or_default();
                match self.table.lookup(&id) {
                    Some(entry) => entry.ty.clone(),
                    None => {
                        self.report(format!("identifier '{}' not declared before use", id));
                        None
                    }
                }
            }
            _ => None,
        }
    }

    fn process_var_decl(&mut self, node: &Node, ctx: &Context) {
        if ctx.in_record {
            return;
        }
        if node.children.len() < 3 {
            return;
        }
        let ids = node.children[0].collect_ids();
        let ty = node.children[2].inferred_type.clone();
        for id in ids {
            if self.table.declared_here(&id) {
                self.report_duplicate(&id);
                continue;
            }
            let classification = if self.defining_params {
                Classification::Parameter
            } else {
                Classification::Variable
            };
            self.table.insert(&id, classification, ty.clone());
            if classification == Classification::Parameter {
                self.record_parameter(&id, ty.clone());
            }
        }
    }

    /// Append a declared parameter to the enclosing function's metadata.
    fn record_parameter(&mut self, name: &str, ty: Option<Type>) {
        let Some(function) = self.current_function.clone() else {
            return;
        };
        let Some(parent) = self.table.parent_of(self.table.current_scope()) else {
            return;
        };
        if let Some(entry) = self.table.entry_mut_from(parent, &function) {
            if entry.classification == Classification::Function {
                entry.params.push(ParamInfo {
                    name: name.to_string(),
                    ty,
                });
            }
        }
    }

    fn process_func_header(&mut self, node: &Node) {
        let Some(name) = node.first_id().map(str::to_string) else {
            return;
        };
        let return_type = node
            .children
            .last()
            .filter(|child| child.kind == NodeKind::TypeSpec)
            .and_then(|child| child.inferred_type.clone());

        if let Some(parent) = self.table.parent_of(self.table.current_scope()) {
            if let Some(entry) = self.table.entry_mut_from(parent, &name) {
                if entry.classification == Classification::Function {
                    entry.ty = return_type.clone();
                }
            }
        }

        // The function body assigns its return value through `result`.
        if !self.table.declared_here("result") {
            self.table
                .insert("result", Classification::Variable, return_type);
        }
    }

    fn process_command(&mut self, node: &Node) {
        let Some(first) = node.children.first() else {
            return;
        };
        if first.kind != NodeKind::Name {
            return;
        }

        let target_ty = first.inferred_type.clone();
        let value_ty = node
            .children
            .get(2)
            .filter(|child| child.kind == NodeKind::Value)
            .and_then(|child| child.inferred_type.clone());
        let Some(target_id) = first.first_id().map(str::to_string) else {
            return;
        };
        if self.table.lookup(&target_id).is_none() {
            // The undeclared target was already reported while the name was
            // annotated; nothing left to check.
            return;
        }

        if let (Some(target), Some(value)) = (&target_ty, &value_ty) {
            if target != value {
                self.report(format!(
                    "incompatible types in assignment: '{}' and '{}'",
                    target, value
                ));
            }
        }

        if let Some(function) = self.current_function.clone() {
            if target_id == function || target_id == "result" {
                let declared = self
                    .table
                    .parent_of(self.table.current_scope())
                    .and_then(|parent| self.table.lookup_from(parent, &function))
                    .filter(|entry| entry.classification == Classification::Function)
                    .and_then(|entry| entry.ty.clone());
                if let (Some(declared), Some(value)) = (declared, &value_ty) {
                    if &declared != value {
                        self.report(format!(
                            "return type '{}' differs from function type '{}'",
                            value, declared
                        ));
                    }
                }
            }
        }
    }

    fn eval_value(&mut self, node: &Node) -> Option<Type> {
        let first = node.children.first()?;
        if first.is_terminal(TokenKind::Number) {
            return Some(Type::Integer);
        }
        if first.is_terminal(TokenKind::Id) {
            let id = first.value.clone().unwrap_or_default();
            let tail = node
                .children
                .get(1)
                .filter(|child| child.kind == NodeKind::ValueTail);
            if let Some(tail) = tail {
                if let Some(args) = tail.find_child(NodeKind::ArgList) {
                    return self.eval_call(&id, args);
                }
                return self.eval_name_parts(&id, tail.find_child(NodeKind::NameTail));
            }
            return self.eval_name_parts(&id, None);
        }
        None
    }

    fn eval_call(&mut self, id: &str, arg_list: &Node) -> Option<Type> {
        let (classification, ty, declared) = match self.table.lookup(id) {
            Some(entry) => (entry.classification, entry.ty.clone(), entry.params.clone()),
            None => {
                self.report(format!("identifier '{}' not declared before use", id));
                return None;
            }
        };
        if classification != Classification::Function {
            self.report(format!("'{}' is not a function to receive parameters", id));
            return ty;
        }

        let supplied = arg_list
            .find_child(NodeKind::NameList)
            .and_then(|list| list.argument_types.clone())
            .unwrap_or_default();
        if supplied.len() != declared.len() {
            self.report(format!(
                "parameter count mismatch in '{}': expected {}, received {}",
                id,
                declared.len(),
                supplied.len()
            ));
        } else {
            for (index, (argument, param)) in supplied.iter().zip(declared.iter()).enumerate() {
                if let (Some(argument), Some(declared_ty)) = (argument, &param.ty) {
                    if argument != declared_ty {
                        self.report(format!(
                            "argument {} type mismatch in '{}': expected '{}', received '{}'",
                            index + 1,
                            id,
                            declared_ty,
                            argument
                        ));
                    }
                }
            }
        }

        // The declared type stands even after an error so the surrounding
        // expression keeps analyzing.
        ty
    }

    fn eval_name(&mut self, node: &Node) -> Option<Type> {
        let id = match node.children.first() {
            Some(child) if child.is_terminal(TokenKind::Id) => {
                child.value.clone().unwrap_or_default()
            }
            _ => return None,
        };
        self.eval_name_parts(&id, node.children.get(1))
    }

    /// Resolve a base identifier plus an optional member/index suffix.
    fn eval_name_parts(&mut self, id: &str, tail: Option<&Node>) -> Option<Type> {
        let ty = match self.table.lookup(id) {
            Some(entry) => entry.ty.clone(),
            None => {
                self.report(format!("identifier '{}' not declared before use", id));
                return None;
            }
        };

        let tail = match tail {
            Some(tail) if tail.kind == NodeKind::NameTail && !tail.children.is_empty() => tail,
            _ => return ty,
        };

        let first = &tail.children[0];
        if first.is_terminal(TokenKind::Dot) {
            let fields = match &ty {
                Some(Type::Record { fields }) => fields.clone(),
                _ => {
                    self.report("member access only allowed for record types".to_string());
                    return ty;
                }
            };
            let member = tail
                .children
                .get(1)
                .and_then(Node::first_id)
                .map(str::to_string)?;
            match fields.get(&member) {
                Some(field) => Some(field.clone()),
                None => {
                    self.report(format!("member '{}' not declared in type", member));
                    None
                }
            }
        } else if first.is_terminal(TokenKind::LeftBracket) {
            match ty {
                Some(Type::Array { element, .. }) => Some(*element),
                other => {
                    self.report("index only usable on array-typed variables".to_string());
                    other
                }
            }
        } else {
            ty
        }
    }

    fn eval_logic_expr(&mut self, node: &Node) -> Option<Type> {
        let left = node
            .children
            .first()
            .and_then(|child| child.inferred_type.clone());
        if let Some(tail) = node
            .children
            .get(1)
            .filter(|tail| tail.kind == NodeKind::LogicExprTail && !tail.children.is_empty())
        {
            let right = tail
                .children
                .get(1)
                .and_then(|child| child.inferred_type.clone());
            if let (Some(left), Some(right)) = (&left, &right) {
                if left != right {
                    self.report("incompatible types in logical expression".to_string());
                }
            }
        }
        left
    }

    fn eval_math_expr(&mut self, node: &Node) -> Option<Type> {
        let left = node
            .children
            .first()
            .and_then(|child| child.inferred_type.clone());
        if let Some(tail) = node
            .children
            .get(1)
            .filter(|tail| tail.kind == NodeKind::MathExprTail && !tail.children.is_empty())
        {
            let right = tail
                .children
                .get(1)
                .and_then(|child| child.inferred_type.clone());
            if let (Some(left), Some(right)) = (&left, &right) {
                if left != right {
                    self.report("incompatible types in arithmetic expression".to_string());
                }
            }
        }
        left
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn operand_type(node: &Node) -> Option<Type> {
    let child = node.children.first()?;
    if child.is_terminal(TokenKind::Number) {
        Some(Type::Integer)
    } else if child.kind == NodeKind::Name {
        child.inferred_type.clone()
    } else {
        None
    }
}

/// Argument types of a NAME_LIST, first operand plus the cached tail.
fn collect_argument_types(node: &Node) -> Vec<Option<Type>> {
    let mut args = Vec::new();
    if let Some(operand) = node
        .children
        .first()
        .filter(|child| child.kind == NodeKind::Operand)
    {
        args.push(operand.inferred_type.clone());
        if let Some(rest) = node
            .children
            .get(1)
            .and_then(|tail| tail.find_child(NodeKind::NameList))
            .and_then(|inner| inner.argument_types.clone())
        {
            args.extend(rest);
        }
    }
    args
}

/// Fields of a `record` specification: every variable declaration in its
/// member list, unknown-typed fields omitted.
fn collect_record_fields(var_list: &Node, fields: &mut BTreeMap<String, Type>) {
    for child in &var_list.children {
        match child.kind {
            NodeKind::VarDecl => {
                if child.children.len() < 3 {
                    continue;
                }
                let ty = child.children[2].inferred_type.clone();
                if let Some(ty) = ty {
                    for name in child.children[0].collect_ids() {
                        fields.insert(name, ty.clone());
                    }
                }
            }
            NodeKind::VarListTail => {
                if let Some(inner) = child.find_child(NodeKind::VarList) {
                    collect_record_fields(inner, fields);
                }
            }
            _ => {}
        }
    }
}
