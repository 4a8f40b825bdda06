use std::collections::HashMap;

use pascalina::lexer::token::TokenKind;
use pascalina::parser::ast::{Node, NodeKind};

use crate::ir::{Opcode, Operand, Quad};

/// Reserved register a callee leaves its return value in.
pub const RETURN_REGISTER: &str = "r0";

/// Lower a checked syntax tree to a quadruple list.
pub fn generate(tree: &Node) -> Vec<Quad> {
    Generator::new().generate(tree)
}

pub struct Generator {
    code: Vec<Quad>,
    temp_count: u32,
    label_count: u32,
    /// Flat store: identifier -> synthetic (base, offset) cell, offset 0.
    variables: HashMap<String, (String, i64)>,
    /// Jump target for the main body, emitted once after the functions.
    label_main: Option<String>,
    /// Current value register of each live function parameter; reads bypass
    /// the memory load until the parameter is reassigned.
    param_temps: HashMap<String, Operand>,
}

impl Generator {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            temp_count: 0,
            label_count: 0,
            variables: HashMap::new(),
            label_main: None,
            param_temps: HashMap::new(),
        }
    }

    pub fn generate(mut self, tree: &Node) -> Vec<Quad> {
        self.gen_program(tree);
        self.code
    }

    fn emit(&mut self, op: Opcode, a: Operand, b: Operand, c: Operand) {
        self.code.push(Quad::new(op, a, b, c));
    }

    fn new_temp(&mut self) -> Operand {
        self.temp_count += 1;
        Operand::Temp(self.temp_count)
    }

    fn new_label(&mut self, prefix: &str) -> String {
        self.label_count += 1;
        format!("{}{}", prefix, self.label_count)
    }

    fn mem_cell(&mut self, name: &str) -> (String, i64) {
        self.variables
            .entry(name.to_string())
            .or_insert_with(|| (name.to_string(), 0))
            .clone()
    }

    // PROGRAM ::= 'program' ID ';' BODY
    fn gen_program(&mut self, node: &Node) {
        let name = node
            .children
            .iter()
            .find(|child| child.is_terminal(TokenKind::Id))
            .and_then(|child| child.value.clone())
            .unwrap_or_else(|| "main".to_string());

        let main = self.new_label("Lmain");
        self.label_main = Some(main.clone());

        self.emit(
            Opcode::Label,
            Operand::label(name),
            Operand::None,
            Operand::None,
        );
        // Functions are laid out first; control skips over them.
        self.emit(
            Opcode::Jmp,
            Operand::label(main),
            Operand::None,
            Operand::None,
        );

        if let Some(body) = node.find_child(NodeKind::Body) {
            self.gen_body(body);
        }
    }

    fn gen_body(&mut self, node: &Node) {
        if let Some(declarations) = node.find_child(NodeKind::Declarations) {
            self.gen_declarations(declarations);
        }
        if let Some(main) = self.label_main.take() {
            self.emit(
                Opcode::Label,
                Operand::label(main),
                Operand::None,
                Operand::None,
            );
        }
        if let Some(statements) = node.find_child(NodeKind::StmtList) {
            self.gen_stmt_list(statements);
        }
    }

    /// Declarations produce no code; they only register identifiers and lay
    /// out the function bodies.
    fn gen_declarations(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                NodeKind::VarSection => self.collect_variables(child),
                NodeKind::FuncList => self.gen_func_list(child),
                _ => {}
            }
        }
    }

    fn gen_func_list(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                NodeKind::Function => self.gen_function(child),
                NodeKind::FuncList => self.gen_func_list(child),
                _ => {}
            }
        }
    }

    fn gen_function(&mut self, node: &Node) {
        let mut name = None;
        let mut params = Vec::new();
        if let Some(header) = node.find_child(NodeKind::FuncHeader) {
            for child in &header.children {
                if child.is_terminal(TokenKind::Id) {
                    name = child.value.clone();
                } else if child.kind == NodeKind::VarList {
                    self.collect_variables(child);
                    declared_names(child, &mut params);
                }
            }
        }
        let name = name.unwrap_or_else(|| "anon".to_string());

        self.emit(
            Opcode::Label,
            Operand::label(name),
            Operand::None,
            Operand::None,
        );

        let saved_params = std::mem::take(&mut self.param_temps);

        // The caller pushes arguments in declared order; popping
        // last-pushed-first recovers declaration order.
        for param in params.iter().rev() {
            let reg = self.new_temp();
            self.emit(Opcode::Pop, reg.clone(), Operand::None, Operand::None);
            self.param_temps.insert(param.clone(), reg);
        }

        if let Some(body) = node.find_child(NodeKind::FuncBody) {
            self.gen_func_body(body);
        }

        // Epilogue: the `result` cell travels back through r0.
        let (base, offset) = self.mem_cell("result");
        let value = self.new_temp();
        self.emit(
            Opcode::Lod,
            value.clone(),
            Operand::name(base),
            Operand::lit(offset.to_string()),
        );
        self.emit(
            Opcode::Mov,
            Operand::name(RETURN_REGISTER),
            value,
            Operand::None,
        );
        self.emit(
            Opcode::Ret,
            Operand::name(RETURN_REGISTER),
            Operand::None,
            Operand::None,
        );

        self.param_temps = saved_params;
    }

    fn gen_func_body(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                NodeKind::VarSection => self.collect_variables(child),
                NodeKind::Block => self.gen_block(child),
                _ => {}
            }
        }
    }

    /// Register every declared identifier's memory cell.
    fn collect_variables(&mut self, node: &Node) {
        match node.kind {
            NodeKind::VarSection | NodeKind::VarListTail => {
                if let Some(list) = node.find_child(NodeKind::VarList) {
                    self.collect_variables(list);
                }
            }
            NodeKind::VarList => {
                for child in &node.children {
                    if matches!(child.kind, NodeKind::VarDecl | NodeKind::VarListTail) {
                        self.collect_variables(child);
                    }
                }
            }
            NodeKind::VarDecl => {
                if let Some(ids) = node
                    .children
                    .first()
                    .filter(|child| child.kind == NodeKind::IdList)
                {
                    for id in ids.collect_ids() {
                        self.mem_cell(&id);
                    }
                }
            }
            _ => {}
        }
    }

    fn gen_stmt_list(&mut self, node: &Node) {
        for child in &node.children {
            match child.kind {
                NodeKind::Command => self.gen_command(child),
                NodeKind::StmtList => self.gen_stmt_list(child),
                _ => {}
            }
        }
    }

    fn gen_block(&mut self, node: &Node) {
        if node.children.iter().any(|child| child.kind == NodeKind::Command) {
            for child in &node.children {
                if child.kind == NodeKind::Command {
                    self.gen_command(child);
                }
            }
        } else if let Some(statements) = node.find_child(NodeKind::StmtList) {
            self.gen_stmt_list(statements);
        }
    }

    fn gen_command(&mut self, node: &Node) {
        let Some(first) = node.children.first() else {
            return;
        };
        match first.kind {
            NodeKind::Name => self.gen_assignment(node, first),
            NodeKind::Terminal(TokenKind::While) => self.gen_while(node),
            NodeKind::Terminal(TokenKind::If) => self.gen_if(node),
            NodeKind::Terminal(TokenKind::Write) => self.gen_write(node),
            NodeKind::Terminal(TokenKind::Read) => self.gen_read(node),
            _ => {}
        }
    }

    fn gen_assignment(&mut self, node: &Node, target: &Node) {
        let Some(value) = node.find_child(NodeKind::Value) else {
            return;
        };
        let reg = self.gen_value(value);
        let Some(var) = base_identifier(target) else {
            return;
        };
        let (base, offset) = self.mem_cell(&var);
        self.emit(
            Opcode::Str,
            Operand::name(base),
            Operand::lit(offset.to_string()),
            reg.clone(),
        );
        if self.param_temps.contains_key(&var) {
            // The tracked register now holds the assigned value.
            self.param_temps.insert(var, reg);
        }
    }

    fn gen_while(&mut self, node: &Node) {
        let (Some(condition), Some(block)) = (
            node.find_child(NodeKind::LogicExpr),
            node.find_child(NodeKind::Block),
        ) else {
            return;
        };

        let start = self.new_label("Lwhile");
        let end = self.new_label("Lendwhile");

        self.emit(
            Opcode::Label,
            Operand::label(start.clone()),
            Operand::None,
            Operand::None,
        );
        let cond = self.gen_logic_expr(condition);

        let body = self.new_label("Lbody");
        self.emit(Opcode::Jnz, Operand::label(body.clone()), cond, Operand::None);
        self.emit(
            Opcode::Jmp,
            Operand::label(end.clone()),
            Operand::None,
            Operand::None,
        );

        self.emit(Opcode::Label, Operand::label(body), Operand::None, Operand::None);
        self.gen_block(block);
        self.emit(Opcode::Jmp, Operand::label(start), Operand::None, Operand::None);
        self.emit(Opcode::Label, Operand::label(end), Operand::None, Operand::None);
    }

    fn gen_if(&mut self, node: &Node) {
        let (Some(condition), Some(then_block)) = (
            node.find_child(NodeKind::LogicExpr),
            node.find_child(NodeKind::Block),
        ) else {
            return;
        };
        let else_block = node
            .find_child(NodeKind::ElseClause)
            .and_then(|clause| clause.find_child(NodeKind::Block));

        let cond = self.gen_logic_expr(condition);
        let then_label = self.new_label("Lthen");
        let end_label = self.new_label("Lendif");
        let else_label = if else_block.is_some() {
            self.new_label("Lelse")
        } else {
            end_label.clone()
        };

        self.emit(
            Opcode::Jnz,
            Operand::label(then_label.clone()),
            cond,
            Operand::None,
        );
        self.emit(
            Opcode::Jmp,
            Operand::label(else_label.clone()),
            Operand::None,
            Operand::None,
        );

        self.emit(
            Opcode::Label,
            Operand::label(then_label),
            Operand::None,
            Operand::None,
        );
        self.gen_block(then_block);
        self.emit(
            Opcode::Jmp,
            Operand::label(end_label.clone()),
            Operand::None,
            Operand::None,
        );

        if let Some(block) = else_block {
            self.emit(
                Opcode::Label,
                Operand::label(else_label),
                Operand::None,
                Operand::None,
            );
            self.gen_block(block);
        }

        self.emit(
            Opcode::Label,
            Operand::label(end_label),
            Operand::None,
            Operand::None,
        );
    }

    fn gen_write(&mut self, node: &Node) {
        let Some(value) = node.find_child(NodeKind::ConstValue) else {
            return;
        };
        let reg = self.gen_const_value(value);
        self.emit(Opcode::Psh, reg, Operand::None, Operand::None);
        self.emit(
            Opcode::Call,
            Operand::label("WRITE"),
            Operand::lit("1"),
            Operand::None,
        );
        // Discard the callee's stack slot.
        let discard = self.new_temp();
        self.emit(Opcode::Pop, discard, Operand::None, Operand::None);
    }

    fn gen_read(&mut self, node: &Node) {
        let Some(target) = node.find_child(NodeKind::Name) else {
            return;
        };
        let Some(var) = base_identifier(target) else {
            return;
        };
        let (base, offset) = self.mem_cell(&var);
        self.emit(
            Opcode::Call,
            Operand::label("READ"),
            Operand::lit("0"),
            Operand::None,
        );
        let reg = self.new_temp();
        self.emit(
            Opcode::Mov,
            reg.clone(),
            Operand::name(RETURN_REGISTER),
            Operand::None,
        );
        self.emit(
            Opcode::Str,
            Operand::name(base),
            Operand::lit(offset.to_string()),
            reg,
        );
    }

    // CONST_VALUE ::= STRING | MATH_EXPR
    fn gen_const_value(&mut self, node: &Node) -> Operand {
        for child in &node.children {
            if child.is_terminal(TokenKind::StringLit) {
                let reg = self.new_temp();
                let literal = child.value.clone().unwrap_or_default();
                self.emit(Opcode::Ldc, reg.clone(), Operand::Lit(literal), Operand::None);
                return reg;
            }
            if child.kind == NodeKind::MathExpr {
                return self.gen_math_expr(child);
            }
        }
        self.load_zero()
    }

    // VALUE ::= NUMBER MATH_EXPR_TAIL | ID VALUE_TAIL
    fn gen_value(&mut self, node: &Node) -> Operand {
        let Some(first) = node.children.first() else {
            return self.load_zero();
        };

        if first.is_terminal(TokenKind::Number) {
            let mut reg = self.gen_number(first);
            for child in &node.children[1..] {
                if child.kind == NodeKind::MathExprTail {
                    reg = self.gen_math_tail(child, reg);
                }
            }
            return reg;
        }

        if first.is_terminal(TokenKind::Id) {
            let id = first.value.clone().unwrap_or_default();
            let tail = node
                .children
                .get(1)
                .filter(|child| child.kind == NodeKind::ValueTail);
            if let Some(tail) = tail {
                if tail.find_child(NodeKind::ArgList).is_some() {
                    return self.gen_call(&id, tail);
                }
                let mut reg = self.load_identifier(&id);
                for child in &tail.children {
                    if child.kind == NodeKind::MathExprTail {
                        reg = self.gen_math_tail(child, reg);
                    }
                }
                return reg;
            }
            return self.load_identifier(&id);
        }

        self.load_zero()
    }

    /// Push each argument in textual order, call, and move r0 into a fresh
    /// temporary. The callee consumes the pushed arguments itself.
    fn gen_call(&mut self, name: &str, value_tail: &Node) -> Operand {
        let mut arguments = Vec::new();
        if let Some(args) = value_tail.find_child(NodeKind::ArgList) {
            collect_call_operands(args, &mut arguments);
        }

        let argc = arguments.len();
        for argument in arguments {
            let reg = self.gen_operand(argument);
            self.emit(Opcode::Psh, reg, Operand::None, Operand::None);
        }
        self.emit(
            Opcode::Call,
            Operand::label(name),
            Operand::lit(argc.to_string()),
            Operand::None,
        );

        let reg = self.new_temp();
        self.emit(
            Opcode::Mov,
            reg.clone(),
            Operand::name(RETURN_REGISTER),
            Operand::None,
        );
        reg
    }

    // OPERAND ::= NAME | NUMBER
    fn gen_operand(&mut self, node: &Node) -> Operand {
        let Some(child) = node.children.first() else {
            return self.load_zero();
        };
        if child.is_terminal(TokenKind::Number) {
            return self.gen_number(child);
        }
        if child.kind == NodeKind::Name {
            if let Some(id) = base_identifier(child) {
                return self.load_identifier(&id);
            }
        }
        self.load_zero()
    }

    fn gen_number(&mut self, node: &Node) -> Operand {
        let reg = self.new_temp();
        let literal = node.value.clone().unwrap_or_default();
        self.emit(Opcode::Ldc, reg.clone(), Operand::Lit(literal), Operand::None);
        reg
    }

    fn load_zero(&mut self) -> Operand {
        let reg = self.new_temp();
        self.emit(Opcode::Ldc, reg.clone(), Operand::lit("0"), Operand::None);
        reg
    }

    /// Load a name's current value: the tracked register for live function
    /// parameters, a memory load for everything else.
    fn load_identifier(&mut self, id: &str) -> Operand {
        if let Some(reg) = self.param_temps.get(id) {
            return reg.clone();
        }
        let (base, offset) = self.mem_cell(id);
        let reg = self.new_temp();
        self.emit(
            Opcode::Lod,
            reg.clone(),
            Operand::name(base),
            Operand::lit(offset.to_string()),
        );
        reg
    }

    // MATH_EXPR ::= OPERAND MATH_EXPR_TAIL
    fn gen_math_expr(&mut self, node: &Node) -> Operand {
        let mut reg = match node.children.first() {
            Some(child) if child.kind == NodeKind::Operand => self.gen_operand(child),
            _ => self.load_zero(),
        };
        if let Some(tail) = node
            .children
            .get(1)
            .filter(|child| child.kind == NodeKind::MathExprTail)
        {
            reg = self.gen_math_tail(tail, reg);
        }
        reg
    }

    // MATH_EXPR_TAIL ::= MATHOP MATH_EXPR | ε
    // Right recursion: the right side is evaluated first, combining
    // right-to-left.
    fn gen_math_tail(&mut self, tail: &Node, left: Operand) -> Operand {
        if tail.children.is_empty() {
            return left;
        }
        let operator = tail
            .children
            .iter()
            .find(|child| child.is_terminal(TokenKind::MathOp))
            .and_then(|child| child.value.clone());
        let Some(right_node) = tail
            .children
            .iter()
            .find(|child| child.kind == NodeKind::MathExpr)
        else {
            return left;
        };

        let right = self.gen_math_expr(right_node);
        let result = self.new_temp();
        match operator.as_deref() {
            Some("+") => self.emit(Opcode::Add, result.clone(), left, right),
            Some("-") => self.emit(Opcode::Sub, result.clone(), left, right),
            Some("*") => self.emit(Opcode::Mul, result.clone(), left, right),
            Some("/") => self.emit(Opcode::Div, result.clone(), left, right),
            _ => self.emit(Opcode::Mov, result.clone(), left, Operand::None),
        }
        result
    }

    // LOGIC_EXPR ::= MATH_EXPR LOGIC_EXPR_TAIL
    fn gen_logic_expr(&mut self, node: &Node) -> Operand {
        let mut reg = match node.children.first() {
            Some(child) if child.kind == NodeKind::MathExpr => self.gen_math_expr(child),
            _ => self.load_zero(),
        };
        if let Some(tail) = node
            .children
            .get(1)
            .filter(|child| child.kind == NodeKind::LogicExprTail)
        {
            reg = self.gen_logic_tail(tail, reg);
        }
        reg
    }

    // LOGIC_EXPR_TAIL ::= RELOP LOGIC_EXPR | ε
    fn gen_logic_tail(&mut self, tail: &Node, left: Operand) -> Operand {
        if tail.children.is_empty() {
            return left;
        }
        let operator = tail
            .children
            .iter()
            .find(|child| child.is_terminal(TokenKind::RelOp))
            .and_then(|child| child.value.clone());
        let Some(right_node) = tail
            .children
            .iter()
            .find(|child| child.kind == NodeKind::LogicExpr)
        else {
            return left;
        };

        let right = self.gen_logic_expr(right_node);
        let result = self.new_temp();
        match operator.as_deref() {
            Some("=") => self.emit(Opcode::Eql, result.clone(), left, right),
            Some("<") => self.emit(Opcode::Les, result.clone(), left, right),
            Some(">") => self.emit(Opcode::Grt, result.clone(), left, right),
            Some("!") => self.emit(Opcode::Neq, result.clone(), left, right),
            _ => self.emit(Opcode::Mov, result.clone(), left, Operand::None),
        }
        result
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

/// Base identifier of a NAME node; member/index suffixes share the base cell
/// in the flat store.
fn base_identifier(name: &Node) -> Option<String> {
    name.children
        .iter()
        .find(|child| child.is_terminal(TokenKind::Id))
        .and_then(|child| child.value.clone())
}

/// Declared identifiers of a VAR_LIST, in declaration order. Only the names
/// in the id lists count; identifiers inside type specifications do not.
fn declared_names(node: &Node, names: &mut Vec<String>) {
    match node.kind {
        NodeKind::VarList => {
            for child in &node.children {
                if matches!(child.kind, NodeKind::VarDecl | NodeKind::VarListTail) {
                    declared_names(child, names);
                }
            }
        }
        NodeKind::VarListTail => {
            if let Some(list) = node.find_child(NodeKind::VarList) {
                declared_names(list, names);
            }
        }
        NodeKind::VarDecl => {
            if let Some(ids) = node
                .children
                .first()
                .filter(|child| child.kind == NodeKind::IdList)
            {
                names.extend(ids.collect_ids());
            }
        }
        _ => {}
    }
}

/// The argument operands of a call, outermost only: operands nested inside an
/// index suffix belong to that suffix, not to the argument list.
fn collect_call_operands<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
    if node.kind == NodeKind::Operand {
        out.push(node);
        return;
    }
    for child in &node.children {
        collect_call_operands(child, out);
    }
}
