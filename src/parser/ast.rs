use std::fmt;

use crate::lexer::token::TokenKind;
use crate::semantic::types::Type;

/// Production tag of a syntax-tree node.
///
/// One variant per grammar production, `Terminal` for leaves (wrapping the
/// token category) and `Error` for subtrees abandoned by error recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Program,
    Body,
    Declarations,
    ConstSection,
    ConstList,
    ConstListTail,
    ConstDef,
    ConstValue,
    TypeSection,
    TypeList,
    TypeListTail,
    TypeDef,
    TypeSpec,
    VarSection,
    VarList,
    VarListTail,
    VarDecl,
    IdList,
    IdListTail,
    FuncList,
    Function,
    FuncHeader,
    FuncBody,
    Block,
    StmtList,
    Command,
    ElseClause,
    Value,
    ValueTail,
    ArgList,
    NameList,
    NameListTail,
    Operand,
    LogicExpr,
    LogicExprTail,
    MathExpr,
    MathExprTail,
    Name,
    NameTail,
    Terminal(TokenKind),
    Error,
}

/// A node of the syntax tree.
///
/// Children are owned and ordered; `value` holds the lexeme of terminals and
/// the offending-token description of error nodes. `inferred_type` and
/// `argument_types` are written in place by the semantic analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub value: Option<String>,
    pub children: Vec<Node>,
    pub inferred_type: Option<Type>,
    pub argument_types: Option<Vec<Option<Type>>>,
}

impl Node {
    pub fn inner(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            value: None,
            children,
            inferred_type: None,
            argument_types: None,
        }
    }

    pub fn terminal(kind: TokenKind, lexeme: String) -> Self {
        Self {
            kind: NodeKind::Terminal(kind),
            value: Some(lexeme),
            children: Vec::new(),
            inferred_type: None,
            argument_types: None,
        }
    }

    pub fn error(value: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Error,
            value: Some(value.into()),
            children: Vec::new(),
            inferred_type: None,
            argument_types: None,
        }
    }

    pub fn is_terminal(&self, kind: TokenKind) -> bool {
        self.kind == NodeKind::Terminal(kind)
    }

    /// First child with the given kind, if any.
    pub fn find_child(&self, kind: NodeKind) -> Option<&Node> {
        self.children.iter().find(|child| child.kind == kind)
    }

    /// Lexeme of the first identifier terminal in this subtree.
    pub fn first_id(&self) -> Option<&str> {
        if self.kind == NodeKind::Terminal(TokenKind::Id) {
            return self.value.as_deref();
        }
        self.children.iter().find_map(Node::first_id)
    }

    /// Lexemes of every identifier terminal in this subtree, in order.
    pub fn collect_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.collect_ids_into(&mut ids);
        ids
    }

    fn collect_ids_into(&self, ids: &mut Vec<String>) {
        if self.kind == NodeKind::Terminal(TokenKind::Id) {
            if let Some(lexeme) = &self.value {
                ids.push(lexeme.clone());
            }
        }
        for child in &self.children {
            child.collect_ids_into(ids);
        }
    }

    fn label(&self) -> String {
        match self.kind {
            NodeKind::Terminal(kind) => format!("{:?}", kind),
            other => format!("{:?}", other),
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            f.write_str("  ")?;
        }
        match &self.value {
            Some(value) => writeln!(f, "{} '{}'", self.label(), value)?,
            None => writeln!(f, "{}", self.label())?,
        }
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
