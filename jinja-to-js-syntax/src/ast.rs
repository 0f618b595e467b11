//! Syntax tree for the template language
//!
//! Statements are [`Node`]s, values are [`Expr`]s. Every node keeps the byte
//! span it was parsed from so later stages can point diagnostics at the
//! template source.

use std::sync::Arc;

/// Byte range in the template source.
pub type Span = miette::SourceSpan;

/// Build a span covering `start..end`.
pub(crate) fn span(start: usize, end: usize) -> Span {
    Span::from(start..end.max(start))
}

/// Span from the start of `a` to the end of `b`.
pub fn join(a: Span, b: Span) -> Span {
    span(a.offset(), b.offset() + b.len())
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    /// Loader name of the template, `None` for literal sources
    pub name: Option<String>,
    /// The full source text, shared with diagnostics
    pub source: Arc<String>,
    /// Top-level statements
    pub body: Vec<Node>,
}

impl Template {
    /// Every `{% block %}` in the template, outermost first, including blocks
    /// nested inside other statements.
    pub fn blocks(&self) -> Vec<&BlockNode> {
        let mut found = Vec::new();
        collect_blocks(&self.body, &mut found);
        found
    }
}

fn collect_blocks<'a>(nodes: &'a [Node], found: &mut Vec<&'a BlockNode>) {
    for node in nodes {
        match node {
            Node::Block(block) => {
                found.push(block);
                collect_blocks(&block.body, found);
            }
            Node::If(n) => {
                collect_blocks(&n.body, found);
                collect_blocks(&n.otherwise, found);
            }
            Node::For(n) => collect_blocks(&n.body, found),
            Node::With(n) => collect_blocks(&n.body, found),
            Node::Macro(n) => collect_blocks(&n.body, found),
            Node::Text(_)
            | Node::Print(_)
            | Node::Set(_)
            | Node::Include(_)
            | Node::Extends(_) => {}
        }
    }
}

/// A statement-level node.
#[derive(Debug, Clone)]
pub enum Node {
    /// Literal template text
    Text(TextNode),
    /// `{{ expr }}`
    Print(PrintNode),
    /// `{% if %}`; `elif` is a single nested `If` in `otherwise`
    If(IfNode),
    /// `{% for %}`
    For(ForNode),
    /// `{% set name = expr %}`
    Set(SetNode),
    /// `{% with %}`
    With(WithNode),
    /// `{% include "name" %}`
    Include(IncludeNode),
    /// `{% extends "name" %}`
    Extends(ExtendsNode),
    /// `{% block name %}`
    Block(BlockNode),
    /// `{% macro name(args) %}`
    Macro(MacroNode),
}

impl Node {
    /// Stable lowercase tag for this kind of node.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Text(_) => "text",
            Node::Print(_) => "print",
            Node::If(_) => "if",
            Node::For(_) => "for",
            Node::Set(_) => "set",
            Node::With(_) => "with",
            Node::Include(_) => "include",
            Node::Extends(_) => "extends",
            Node::Block(_) => "block",
            Node::Macro(_) => "macro",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Node::Text(n) => n.span,
            Node::Print(n) => n.span,
            Node::If(n) => n.span,
            Node::For(n) => n.span,
            Node::Set(n) => n.span,
            Node::With(n) => n.span,
            Node::Include(n) => n.span,
            Node::Extends(n) => n.span,
            Node::Block(n) => n.span,
            Node::Macro(n) => n.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextNode {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct PrintNode {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfNode {
    pub test: Expr,
    pub body: Vec<Node>,
    /// `else` body, or a single nested `If` for `elif`
    pub otherwise: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ForNode {
    /// A [`Expr::Var`] or an [`Expr::Tuple`] of names
    pub target: Expr,
    pub iter: Expr,
    /// Inline `if` filter: `{% for x in xs if x %}`
    pub filter: Option<Expr>,
    pub body: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SetNode {
    pub target: Ident,
    pub value: Expr,
    pub span: Span,
}

/// `{% with a = 1 %}...{% endwith %}`. Inline assignments are stored as
/// leading [`Node::Set`] entries of `body`.
#[derive(Debug, Clone)]
pub struct WithNode {
    pub body: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IncludeNode {
    pub template: StringLit,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExtendsNode {
    pub template: StringLit,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BlockNode {
    pub name: Ident,
    pub body: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MacroNode {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: Vec<Node>,
    pub span: Span,
}

/// An identifier with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLit {
    pub value: String,
    pub span: Span,
}

/// An expression.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    List(ListExpr),
    Tuple(ListExpr),
    Dict(DictExpr),
    Var(Ident),
    /// `base.field`
    Field(FieldExpr),
    /// `base[index]`
    Index(IndexExpr),
    /// `base[start:stop:step]`
    Slice(SliceExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Compare(CompareExpr),
    /// `expr | filter(args)`
    Filter(FilterExpr),
    /// `expr is [not] test(args)`
    Test(TestExpr),
    Call(CallExpr),
    /// `value if condition else otherwise`
    Ternary(TernaryExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(l) => l.span,
            Expr::List(l) | Expr::Tuple(l) => l.span,
            Expr::Dict(d) => d.span,
            Expr::Var(i) => i.span,
            Expr::Field(f) => f.span,
            Expr::Index(i) => i.span,
            Expr::Slice(s) => s.span,
            Expr::Unary(u) => u.span,
            Expr::Binary(b) => b.span,
            Expr::Compare(c) => c.span,
            Expr::Filter(f) => f.span,
            Expr::Test(t) => t.span,
            Expr::Call(c) => c.span,
            Expr::Ternary(t) => t.span,
        }
    }

    /// The literal value, if this is a constant.
    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match self {
            Expr::Literal(l) => Some(&l.value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone)]
pub struct ListExpr {
    pub items: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DictExpr {
    pub entries: Vec<(Expr, Expr)>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FieldExpr {
    pub base: Box<Expr>,
    pub field: Ident,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub base: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SliceExpr {
    pub base: Box<Expr>,
    pub start: Option<Box<Expr>>,
    pub stop: Option<Box<Expr>>,
    pub step: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    /// `~`
    Concat,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

/// A comparison. Chains such as `a < b < c` keep every operator so the
/// consumer can decide whether to accept them.
#[derive(Debug, Clone)]
pub struct CompareExpr {
    pub left: Box<Expr>,
    pub ops: Vec<(CompareOp, Expr)>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FilterExpr {
    pub expr: Box<Expr>,
    pub name: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TestExpr {
    pub expr: Box<Expr>,
    pub name: Ident,
    pub args: Vec<Expr>,
    pub negated: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub func: Box<Expr>,
    pub args: Vec<Expr>,
    pub span: Span,
}

impl CallExpr {
    /// Name of the called method when the callee is an attribute or a
    /// string subscript, e.g. `items` for both `d.items()` and `d["items"]()`.
    pub fn method_name(&self) -> Option<&str> {
        match &*self.func {
            Expr::Field(f) => Some(&f.field.name),
            Expr::Index(i) => match &*i.index {
                Expr::Literal(Literal {
                    value: LiteralValue::String(s),
                    ..
                }) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }

    /// The receiver of a method call (`d` in `d.items()`).
    pub fn receiver(&self) -> Option<&Expr> {
        match &*self.func {
            Expr::Field(f) => Some(&f.base),
            Expr::Index(i) => Some(&i.base),
            _ => None,
        }
    }

    /// Whether this is a call of one of the given method names.
    pub fn is_method_call(&self, names: &[&str]) -> bool {
        self.method_name().is_some_and(|m| names.contains(&m))
    }
}

#[derive(Debug, Clone)]
pub struct TernaryExpr {
    pub condition: Box<Expr>,
    pub value: Box<Expr>,
    pub otherwise: Option<Box<Expr>>,
    pub span: Span,
}
