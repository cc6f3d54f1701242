//! The syntax tree produced by the parser.
//!
//! Nodes refer back into the template source with [`Span`]s, only literals and
//! template names are stored as owned values.

use crate::types::span::Span;
use crate::Value;

#[cfg_attr(internal_debug, derive(Debug))]
pub struct Template {
    /// The parent named by `{% extends %}`.
    pub extends: Option<TemplateName>,
    pub scope: Scope,
}

/// A sequence of statements.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Scope {
    pub stmts: Vec<Stmt>,
}

#[cfg_attr(internal_debug, derive(Debug))]
pub enum Stmt {
    Raw(Span),
    Emit(Emit),
    Include(Include),
    If(If),
    For(For),
    With(With),
    Block(Block),
    /// `{{ block.super }}`
    Super,
}

/// `{{ expr }}` or `{{ expr | formatter }}`.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Emit {
    pub expr: Expr,
    pub formatter: Option<Ident>,
    pub span: Span,
}

#[cfg_attr(internal_debug, derive(Debug))]
pub struct Include {
    pub name: TemplateName,
    /// Replaces the variables visible to the included template.
    pub globals: Option<Expr>,
}

/// A template name given as a string literal.
#[derive(Clone)]
#[cfg_attr(internal_debug, derive(Debug))]
pub struct TemplateName {
    pub name: String,
    pub span: Span,
}

/// `{% if [not] cond %} ... [{% else %} ...] {% endif %}`.
///
/// An `else if` chain is represented as an `If` nested in `otherwise`.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct If {
    pub negate: bool,
    pub cond: Expr,
    pub then: Scope,
    pub otherwise: Option<Scope>,
}

#[cfg_attr(internal_debug, derive(Debug))]
pub struct For {
    pub vars: LoopVars,
    pub iterable: Expr,
    pub body: Scope,
}

#[derive(Clone, Copy)]
#[cfg_attr(internal_debug, derive(Debug))]
pub enum LoopVars {
    Item(Ident),
    KeyValue(KeyValue),
}

#[derive(Clone, Copy)]
#[cfg_attr(internal_debug, derive(Debug))]
pub struct KeyValue {
    pub key: Ident,
    pub value: Ident,
    pub span: Span,
}

/// `{% with expr as name %} ... {% endwith %}`.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct With {
    pub expr: Expr,
    pub name: Ident,
    pub body: Scope,
}

/// `{% block name %} ... {% endblock %}`.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Block {
    pub name: Ident,
    pub body: Scope,
}

#[cfg_attr(internal_debug, derive(Debug))]
pub enum Expr {
    Var(Var),
    Literal(Literal),
}

/// A dotted variable path, never empty.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Var {
    pub path: Vec<Key>,
}

#[derive(Clone, Copy)]
#[cfg_attr(internal_debug, derive(Debug))]
pub enum Key {
    List(Index),
    Map(Ident),
}

#[derive(Clone, Copy)]
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Index {
    pub value: usize,
    pub span: Span,
}

#[derive(Clone, Copy)]
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Ident {
    pub span: Span,
}

#[cfg_attr(internal_debug, derive(Debug))]
pub struct Literal {
    pub value: Value,
    pub span: Span,
}

impl Scope {
    pub const fn new() -> Self {
        Self { stmts: Vec::new() }
    }
}

impl TemplateName {
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Self::Var(var) => var.span(),
            Self::Literal(lit) => lit.span,
        }
    }
}

impl Var {
    pub fn span(&self) -> Span {
        match (self.path.first(), self.path.last()) {
            (Some(first), Some(last)) => first.span().combine(last.span()),
            _ => Span::from(0..0),
        }
    }

    pub fn first(&self) -> &Key {
        &self.path[0]
    }

    pub fn rest(&self) -> &[Key] {
        &self.path[1..]
    }
}

impl Key {
    pub const fn span(&self) -> Span {
        match *self {
            Self::List(Index { span, .. }) | Self::Map(Ident { span }) => span,
        }
    }
}
