//! A compiled template: a flat list of instructions for the top level and one
//! list per declared block.

use std::borrow::Cow;

use crate::types::ast;
use crate::types::span::Span;
use crate::Value;

/// The target of a jump that has not been patched yet.
pub const UNPATCHED: usize = !0;

/// The origin reported for templates that were not registered by name.
pub const ANONYMOUS: &str = "<anonymous>";

#[cfg_attr(internal_debug, derive(Debug))]
pub struct Template<'source> {
    pub source: Cow<'source, str>,
    /// The name the template was registered under.
    pub name: Cow<'source, str>,
    /// The parent template, if this template starts with `{% extends %}`.
    pub extends: Option<ast::TemplateName>,
    pub instrs: Vec<Instr>,
    pub blocks: Vec<BlockDecl>,
}

/// A compiled `{% block %}` declaration.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct BlockDecl {
    pub name: ast::Ident,
    pub instrs: Vec<Instr>,
    /// The name of the template that declared this block.
    pub origin: String,
}

/// A single step of a compiled template.
///
/// Expressions are evaluated into a single register by `Load` or
/// `LoadLiteral` and consumed by the next instruction that needs a value.
#[cfg_attr(internal_debug, derive(Debug))]
pub enum Instr {
    Jump(usize),
    /// Jump if the register holds `true`, the span is the condition's.
    JumpIfTrue(usize, Span),
    /// Jump if the register holds `false`.
    JumpIfFalse(usize, Span),

    EmitRaw(Span),
    /// Format the register with the default formatter.
    EmitValue(Span),
    /// Format the register with a named formatter.
    EmitFormatted(ast::Ident, Span),

    /// Start iterating over the register.
    LoopBegin(ast::LoopVars, Span),
    /// Advance the innermost loop, jumping past it once exhausted.
    LoopNext(usize),

    /// Bind the register to a name until the matching `Unbind`.
    Bind(ast::Ident),
    Unbind,

    Include(ast::TemplateName),
    /// Include a template with the register as its only variables.
    IncludeWith(ast::TemplateName),

    Load(ast::Var),
    LoadLiteral(Value),

    /// Render the block declared at this index, or its override.
    Block(usize),
    /// Render the declaration the current block overrides.
    Super,
}

impl Template<'_> {
    /// Returns the name of the given block declaration.
    pub fn block_name(&self, decl: &BlockDecl) -> &str {
        &self.source[decl.name.span]
    }
}

#[cfg(not(internal_debug))]
impl std::fmt::Debug for Template<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
