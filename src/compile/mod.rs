//! Compile the template into a program that can be executed by the renderer.
//!
//! This process has three stages:
//! - The lexer chunks the template source into tokens.
//! - The parser constructs an AST from the token stream.
//! - The compiler takes the AST and constructs the program.

mod lex;
mod parse;
mod search;

use std::borrow::Cow;
use std::mem;

use crate::types::ast;
use crate::types::program::{BlockDecl, Instr, Template, UNPATCHED};
use crate::Result;

/// Compile a template into a program.
pub fn template<'source>(
    source: Cow<'source, str>,
    name: Cow<'source, str>,
) -> Result<Template<'source>> {
    let ast = parse::Parser::new(&source)
        .parse_template()
        .map_err(|err| err.with_template_name(&name))?;
    tracing::trace!(template = %name, "compiled template");
    let origin = name.to_string();
    let Compiler {
        instrs, blocks, ..
    } = Compiler::new(origin).compile_template(ast.scope);
    Ok(Template {
        source,
        name,
        extends: ast.extends,
        instrs,
        blocks,
    })
}

/// A compiler that constructs a program from an AST.
struct Compiler {
    /// The name of the template being compiled.
    origin: String,
    instrs: Vec<Instr>,
    blocks: Vec<BlockDecl>,
}

impl Compiler {
    fn new(origin: String) -> Self {
        Self {
            origin,
            instrs: Vec::new(),
            blocks: Vec::new(),
        }
    }

    fn compile_template(mut self, scope: ast::Scope) -> Self {
        self.compile_scope(scope);
        self
    }

    fn compile_scope(&mut self, scope: ast::Scope) {
        for stmt in scope.stmts {
            self.compile_stmt(stmt);
        }
    }

    fn compile_stmt(&mut self, stmt: ast::Stmt) {
        match stmt {
            ast::Stmt::Raw(raw) => {
                self.push(Instr::EmitRaw(raw));
            }

            ast::Stmt::Emit(ast::Emit {
                expr,
                formatter,
                span,
            }) => {
                self.compile_expr(expr);
                match formatter {
                    Some(name) => self.push(Instr::EmitFormatted(name, span)),
                    None => self.push(Instr::EmitValue(span)),
                };
            }

            ast::Stmt::Include(ast::Include { name, globals }) => match globals {
                Some(globals) => {
                    self.compile_expr(globals);
                    self.push(Instr::IncludeWith(name));
                }
                None => {
                    self.push(Instr::Include(name));
                }
            },

            ast::Stmt::If(ast::If {
                negate,
                cond,
                then,
                otherwise,
            }) => {
                let span = cond.span();
                self.compile_expr(cond);

                // then branch
                let instr = if negate {
                    Instr::JumpIfTrue(UNPATCHED, span)
                } else {
                    Instr::JumpIfFalse(UNPATCHED, span)
                };
                let j = self.push(instr);
                self.compile_scope(then);

                match otherwise {
                    Some(otherwise) => {
                        // else branch
                        let j2 = self.push(Instr::Jump(UNPATCHED));
                        self.update_jump(j);
                        self.compile_scope(otherwise);
                        self.update_jump(j2)
                    }
                    None => {
                        self.update_jump(j);
                    }
                }
            }

            ast::Stmt::For(ast::For {
                vars,
                iterable,
                body,
            }) => {
                let span = iterable.span();
                self.compile_expr(iterable);
                self.push(Instr::LoopBegin(vars, span));
                let j = self.push(Instr::LoopNext(UNPATCHED));
                self.compile_scope(body);
                self.push(Instr::Jump(j));
                self.update_jump(j);
            }

            ast::Stmt::With(ast::With { expr, name, body }) => {
                self.compile_expr(expr);
                self.push(Instr::Bind(name));
                self.compile_scope(body);
                self.push(Instr::Unbind);
            }

            // A block body is compiled into its own instruction sequence so
            // that the renderer can swap in an override.
            ast::Stmt::Block(ast::Block { name, body }) => {
                let outer = mem::take(&mut self.instrs);
                self.compile_scope(body);
                let instrs = mem::replace(&mut self.instrs, outer);
                let i = self.blocks.len();
                self.blocks.push(BlockDecl {
                    name,
                    instrs,
                    origin: self.origin.clone(),
                });
                self.push(Instr::Block(i));
            }

            ast::Stmt::Super => {
                self.push(Instr::Super);
            }
        }
    }

    fn compile_expr(&mut self, expr: ast::Expr) {
        match expr {
            ast::Expr::Var(var) => {
                self.push(Instr::Load(var));
            }
            ast::Expr::Literal(ast::Literal { value, .. }) => {
                self.push(Instr::LoadLiteral(value));
            }
        }
    }

    fn update_jump(&mut self, i: usize) {
        let n = self.instrs.len();
        let j = match &mut self.instrs[i] {
            Instr::Jump(j)
            | Instr::JumpIfTrue(j, _)
            | Instr::JumpIfFalse(j, _)
            | Instr::LoopNext(j) => j,
            _ => panic!("not a jump instr"),
        };
        *j = n;
    }

    fn push(&mut self, instr: Instr) -> usize {
        let i = self.instrs.len();
        self.instrs.push(instr);
        i
    }
}
