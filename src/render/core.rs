use std::fmt::Write;

use crate::fmt::Formatter;
use crate::render::blocks::{BlockContext, BlockRef};
use crate::render::iter::LoopState;
use crate::render::stack::Stack;
use crate::types::ast;
use crate::types::program::{BlockDecl, Instr, Template};
use crate::unwind::{self, Annotator};
use crate::value::ValueCow;
use crate::{Engine, Error, Result};

/// Interprets compiled templates, annotating blocks as it goes.
pub(crate) struct RendererImpl<'render, 'stack> {
    pub(crate) engine: &'render Engine<'render>,
    pub(crate) stack: Stack<'stack>,
    pub(crate) annotator: Annotator,
    pub(crate) max_depth: usize,
    /// The override chains of the `{% extends %}` hierarchy being rendered.
    pub(crate) blocks: Option<BlockContext<'render>>,
    /// The names of the blocks currently being rendered, innermost last.
    pub(crate) frames: Vec<&'render str>,
}

impl<'render, 'stack> RendererImpl<'render, 'stack>
where
    'render: 'stack,
{
    pub(crate) fn render(
        mut self,
        f: &mut Formatter<'_>,
        t: &'render Template<'render>,
    ) -> Result<()> {
        tracing::debug!(template = %t.name, "rendering template");
        self.render_template(f, t, 1)
    }

    /// Render a template, resolving its `{% extends %}` chain first.
    ///
    /// `depth` counts the templates entered so far, including this one.
    fn render_template(
        &mut self,
        f: &mut Formatter<'_>,
        t: &'render Template<'render>,
        mut depth: usize,
    ) -> Result<()> {
        if depth > self.max_depth {
            return Err(Error::max_depth(self.max_depth));
        }

        if t.extends.is_none() {
            return self.render_instrs(f, t, &t.instrs, depth);
        }

        // Collect the blocks from the most derived template down to the root,
        // only the root template's content is rendered.
        let mut ctx = BlockContext::new();
        ctx.add_blocks(t);
        let mut root = t;
        while let Some(parent) = &root.extends {
            depth += 1;
            if depth > self.max_depth {
                return Err(Error::max_depth(self.max_depth));
            }
            let next = self
                .get_template(root, parent)
                .map_err(|err| err.with_template_name(&root.name))?;
            tracing::trace!(template = %root.name, parent = %next.name, "extending template");
            ctx.add_blocks(next);
            root = next;
        }

        let prev = self.blocks.replace(ctx);
        let result = self.render_instrs(f, root, &root.instrs, depth);
        self.blocks = prev;
        result
    }

    fn render_instrs(
        &mut self,
        f: &mut Formatter<'_>,
        t: &'render Template<'render>,
        instrs: &'render [Instr],
        depth: usize,
    ) -> Result<()> {
        self.render_instrs_impl(f, t, instrs, depth)
            .map_err(|err| err.with_template_name(&t.name))
    }

    fn render_instrs_impl(
        &mut self,
        f: &mut Formatter<'_>,
        t: &'render Template<'render>,
        instrs: &'render [Instr],
        depth: usize,
    ) -> Result<()> {
        // An expression that we are building
        let mut expr: Option<ValueCow<'stack>> = None;
        let mut pc = 0;

        while let Some(instr) = instrs.get(pc) {
            match instr {
                Instr::Jump(j) => {
                    pc = *j;
                    continue;
                }

                Instr::JumpIfTrue(j, span) => {
                    if expr.take().unwrap().to_bool(&t.source, *span)? {
                        pc = *j;
                        continue;
                    }
                }

                Instr::JumpIfFalse(j, span) => {
                    if !expr.take().unwrap().to_bool(&t.source, *span)? {
                        pc = *j;
                        continue;
                    }
                }

                Instr::EmitValue(span) => {
                    let value = expr.take().unwrap();
                    (self.engine.default_formatter)(f, &value)
                        .map_err(|err| Error::format(err, &t.source, *span))?;
                }

                Instr::EmitRaw(span) => {
                    let raw = &t.source[*span];
                    // We don't need to enrich this error because it can only
                    // fail because of an IO error.
                    f.write_str(raw)?;
                }

                Instr::EmitFormatted(name, span) => {
                    let name_raw = &t.source[name.span];
                    match self.engine.formatters.get(name_raw) {
                        Some(formatter) => {
                            let value = expr.take().unwrap();
                            formatter(f, &value)
                                .map_err(|err| Error::format(err, &t.source, *span))?;
                        }
                        None => {
                            return Err(Error::render(
                                "unknown formatter",
                                &t.source,
                                name.span,
                            ));
                        }
                    }
                }

                Instr::LoopBegin(vars, span) => {
                    let iterable = expr.take().unwrap();
                    self.stack
                        .push_loop(LoopState::new(&t.source, vars, iterable, *span)?);
                }

                Instr::LoopNext(j) => {
                    if self.stack.current_loop_mut().iterate().is_none() {
                        self.stack.pop_loop();
                        pc = *j;
                        continue;
                    }
                }

                Instr::Bind(name) => {
                    let value = expr.take().unwrap();
                    self.stack.push_var(&t.source[name.span], value);
                }

                Instr::Unbind => {
                    self.stack.pop_var();
                }

                Instr::Include(name) => {
                    let template = self.get_template(t, name)?;
                    self.render_include(f, template, depth)?;
                }

                Instr::IncludeWith(name) => {
                    let globals = expr.take().unwrap();
                    let template = self.get_template(t, name)?;
                    self.stack.enter_include(globals);
                    self.render_include(f, template, depth)?;
                    self.stack.exit_include();
                }

                Instr::Load(var) => {
                    let value = self.stack.lookup_var(&t.source, var)?;
                    let prev = expr.replace(value);
                    debug_assert!(prev.is_none());
                }

                Instr::LoadLiteral(value) => {
                    let prev = expr.replace(ValueCow::Owned(value.clone()));
                    debug_assert!(prev.is_none());
                }

                Instr::Block(i) => {
                    self.render_block(f, t, &t.blocks[*i], depth)?;
                }

                Instr::Super => {
                    self.render_super(f, depth)?;
                }
            }
            pc += 1;
        }

        assert!(pc == instrs.len());
        Ok(())
    }

    /// Render a block, substituting the most derived override if any.
    fn render_block(
        &mut self,
        f: &mut Formatter<'_>,
        t: &'render Template<'render>,
        decl: &'render BlockDecl,
        depth: usize,
    ) -> Result<()> {
        let name = t.block_name(decl);
        let popped = self.blocks.as_mut().and_then(|ctx| ctx.pop(name));
        let block = popped.unwrap_or(BlockRef { template: t, decl });
        if popped.is_some() {
            tracing::trace!(block = name, origin = %block.decl.origin, "resolved block override");
        }

        self.frames.push(name);
        let result = self.render_block_content(block, depth);
        let path = unwind::block_path(self.frames.iter().copied());
        self.frames.pop();
        if let (Some(ctx), Some(popped)) = (self.blocks.as_mut(), popped) {
            ctx.push(name, popped);
        }

        let content = result?;
        let output = self.annotator.block(&path, content, &block.decl.origin);
        f.write_str(&output)?;
        Ok(())
    }

    /// Render the declaration overridden by the innermost active block.
    fn render_super(&mut self, f: &mut Formatter<'_>, depth: usize) -> Result<()> {
        let Some(&name) = self.frames.last() else {
            return Ok(());
        };
        let Some(base) = self.blocks.as_mut().and_then(|ctx| ctx.pop(name)) else {
            tracing::trace!(block = name, "no inherited block for super");
            return Ok(());
        };
        tracing::trace!(block = name, origin = %base.decl.origin, "rendering super block");

        let path = unwind::block_path(self.frames.iter().copied());
        self.frames.push(name);
        let result = self.render_block_content(base, depth);
        self.frames.pop();
        if let Some(ctx) = self.blocks.as_mut() {
            ctx.push(name, base);
        }

        let content = result?;
        if content.is_empty() {
            return Ok(());
        }
        let inner = self.annotator.block(&path, content, &base.decl.origin);
        let output = self.annotator.super_(&path, inner, &base.decl.origin);
        f.write_str(&output)?;
        Ok(())
    }

    /// Render the body of a block declaration into a new buffer.
    fn render_block_content(&mut self, block: BlockRef<'render>, depth: usize) -> Result<String> {
        let mut buf = String::new();
        let mut f = Formatter::with_string(&mut buf);
        self.render_instrs(&mut f, block.template, &block.decl.instrs, depth)?;
        Ok(buf)
    }

    /// Render an included template with a fresh block context.
    fn render_include(
        &mut self,
        f: &mut Formatter<'_>,
        template: &'render Template<'render>,
        depth: usize,
    ) -> Result<()> {
        let blocks = self.blocks.take();
        let result = self.render_template(f, template, depth + 1);
        self.blocks = blocks;
        result
    }

    fn get_template(
        &self,
        t: &Template<'_>,
        name: &ast::TemplateName,
    ) -> Result<&'render Template<'render>> {
        self.engine
            .templates
            .get(name.as_str())
            .ok_or_else(|| Error::render("unknown template", &t.source, name.span))
    }
}
