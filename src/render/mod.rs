#![allow(clippy::wrong_self_convention)]

mod blocks;
mod core;
mod iter;
mod stack;
mod value;

use std::io;

use crate::fmt::{Formatter, IoWriter};
use crate::render::core::RendererImpl;
use crate::render::stack::Stack;
use crate::types::program::Template;
use crate::unwind::{Annotator, Request, UnwindMode};
use crate::{Engine, Error, Result, Value};

/// A renderer that interprets a compiled [`Template`][crate::Template].
///
/// This struct is created by one of the following functions:
/// - [`Template{,Ref}::render`][crate::Template::render]
/// - [`Template{,Ref}::render_from`][crate::Template::render_from]
#[must_use = "must call `.to_string()` or `.to_writer(..)` on the renderer"]
pub struct Renderer<'render> {
    engine: &'render Engine<'render>,
    template: &'render Template<'render>,
    globals: Globals<'render>,
    request: Option<&'render Request>,
    mode: Option<UnwindMode>,
    max_depth: Option<usize>,
}

enum Globals<'render> {
    Owned(Result<Value>),
    Borrowed(&'render Value),
}

/// Settings resolved once before anything is rendered.
struct RenderSettings {
    mode: UnwindMode,
    max_depth: usize,
}

impl<'render> Renderer<'render> {
    fn new(
        engine: &'render Engine<'render>,
        template: &'render Template<'render>,
        globals: Globals<'render>,
    ) -> Self {
        Self {
            engine,
            template,
            globals,
            request: None,
            mode: None,
            max_depth: None,
        }
    }

    pub(crate) fn with_serde<S>(
        engine: &'render Engine<'render>,
        template: &'render Template<'render>,
        globals: S,
    ) -> Self
    where
        S: serde::Serialize,
    {
        Self::new(engine, template, Globals::Owned(crate::to_value(globals)))
    }

    pub(crate) fn with_value(
        engine: &'render Engine<'render>,
        template: &'render Template<'render>,
        globals: &'render Value,
    ) -> Self {
        Self::new(engine, template, Globals::Borrowed(globals))
    }

    /// Set the request this template is rendered for.
    ///
    /// The debug mode is read from the query parameter configured with
    /// [`Engine::set_unwind_param`], an unknown value fails the render before
    /// any output is written.
    pub fn with_request(mut self, request: &'render Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Set the debug mode directly, taking precedence over the request.
    pub fn with_unwind_mode(mut self, mode: UnwindMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the maximum number of nested templates.
    ///
    /// Both `{% include %}` and `{% extends %}` count towards this limit, as
    /// counted from the root template.
    ///
    /// Defaults to the engine setting.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Render the template to a string.
    pub fn to_string(self) -> Result<String> {
        let mut s = String::with_capacity(self.template.source.len());
        let mut f = Formatter::with_string(&mut s);
        self.render(&mut f)?;
        Ok(s)
    }

    /// Render the template to the given writer.
    pub fn to_writer<W>(self, writer: W) -> Result<()>
    where
        W: io::Write,
    {
        let mut w = IoWriter::new(writer);
        let mut f = Formatter::with_writer(&mut w);
        self.render(&mut f)
            .map_err(|err| w.take_error().map(Error::from).unwrap_or(err))
    }

    fn render(self, f: &mut Formatter<'_>) -> Result<()> {
        let settings = self.settings()?;
        match self.globals {
            Globals::Owned(result) => {
                let value = result?;
                render(self.engine, self.template, Stack::new(&value), &settings, f)
            }
            Globals::Borrowed(value) => {
                render(self.engine, self.template, Stack::new(value), &settings, f)
            }
        }
    }

    fn settings(&self) -> Result<RenderSettings> {
        let mode = match self.mode {
            Some(mode) => mode,
            None => {
                let selector = self
                    .request
                    .and_then(|r| r.query(&self.engine.unwind_param));
                UnwindMode::from_selector(selector)?
            }
        };
        tracing::debug!(template = %self.template.name, ?mode, "resolved unwind mode");
        Ok(RenderSettings {
            mode,
            max_depth: self.max_depth.unwrap_or(self.engine.max_depth),
        })
    }
}

fn render<'render, 'stack>(
    engine: &'render Engine<'render>,
    template: &'render Template<'render>,
    stack: Stack<'stack>,
    settings: &RenderSettings,
    f: &mut Formatter<'_>,
) -> Result<()>
where
    'render: 'stack,
{
    RendererImpl {
        engine,
        stack,
        annotator: Annotator::new(settings.mode),
        max_depth: settings.max_depth,
        blocks: None,
        frames: Vec::new(),
    }
    .render(f, template)
}
