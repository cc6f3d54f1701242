//! A template engine with block inheritance that can annotate its output with
//! the template each block came from.
//!
//! # Features
//!
//! ### Syntax
//!
//! - Expressions: `{{ user.name }}`
//! - Conditionals: `{% if user.enabled %} ... {% endif %}`
//! - Loops: `{% for user in users %} ... {% endfor %}`
//! - Nested templates: `{% include "nested" %}`
//! - Inheritance: `{% extends "base" %}`, `{% block content %} ... {% endblock %}`
//!   and `{{ block.super }}`
//!
//! ### Engine
//!
//! - Render to a [`String`] or any [`std::io::Write`] implementor
//! - Render using any [`serde`] serializable values
//! - Customizable value formatters: `{{ user.name | escape_html }}`
//! - Per request debug annotations showing which template provided each block
//!
//! # Getting started
//!
//! Your entry point is the [`Engine`] struct. The engine stores the value
//! formatters and compiled templates. Generally, you only need to construct
//! one engine during the lifetime of a program.
//!
//! ```
//! let engine = template_unwind::Engine::new();
//! ```
//!
//! Next, [`.add_template`][Engine::add_template] is used to compile and store a
//! template in the engine.
//!
//! ```
//! # let mut engine = template_unwind::Engine::new();
//! engine.add_template("hello", "Hello {{ user.name }}!")?;
//! # Ok::<(), template_unwind::Error>(())
//! ```
//!
//! Finally, the template is rendered by fetching it using
//! [`.get_template`][Engine::get_template] and calling
//! [`.render`][TemplateRef::render].
//!
//! ```
//! # let mut engine = template_unwind::Engine::new();
//! # engine.add_template("hello", "Hello {{ user.name }}!")?;
//! let template = engine.get_template("hello").unwrap();
//! let result = template
//!     .render(template_unwind::value! { user: { name: "John Smith" } })
//!     .to_string()?;
//! assert_eq!(result, "Hello John Smith!");
//! # Ok::<(), template_unwind::Error>(())
//! ```
//!
//! # Examples
//!
//! ### Template inheritance
//!
//! A template that extends another only provides blocks, everything else is
//! taken from the parent.
//!
//! ```
//! use template_unwind::{value, Engine};
//!
//! let mut engine = Engine::new();
//! engine.add_template("base", "<title>{% block title %}Site{% endblock %}</title>")?;
//! engine.add_template(
//!     "page",
//!     "{% extends \"base\" %}{% block title %}Page | {{ block.super }}{% endblock %}",
//! )?;
//!
//! let result = engine
//!     .get_template("page")
//!     .unwrap()
//!     .render(value! {})
//!     .to_string()?;
//! assert_eq!(result, "<title>Page | Site</title>");
//! # Ok::<(), template_unwind::Error>(())
//! ```
//!
//! ### Annotate blocks
//!
//! Rendering in one of the [`UnwindMode`]s wraps each block with the name of
//! the template that declared it.
//!
//! ```
//! use template_unwind::{value, Engine, UnwindMode};
//!
//! let mut engine = Engine::new();
//! engine.add_template("base", "<div>{% block body %}{% endblock %}</div>")?;
//! engine.add_template("page", "{% extends \"base\" %}{% block body %}<p>hi</p>{% endblock %}")?;
//!
//! let result = engine
//!     .get_template("page")
//!     .unwrap()
//!     .render(value! {})
//!     .with_unwind_mode(UnwindMode::Comments)
//!     .to_string()?;
//! assert_eq!(
//!     result,
//!     "<div><!-- {% block body [page] %} -->\n<p>hi</p>\n<!-- {% endblock body [page] %} -->\n</div>"
//! );
//! # Ok::<(), template_unwind::Error>(())
//! ```
//!
//! ### Add and use a custom formatter
//!
//! ```
//! use std::fmt::Write;
//!
//! let mut engine = template_unwind::Engine::new();
//! engine.add_formatter("debug", |f, value| {
//!     write!(f, "Value::{:?}", value)?;
//!     Ok(())
//! });
//!
//! let result = engine
//!     .compile("User age: {{ user.age | debug }}")?
//!     .render(template_unwind::value! { user: { age: 23 } })
//!     .to_string()?;
//!
//! assert_eq!(result, "User age: Value::Integer(23)");
//! # Ok::<(), template_unwind::Error>(())
//! ```

mod compile;
mod error;
pub mod fmt;
mod macros;
mod render;
mod types;
pub mod unwind;
mod value;

use std::borrow::Cow;
use std::collections::BTreeMap;

pub use crate::error::{Error, ErrorKind};
pub use crate::render::Renderer;
pub use crate::unwind::{Request, UnwindMode};
pub use crate::value::{to_value, Value};

use crate::fmt::FormatFn;
use crate::types::program;

/// A type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The compilation and rendering engine.
pub struct Engine<'engine> {
    default_formatter: &'engine FormatFn,
    formatters: BTreeMap<Cow<'engine, str>, Box<FormatFn>>,
    templates: BTreeMap<Cow<'engine, str>, program::Template<'engine>>,
    max_depth: usize,
    unwind_param: Cow<'engine, str>,
}

/// A compiled template.
pub struct Template<'engine, 'source> {
    engine: &'engine Engine<'engine>,
    template: program::Template<'source>,
}

/// A reference to a compiled template in an [`Engine`].
#[derive(Clone, Copy)]
pub struct TemplateRef<'engine> {
    engine: &'engine Engine<'engine>,
    template: &'engine program::Template<'engine>,
}

impl<'engine> Default for Engine<'engine> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<'engine> Engine<'engine> {
    /// Construct a new engine.
    #[inline]
    pub fn new() -> Self {
        Self {
            default_formatter: &fmt::default,
            formatters: BTreeMap::new(),
            templates: BTreeMap::new(),
            max_depth: 64,
            unwind_param: Cow::Borrowed(unwind::DEFAULT_PARAM),
        }
    }

    /// Set the default formatter.
    ///
    /// This is used for every `{{ expr }}` without an explicit formatter.
    #[inline]
    pub fn set_default_formatter<F>(&mut self, f: &'engine F)
    where
        F: Fn(&mut fmt::Formatter<'_>, &Value) -> fmt::Result + Sync + Send + 'static,
    {
        self.default_formatter = f;
    }

    /// Add a new value formatter to the engine.
    #[inline]
    pub fn add_formatter<N, F>(&mut self, name: N, f: F)
    where
        N: Into<Cow<'engine, str>>,
        F: Fn(&mut fmt::Formatter<'_>, &Value) -> fmt::Result + Sync + Send + 'static,
    {
        self.formatters.insert(name.into(), Box::new(f));
    }

    /// Set the maximum number of nested templates.
    ///
    /// Both `{% include %}` and `{% extends %}` count towards this limit.
    /// Defaults to 64.
    #[inline]
    pub fn set_max_depth(&mut self, depth: usize) {
        self.max_depth = depth;
    }

    /// Set the name of the query parameter that selects the debug mode.
    ///
    /// Defaults to `unwind-template-as`.
    #[inline]
    pub fn set_unwind_param<P>(&mut self, param: P)
    where
        P: Into<Cow<'engine, str>>,
    {
        self.unwind_param = param.into();
    }

    /// Add a template to the engine.
    ///
    /// The template will be compiled and stored under the given name. The
    /// name is also what block annotations report as the block's template.
    ///
    /// When using this function over [`.compile(..)`][Engine::compile] the
    /// template source lifetime needs to be as least as long as the engine
    /// lifetime.
    #[inline]
    pub fn add_template<N, S>(&mut self, name: N, source: S) -> Result<()>
    where
        N: Into<Cow<'engine, str>>,
        S: Into<Cow<'engine, str>>,
    {
        let name = name.into();
        let template = compile::template(source.into(), name.clone())?;
        tracing::debug!(template = %name, "added template");
        self.templates.insert(name, template);
        Ok(())
    }

    /// Lookup a template by name.
    #[inline]
    pub fn get_template(&self, name: &str) -> Option<TemplateRef<'_>> {
        self.templates.get(name).map(|template| TemplateRef {
            engine: self,
            template,
        })
    }

    /// Compile a template.
    ///
    /// The template will not be stored in the engine. The advantage over
    /// [`.add_template(..)`][Engine::add_template] here is that the lifetime of
    /// the template source does not need to outlive the engine. Blocks declared
    /// in the template are annotated with `<anonymous>`.
    #[inline]
    pub fn compile<'source, S>(&self, source: S) -> Result<Template<'_, 'source>>
    where
        S: Into<Cow<'source, str>>,
    {
        let template = compile::template(source.into(), Cow::Borrowed(program::ANONYMOUS))?;
        Ok(Template {
            engine: self,
            template,
        })
    }
}

impl std::fmt::Debug for Engine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("formatters", &self.formatters.keys())
            .field("templates", &self.templates.keys())
            .field("max_depth", &self.max_depth)
            .field("unwind_param", &self.unwind_param)
            .finish()
    }
}

impl<'engine, 'source> Template<'engine, 'source> {
    /// Render the template using the provided [`serde::Serialize`] value.
    #[inline]
    pub fn render<S>(&self, ctx: S) -> Renderer<'_>
    where
        S: serde::Serialize,
    {
        Renderer::with_serde(self.engine, &self.template, ctx)
    }

    /// Render the template using the provided value.
    #[inline]
    pub fn render_from<'render>(&'render self, ctx: &'render Value) -> Renderer<'render> {
        Renderer::with_value(self.engine, &self.template, ctx)
    }

    /// Returns the original template source.
    #[inline]
    pub fn source(&self) -> &str {
        &self.template.source
    }
}

impl std::fmt::Debug for Template<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl<'engine> TemplateRef<'engine> {
    /// Render the template using the provided [`serde::Serialize`] value.
    #[inline]
    pub fn render<S>(&self, ctx: S) -> Renderer<'engine>
    where
        S: serde::Serialize,
    {
        Renderer::with_serde(self.engine, self.template, ctx)
    }

    /// Render the template using the provided value.
    #[inline]
    pub fn render_from<'render>(&self, ctx: &'render Value) -> Renderer<'render>
    where
        'engine: 'render,
    {
        Renderer::with_value(self.engine, self.template, ctx)
    }

    /// Returns the name the template was registered under.
    #[inline]
    pub fn name(&self) -> &'engine str {
        &self.template.name
    }

    /// Returns the original template source.
    #[inline]
    pub fn source(&self) -> &'engine str {
        &self.template.source
    }
}

impl std::fmt::Debug for TemplateRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRef")
            .field("name", &self.template.name)
            .finish_non_exhaustive()
    }
}
