//! Annotate rendered blocks with the template that provided them.
//!
//! When a template is rendered in one of the debug modes every `{% block %}`
//! is wrapped in markers naming the block and the template that declared the
//! content that was actually rendered. This makes it easy to find which
//! template in a deep `{% extends %}` chain is responsible for some output.
//!
//! The mode is usually picked per request using a query parameter, see
//! [`Renderer::with_request`][crate::Renderer::with_request].
//!
//! ```
//! use template_unwind::{value, Engine, Request};
//!
//! let mut engine = Engine::new();
//! engine.add_template("base", "<main>{% block content %}{% endblock %}</main>")?;
//! engine.add_template("page", "{% extends \"base\" %}{% block content %}hi{% endblock %}")?;
//!
//! let request = Request::new().with_query("unwind-template-as", "comments");
//! let result = engine
//!     .get_template("page")
//!     .unwrap()
//!     .render(value! {})
//!     .with_request(&request)
//!     .to_string()?;
//! assert_eq!(result, "<main>{% block content [page] %}hi{% endblock %}</main>");
//! # Ok::<(), template_unwind::Error>(())
//! ```

mod format;

use std::collections::BTreeMap;

pub use crate::unwind::format::{interpolate, Formats, Role};
use crate::{Error, Result};

/// The query parameter that selects the debug mode by default.
pub const DEFAULT_PARAM: &str = "unwind-template-as";

/// The style of block annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnwindMode {
    /// Blocks are rendered without annotations.
    #[default]
    None,
    /// Blocks are wrapped in HTML comments.
    Comments,
    /// Blocks are wrapped in `<django:block>` elements.
    Elements,
}

/// The parts of an incoming request relevant to rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    query: BTreeMap<String, String>,
}

/// Wraps rendered block content according to the resolved mode.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Annotator {
    mode: UnwindMode,
    formats: &'static Formats,
}

impl UnwindMode {
    /// Resolves the mode from the value of the selector query parameter.
    ///
    /// A missing or empty selector disables annotations.
    pub fn from_selector(selector: Option<&str>) -> Result<Self> {
        match selector {
            None | Some("") => Ok(Self::None),
            Some("comments") => Ok(Self::Comments),
            Some("elements") => Ok(Self::Elements),
            Some(other) => Err(Error::unknown_mode(other)),
        }
    }

    /// Returns the annotation templates for this mode.
    pub fn formats(self) -> &'static Formats {
        match self {
            Self::None => &format::NONE,
            Self::Comments => &format::COMMENTS,
            Self::Elements => &format::ELEMENTS,
        }
    }
}

impl std::str::FromStr for UnwindMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_selector(Some(s))
    }
}

impl Request {
    /// Construct a request without any query parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter, replacing any previous value.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Returns the value of a query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for Request
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            query: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Annotator {
    pub fn new(mode: UnwindMode) -> Self {
        Self {
            mode,
            formats: mode.formats(),
        }
    }

    /// Annotates the output of a block.
    pub fn block(&self, path: &str, content: String, tmplsrc: &str) -> String {
        if self.mode == UnwindMode::None {
            return content;
        }
        let role = Role::for_content(&content);
        interpolate(self.formats.get(role), path, &content, tmplsrc)
    }

    /// Annotates the output of a `{{ block.super }}` call.
    pub fn super_(&self, path: &str, content: String, tmplsrc: &str) -> String {
        if self.mode == UnwindMode::None {
            return content;
        }
        interpolate(self.formats.get(Role::Super), path, &content, tmplsrc)
    }
}

/// Joins the names of the active blocks, skipping consecutive duplicates.
pub(crate) fn block_path<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut path = String::new();
    let mut prev = None;
    for name in names {
        if prev == Some(name) {
            continue;
        }
        if prev.is_some() {
            path.push('/');
        }
        path.push_str(name);
        prev = Some(name);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn from_selector() {
        assert_eq!(UnwindMode::from_selector(None).unwrap(), UnwindMode::None);
        assert_eq!(UnwindMode::from_selector(Some("")).unwrap(), UnwindMode::None);
        assert_eq!(
            UnwindMode::from_selector(Some("comments")).unwrap(),
            UnwindMode::Comments
        );
        assert_eq!(
            UnwindMode::from_selector(Some("elements")).unwrap(),
            UnwindMode::Elements
        );
    }

    #[test]
    fn from_selector_unknown() {
        let err = UnwindMode::from_selector(Some("bogus")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownMode);
        assert_eq!(err.to_string(), "unknown unwind mode `bogus`");
    }

    #[test]
    fn request_query() {
        let request: Request = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(request.query("a"), Some("1"));
        assert_eq!(request.query("c"), None);
        let request = request.with_query("a", "3");
        assert_eq!(request.query("a"), Some("3"));
    }

    #[test]
    fn block_path_skips_consecutive_duplicates() {
        assert_eq!(block_path(Vec::<&str>::new()), "");
        assert_eq!(block_path(["outer", "inner"]), "outer/inner");
        assert_eq!(block_path(["content", "content", "sidebar"]), "content/sidebar");
        assert_eq!(block_path(["a", "b", "a"]), "a/b/a");
    }

    #[test]
    fn annotator_none_passes_through() {
        let a = Annotator::new(UnwindMode::None);
        assert_eq!(a.block("x", String::from("<p>\n"), "t"), "<p>\n");
        assert_eq!(a.super_("x", String::from("y"), "t"), "y");
    }

    #[test]
    fn annotator_comments_inline() {
        let a = Annotator::new(UnwindMode::Comments);
        assert_eq!(
            a.block("title", String::from("Hello"), "base"),
            "{% block title [base] %}Hello{% endblock %}"
        );
    }
}
