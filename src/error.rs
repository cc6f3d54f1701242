use std::cmp::max;
use std::fmt;
use std::io;

use unicode_width::UnicodeWidthStr;

use crate::types::span::Span;

/// An error that can occur during template compilation or rendering.
#[derive(Clone)]
pub struct Error {
    kind: ErrorKind,
    /// The name of the template the error occurred in.
    name: Option<String>,
    reason: String,
    /// The template source and the span of the offending region.
    pretty: Option<(String, Span)>,
}

/// The category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The template source could not be compiled.
    Syntax,
    /// The template could not be rendered with the given data.
    Render,
    /// A value formatter failed.
    Format,
    /// The render data could not be converted into a [`Value`][crate::Value].
    Serialize,
    /// Writing to the output failed.
    Io,
    /// Too many nested `include` or `extends` templates.
    MaxDepth,
    /// The debug-mode selector is not one of the known modes.
    UnknownMode,
}

impl Error {
    pub(crate) fn syntax(reason: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self::with_span(ErrorKind::Syntax, reason, source, span)
    }

    pub(crate) fn render(reason: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self::with_span(ErrorKind::Render, reason, source, span)
    }

    pub(crate) fn format(err: crate::fmt::Error, source: &str, span: impl Into<Span>) -> Self {
        let reason = err
            .message()
            .unwrap_or_else(|| String::from("format error"));
        Self::with_span(ErrorKind::Format, reason, source, span)
    }

    pub(crate) fn max_depth(max: usize) -> Self {
        Self {
            kind: ErrorKind::MaxDepth,
            name: None,
            reason: format!("reached maximum template depth ({max})"),
            pretty: None,
        }
    }

    pub(crate) fn unknown_mode(selector: &str) -> Self {
        Self {
            kind: ErrorKind::UnknownMode,
            name: None,
            reason: format!("unknown unwind mode `{selector}`"),
            pretty: None,
        }
    }

    pub(crate) fn serialize(reason: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Serialize,
            name: None,
            reason: reason.to_string(),
            pretty: None,
        }
    }

    fn with_span(
        kind: ErrorKind,
        reason: impl Into<String>,
        source: &str,
        span: impl Into<Span>,
    ) -> Self {
        Self {
            kind,
            name: None,
            reason: reason.into(),
            pretty: Some((source.to_owned(), span.into())),
        }
    }

    /// Attach the template name, keeping the innermost one.
    pub(crate) fn with_template_name(mut self, name: &str) -> Self {
        if self.name.is_none() {
            self.name = Some(name.to_owned());
        }
        self
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the name of the template the error occurred in, if known.
    pub fn template_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self {
            kind: ErrorKind::Io,
            name: None,
            reason: err.to_string(),
            pretty: None,
        }
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Self {
            kind: ErrorKind::Io,
            name: None,
            reason: String::from("format error"),
            pretty: None,
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pretty {
            Some((source, span)) => fmt_pretty(&self.reason, source, *span, f),
            None => write!(f, "{}", self.reason),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pretty {
            Some((source, span)) => {
                if f.alternate() {
                    fmt_pretty(&self.reason, source, *span, f)
                } else {
                    write!(f, "{} between bytes {} and {}", self.reason, span.m, span.n)
                }
            }
            None => write!(f, "{}", self.reason),
        }
    }
}

fn fmt_pretty(msg: &str, source: &str, span: Span, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let lines: Vec<_> = source.split_terminator('\n').collect();
    let (line, col) = to_line_col(&lines, span.m);
    let width = max(1, source[span].width());
    let code = lines
        .get(line)
        .or_else(|| lines.last())
        .copied()
        .unwrap_or_default();

    let num = (line + 1).to_string();
    let pad = num.width();
    let pipe = "|";
    let underline = "^".repeat(width);

    write!(
        f,
        "\n \
        {0:pad$} {pipe}\n \
        {num:>} {pipe} {code}\n \
        {0:pad$} {pipe} {underline:>width$} {msg}\n",
        "",
        pad = pad,
        pipe = pipe,
        num = num,
        code = code,
        underline = underline,
        width = col + width,
        msg = msg
    )
}

fn to_line_col(lines: &[&str], offset: usize) -> (usize, usize) {
    let mut n = 0;
    for (i, line) in lines.iter().enumerate() {
        let len = line.width() + 1;
        if n + len > offset {
            return (i, offset - n);
        }
        n += len;
    }
    (lines.len(), lines.last().map(|l| l.width()).unwrap_or(0))
}
