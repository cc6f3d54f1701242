//! Types for value formatters.
//!
//! Value formatters allow you to change the way a [`Value`] is formatted in the
//! rendered template. They can be configured on the engine using
//! [`set_default_formatter`][crate::Engine::set_default_formatter] or
//! [`add_formatter`][crate::Engine::add_formatter].
//!
//! All formatter functions must have the following signature.
//!
//! ```text
//! use template_unwind::{Value, fmt};
//! Fn(&mut fmt::Formatter<'_>, &Value) -> fmt::Result;
//! ```
//!
//! # Examples
//!
//! ### Escape HTML by default
//!
//! Block output is written as-is, so escaping has to happen where values are
//! emitted.
//!
//! ```
//! use template_unwind::{fmt, value, Engine};
//!
//! let mut engine = Engine::new();
//! engine.set_default_formatter(&fmt::escape_html);
//!
//! let result = engine
//!     .compile("{% block body %}{{ text }}{% endblock %}")?
//!     .render(value! { text: "<b>" })
//!     .to_string()?;
//! assert_eq!(result, "&lt;b&gt;");
//! # Ok::<(), template_unwind::Error>(())
//! ```

use std::fmt;
use std::fmt::Write;
use std::io;

use crate::Value;

/// A formatter function or closure.
pub(crate) type FormatFn = dyn Fn(&mut Formatter<'_>, &Value) -> Result + Sync + Send + 'static;

/// The result type returned from a formatter function.
pub type Result = std::result::Result<(), Error>;

/// The output a formatter writes to.
///
/// Block annotations are assembled from buffered strings, everything else is
/// written straight through to the final destination.
pub struct Formatter<'a> {
    out: &'a mut dyn fmt::Write,
}

/// The error type returned from a formatter function.
///
/// A formatter can fail with its own message, which is reported together with
/// the span of the expression being formatted.
#[derive(Debug, Clone)]
pub struct Error {
    message: Option<String>,
}

/// Adapts an [`io::Write`] to [`fmt::Write`], holding on to the first I/O
/// error so it can be reported instead of the opaque [`fmt::Error`].
pub(crate) struct IoWriter<W> {
    inner: W,
    error: Option<io::Error>,
}

impl<'a> Formatter<'a> {
    pub(crate) fn with_string(out: &'a mut String) -> Self {
        Self { out }
    }

    pub(crate) fn with_writer<W: io::Write>(out: &'a mut IoWriter<W>) -> Self {
        Self { out }
    }
}

impl fmt::Write for Formatter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.write_str(s)
    }

    fn write_char(&mut self, c: char) -> fmt::Result {
        self.out.write_char(c)
    }
}

impl Error {
    pub(crate) fn message(self) -> Option<String> {
        self.message
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message.as_deref().unwrap_or("format error"))
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self {
            message: Some(message),
        }
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::from(message.to_owned())
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Self { message: None }
    }
}

impl<W: io::Write> IoWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, error: None }
    }

    pub(crate) fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }
}

impl<W: io::Write> fmt::Write for IoWriter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Err(err) = self.inner.write_all(s.as_bytes()) {
            self.error.get_or_insert(err);
            return Err(fmt::Error);
        }
        Ok(())
    }
}

/// The default value formatter.
///
/// Strings are written unescaped, numbers and bools using their
/// [`Display`][std::fmt::Display] implementation and [`Value::None`] as
/// nothing at all. Lists and maps cannot be formatted and produce an error.
pub fn default(f: &mut Formatter<'_>, value: &Value) -> Result {
    match value {
        Value::None => Ok(()),
        Value::Bool(b) => Ok(write!(f, "{b}")?),
        Value::Integer(n) => Ok(write!(f, "{n}")?),
        Value::Float(n) => Ok(write!(f, "{n}")?),
        Value::String(s) => Ok(f.write_str(s)?),
        Value::List(_) | Value::Map(_) => Err(Error::from(format!(
            "expression evaluated to unformattable type {}",
            value.type_name()
        ))),
    }
}

/// A value formatter that escapes HTML special characters in strings.
///
/// Non-string values are formatted with [`default`].
pub fn escape_html(f: &mut Formatter<'_>, value: &Value) -> Result {
    let Value::String(s) = value else {
        return default(f, value);
    };
    let mut rest = s.as_str();
    while let Some(i) = rest.find(['&', '<', '>', '"', '\'']) {
        f.write_str(&rest[..i])?;
        f.write_str(match rest.as_bytes()[i] {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            _ => "&#x27;",
        })?;
        rest = &rest[i + 1..];
    }
    f.write_str(rest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    type FormatterFn = fn(&mut Formatter<'_>, &Value) -> Result;

    fn format(formatter: FormatterFn, value: Value) -> std::result::Result<String, Error> {
        let mut out = String::new();
        formatter(&mut Formatter::with_string(&mut out), &value)?;
        Ok(out)
    }

    #[test]
    fn escape_html_special_characters() {
        let value = Value::from(r#"<a href="x">Tom & 'Jerry'</a>"#);
        assert_eq!(
            format(escape_html, value).unwrap(),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn escape_html_non_string() {
        assert_eq!(format(escape_html, Value::Integer(7)).unwrap(), "7");
    }

    #[test]
    fn default_none_is_empty() {
        assert_eq!(format(default, Value::None).unwrap(), "");
    }

    #[test]
    fn default_rejects_map() {
        let err = format(default, Value::Map(Default::default())).unwrap_err();
        assert_eq!(err.to_string(), "expression evaluated to unformattable type map");
    }

    #[test]
    fn io_writer_keeps_first_error() {
        struct Broken;

        impl io::Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "broken pipe"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut w = IoWriter::new(Broken);
        assert!(w.write_str("a").is_err());
        assert!(w.write_str("b").is_err());
        assert_eq!(w.take_error().unwrap().to_string(), "broken pipe");
        assert!(w.take_error().is_none());
    }
}
