use crate::types::ast;
use crate::types::span::Span;
use crate::value::ValueCow;
use crate::{Error, Result, Value};

impl<'a> ValueCow<'a> {
    /// Interprets the value as an `if` condition, only bools are accepted.
    pub fn to_bool(&self, source: &str, span: Span) -> Result<bool> {
        if let Value::Bool(cond) = **self {
            return Ok(cond);
        }
        Err(Error::render(
            format!(
                "expected bool, but expression evaluated to {}",
                self.type_name()
            ),
            source,
            span,
        ))
    }

    /// Follows the remaining segments of a variable path.
    ///
    /// A borrowed value stays borrowed, an owned value only clones the value
    /// found at the end of the path.
    pub fn index_path(self, source: &str, path: &[ast::Key]) -> Result<ValueCow<'a>> {
        if path.is_empty() {
            return Ok(self);
        }
        match self {
            Self::Borrowed(value) => index_path(source, value, path).map(Self::Borrowed),
            Self::Owned(value) => index_path(source, &value, path)
                .cloned()
                .map(Self::Owned),
        }
    }
}

fn index_path<'v>(source: &str, mut value: &'v Value, path: &[ast::Key]) -> Result<&'v Value> {
    for key in path {
        value = index(source, value, key)?;
    }
    Ok(value)
}

fn index<'v>(source: &str, value: &'v Value, key: &ast::Key) -> Result<&'v Value> {
    let reason = match (value, key) {
        (Value::List(list), ast::Key::List(index)) => match list.get(index.value) {
            Some(item) => return Ok(item),
            None => String::from("index out of bounds"),
        },
        (Value::Map(map), ast::Key::Map(ident)) => match map.get(&source[ident.span]) {
            Some(item) => return Ok(item),
            None => String::from("not found in map"),
        },
        (Value::List(_), ast::Key::Map(_)) => String::from("cannot index list with string"),
        (Value::Map(_), ast::Key::List(_)) => String::from("cannot index map with integer"),
        (value, _) => format!("cannot index into {}", value.type_name()),
    };
    Err(Error::render(reason, source, key.span()))
}
