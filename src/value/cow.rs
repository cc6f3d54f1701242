//! A [`Value`] that is either borrowed from the render globals or owned.

use std::ops::Deref;

use crate::Value;

/// Most lookups borrow from the globals for the whole render. Values produced
/// while rendering, such as `loop` or a map key, are owned.
#[derive(Debug, Clone)]
pub enum ValueCow<'a> {
    Borrowed(&'a Value),
    Owned(Value),
}

impl Deref for ValueCow<'_> {
    type Target = Value;

    fn deref(&self) -> &Value {
        match self {
            Self::Borrowed(value) => value,
            Self::Owned(value) => value,
        }
    }
}
