use std::collections::BTreeMap;

use crate::types::ast;
use crate::types::span::Span;
use crate::value::ValueCow;
use crate::{Error, Result, Value};

/// The state of a `{% for %}` loop.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct LoopState<'stack> {
    vars: Vars<'stack>,
    items: Vec<Item<'stack>>,
    /// The index of the current item, `None` before the first iteration.
    index: Option<usize>,
}

#[cfg_attr(internal_debug, derive(Debug))]
enum Vars<'stack> {
    Item(&'stack str),
    KeyValue(&'stack str, &'stack str),
}

#[cfg_attr(internal_debug, derive(Debug))]
enum Item<'stack> {
    Value(ValueCow<'stack>),
    KeyValue(String, ValueCow<'stack>),
}

impl<'stack> LoopState<'stack> {
    pub fn new(
        source: &'stack str,
        vars: &ast::LoopVars,
        iterable: ValueCow<'stack>,
        span: Span,
    ) -> Result<Self> {
        let kind = iterable.type_name();
        let err = || {
            Error::render(
                format!("expected iterable, but expression evaluated to {kind}"),
                source,
                span,
            )
        };

        let vars_span = match vars {
            ast::LoopVars::Item(item) => item.span,
            ast::LoopVars::KeyValue(kv) => kv.span,
        };
        let vars = match vars {
            ast::LoopVars::Item(item) => Vars::Item(&source[item.span]),
            ast::LoopVars::KeyValue(kv) => {
                Vars::KeyValue(&source[kv.key.span], &source[kv.value.span])
            }
        };

        let items: Vec<_> = match (iterable, &vars) {
            (ValueCow::Borrowed(Value::List(list)), Vars::Item(_)) => list
                .iter()
                .map(|v| Item::Value(ValueCow::Borrowed(v)))
                .collect(),
            (ValueCow::Owned(Value::List(list)), Vars::Item(_)) => list
                .into_iter()
                .map(|v| Item::Value(ValueCow::Owned(v)))
                .collect(),
            (ValueCow::Borrowed(Value::Map(map)), Vars::KeyValue(..)) => map
                .iter()
                .map(|(k, v)| Item::KeyValue(k.clone(), ValueCow::Borrowed(v)))
                .collect(),
            (ValueCow::Owned(Value::Map(map)), Vars::KeyValue(..)) => map
                .into_iter()
                .map(|(k, v)| Item::KeyValue(k, ValueCow::Owned(v)))
                .collect(),
            (ValueCow::Borrowed(Value::List(_)) | ValueCow::Owned(Value::List(_)), _) => {
                return Err(Error::render(
                    "cannot unpack list item into two variables",
                    source,
                    vars_span,
                ));
            }
            (ValueCow::Borrowed(Value::Map(_)) | ValueCow::Owned(Value::Map(_)), _) => {
                return Err(Error::render(
                    "cannot unpack map item into one variable",
                    source,
                    vars_span,
                ));
            }
            _ => return Err(err()),
        };

        Ok(Self {
            vars,
            items,
            index: None,
        })
    }

    /// Advance to the next item, returns `None` once exhausted.
    pub fn iterate(&mut self) -> Option<()> {
        let next = self.index.map_or(0, |i| i + 1);
        if next >= self.items.len() {
            return None;
        }
        self.index = Some(next);
        Some(())
    }

    /// Lookup one of the loop variables or the special `loop` variable.
    pub fn lookup_var(&self, name: &str) -> Option<ValueCow<'stack>> {
        let index = self.index?;
        let item = &self.items[index];
        match (&self.vars, item) {
            (Vars::Item(n), Item::Value(value)) if *n == name => Some(value.clone()),
            (Vars::KeyValue(k, _), Item::KeyValue(key, _)) if *k == name => {
                Some(ValueCow::Owned(Value::String(key.clone())))
            }
            (Vars::KeyValue(_, v), Item::KeyValue(_, value)) if *v == name => Some(value.clone()),
            _ if name == "loop" => Some(ValueCow::Owned(self.loop_value(index))),
            _ => None,
        }
    }

    fn loop_value(&self, index: usize) -> Value {
        let mut map = BTreeMap::new();
        map.insert(String::from("index"), Value::Integer(index as i64));
        map.insert(String::from("first"), Value::Bool(index == 0));
        map.insert(
            String::from("last"),
            Value::Bool(index + 1 == self.items.len()),
        );
        Value::Map(map)
    }
}
