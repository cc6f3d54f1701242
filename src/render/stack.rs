use crate::render::iter::LoopState;
use crate::types::ast;
use crate::value::ValueCow;
use crate::{Error, Result, Value};

/// The variables visible at the current point of a render.
///
/// Lookups search from the top of the stack down to the nearest include
/// boundary, falling back to nothing. Blocks do not add a boundary, a block
/// body sees the variables of the place where the block is rendered.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Stack<'stack> {
    states: Vec<State<'stack>>,
}

#[cfg_attr(internal_debug, derive(Debug))]
enum State<'stack> {
    /// A map of variables, either the globals or an `include ... with` value.
    Scope(ValueCow<'stack>),
    /// A variable bound by `with ... as name`.
    Var(&'stack str, ValueCow<'stack>),
    Loop(LoopState<'stack>),
    /// Hides everything below it from an included template.
    Boundary,
}

impl<'stack> State<'stack> {
    fn get(&self, name: &str) -> Option<ValueCow<'stack>> {
        match self {
            Self::Scope(ValueCow::Borrowed(Value::Map(map))) => {
                map.get(name).map(ValueCow::Borrowed)
            }
            Self::Scope(ValueCow::Owned(Value::Map(map))) => {
                map.get(name).cloned().map(ValueCow::Owned)
            }
            Self::Var(var, value) if *var == name => Some(value.clone()),
            Self::Loop(state) => state.lookup_var(name),
            _ => None,
        }
    }
}

impl<'stack> Stack<'stack> {
    pub fn new(globals: &'stack Value) -> Self {
        Self {
            states: vec![State::Scope(ValueCow::Borrowed(globals))],
        }
    }

    /// Resolves a variable path against the visible variables.
    pub fn lookup_var(&self, source: &str, var: &ast::Var) -> Result<ValueCow<'stack>> {
        let first = var.first().span();
        let name = &source[first];
        let found = self
            .states
            .iter()
            .rev()
            .take_while(|state| !matches!(state, State::Boundary))
            .find_map(|state| state.get(name));
        match found {
            Some(value) => value.index_path(source, var.rest()),
            None => Err(Error::render("not found in this scope", source, first)),
        }
    }

    pub fn push_var(&mut self, name: &'stack str, value: ValueCow<'stack>) {
        self.states.push(State::Var(name, value));
    }

    pub fn pop_var(&mut self) {
        self.pop(|state| matches!(state, State::Var(..)), "variable");
    }

    pub fn push_loop(&mut self, state: LoopState<'stack>) {
        self.states.push(State::Loop(state));
    }

    /// Returns the innermost loop, which must be on top of the stack.
    pub fn current_loop_mut(&mut self) -> &mut LoopState<'stack> {
        match self.states.last_mut() {
            Some(State::Loop(state)) => state,
            _ => panic!("expected loop state on top of the stack"),
        }
    }

    pub fn pop_loop(&mut self) {
        self.pop(|state| matches!(state, State::Loop(_)), "loop state");
    }

    /// Hides the current variables behind a boundary and makes `globals` the
    /// only visible scope.
    pub fn enter_include(&mut self, globals: ValueCow<'stack>) {
        self.states.push(State::Boundary);
        self.states.push(State::Scope(globals));
    }

    pub fn exit_include(&mut self) {
        self.pop(|state| matches!(state, State::Scope(_)), "scope");
        self.pop(|state| matches!(state, State::Boundary), "boundary");
    }

    fn pop(&mut self, is_expected: fn(&State<'stack>) -> bool, what: &str) {
        match self.states.pop() {
            Some(state) if is_expected(&state) => {}
            _ => panic!("expected {what} on top of the stack"),
        }
    }
}
