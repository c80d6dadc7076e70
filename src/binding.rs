//! Bindings and the scoped binding environment.
//!
//! A binding is a named value the evaluator can invoke: a variable, a
//! user-defined macro, or a built-in function. The environment is a flat
//! map of names with a stack of snapshots; every mutation the evaluator
//! makes inside a page, stub, or macro call is bracketed by a matched
//! push/pop, so nothing a caller can observe ever leaks.

use crate::{
    config,
    engine::{Engine, Error},
    token::{Token, TokenCollection},
};
use std::{collections::HashMap, rc::Rc};

/// An eager built-in. Receives its arguments already evaluated and
/// resolved to strings; its returned string is tokenized and spliced.
pub type EagerFn = fn(&mut Engine, &[String]) -> Result<String, Error>;

/// A lazy built-in. Receives its argument blocks unevaluated, so it can
/// inspect structure and decide what (if anything) gets evaluated. A
/// returned replacement block is evaluated recursively; `None` suppresses
/// output.
pub type LazyFn = fn(&mut Engine, &[Token]) -> Result<Option<TokenCollection>, Error>;

/// The callable half of a function binding.
#[derive(Clone, Copy, Debug)]
pub enum FunctionImpl {
    /// Arguments are evaluated and resolved before the call.
    Eager(EagerFn),
    /// Arguments are passed through unevaluated.
    Lazy(LazyFn),
}

/// What a binding does when invoked.
#[derive(Clone, Debug)]
pub enum BindingKind {
    /// A stored token tree, evaluated under the caller's environment.
    Variable {
        /// The unevaluated body.
        body: TokenCollection,
    },
    /// A parameterized token tree.
    Macro {
        /// Parameter names, required first.
        params: Vec<String>,
        /// How many of `params` must be supplied.
        required: usize,
        /// The unevaluated body.
        body: TokenCollection,
    },
    /// A built-in function.
    Function {
        /// The set of accepted argument counts.
        arity: &'static [usize],
        /// The implementation.
        call: FunctionImpl,
    },
}

impl BindingKind {
    /// An empty variable.
    pub fn empty() -> Self {
        BindingKind::Variable {
            body: TokenCollection::new(),
        }
    }

    /// Builds a macro from its declared parameter list.
    ///
    /// A parameter equal to the optional delimiter divides required from
    /// optional parameters; it is not itself a parameter.
    pub fn macro_from(mut params: Vec<String>, body: TokenCollection) -> Self {
        let required = match params.iter().position(|p| p == config::OPT_DELIMITER) {
            Some(i) => {
                params.remove(i);
                i
            }
            None => params.len(),
        };
        BindingKind::Macro {
            params,
            required,
            body,
        }
    }
}

/// A named value, plus the flag that guards built-ins from redefinition.
#[derive(Debug)]
pub struct Binding {
    /// Protected bindings may never be overwritten.
    pub protected: bool,
    /// What the binding does.
    pub kind: BindingKind,
}

/// The error raised by an attempt to redefine a protected binding.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("cannot overwrite protected binding '{0}'")]
pub struct OverwriteError(pub String);

/// The scoped binding environment.
///
/// `get`, `contains`, and `set` operate on the top snapshot. `push` takes
/// a shallow copy of the current map (the bindings themselves are shared
/// and immutable after construction); `pop` restores the prior one.
#[derive(Debug, Default)]
pub struct Bindings {
    /// The live mapping.
    current: HashMap<String, Rc<Binding>>,
    /// Saved snapshots, innermost last.
    stack: Vec<HashMap<String, Rc<Binding>>>,
}

impl Bindings {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is currently bound.
    pub fn contains(&self, name: &str) -> bool {
        self.current.contains_key(name)
    }

    /// Looks up a binding by name.
    pub fn get(&self, name: &str) -> Option<Rc<Binding>> {
        self.current.get(name).cloned()
    }

    /// Binds `name`, replacing any existing unprotected binding.
    pub fn set(
        &mut self,
        name: &str,
        kind: BindingKind,
        protected: bool,
    ) -> Result<(), OverwriteError> {
        if self.current.get(name).is_some_and(|b| b.protected) {
            return Err(OverwriteError(name.to_string()));
        }
        self.current
            .insert(name.to_string(), Rc::new(Binding { protected, kind }));
        Ok(())
    }

    /// Saves the current mapping.
    pub fn push(&mut self) {
        self.stack.push(self.current.clone());
    }

    /// Restores the mapping saved by the matching [`push`](Bindings::push),
    /// discarding every binding made since.
    pub fn pop(&mut self) {
        debug_assert!(!self.stack.is_empty(), "unbalanced environment pop");
        if let Some(prev) = self.stack.pop() {
            self.current = prev;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer;

    #[test]
    fn writes_after_push_are_discarded_by_pop() {
        let mut bindings = Bindings::new();
        bindings
            .set("outer", BindingKind::empty(), false)
            .unwrap();

        bindings.push();
        bindings
            .set("inner", BindingKind::empty(), false)
            .unwrap();
        assert!(bindings.contains("outer"));
        assert!(bindings.contains("inner"));

        bindings.pop();
        assert!(bindings.contains("outer"));
        assert!(!bindings.contains("inner"));
    }

    #[test]
    fn protected_bindings_cannot_be_overwritten() {
        let mut bindings = Bindings::new();
        bindings.set("builtin", BindingKind::empty(), true).unwrap();

        let err = bindings
            .set("builtin", BindingKind::empty(), false)
            .unwrap_err();
        assert_eq!(err, OverwriteError("builtin".to_string()));

        // Protection holds inside pushed scopes too.
        bindings.push();
        assert!(bindings.set("builtin", BindingKind::empty(), false).is_err());
        bindings.pop();
    }

    #[test]
    fn unprotected_bindings_are_replaced_silently() {
        let mut bindings = Bindings::new();
        bindings
            .set("v", BindingKind::Variable { body: tokenizer::text("one") }, false)
            .unwrap();
        bindings
            .set("v", BindingKind::Variable { body: tokenizer::text("two") }, false)
            .unwrap();

        let binding = bindings.get("v").unwrap();
        let BindingKind::Variable { body } = &binding.kind else {
            panic!("expected a variable");
        };
        assert_eq!(body.resolve(), "two");
    }

    #[test]
    fn optional_delimiter_splits_required_from_optional() {
        let kind = BindingKind::macro_from(
            vec!["a".into(), "b".into(), "/".into(), "c".into()],
            TokenCollection::new(),
        );
        let BindingKind::Macro {
            params, required, ..
        } = kind
        else {
            panic!("expected a macro");
        };
        assert_eq!(params, ["a", "b", "c"]);
        assert_eq!(required, 2);
    }
}
