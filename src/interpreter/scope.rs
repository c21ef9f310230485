use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::runtime::{RuntimeError, RuntimeResult, Value};

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    mutable: bool,
}

#[derive(Default)]
struct Scope {
    bindings: AHashMap<String, Binding>,
    parent: Option<ScopeRef>,
    /// Set on function scopes only; `var` declarations land in the nearest one.
    this: Option<Value>,
}

/// Lexical environment for script bindings. Names missing from every scope
/// fall through to the engine's global object, which the interpreter owns.
#[derive(Clone, Default)]
pub struct ScopeRef(Rc<RefCell<Scope>>);

impl ScopeRef {
    /// Outermost scope of a session. It holds top-level `let`/`const`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Block scope nested in `self`.
    pub fn child(&self) -> Self {
        Self(Rc::new(RefCell::new(Scope {
            parent: Some(self.clone()),
            ..Scope::default()
        })))
    }

    /// Activation scope for a call, closing over `closure`.
    pub fn function(closure: &Self, this: Value) -> Self {
        Self(Rc::new(RefCell::new(Scope {
            parent: Some(closure.clone()),
            this: Some(this),
            ..Scope::default()
        })))
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            let next = {
                let inner = scope.0.borrow();
                if let Some(binding) = inner.bindings.get(name) {
                    return Some(binding.value.clone());
                }
                inner.parent.clone()
            };
            current = next;
        }
        None
    }

    /// Update the innermost binding of `name`. Returns `false` when no scope
    /// declares it.
    pub fn assign(&self, name: &str, value: Value) -> RuntimeResult<bool> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            let next = {
                let mut inner = scope.0.borrow_mut();
                if let Some(binding) = inner.bindings.get_mut(name) {
                    if !binding.mutable {
                        return Err(RuntimeError::AssignToConst {
                            name: name.to_string(),
                        });
                    }
                    binding.value = value;
                    return Ok(true);
                }
                inner.parent.clone()
            };
            current = next;
        }
        Ok(false)
    }

    /// `let`/`const` binding in this exact scope.
    pub fn declare(&self, name: &str, value: Value, mutable: bool) -> RuntimeResult<()> {
        let mut inner = self.0.borrow_mut();
        if inner.bindings.contains_key(name) {
            return Err(RuntimeError::Redeclared {
                name: name.to_string(),
            });
        }
        inner
            .bindings
            .insert(name.to_string(), Binding { value, mutable });
        Ok(())
    }

    /// Parameters shadow silently, so a repeated name keeps the last argument.
    pub fn declare_param(&self, name: &str, value: Value) {
        self.0.borrow_mut().bindings.insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
            },
        );
    }

    /// `var` binding in the nearest function scope. Without an initializer an
    /// existing binding keeps its value. Returns `false` at top level, where
    /// vars belong on the global object instead.
    pub fn declare_var(&self, name: &str, value: Option<Value>) -> RuntimeResult<bool> {
        let Some(target) = self.function_scope() else {
            return Ok(false);
        };
        let mut inner = target.0.borrow_mut();
        if let Some(binding) = inner.bindings.get_mut(name) {
            if !binding.mutable {
                return Err(RuntimeError::Redeclared {
                    name: name.to_string(),
                });
            }
            if let Some(value) = value {
                binding.value = value;
            }
            return Ok(true);
        }
        inner.bindings.insert(
            name.to_string(),
            Binding {
                value: value.unwrap_or_default(),
                mutable: true,
            },
        );
        Ok(true)
    }

    /// Receiver of the innermost enclosing call, if any.
    pub fn this(&self) -> Option<Value> {
        self.function_scope()
            .and_then(|scope| scope.0.borrow().this.clone())
    }

    fn function_scope(&self) -> Option<Self> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            let next = {
                let inner = scope.0.borrow();
                if inner.this.is_some() {
                    drop(inner);
                    return Some(scope);
                }
                inner.parent.clone()
            };
            current = next;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scopes_see_and_shadow_outer_bindings() {
        let root = ScopeRef::root();
        root.declare("x", 1.into(), true).unwrap();
        let block = root.child();
        assert_eq!(block.lookup("x").and_then(|v| v.as_number()), Some(1.0));
        block.declare("x", 2.into(), true).unwrap();
        assert_eq!(block.lookup("x").and_then(|v| v.as_number()), Some(2.0));
        assert_eq!(root.lookup("x").and_then(|v| v.as_number()), Some(1.0));
        assert!(block.lookup("y").is_none());
    }

    #[test]
    fn const_bindings_reject_assignment() {
        let root = ScopeRef::root();
        root.declare("c", 1.into(), false).unwrap();
        assert_eq!(
            root.child().assign("c", 2.into()),
            Err(RuntimeError::AssignToConst { name: "c".into() })
        );
        assert!(!root.assign("missing", 2.into()).unwrap());
    }

    #[test]
    fn let_redeclaration_fails() {
        let root = ScopeRef::root();
        root.declare("x", 1.into(), true).unwrap();
        assert!(matches!(
            root.declare("x", 2.into(), true),
            Err(RuntimeError::Redeclared { .. })
        ));
    }

    #[test]
    fn vars_hoist_to_the_function_scope() {
        let root = ScopeRef::root();
        assert!(!root.child().declare_var("top", Some(1.into())).unwrap());

        let call = ScopeRef::function(&root, Value::Null);
        let block = call.child();
        assert!(block.declare_var("v", Some(3.into())).unwrap());
        assert!(block.declare_var("v", None).unwrap());
        assert_eq!(call.lookup("v").and_then(|v| v.as_number()), Some(3.0));
    }

    #[test]
    fn this_comes_from_the_nearest_call() {
        let root = ScopeRef::root();
        assert!(root.this().is_none());
        let call = ScopeRef::function(&root, Value::from("receiver"));
        let this = call.child().child().this();
        assert!(this.is_some_and(|v| v.strict_equals(&Value::from("receiver"))));
    }
}
