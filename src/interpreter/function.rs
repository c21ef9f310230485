use std::rc::Rc;

use proto_ast::nodes::FunctionDecl;

use crate::interpreter::Interpreter;
use crate::interpreter::scope::ScopeRef;
use crate::runtime::{Engine, FunctionBody, RuntimeResult, Value};

/// A function literal closed over the scope it was evaluated in.
pub struct ScriptFunction {
    decl: Rc<FunctionDecl>,
    closure: ScopeRef,
}

impl ScriptFunction {
    pub const fn new(decl: Rc<FunctionDecl>, closure: ScopeRef) -> Self {
        Self { decl, closure }
    }
}

impl FunctionBody for ScriptFunction {
    fn call(&self, engine: &Engine, this: Value, args: &[Value]) -> RuntimeResult<Value> {
        let scope = ScopeRef::function(&self.closure, this);
        for (index, param) in self.decl.params.iter().enumerate() {
            scope.declare_param(param.inner(), args.get(index).cloned().unwrap_or_default());
        }
        Interpreter::new(engine).run_body(&self.decl.body, &scope)
    }
}
