use std::fmt;
use std::rc::Rc;

use crate::runtime::engine::Engine;
use crate::runtime::error::RuntimeResult;
use crate::runtime::object::ObjectRef;
use crate::runtime::value::Value;

/// Field on a function that seeds the parent of objects it constructs.
pub const PROTOTYPE_KEY: &str = "prototype";

/// Executable part of a function. The engine supplies the receiver already
/// resolved, so bodies never see how the call was spelled.
pub trait FunctionBody {
    fn call(&self, engine: &Engine, this: Value, args: &[Value]) -> RuntimeResult<Value>;
}

/// Adapter that lets a Rust closure act as a function body.
pub struct NativeFunction<F>(pub F);

impl<F> FunctionBody for NativeFunction<F>
where
    F: Fn(&Engine, Value, &[Value]) -> RuntimeResult<Value>,
{
    fn call(&self, engine: &Engine, this: Value, args: &[Value]) -> RuntimeResult<Value> {
        (self.0)(engine, this, args)
    }
}

pub struct Function {
    name: Option<String>,
    body: Rc<dyn FunctionBody>,
    fields: ObjectRef,
}

/// Shared handle to a callable value. Functions carry their own field map,
/// which holds `prototype` and anything scripts attach to them.
#[derive(Clone)]
pub struct FunctionRef(Rc<Function>);

impl FunctionRef {
    /// A function whose `prototype` field starts as a fresh empty object.
    pub fn new(name: Option<String>, body: Rc<dyn FunctionBody>) -> Self {
        let fields = ObjectRef::new();
        fields.set_own(PROTOTYPE_KEY, Value::Object(ObjectRef::new()));
        Self(Rc::new(Function { name, body, fields }))
    }

    pub fn native<F>(name: &str, f: F) -> Self
    where
        F: Fn(&Engine, Value, &[Value]) -> RuntimeResult<Value> + 'static,
    {
        Self::new(Some(name.to_string()), Rc::new(NativeFunction(f)))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn fields(&self) -> &ObjectRef {
        &self.0.fields
    }

    pub(crate) fn body(&self) -> &Rc<dyn FunctionBody> {
        &self.0.body
    }

    /// Current value of the `prototype` field viewed as an object. Reassigning
    /// `prototype` is observed by the next construction.
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.0
            .fields
            .get_own(PROTOTYPE_KEY)
            .and_then(|value| value.field_holder())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRef")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
