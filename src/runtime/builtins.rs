//! Global bindings every engine starts with: `Object` helpers and `console`.

use crate::runtime::engine::Engine;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::function::FunctionRef;
use crate::runtime::inspect::inspect;
use crate::runtime::object::ObjectRef;
use crate::runtime::value::Value;

pub(crate) fn install(engine: &Engine) {
    let object = ObjectRef::new();
    define(&object, "create", object_create);
    define(&object, "getPrototypeOf", object_get_prototype_of);
    define(&object, "setPrototypeOf", object_set_prototype_of);
    define(&object, "keys", object_keys);
    define(&object, "hasOwn", object_has_own);
    engine.global().set_own("Object", Value::Object(object));

    let console = ObjectRef::new();
    define(&console, "log", console_log);
    engine.global().set_own("console", Value::Object(console));
}

fn define(
    target: &ObjectRef,
    name: &str,
    f: fn(&Engine, Value, &[Value]) -> RuntimeResult<Value>,
) {
    target.set_own(name, Value::Function(FunctionRef::native(name, f)));
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// An object or `null` in parent position.
fn parent_arg(value: &Value) -> RuntimeResult<Option<ObjectRef>> {
    match value {
        Value::Null => Ok(None),
        other => other.field_holder().map(Some).ok_or_else(|| {
            RuntimeError::type_error(format!(
                "Object prototype may only be an Object or null: {}",
                inspect(other)
            ))
        }),
    }
}

fn require_object_coercible(value: &Value) -> RuntimeResult<()> {
    if value.is_nullish() {
        return Err(RuntimeError::type_error(
            "Cannot convert undefined or null to object",
        ));
    }
    Ok(())
}

fn object_create(engine: &Engine, _this: Value, args: &[Value]) -> RuntimeResult<Value> {
    let parent = parent_arg(&arg(args, 0))?;
    Ok(Value::Object(engine.new_object_with_parent(parent)))
}

fn object_get_prototype_of(engine: &Engine, _this: Value, args: &[Value]) -> RuntimeResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(&target)?;
    Ok(engine.parent_of(&target).map_or(Value::Null, Value::Object))
}

fn object_set_prototype_of(engine: &Engine, _this: Value, args: &[Value]) -> RuntimeResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(&target)?;
    let parent = parent_arg(&arg(args, 1))?;
    if let Some(holder) = target.field_holder() {
        engine.set_parent(&holder, parent)?;
    }
    Ok(target)
}

/// Own keys as an array-like object: `{ '0': 'a', '1': 'b', length: 2 }`.
fn object_keys(engine: &Engine, _this: Value, args: &[Value]) -> RuntimeResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(&target)?;
    let keys = engine.own_keys(&target);
    let list = engine.new_object();
    for (index, key) in keys.iter().enumerate() {
        list.set_own(index.to_string(), Value::from(key.as_str()));
    }
    list.set_own("length", Value::Number(keys.len() as f64));
    Ok(Value::Object(list))
}

fn object_has_own(engine: &Engine, _this: Value, args: &[Value]) -> RuntimeResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(&target)?;
    let key = arg(args, 1).to_display_string();
    Ok(Value::Bool(engine.get_own(&target, &key)?.is_some()))
}

fn console_log(engine: &Engine, _this: Value, args: &[Value]) -> RuntimeResult<Value> {
    let line = args
        .iter()
        .map(|value| match value {
            Value::String(text) => text.to_string(),
            other => inspect(other),
        })
        .collect::<Vec<_>>()
        .join(" ");
    engine.print(line);
    Ok(Value::Undefined)
}
