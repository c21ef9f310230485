//! The object model: lookup along parent links, own-field mutation,
//! construction and receiver-aware calls.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::runtime::builtins;
use crate::runtime::config::EngineConfig;
use crate::runtime::error::{Access, RuntimeError, RuntimeResult};
use crate::runtime::function::{FunctionBody, FunctionRef};
use crate::runtime::inspect::inspect;
use crate::runtime::object::{ObjectRef, PARENT_KEY};
use crate::runtime::value::Value;

/// Headroom left on the native stack before a recursive step switches to a
/// fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Run `f`, moving to a heap-allocated stack segment first when the current
/// one is nearly exhausted. Every recursive evaluation step goes through here.
pub(crate) fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, f)
}

/// Receiver a call runs with. A call spelled as a field access binds the
/// object it was read from; a bare call binds the global object.
#[derive(Debug, Clone, Default)]
pub enum Receiver {
    #[default]
    Global,
    Bound(Value),
}

pub struct Engine {
    config: EngineConfig,
    global: ObjectRef,
    call_depth: Cell<usize>,
    output: RefCell<Vec<String>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        debug!(
            max_chain_depth = config.max_chain_depth,
            max_call_depth = config.max_call_depth,
            reject_cyclic_parent = config.reject_cyclic_parent,
            "creating engine"
        );
        let engine = Self {
            config,
            global: ObjectRef::new(),
            call_depth: Cell::new(0),
            output: RefCell::new(Vec::new()),
        };
        builtins::install(&engine);
        engine
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Default receiver for bare calls and home of global bindings.
    pub const fn global(&self) -> &ObjectRef {
        &self.global
    }

    pub fn new_object(&self) -> ObjectRef {
        ObjectRef::new()
    }

    pub fn new_object_with_parent(&self, parent: Option<ObjectRef>) -> ObjectRef {
        ObjectRef::with_parent(parent)
    }

    pub fn new_function(&self, name: Option<String>, body: Rc<dyn FunctionBody>) -> FunctionRef {
        FunctionRef::new(name, body)
    }

    pub fn new_native_function<F>(&self, name: &str, f: F) -> FunctionRef
    where
        F: Fn(&Self, Value, &[Value]) -> RuntimeResult<Value> + 'static,
    {
        FunctionRef::native(name, f)
    }

    /// Read `key` from `target`, walking parent links. Resolves to
    /// `Undefined` when no object on the chain has the field.
    pub fn get(&self, target: &Value, key: &str) -> RuntimeResult<Value> {
        match self.holder_for(target, key, Access::Read)? {
            Some(holder) => self.get_from(&holder, key),
            None => Ok(Value::Undefined),
        }
    }

    pub fn get_from(&self, object: &ObjectRef, key: &str) -> RuntimeResult<Value> {
        if key == PARENT_KEY {
            return Ok(object.parent().map_or(Value::Null, Value::Object));
        }
        Ok(self.resolve(object, key)?.unwrap_or_default())
    }

    /// Own field only, no chain walk.
    pub fn get_own(&self, target: &Value, key: &str) -> RuntimeResult<Option<Value>> {
        Ok(self
            .holder_for(target, key, Access::Read)?
            .and_then(|holder| holder.get_own(key)))
    }

    /// Whether `key` resolves anywhere on the chain, including fields that
    /// hold `undefined`.
    pub fn has_property(&self, target: &Value, key: &str) -> RuntimeResult<bool> {
        let Some(holder) = self.holder_for(target, key, Access::Read)? else {
            return Ok(false);
        };
        if key == PARENT_KEY {
            return Ok(true);
        }
        Ok(self.resolve(&holder, key)?.is_some())
    }

    pub fn own_keys(&self, target: &Value) -> Vec<String> {
        target
            .field_holder()
            .map(|holder| holder.own_keys())
            .unwrap_or_default()
    }

    fn resolve(&self, object: &ObjectRef, key: &str) -> RuntimeResult<Option<Value>> {
        let mut current = object.clone();
        let mut hops = 0_usize;
        loop {
            if let Some(value) = current.get_own(key) {
                trace!(key, hops, "resolved field");
                return Ok(Some(value));
            }
            let Some(parent) = current.parent() else {
                return Ok(None);
            };
            hops += 1;
            if hops > self.config.max_chain_depth {
                warn!(
                    key,
                    limit = self.config.max_chain_depth,
                    "lookup exceeded maximum chain depth"
                );
                return Err(RuntimeError::ChainDepthExceeded {
                    key: key.to_string(),
                    limit: self.config.max_chain_depth,
                });
            }
            current = parent;
        }
    }

    /// Write an own field on `target`. Writing [`PARENT_KEY`] reparents:
    /// an object sets the link, `null` clears it, anything else is ignored.
    /// Writes to primitives other than `undefined`/`null` are dropped.
    pub fn set(&self, target: &Value, key: &str, value: Value) -> RuntimeResult<()> {
        let Some(holder) = self.holder_for(target, key, Access::Write)? else {
            trace!(key, "ignoring write to primitive");
            return Ok(());
        };
        if key != PARENT_KEY {
            holder.set_own(key, value);
            return Ok(());
        }
        match value {
            Value::Null => self.set_parent(&holder, None),
            other => match other.field_holder() {
                Some(parent) => self.set_parent(&holder, Some(parent)),
                None => Ok(()),
            },
        }
    }

    /// Remove an own field. Returns whether a field was removed; inherited
    /// fields and the parent link are never touched.
    pub fn delete(&self, target: &Value, key: &str) -> RuntimeResult<bool> {
        let Some(holder) = self.holder_for(target, key, Access::Delete)? else {
            return Ok(false);
        };
        if key == PARENT_KEY {
            return Ok(false);
        }
        Ok(holder.remove_own(key))
    }

    pub fn parent_of(&self, target: &Value) -> Option<ObjectRef> {
        target.field_holder().and_then(|holder| holder.parent())
    }

    pub fn set_parent(&self, object: &ObjectRef, parent: Option<ObjectRef>) -> RuntimeResult<()> {
        if self.config.reject_cyclic_parent
            && let Some(candidate) = &parent
            && self.chain_contains(candidate, object)?
        {
            debug!("rejecting cyclic parent assignment");
            return Err(RuntimeError::CyclicParent);
        }
        trace!(has_parent = parent.is_some(), "reparenting object");
        object.set_parent(parent);
        Ok(())
    }

    /// Whether `ancestor` appears on `value`'s parent chain, excluding
    /// `value` itself.
    pub fn is_in_chain(&self, ancestor: &ObjectRef, value: &Value) -> RuntimeResult<bool> {
        match self.parent_of(value) {
            Some(parent) => self.chain_contains(&parent, ancestor),
            None => Ok(false),
        }
    }

    fn chain_contains(&self, start: &ObjectRef, target: &ObjectRef) -> RuntimeResult<bool> {
        let mut current = start.clone();
        let mut hops = 0_usize;
        loop {
            if current.ptr_eq(target) {
                return Ok(true);
            }
            let Some(parent) = current.parent() else {
                return Ok(false);
            };
            hops += 1;
            if hops > self.config.max_chain_depth {
                return Err(RuntimeError::ChainDepthExceeded {
                    key: PARENT_KEY.to_string(),
                    limit: self.config.max_chain_depth,
                });
            }
            current = parent;
        }
    }

    /// Build a fresh object whose parent is the constructor's current
    /// `prototype`, run the body against it and return it. Whatever the body
    /// returns is discarded.
    pub fn construct(&self, constructor: &Value, args: &[Value]) -> RuntimeResult<Value> {
        let Value::Function(function) = constructor else {
            return Err(RuntimeError::NotConstructor {
                callee: inspect(constructor),
            });
        };
        let instance = ObjectRef::with_parent(function.prototype());
        debug!(
            constructor = function.name().unwrap_or("(anonymous)"),
            args = args.len(),
            "constructing instance"
        );
        self.call_function(function, Value::Object(instance.clone()), args)?;
        Ok(Value::Object(instance))
    }

    /// Look up `key` on `target` and call it with `target` as receiver.
    pub fn invoke(&self, target: &Value, key: &str, args: &[Value]) -> RuntimeResult<Value> {
        self.invoke_described(target, key, args, || key.to_string())
    }

    /// [`Engine::invoke`] with a caller-supplied rendering of the callee for
    /// the not-callable error.
    pub fn invoke_described(
        &self,
        target: &Value,
        key: &str,
        args: &[Value],
        describe: impl FnOnce() -> String,
    ) -> RuntimeResult<Value> {
        let method = self.get(target, key)?;
        let Value::Function(function) = &method else {
            return Err(RuntimeError::NotCallable {
                callee: describe(),
            });
        };
        self.call_function(function, target.clone(), args)
    }

    pub fn call(&self, callee: &Value, receiver: Receiver, args: &[Value]) -> RuntimeResult<Value> {
        let Value::Function(function) = callee else {
            return Err(RuntimeError::NotCallable {
                callee: inspect(callee),
            });
        };
        let this = match receiver {
            Receiver::Global => Value::Object(self.global.clone()),
            Receiver::Bound(value) => value,
        };
        self.call_function(function, this, args)
    }

    fn call_function(
        &self,
        function: &FunctionRef,
        this: Value,
        args: &[Value],
    ) -> RuntimeResult<Value> {
        let depth = self.call_depth.get();
        if depth >= self.config.max_call_depth {
            warn!(limit = self.config.max_call_depth, "call depth exceeded");
            return Err(RuntimeError::CallStackExceeded {
                limit: self.config.max_call_depth,
            });
        }
        self.call_depth.set(depth + 1);
        let result = with_stack(|| function.body().call(self, this, args));
        self.call_depth.set(depth);
        result
    }

    /// Queue a line of program output.
    pub fn print(&self, line: impl Into<String>) {
        self.output.borrow_mut().push(line.into());
    }

    /// Drain queued output lines in the order they were printed.
    pub fn take_output(&self) -> Vec<String> {
        std::mem::take(&mut *self.output.borrow_mut())
    }

    fn holder_for(
        &self,
        target: &Value,
        key: &str,
        access: Access,
    ) -> RuntimeResult<Option<ObjectRef>> {
        let base = match target {
            Value::Undefined => "undefined",
            Value::Null => "null",
            other => return Ok(other.field_holder()),
        };
        Err(RuntimeError::PropertyOfNullish {
            base,
            key: key.to_string(),
            access,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::function::PROTOTYPE_KEY;

    fn object(engine: &Engine, fields: &[(&str, Value)]) -> Value {
        let object = engine.new_object();
        for (key, value) in fields {
            object.set_own(*key, value.clone());
        }
        Value::Object(object)
    }

    fn child_of(engine: &Engine, parent: &Value, fields: &[(&str, Value)]) -> Value {
        let child = object(engine, fields);
        engine.set(&child, PARENT_KEY, parent.clone()).unwrap();
        child
    }

    fn number(value: &Value) -> f64 {
        value.as_number().unwrap_or(f64::NAN)
    }

    /// `function Rect(w, h) { this.width = w; this.height = h }`
    fn rect_constructor(engine: &Engine) -> Value {
        let rect = engine.new_native_function("Rect", |engine, this, args| {
            engine.set(&this, "width", args.first().cloned().unwrap_or_default())?;
            engine.set(&this, "height", args.get(1).cloned().unwrap_or_default())?;
            Ok(Value::from("ignored"))
        });
        Value::Function(rect)
    }

    fn get_area(engine: &Engine) -> Value {
        Value::Function(engine.new_native_function("getArea", |engine, this, _| {
            let width = engine.get(&this, "width")?.to_number();
            let height = engine.get(&this, "height")?.to_number();
            Ok(Value::from(width * height))
        }))
    }

    #[test]
    fn literal_fields_resolve_and_missing_is_undefined() {
        let engine = Engine::default();
        let o = object(&engine, &[("foo", 1.into()), ("bar", true.into())]);
        assert_eq!(number(&engine.get(&o, "foo").unwrap()), 1.0);
        assert!(engine.get(&o, "bar").unwrap().strict_equals(&Value::from(true)));
        assert!(engine.get(&o, "baz").unwrap().is_undefined());
    }

    #[test]
    fn lookup_falls_through_to_parent() {
        let engine = Engine::default();
        let obj1 = object(&engine, &[("foo", 1.into())]);
        let obj2 = child_of(&engine, &obj1, &[("bar", 2.into())]);
        assert_eq!(number(&engine.get(&obj2, "bar").unwrap()), 2.0);
        assert_eq!(number(&engine.get(&obj2, "foo").unwrap()), 1.0);
        assert!(engine.get(&obj2, "blah").unwrap().is_undefined());
    }

    #[test]
    fn own_field_shadows_inherited_and_writes_stay_local() {
        let engine = Engine::default();
        let parent = object(&engine, &[("x", 1.into())]);
        let child = child_of(&engine, &parent, &[]);
        engine.set(&child, "x", 5.into()).unwrap();
        assert_eq!(number(&engine.get(&child, "x").unwrap()), 5.0);
        assert_eq!(number(&engine.get(&parent, "x").unwrap()), 1.0);
    }

    #[test]
    fn deleting_inherited_key_is_a_noop() {
        let engine = Engine::default();
        let parent = object(&engine, &[("x", 1.into())]);
        let child = child_of(&engine, &parent, &[]);
        assert!(!engine.delete(&child, "x").unwrap());
        assert_eq!(number(&engine.get(&child, "x").unwrap()), 1.0);
        assert!(engine.get_own(&parent, "x").unwrap().is_some());
    }

    #[test]
    fn deleting_own_key_uncovers_inherited_value() {
        let engine = Engine::default();
        let parent = object(&engine, &[("x", 1.into())]);
        let child = child_of(&engine, &parent, &[("x", 2.into())]);
        assert!(engine.delete(&child, "x").unwrap());
        assert_eq!(number(&engine.get(&child, "x").unwrap()), 1.0);
    }

    #[test]
    fn parent_key_is_not_deletable() {
        let engine = Engine::default();
        let parent = object(&engine, &[("x", 1.into())]);
        let child = child_of(&engine, &parent, &[]);
        assert!(!engine.delete(&child, PARENT_KEY).unwrap());
        assert!(engine.parent_of(&child).is_some());
    }

    #[test]
    fn constructed_instances_share_prototype() {
        let engine = Engine::default();
        let rect = rect_constructor(&engine);
        let first = engine.construct(&rect, &[3.into(), 4.into()]).unwrap();

        let Some(prototype) = rect.as_function().and_then(FunctionRef::prototype) else {
            unreachable!("constructors have a prototype")
        };
        prototype.set_own("getArea", get_area(&engine));
        let second = engine.construct(&rect, &[5.into(), 6.into()]).unwrap();

        assert_eq!(number(&engine.invoke(&first, "getArea", &[]).unwrap()), 12.0);
        assert_eq!(number(&engine.invoke(&second, "getArea", &[]).unwrap()), 30.0);
        let (Some(a), Some(b)) = (engine.parent_of(&first), engine.parent_of(&second)) else {
            unreachable!("instances have parents")
        };
        assert!(a.ptr_eq(&b));
        assert!(a.ptr_eq(&prototype));

        prototype.set_own("kind", "rect".into());
        assert!(engine.get(&first, "kind").unwrap().strict_equals(&"rect".into()));
        assert!(engine.get(&second, "kind").unwrap().strict_equals(&"rect".into()));
    }

    #[test]
    fn construct_discards_body_result() {
        let engine = Engine::default();
        let rect = rect_constructor(&engine);
        let instance = engine.construct(&rect, &[1.into(), 2.into()]).unwrap();
        assert!(instance.as_object().is_some());
        assert_eq!(engine.own_keys(&instance), vec!["width", "height"]);
    }

    #[test]
    fn construct_reads_prototype_at_construction_time() {
        let engine = Engine::default();
        let rect = rect_constructor(&engine);
        let before = engine.construct(&rect, &[]).unwrap();
        let replacement = object(&engine, &[("tag", "new".into())]);
        engine.set(&rect, PROTOTYPE_KEY, replacement).unwrap();
        let after = engine.construct(&rect, &[]).unwrap();
        assert!(engine.get(&before, "tag").unwrap().is_undefined());
        assert!(engine.get(&after, "tag").unwrap().strict_equals(&"new".into()));
    }

    #[test]
    fn constructing_a_non_function_fails() {
        let engine = Engine::default();
        let err = engine.construct(&Value::from(3), &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::NotConstructor { .. }));
    }

    #[test]
    fn reparenting_changes_inherited_lookups_only() {
        let engine = Engine::default();
        let base1 = object(&engine, &[("foo", 1.into())]);
        let base2 = object(&engine, &[("bar", 2.into())]);
        let o = child_of(&engine, &base1, &[("own", 0.into())]);
        assert_eq!(number(&engine.get(&o, "foo").unwrap()), 1.0);

        engine.set(&o, PARENT_KEY, base2).unwrap();
        assert!(engine.get(&o, "foo").unwrap().is_undefined());
        assert_eq!(number(&engine.get(&o, "bar").unwrap()), 2.0);
        assert_eq!(number(&engine.get(&o, "own").unwrap()), 0.0);
    }

    #[test]
    fn parent_key_reads_link_and_ignores_primitives() {
        let engine = Engine::default();
        let base = object(&engine, &[]);
        let o = child_of(&engine, &base, &[]);
        let Value::Object(read) = engine.get(&o, PARENT_KEY).unwrap() else {
            unreachable!("parent should read back as an object")
        };
        assert!(base.as_object().is_some_and(|b| b.ptr_eq(&read)));

        engine.set(&o, PARENT_KEY, 42.into()).unwrap();
        assert!(engine.parent_of(&o).is_some());
        assert!(!engine.own_keys(&o).contains(&PARENT_KEY.to_string()));

        engine.set(&o, PARENT_KEY, Value::Null).unwrap();
        assert!(matches!(engine.get(&o, PARENT_KEY).unwrap(), Value::Null));
    }

    #[test]
    fn invoke_binds_receiver_but_bare_call_binds_global() {
        let engine = Engine::default();
        let r = object(&engine, &[("width", 3.into()), ("height", 4.into())]);
        engine.set(&r, "getArea", get_area(&engine)).unwrap();

        assert_eq!(number(&engine.invoke(&r, "getArea", &[]).unwrap()), 12.0);

        let temp = engine.get(&r, "getArea").unwrap();
        let bare = engine.call(&temp, Receiver::Global, &[]).unwrap();
        assert!(bare.to_number().is_nan());

        engine.global().set_own("width", 2.into());
        engine.global().set_own("height", 5.into());
        let bare = engine.call(&temp, Receiver::Global, &[]).unwrap();
        assert_eq!(number(&bare), 10.0);
    }

    #[test]
    fn invoking_a_non_callable_fails() {
        let engine = Engine::default();
        let r = object(&engine, &[("foo", 1.into())]);
        let err = engine.invoke(&r, "foo", &[]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::NotCallable {
                callee: "foo".into()
            }
        );
        let err = engine.invoke(&r, "missing", &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::NotCallable { .. }));
    }

    #[test]
    fn cyclic_chain_hits_depth_guard() {
        let engine = Engine::new(EngineConfig {
            max_chain_depth: 16,
            ..EngineConfig::default()
        });
        let a = object(&engine, &[("a", 1.into())]);
        let b = child_of(&engine, &a, &[]);
        engine.set(&a, PARENT_KEY, b.clone()).unwrap();

        assert_eq!(number(&engine.get(&b, "a").unwrap()), 1.0);
        let err = engine.get(&b, "missing").unwrap_err();
        assert_eq!(
            err,
            RuntimeError::ChainDepthExceeded {
                key: "missing".into(),
                limit: 16
            }
        );
    }

    #[test]
    fn depth_guard_allows_chains_up_to_the_limit() {
        let engine = Engine::new(EngineConfig {
            max_chain_depth: 3,
            ..EngineConfig::default()
        });
        let root = object(&engine, &[("deep", true.into())]);
        let mut tip = root;
        for _ in 0..3 {
            tip = child_of(&engine, &tip, &[]);
        }
        assert!(engine.get(&tip, "deep").unwrap().truthy());

        let too_deep = child_of(&engine, &tip, &[]);
        assert!(matches!(
            engine.get(&too_deep, "deep"),
            Err(RuntimeError::ChainDepthExceeded { .. })
        ));
    }

    #[test]
    fn cycle_rejection_is_opt_in() {
        let engine = Engine::new(EngineConfig {
            reject_cyclic_parent: true,
            ..EngineConfig::default()
        });
        let a = object(&engine, &[]);
        let b = child_of(&engine, &a, &[]);
        assert_eq!(
            engine.set(&a, PARENT_KEY, b.clone()),
            Err(RuntimeError::CyclicParent)
        );
        assert_eq!(
            engine.set(&a, PARENT_KEY, a.clone()),
            Err(RuntimeError::CyclicParent)
        );
        assert!(engine.parent_of(&a).is_none());
    }

    #[test]
    fn nullish_targets_raise_and_primitives_read_undefined() {
        let engine = Engine::default();
        assert!(matches!(
            engine.get(&Value::Undefined, "x"),
            Err(RuntimeError::PropertyOfNullish {
                access: Access::Read,
                ..
            })
        ));
        assert!(matches!(
            engine.set(&Value::Null, "x", 1.into()),
            Err(RuntimeError::PropertyOfNullish {
                access: Access::Write,
                ..
            })
        ));
        assert!(engine.get(&Value::from(5), "x").unwrap().is_undefined());
        assert!(engine.set(&Value::from("s"), "x", 1.into()).is_ok());
    }

    #[test]
    fn functions_hold_their_own_fields() {
        let engine = Engine::default();
        let f = rect_constructor(&engine);
        engine.set(&f, "count", 1.into()).unwrap();
        assert_eq!(number(&engine.get(&f, "count").unwrap()), 1.0);
        assert_eq!(engine.own_keys(&f), vec![PROTOTYPE_KEY, "count"]);
    }

    #[test]
    fn has_property_sees_fields_holding_undefined() {
        let engine = Engine::default();
        let parent = object(&engine, &[("u", Value::Undefined)]);
        let child = child_of(&engine, &parent, &[]);
        assert!(engine.has_property(&child, "u").unwrap());
        assert!(!engine.has_property(&child, "v").unwrap());
        assert!(engine.get_own(&child, "u").unwrap().is_none());
    }

    #[test]
    fn instance_chain_membership() {
        let engine = Engine::default();
        let base = object(&engine, &[]);
        let child = child_of(&engine, &base, &[]);
        let grandchild = child_of(&engine, &child, &[]);
        let Some(base_ref) = base.as_object() else {
            unreachable!()
        };
        assert!(engine.is_in_chain(base_ref, &grandchild).unwrap());
        assert!(!engine.is_in_chain(base_ref, &base).unwrap());
    }

    #[test]
    fn call_depth_is_bounded() {
        let engine = Engine::new(EngineConfig {
            max_call_depth: 8,
            ..EngineConfig::default()
        });
        let recurse = engine.new_native_function("recurse", |engine, _, _| {
            let again = engine.get_from(engine.global(), "recurse")?;
            engine.call(&again, Receiver::Global, &[])
        });
        engine.global().set_own("recurse", Value::Function(recurse.clone()));
        let err = engine
            .call(&Value::Function(recurse), Receiver::Global, &[])
            .unwrap_err();
        assert_eq!(err, RuntimeError::CallStackExceeded { limit: 8 });
        assert_eq!(engine.call_depth.get(), 0);
    }

    #[test]
    fn output_is_drained_in_order() {
        let engine = Engine::default();
        engine.print("one");
        engine.print(String::from("two"));
        assert_eq!(engine.take_output(), vec!["one", "two"]);
        assert!(engine.take_output().is_empty());
    }
}
