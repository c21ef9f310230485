use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::runtime::value::Value;

/// Reserved property name that reads and writes an object's parent link.
pub const PARENT_KEY: &str = "__proto__";

/// Own state of a script object: insertion-ordered fields and an optional
/// parent. The parent is never stored in `fields`.
#[derive(Default)]
pub struct Object {
    fields: IndexMap<String, Value>,
    parent: Option<ObjectRef>,
}

/// Shared handle to an [`Object`]. Cloning shares identity.
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Option<Self>) -> Self {
        Self(Rc::new(RefCell::new(Object {
            fields: IndexMap::new(),
            parent,
        })))
    }

    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.0.borrow().fields.get(key).cloned()
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.0.borrow().fields.contains_key(key)
    }

    /// Insert or overwrite an own field. New keys go to the end; existing keys
    /// keep their position.
    pub fn set_own(&self, key: impl Into<String>, value: Value) {
        self.0.borrow_mut().fields.insert(key.into(), value);
    }

    /// Remove an own field, preserving the order of the rest.
    pub fn remove_own(&self, key: &str) -> bool {
        self.0.borrow_mut().fields.shift_remove(key).is_some()
    }

    pub fn own_keys(&self) -> Vec<String> {
        self.0.borrow().fields.keys().cloned().collect()
    }

    pub fn own_entries(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parent(&self) -> Option<Self> {
        self.0.borrow().parent.clone()
    }

    pub fn set_parent(&self, parent: Option<Self>) {
        self.0.borrow_mut().parent = parent;
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity for cycle detection while the handle is alive.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("keys", &self.own_keys())
            .field("has_parent", &self.parent().is_some())
            .finish()
    }
}
