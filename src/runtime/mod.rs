pub mod builtins;
pub mod config;
pub mod engine;
pub mod error;
pub mod function;
pub mod inspect;
pub mod object;
pub mod value;

pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, Receiver};
pub use error::{Access, ErrorKind, RuntimeError, RuntimeResult};
pub use function::{FunctionBody, FunctionRef, NativeFunction, PROTOTYPE_KEY};
pub use inspect::inspect;
pub use object::{ObjectRef, PARENT_KEY};
pub use value::Value;
