//! protolang: a prototype-chain object model with a small script front end.
//!
//! [`runtime::Engine`] implements field lookup along parent links,
//! construction through a function's `prototype`, and the receiver rules for
//! method calls versus bare calls. The interpreter, REPL and transcript
//! checker are layered on top of it.

pub mod cli;
pub mod interpreter;
pub mod repl;
pub mod runtime;
pub mod transcript;
pub mod version;
