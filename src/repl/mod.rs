//! REPL (Read-Eval-Print Loop) for protolang
//!
//! Evaluates inputs one at a time against a persistent engine and renders
//! them the way an interactive session prints them.

mod engine;
mod shell;
mod state;

pub use engine::{EvaluationKind, EvaluationResult, ReplEngine};
pub use shell::Shell;
pub use state::ShellState;
