use tracing::debug;

use proto_lexer::tokenize;
use proto_parser::parse;

use crate::interpreter::{Interpreter, ScopeRef};
use crate::runtime::{Engine, EngineConfig, inspect};

/// Result of an evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    /// Lines printed by the program while it ran
    pub output: Vec<String>,
    /// Inspected completion value or error line; `None` for blank input
    pub value: Option<String>,
    pub kind: EvaluationKind,
}

impl EvaluationResult {
    /// Everything a session shows for this input, in order.
    pub fn lines(&self) -> Vec<String> {
        self.output.iter().cloned().chain(self.value.clone()).collect()
    }
}

/// Kind of evaluation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationKind {
    Success,
    Info,
    Error,
}

/// REPL engine that maintains state across evaluations
pub struct ReplEngine {
    config: EngineConfig,
    engine: Engine,
    scope: ScopeRef,
}

impl ReplEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: Engine::new(config.clone()),
            config,
            scope: ScopeRef::root(),
        }
    }

    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Drop every binding and start from a fresh global object.
    pub fn reset(&mut self) {
        debug!("resetting session");
        self.engine = Engine::new(self.config.clone());
        self.scope = ScopeRef::root();
    }

    /// Whether `input` stops short of a complete program, so a shell should
    /// read another line before evaluating.
    pub fn is_incomplete(input: &str) -> bool {
        match tokenize(input) {
            Err(errors) => errors.iter().all(|e| e.is_incomplete_input()),
            Ok(tokens) => match parse(&tokens) {
                Ok(_) => false,
                Err(errors) => errors.iter().all(|e| e.at_end_of_input),
            },
        }
    }

    pub fn evaluate(&mut self, input: &str) -> EvaluationResult {
        if input.trim() == ".clear" {
            self.reset();
            return EvaluationResult {
                output: Vec::new(),
                value: Some("Cleared session state.".to_string()),
                kind: EvaluationKind::Info,
            };
        }

        let tokens = match tokenize(input) {
            Ok(tokens) => tokens,
            Err(errors) => {
                let message = errors.first().map(ToString::to_string).unwrap_or_default();
                return syntax_error(&message);
            }
        };

        let program = match parse(&tokens) {
            Ok(program) => program,
            Err(errors) => {
                let message = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_default();
                return syntax_error(&message);
            }
        };

        if program.statements.is_empty() {
            return EvaluationResult {
                output: Vec::new(),
                value: None,
                kind: EvaluationKind::Success,
            };
        }

        let result = Interpreter::new(&self.engine).run(&program, &self.scope);
        let output = self.engine.take_output();
        match result {
            Ok(value) => EvaluationResult {
                output,
                value: Some(inspect(&value)),
                kind: EvaluationKind::Success,
            },
            Err(err) => {
                debug!(error = %err, "evaluation failed");
                EvaluationResult {
                    output,
                    value: Some(err.uncaught()),
                    kind: EvaluationKind::Error,
                }
            }
        }
    }
}

impl Default for ReplEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn syntax_error(message: &str) -> EvaluationResult {
    EvaluationResult {
        output: Vec::new(),
        value: Some(format!("Uncaught SyntaxError: {message}")),
        kind: EvaluationKind::Error,
    }
}
