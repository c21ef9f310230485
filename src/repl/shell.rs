#![expect(
    clippy::print_stdout,
    reason = "The interactive shell writes its results to stdout"
)]

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::repl::engine::{EvaluationKind, EvaluationResult, ReplEngine};
use crate::repl::state::ShellState;
use crate::runtime::EngineConfig;
use crate::version::VERSION;

const HELP: &str = "\
.help     Show this message
.clear    Reset all bindings
.history  List previous inputs
.exit     Leave the shell
Incomplete input continues on the next line; an empty line submits it as is.";

/// Line-oriented interactive session over stdin/stdout.
pub struct Shell {
    engine: ReplEngine,
    state: ShellState,
}

impl Shell {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: ReplEngine::new(config),
            state: ShellState::new(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        println!(
            "{} {}  (type {} for commands)",
            "protolang".bold(),
            VERSION,
            ".help".cyan()
        );

        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            print!("{}", self.state.prompt().dimmed());
            io::stdout().flush().context("failed to flush stdout")?;

            let Some(line) = lines.next() else {
                println!();
                break;
            };
            let line = line.context("failed to read from stdin")?;

            if !self.state.in_continuation() {
                match line.trim() {
                    ".exit" => break,
                    ".help" => {
                        println!("{HELP}");
                        continue;
                    }
                    ".history" => {
                        for (index, entry) in self.state.history().iter().enumerate() {
                            println!("{:>4}  {}", index + 1, entry.replace('\n', "\n      "));
                        }
                        continue;
                    }
                    _ => {}
                }
            }

            let submit_partial = self.state.in_continuation() && line.trim().is_empty();
            if !submit_partial {
                self.state.push_line(&line);
            }
            if !submit_partial && ReplEngine::is_incomplete(&self.state.input()) {
                continue;
            }

            let input = self.state.submit();
            let result = self.engine.evaluate(&input);
            print_result(&result);
        }
        Ok(())
    }
}

fn print_result(result: &EvaluationResult) {
    for line in &result.output {
        println!("{line}");
    }
    let Some(value) = &result.value else {
        return;
    };
    match result.kind {
        EvaluationKind::Success => println!("{value}"),
        EvaluationKind::Info => println!("{}", value.cyan()),
        EvaluationKind::Error => println!("{}", value.red()),
    }
}
