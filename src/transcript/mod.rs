//! Session transcripts: `> input` lines, `... ` continuations, then the
//! lines the session printed for that input.

pub mod discovery;
pub mod reporter;
pub mod runner;

use proto_ast::nodes::Program;
use thiserror::Error;

use crate::repl::ReplEngine;

pub const PROMPT: &str = "> ";
pub const CONTINUATION: &str = "... ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    /// Input lines joined with `\n`
    pub input: String,
    pub expected: Vec<String>,
    /// 1-based line of the prompt
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub entries: Vec<TranscriptEntry>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("line {line}: output appears before the first `>` prompt")]
    OutputBeforePrompt { line: usize },
    #[error("line {line}: `...` continuation must directly follow an input line")]
    StrayContinuation { line: usize },
}

impl Transcript {
    /// Parse transcript text. Blank lines and `#` comments before the first
    /// prompt are ignored; blank lines trailing an entry's output are dropped.
    pub fn parse(text: &str) -> Result<Self, TranscriptError> {
        let mut entries: Vec<TranscriptEntry> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            if let Some(input) = strip_marker(raw, PROMPT) {
                entries.push(TranscriptEntry {
                    input: input.to_string(),
                    expected: Vec::new(),
                    line,
                });
            } else if let Some(rest) = strip_marker(raw, CONTINUATION) {
                match entries.last_mut() {
                    Some(entry) if entry.expected.is_empty() => {
                        entry.input.push('\n');
                        entry.input.push_str(rest);
                    }
                    _ => return Err(TranscriptError::StrayContinuation { line }),
                }
            } else if let Some(entry) = entries.last_mut() {
                entry.expected.push(raw.to_string());
            } else if !(raw.trim().is_empty() || raw.starts_with('#')) {
                return Err(TranscriptError::OutputBeforePrompt { line });
            }
        }

        for entry in &mut entries {
            while entry.expected.last().is_some_and(|l| l.trim().is_empty()) {
                entry.expected.pop();
            }
        }
        Ok(Self { entries })
    }
}

/// `"> x"` and a bare `">"` both mark a prompt.
fn strip_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.strip_prefix(marker)
        .or_else(|| (line == marker.trim_end()).then_some(""))
}

/// Render one input and the lines it produced.
pub fn render_entry(input: &str, lines: &[String]) -> String {
    let mut out = String::new();
    for (index, input_line) in input.lines().enumerate() {
        out.push_str(if index == 0 { PROMPT } else { CONTINUATION });
        out.push_str(input_line);
        out.push('\n');
    }
    if input.is_empty() {
        out.push_str(PROMPT);
        out.push('\n');
    }
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Replay each top-level statement of `program` as its own session input
/// and render the session.
pub fn record(repl: &mut ReplEngine, source: &str, program: &Program) -> String {
    let mut out = String::new();
    for statement in &program.statements {
        let input = statement.span().slice(source);
        let result = repl.evaluate(input);
        out.push_str(&render_entry(input, &result.lines()));
    }
    out
}
