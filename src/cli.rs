use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use crate::interpreter::{Interpreter, ScopeRef};
use crate::repl::{ReplEngine, Shell};
use crate::runtime::{Engine, EngineConfig};
use crate::transcript::discovery::discover_files;
use crate::transcript::reporter::CheckReporter;
use crate::transcript::runner::CheckRunner;
use crate::transcript::{self};
use crate::version::VERSION;
use proto_ast::nodes::Program;
use proto_lexer::{LexerError, tokenize};
use proto_parser::{ParserError, parse};
use proto_utils::errors::{Diagnostic, emit_diagnostics};
use proto_utils::logger;

#[derive(Parser, Debug)]
#[command(
    name = "protolang",
    version = VERSION,
    about = "Prototype-chain object model runtime"
)]
pub struct ProtoCli {
    #[arg(long, global = true, value_name = "file")]
    /// Load engine settings from a JSON or YAML file.
    config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "n")]
    /// Parent links a lookup may follow before failing.
    max_chain_depth: Option<usize>,

    #[arg(long, global = true, value_name = "n")]
    /// Nested calls allowed before failing.
    max_call_depth: Option<usize>,

    #[arg(long, global = true)]
    /// Refuse `__proto__` assignments that would create a cycle.
    reject_cycles: bool,

    #[arg(long, global = true)]
    /// Enable debug logging (overridden by PROTOLANG_LOG).
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

impl ProtoCli {
    pub const fn command(&self) -> &Command {
        &self.command
    }

    /// Defaults, then the config file, then environment, then flags.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let base = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };
        let mut config = base.with_env();
        if let Some(depth) = self.max_chain_depth {
            config.max_chain_depth = depth;
        }
        if let Some(depth) = self.max_call_depth {
            config.max_call_depth = depth;
        }
        if self.reject_cycles {
            config.reject_cyclic_parent = true;
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive REPL (Read-Eval-Print Loop).
    Repl,
    /// Execute a script file.
    Run {
        path: PathBuf,
        #[arg(long)]
        /// Print a session transcript of the script instead of plain output.
        transcript: bool,
    },
    /// Replay `.transcript` files and compare their recorded output.
    Check {
        /// Files or directories to check (defaults to the current directory)
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
        #[arg(short, long)]
        /// Show the input of every mismatching entry.
        verbose: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = ProtoCli::parse();
    if cli.debug {
        logger::init_with_default("debug");
    } else {
        logger::init_logging();
    }
    let config = cli.engine_config()?;
    debug!(?config, "resolved engine configuration");

    match &cli.command {
        Command::Repl => handle_repl(config),
        Command::Run { path, transcript } => handle_run(config, path, *transcript),
        Command::Check { paths, verbose } => handle_check(config, paths, *verbose),
    }
}

fn handle_repl(config: EngineConfig) -> Result<()> {
    Shell::new(config).run().context("REPL session failed")
}

#[expect(clippy::print_stdout, reason = "Script output goes to stdout")]
fn handle_run(config: EngineConfig, path: &Path, as_transcript: bool) -> Result<()> {
    let source = read_source(path)?;
    let program = parse_program(path, &source)?;
    info!(path = %path.display(), statements = program.statements.len(), "running script");

    if as_transcript {
        let mut repl = ReplEngine::new(config);
        print!("{}", transcript::record(&mut repl, &source, &program));
        return Ok(());
    }

    let engine = Engine::new(config);
    let result = Interpreter::new(&engine).run(&program, &ScopeRef::root());
    for line in engine.take_output() {
        println!("{line}");
    }
    if let Err(err) = result {
        #[expect(clippy::print_stderr, reason = "Uncaught errors are reported like a script host")]
        {
            eprintln!("{}", err.uncaught());
        }
        bail!("script failed");
    }
    Ok(())
}

fn handle_check(config: EngineConfig, paths: &[PathBuf], verbose: bool) -> Result<()> {
    let files = discover_files(paths)?;
    if files.is_empty() {
        bail!("no .transcript files found");
    }
    info!(files = files.len(), "checking transcripts");

    let runner = CheckRunner::new(config);
    let mut reporter = CheckReporter::new(verbose);
    for file in files {
        let result = runner.check_file(&file);
        reporter.print_result(&file, &result);
        reporter.record_result(file, result);
    }
    reporter.print_summary();

    if reporter.has_failures() {
        bail!("check failed");
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn parse_program(path: &Path, source: &str) -> Result<Program> {
    let source_id = path.display().to_string();
    let tokens = match tokenize(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            emit_lexer_errors(&source_id, source, &errors);
            bail!("lexing failed");
        }
    };
    match parse(&tokens) {
        Ok(program) => Ok(program),
        Err(errors) => {
            emit_parser_errors(&source_id, source, &errors);
            bail!("parsing failed");
        }
    }
}

fn emit_lexer_errors(source_id: &str, source: &str, errors: &[LexerError]) {
    let diagnostics: Vec<Diagnostic> = errors
        .iter()
        .map(|err| err.to_diagnostic(source_id))
        .collect();
    emit_diagnostics(&diagnostics, source);
}

fn emit_parser_errors(source_id: &str, source: &str, errors: &[ParserError]) {
    let diagnostics: Vec<Diagnostic> = errors
        .iter()
        .map(|err| err.to_diagnostic(source_id))
        .collect();
    emit_diagnostics(&diagnostics, source);
}
