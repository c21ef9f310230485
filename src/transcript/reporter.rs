#![expect(
    clippy::print_stdout,
    reason = "Check results are written to stdout"
)]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use colored::Colorize;

/// One transcript input whose replayed output differed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub line: usize,
    pub input: String,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum CheckResult {
    Passed {
        duration: Duration,
        entries: usize,
    },
    Failed {
        error: String,
        duration: Duration,
        mismatches: Vec<Mismatch>,
    },
    Skipped {
        reason: String,
    },
}

pub struct CheckReporter {
    verbose: bool,
    results: Vec<(PathBuf, CheckResult)>,
    start_time: Instant,
}

impl CheckReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            results: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn record_result(&mut self, file: PathBuf, result: CheckResult) {
        self.results.push((file, result));
    }

    pub fn print_result(&self, file: &Path, result: &CheckResult) {
        match result {
            CheckResult::Passed { duration, entries } => {
                print!("{}", "✓".green());
                println!(
                    " {} ({entries} inputs, {:.2}ms)",
                    file.display(),
                    duration.as_secs_f64() * 1000.0
                );
            }
            CheckResult::Failed {
                error,
                duration,
                mismatches,
            } => {
                print!("{}", "✗".red());
                println!(
                    " {} ({:.2}ms)",
                    file.display(),
                    duration.as_secs_f64() * 1000.0
                );
                println!("  {} {}", "Error:".red().bold(), error);

                for mismatch in mismatches {
                    println!(
                        "  {} {}:{}",
                        "Location:".yellow(),
                        file.display(),
                        mismatch.line
                    );
                    if self.verbose {
                        for (index, line) in mismatch.input.lines().enumerate() {
                            let marker = if index == 0 { ">" } else { "..." };
                            println!("    {marker} {line}");
                        }
                    }
                    println!("    {}", "expected:".green());
                    for line in &mismatch.expected {
                        println!("      {line}");
                    }
                    println!("    {}", "actual:".red());
                    for line in &mismatch.actual {
                        println!("      {line}");
                    }
                }
            }
            CheckResult::Skipped { reason } => {
                print!("{}", "⊘".yellow());
                println!(" {} ({})", file.display(), reason);
            }
        }
    }

    pub fn print_summary(&self) {
        let total_duration = self.start_time.elapsed();
        let passed = self.count(|r| matches!(r, CheckResult::Passed { .. }));
        let failed = self.count(|r| matches!(r, CheckResult::Failed { .. }));
        let skipped = self.count(|r| matches!(r, CheckResult::Skipped { .. }));

        println!("\n{}", "Transcript Summary".bold());
        println!("  Total:   {}", self.results.len());
        println!("  {} {}", "Passed:".green(), passed);
        println!("  {} {}", "Failed:".red(), failed);
        if skipped > 0 {
            println!("  {} {}", "Skipped:".yellow(), skipped);
        }
        println!("  Time:    {:.2}s", total_duration.as_secs_f64());

        if failed > 0 {
            println!("\n{}", "Failed Transcripts:".red().bold());
            for (file, result) in &self.results {
                if let CheckResult::Failed { error, .. } = result {
                    println!("  {} - {}", file.display().to_string().red(), error);
                }
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        self.results
            .iter()
            .any(|(_, r)| matches!(r, CheckResult::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&CheckResult) -> bool) -> usize {
        self.results.iter().filter(|(_, r)| predicate(r)).count()
    }
}
