use std::path::Path;
use std::time::Instant;

use tracing::debug;

use crate::repl::ReplEngine;
use crate::runtime::EngineConfig;
use crate::transcript::reporter::{CheckResult, Mismatch};
use crate::transcript::{Transcript, TranscriptError};

/// Replays transcripts against a fresh session per file.
pub struct CheckRunner {
    config: EngineConfig,
}

impl CheckRunner {
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn check_file(&self, path: &Path) -> CheckResult {
        let start = Instant::now();
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                return CheckResult::Failed {
                    error: format!("failed to read {}: {e}", path.display()),
                    duration: start.elapsed(),
                    mismatches: Vec::new(),
                };
            }
        };

        match self.check_source(&source) {
            Ok((0, _)) => CheckResult::Skipped {
                reason: "no inputs".to_string(),
            },
            Ok((entries, mismatches)) if mismatches.is_empty() => CheckResult::Passed {
                duration: start.elapsed(),
                entries,
            },
            Ok((entries, mismatches)) => CheckResult::Failed {
                error: format!("{} of {entries} inputs differ", mismatches.len()),
                duration: start.elapsed(),
                mismatches,
            },
            Err(e) => CheckResult::Failed {
                error: format!("malformed transcript: {e}"),
                duration: start.elapsed(),
                mismatches: Vec::new(),
            },
        }
    }

    /// Returns the number of inputs replayed and every entry whose output
    /// differed from the recorded one.
    pub fn check_source(&self, source: &str) -> Result<(usize, Vec<Mismatch>), TranscriptError> {
        let transcript = Transcript::parse(source)?;
        let mut repl = ReplEngine::new(self.config.clone());
        let mut mismatches = Vec::new();

        for entry in &transcript.entries {
            let actual = repl.evaluate(&entry.input).lines();
            if actual != entry.expected {
                debug!(line = entry.line, "transcript mismatch");
                mismatches.push(Mismatch {
                    line: entry.line,
                    input: entry.input.clone(),
                    expected: entry.expected.clone(),
                    actual,
                });
            }
        }
        Ok((transcript.entries.len(), mismatches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(source: &str) -> (usize, Vec<Mismatch>) {
        CheckRunner::new(EngineConfig::default())
            .check_source(source)
            .unwrap()
    }

    #[test]
    fn matching_transcript_has_no_mismatches() {
        let (entries, mismatches) = check(
            "> var r = {w: 3, h: 4, area: function() { return this.w * this.h }}\n\
             undefined\n\
             > r.area()\n\
             12\n",
        );
        assert_eq!(entries, 2);
        assert!(mismatches.is_empty(), "{mismatches:?}");
    }

    #[test]
    fn reports_differing_entries() {
        let (_, mismatches) = check("> 1 + 1\n3\n> 2\n2\n");
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].line, 1);
        assert_eq!(mismatches[0].actual, vec!["2"]);
    }

    #[test]
    fn missing_file_fails() {
        let runner = CheckRunner::new(EngineConfig::default());
        let result = runner.check_file(Path::new("definitely/not/here.transcript"));
        assert!(matches!(result, CheckResult::Failed { .. }));
    }

    #[test]
    fn empty_transcript_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.transcript");
        std::fs::write(&path, "# nothing yet\n").unwrap();
        let result = CheckRunner::new(EngineConfig::default()).check_file(&path);
        assert!(matches!(result, CheckResult::Skipped { .. }));
    }
}
