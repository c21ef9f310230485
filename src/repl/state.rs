//! Input buffer and history for the interactive shell

/// History entries kept before the oldest is dropped
const HISTORY_LIMIT: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct ShellState {
    /// Lines of the input being assembled
    buffer: Vec<String>,
    /// Submitted inputs, oldest first
    history: Vec<String>,
}

impl ShellState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether earlier lines are waiting for the rest of their input.
    pub fn in_continuation(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn prompt(&self) -> &'static str {
        if self.in_continuation() { "... " } else { "> " }
    }

    pub fn push_line(&mut self, line: &str) {
        self.buffer.push(line.to_string());
    }

    /// The assembled input so far, lines joined with `\n`.
    pub fn input(&self) -> String {
        self.buffer.join("\n")
    }

    /// Take the assembled input and record it in history.
    pub fn submit(&mut self) -> String {
        let input = self.input();
        self.buffer.clear();
        self.add_to_history(input.clone());
        input
    }

    pub fn clear_input(&mut self) {
        self.buffer.clear();
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    fn add_to_history(&mut self, input: String) {
        if input.trim().is_empty() {
            return;
        }
        // Avoid duplicate consecutive entries
        if self.history.last() != Some(&input) {
            self.history.push(input);
        }
        if self.history.len() > HISTORY_LIMIT {
            self.history.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_lines_join_into_one_input() {
        let mut state = ShellState::new();
        assert_eq!(state.prompt(), "> ");
        state.push_line("function f() {");
        assert!(state.in_continuation());
        assert_eq!(state.prompt(), "... ");
        state.push_line("  return 1 }");
        assert_eq!(state.submit(), "function f() {\n  return 1 }");
        assert!(!state.in_continuation());
        assert_eq!(state.history().len(), 1);
    }

    #[test]
    fn history_skips_blank_and_repeated_inputs() {
        let mut state = ShellState::new();
        for line in ["a", "a", "  ", "b"] {
            state.push_line(line);
            state.submit();
        }
        assert_eq!(state.history(), ["a", "b"]);
    }
}
