use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use proto_span::Span;

/// A source error with optional guidance, rendered through ariadne.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    source_id: String,
    span: Span,
    message: String,
    suggestion: Option<String>,
    help: Option<String>,
}

impl Diagnostic {
    pub fn error(source_id: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            span,
            message: message.into(),
            suggestion: None,
            help: None,
        }
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub const fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    fn build_report(&self, colored: bool) -> Report<'static, (String, std::ops::Range<usize>)> {
        let span: std::ops::Range<usize> = self.span.into();
        let mut report = Report::build(ReportKind::Error, self.source_id.clone(), span.start)
            .with_config(Config::default().with_color(colored))
            .with_message(self.message())
            .with_label(
                Label::new((self.source_id.clone(), span))
                    .with_message(self.message())
                    .with_color(Color::Red),
            );

        if let Some(suggestion) = self.suggestion() {
            report = report.with_note(format!("suggestion: {suggestion}"));
        }
        if let Some(help) = self.help() {
            report = report.with_help(help);
        }

        report.finish()
    }

    /// Render without colour, for transcripts and tests.
    pub fn render_plain(&self, source: &str) -> String {
        let mut buffer = Vec::new();
        if self
            .build_report(false)
            .write((self.source_id.clone(), Source::from(source)), &mut buffer)
            .is_err()
        {
            return self.message.clone();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Print diagnostics to stderr.
pub fn emit_diagnostics(diagnostics: &[Diagnostic], source: &str) {
    for diagnostic in diagnostics {
        let _ = diagnostic
            .build_report(true)
            .eprint((diagnostic.source_id().to_string(), Source::from(source)));
    }
}
