use protolang::cli;

/// Failures whose details were already printed as diagnostics, an uncaught
/// script error or a check summary.
const REPORTED_FAILURES: [&str; 4] = [
    "lexing failed",
    "parsing failed",
    "script failed",
    "check failed",
];

fn main() {
    if let Err(e) = cli::run() {
        let msg = e.to_string();
        if !REPORTED_FAILURES.contains(&msg.as_str()) {
            #[expect(
                clippy::print_stderr,
                reason = "Errors without a diagnostic are reported once on stderr"
            )]
            {
                eprintln!("Error: {e:#}");
            }
        }
        std::process::exit(1);
    }
}
