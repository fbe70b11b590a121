//! Operator-facing progress and failure output.
//!
//! The markers printed here are the tool's protocol with the maintainer
//! running it, so they go straight to stdout/stderr rather than through the
//! tracing subscriber. On failure the captured streams of the failing stage
//! are dumped verbatim; the operator is debugging a configuration, not
//! reading a summary.

use crate::error::MatrixError;
use crate::matrix::FlagSet;

/// Formats and prints progress markers and failure dumps.
#[derive(Debug, Clone)]
pub struct Reporter {
    verbose: bool,
}

impl Reporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// One-line marker before each entry.
    pub fn configuring(&self, index: usize, total: usize, flags: &FlagSet) {
        println!("{}", configuring_line(index, total, flags));
    }

    /// One-line marker before compilation.
    pub fn making(&self) {
        println!("Making");
    }

    /// Full capability report of the variant just built (verbose mode only).
    pub fn capability_dump(&self, report: &str) {
        if self.verbose {
            println!("{}", report.trim_end());
        }
    }

    pub fn running(&self, name: &str, memcheck: bool) {
        if memcheck {
            println!("  Running {name} with memory check");
        } else {
            println!("  Running {name}");
        }
    }

    pub fn skipping(&self, name: &str, reason: &str) {
        println!("  Skipping {name}: {reason}");
    }

    /// Dump the failing stage's diagnostics in full. Build state is left on
    /// disk for post-mortem inspection.
    pub fn failure(&self, error: &MatrixError) {
        eprintln!("** {error}");
        if let Some(output) = error.captured() {
            if !output.stdout.is_empty() {
                eprintln!("---------- captured stdout ----------");
                eprintln!("{}", output.stdout.trim_end());
            }
            if !output.stderr.is_empty() {
                eprintln!("---------- captured stderr ----------");
                eprintln!("{}", output.stderr.trim_end());
            }
        }
    }

    pub fn completed(&self, total: usize) {
        println!("All {total} configurations tested successfully");
    }
}

fn configuring_line(index: usize, total: usize, flags: &FlagSet) -> String {
    format!("[{index}/{total}] Configuring with: {flags}")
}
