//! Conditional test-suite dispatch.
//!
//! Which suites are valid for a variant is a pure function of the probed
//! [`CapabilityProfile`]; the dispatcher only adds process invocation and
//! fail-fast sequencing on top.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::{CapabilityProfile, NewlineMode};
use crate::error::MatrixResult;
use crate::exec::{CapturedOutput, CommandExecutor, Invocation};
use crate::layout::ProjectLayout;
use crate::report::Reporter;

/// The fixed test suites validated against each built variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suite {
    /// Core library tests.
    Library,

    /// Auxiliary command-line-tool tests.
    Tool,

    /// JIT regression tests.
    Jit,

    /// Per-binary unit tests (a fixed named set).
    Unit,
}

impl Suite {
    /// Dispatch order.
    pub const ORDER: [Suite; 4] = [Suite::Library, Suite::Tool, Suite::Jit, Suite::Unit];

    /// Display name used in progress markers.
    pub fn name(&self) -> &'static str {
        match self {
            Suite::Library => "library tests",
            Suite::Tool => "tool tests",
            Suite::Jit => "JIT regression tests",
            Suite::Unit => "unit tests",
        }
    }
}

/// Why a suite did not run against a variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkipNote {
    pub suite: Suite,
    /// The probed property value that caused the skip.
    pub reason: String,
}

/// Pass/fail plus captured streams for one suite invocation.
///
/// Output is attached regardless of outcome but only surfaced by the
/// reporter on failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestOutcome {
    /// Suite display name, or the unit-test binary name.
    pub suite: String,
    pub output: CapturedOutput,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        self.output.passed()
    }
}

/// Everything the dispatcher did for one variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchReport {
    pub outcomes: Vec<TestOutcome>,
    pub skips: Vec<SkipNote>,
}

impl DispatchReport {
    /// The failing outcome, if the dispatch short-circuited.
    pub fn first_failure(&self) -> Option<&TestOutcome> {
        self.outcomes.iter().find(|o| !o.passed())
    }
}

fn newline_description(profile: &CapabilityProfile) -> String {
    match profile.newline {
        Some(mode) => mode.to_string(),
        None => "unreported".to_string(),
    }
}

/// Suite applicability as a pure function of the probed capabilities.
/// Returns the skip reason when the suite must not run.
pub fn applicability(suite: Suite, profile: &CapabilityProfile) -> Result<(), String> {
    match suite {
        Suite::Library | Suite::Unit => match profile.newline {
            Some(NewlineMode::Lf) | Some(NewlineMode::Any) => Ok(()),
            _ => Err(format!("newline is {}", newline_description(profile))),
        },
        Suite::Tool => match profile.newline {
            Some(NewlineMode::Lf) => Ok(()),
            _ => Err(format!("newline is {}", newline_description(profile))),
        },
        Suite::Jit => {
            if !profile.jit {
                Err("JIT support is not compiled".to_string())
            } else if !profile.utf {
                Err("UTF support is not compiled".to_string())
            } else {
                Ok(())
            }
        }
    }
}

/// Runs the applicable suites for one variant, in fixed order, stopping at
/// the first failing outcome.
pub struct SuiteDispatcher {
    exec: Arc<dyn CommandExecutor>,
    layout: ProjectLayout,
}

impl SuiteDispatcher {
    pub fn new(exec: Arc<dyn CommandExecutor>, layout: ProjectLayout) -> Self {
        Self { exec, layout }
    }

    /// Dispatch every applicable suite. Skips are recorded with the probed
    /// property value that caused them; a failing suite ends the dispatch
    /// with its outcome as the last element of the report. When a
    /// memory-check prefix is given, every suite invocation is wrapped with
    /// it.
    pub async fn dispatch(
        &self,
        profile: &CapabilityProfile,
        work_dir: &Path,
        memcheck_prefix: Option<&[String]>,
        reporter: &Reporter,
    ) -> MatrixResult<DispatchReport> {
        let mut report = DispatchReport::default();

        for suite in Suite::ORDER {
            if let Err(reason) = applicability(suite, profile) {
                reporter.skipping(suite.name(), &reason);
                report.skips.push(SkipNote { suite, reason });
                continue;
            }

            match suite {
                Suite::Unit => {
                    for bin in &self.layout.unit_test_bins {
                        if !work_dir.join(bin).exists() {
                            // Absence of a unit-test binary is a silent skip.
                            debug!(bin = %bin, "unit-test binary not built");
                            continue;
                        }
                        reporter.running(bin, memcheck_prefix.is_some());
                        let outcome = self
                            .run_one(bin, &format!("./{bin}"), work_dir, memcheck_prefix)
                            .await?;
                        let failed = !outcome.passed();
                        report.outcomes.push(outcome);
                        if failed {
                            return Ok(report);
                        }
                    }
                }
                _ => {
                    let program = match suite {
                        Suite::Library => &self.layout.lib_suite,
                        Suite::Tool => &self.layout.tool_suite,
                        Suite::Jit => &self.layout.jit_suite,
                        Suite::Unit => unreachable!(),
                    };
                    reporter.running(suite.name(), memcheck_prefix.is_some());
                    let outcome = self
                        .run_one(
                            suite.name(),
                            &format!("./{program}"),
                            work_dir,
                            memcheck_prefix,
                        )
                        .await?;
                    let failed = !outcome.passed();
                    report.outcomes.push(outcome);
                    if failed {
                        return Ok(report);
                    }
                }
            }
        }

        Ok(report)
    }

    async fn run_one(
        &self,
        name: &str,
        program: &str,
        work_dir: &Path,
        memcheck_prefix: Option<&[String]>,
    ) -> MatrixResult<TestOutcome> {
        let mut invocation = Invocation::new(program, work_dir);
        if let Some(prefix) = memcheck_prefix {
            invocation = invocation.wrapped(prefix);
        }
        let output = self.exec.run(&invocation).await?;
        Ok(TestOutcome {
            suite: name.to_string(),
            output,
        })
    }
}
