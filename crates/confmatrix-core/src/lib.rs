//! confmatrix - configuration-matrix test orchestration
//!
//! Drives a configure → build → probe → test cycle across a curated sample
//! of build configurations of a feature-flagged library:
//! - Builds each variant in sequence, requiring warning-free compiles
//! - Probes every built artifact for its effective capabilities
//! - Dispatches only the test suites valid for those capabilities
//! - Halts the whole run with full diagnostics on the first failure

pub mod builder;
pub mod capability;
pub mod driver;
pub mod envprobe;
pub mod error;
pub mod exec;
pub mod fakes;
pub mod layout;
pub mod matrix;
pub mod report;
pub mod suites;
pub mod telemetry;

// Re-export key types
pub use builder::{ArtifactHandle, BuildContext, VariantBuilder};
pub use capability::{CapabilityProber, CapabilityProfile, NewlineMode};
pub use driver::{MatrixDriver, RunState};
pub use envprobe::{EnvironmentProbe, EnvironmentProfile};
pub use error::{MatrixError, MatrixResult};
pub use exec::{CapturedOutput, CommandExecutor, Invocation, ProcessExecutor};
pub use layout::ProjectLayout;
pub use matrix::{plan_digest, standard_plan, BuildPlacement, FlagSet, MatrixEntry, MatrixPhase};
pub use report::Reporter;
pub use suites::{applicability, DispatchReport, SkipNote, Suite, SuiteDispatcher, TestOutcome};
pub use telemetry::init_tracing;
