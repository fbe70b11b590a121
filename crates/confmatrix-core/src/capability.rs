//! Post-build capability probing.
//!
//! A freshly built artifact is the only authority on its effective
//! configuration; requested flags can be silently downgraded by the
//! toolchain. Two independent query mechanisms are consulted, because no
//! single one surfaces every flag: the textual capability report carries the
//! newline convention and the character-width modes, while per-feature
//! predicate queries answer for JIT and UTF by exit status.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::ArtifactHandle;
use crate::error::MatrixResult;
use crate::exec::{CommandExecutor, Invocation};

/// Newline conventions a build can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewlineMode {
    Lf,
    Cr,
    CrLf,
    AnyCrlf,
    Any,
}

impl NewlineMode {
    pub const ALL: [NewlineMode; 5] = [
        NewlineMode::Lf,
        NewlineMode::Cr,
        NewlineMode::CrLf,
        NewlineMode::AnyCrlf,
        NewlineMode::Any,
    ];

    /// Token as printed by the artifact's capability report.
    pub fn token(&self) -> &'static str {
        match self {
            NewlineMode::Lf => "LF",
            NewlineMode::Cr => "CR",
            NewlineMode::CrLf => "CRLF",
            NewlineMode::AnyCrlf => "ANYCRLF",
            NewlineMode::Any => "ANY",
        }
    }

    /// Exact, whole-token match against the fixed enumeration.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|mode| mode.token() == token)
    }
}

impl fmt::Display for NewlineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Read-only snapshot of a built artifact's effective properties.
///
/// Derived fresh after each successful build; never mutated; consumed only
/// by the suite dispatcher for the same variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilityProfile {
    /// Configured newline convention, when the report declared one.
    pub newline: Option<NewlineMode>,

    /// JIT support compiled in.
    pub jit: bool,

    /// UTF support compiled in.
    pub utf: bool,

    /// 8-bit library built.
    pub bit8: bool,

    /// 16-bit library built.
    pub bit16: bool,

    /// 32-bit library built.
    pub bit32: bool,
}

/// Queries a built artifact for its effective configuration.
///
/// There is no failure path distinct from "feature absent": an unrecognized
/// or missing capability reads as disabled rather than raising an error.
pub struct CapabilityProber {
    exec: Arc<dyn CommandExecutor>,
}

impl CapabilityProber {
    pub fn new(exec: Arc<dyn CommandExecutor>) -> Self {
        Self { exec }
    }

    /// Full textual capability report.
    pub async fn report(&self, artifact: &ArtifactHandle) -> MatrixResult<String> {
        let invocation = Invocation::new(&artifact.probe_bin, &artifact.work_dir).arg("-C");
        let out = self.exec.run(&invocation).await?;
        Ok(out.stdout)
    }

    /// Predicate query for one named feature; exit status zero means
    /// enabled.
    pub async fn feature_enabled(
        &self,
        artifact: &ArtifactHandle,
        feature: &str,
    ) -> MatrixResult<bool> {
        let invocation = Invocation::new(&artifact.probe_bin, &artifact.work_dir)
            .arg("-C")
            .arg(feature);
        let out = self.exec.run(&invocation).await?;
        Ok(out.passed())
    }

    /// Probe the artifact through both query mechanisms.
    pub async fn probe(&self, artifact: &ArtifactHandle) -> MatrixResult<CapabilityProfile> {
        let report = self.report(artifact).await?;
        let jit = self.feature_enabled(artifact, "jit").await?;
        let utf = self.feature_enabled(artifact, "utf").await?;

        let profile = CapabilityProfile {
            newline: parse_newline(&report),
            jit,
            utf,
            bit8: report.contains("8-bit support"),
            bit16: report.contains("16-bit support"),
            bit32: report.contains("32-bit support"),
        };
        debug!(?profile, "capabilities probed");
        Ok(profile)
    }
}

/// Extract the newline token from the report's `Newline` line, matching
/// whole tokens so CRLF is never mistaken for CR or LF.
fn parse_newline(report: &str) -> Option<NewlineMode> {
    for line in report.lines() {
        if !line.contains("Newline") {
            continue;
        }
        for token in line.split_whitespace() {
            if let Some(mode) = NewlineMode::from_token(token) {
                return Some(mode);
            }
        }
    }
    None
}
