//! Compiler toolchain probing.
//!
//! Runs once before any variant build. The only question answered here is
//! whether the active compiler accepts the extended warning set; everything
//! else about the toolchain is the build system's business.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::exec::{CommandExecutor, Invocation};

/// Warning overlay added to every build when the compiler is recognised.
const EXTENDED_WARNING_FLAGS: &[&str] = &["-Wall", "-Wextra", "-Wshadow", "-Wundef"];

/// Baseline facts about the active compiler toolchain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentProfile {
    /// Compiler command the probe ran.
    pub compiler: String,

    /// First line of `--version` output, when the probe succeeded.
    pub version_line: Option<String>,

    /// Whether the extended warning set is supported.
    pub extended_warnings: bool,

    /// Warning flags overlaid on every subsequent build's compile flags.
    pub warning_flags: Vec<String>,
}

/// Probes the compiler once, before the matrix starts.
pub struct EnvironmentProbe {
    exec: Arc<dyn CommandExecutor>,
}

impl EnvironmentProbe {
    pub fn new(exec: Arc<dyn CommandExecutor>) -> Self {
        Self { exec }
    }

    /// Inspect the toolchain. Probing failure is non-fatal and reads as
    /// "extended warnings unsupported"; the run proceeds with baseline flags.
    pub async fn probe(&self, source_root: &Path) -> EnvironmentProfile {
        let compiler = std::env::var("CC").unwrap_or_else(|_| "cc".to_string());
        let invocation = Invocation::new(&compiler, source_root).arg("--version");

        match self.exec.run(&invocation).await {
            Ok(out) if out.passed() => {
                let version_line = out.stdout.lines().next().unwrap_or("").to_string();
                let supported = is_gcc(&version_line);
                debug!(compiler = %compiler, version = %version_line, supported, "compiler probed");
                EnvironmentProfile {
                    compiler,
                    version_line: Some(version_line),
                    extended_warnings: supported,
                    warning_flags: if supported {
                        EXTENDED_WARNING_FLAGS.iter().map(|f| f.to_string()).collect()
                    } else {
                        Vec::new()
                    },
                }
            }
            _ => {
                debug!(compiler = %compiler, "compiler probe failed; using baseline flags");
                EnvironmentProfile {
                    compiler,
                    version_line: None,
                    extended_warnings: false,
                    warning_flags: Vec::new(),
                }
            }
        }
    }
}

/// The extended warning set is only known-good on GNU gcc.
fn is_gcc(version_line: &str) -> bool {
    version_line.to_ascii_lowercase().contains("gcc")
}
