//! Variant building: configure + compile with captured diagnostics.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{MatrixError, MatrixResult};
use crate::exec::{CommandExecutor, Invocation};
use crate::layout::ProjectLayout;
use crate::matrix::FlagSet;
use crate::report::Reporter;

/// Build inputs for one variant.
///
/// Exactly one context is live at a time; the driver owns it for the
/// duration of the entry and the work directory is not touched by anything
/// else inside that window.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Checked-out source tree.
    pub source_root: PathBuf,

    /// Directory the build runs in. Equal to `source_root` for in-tree
    /// entries.
    pub work_dir: PathBuf,

    /// Configure tokens for this variant.
    pub flags: FlagSet,

    /// Compile-flag overlay: the probe's warning flags plus the entry's own.
    pub cflags: Vec<String>,

    /// Link-flag overlay.
    pub ldflags: Vec<String>,
}

/// Handle referencing a built artifact's primary executable.
#[derive(Debug, Clone)]
pub struct ArtifactHandle {
    /// Probe binary, relative to the build directory.
    pub probe_bin: String,

    /// Build directory the artifact lives in.
    pub work_dir: PathBuf,
}

/// The one archiver diagnostic that may legitimately appear on an otherwise
/// clean build. It is a toolchain artifact, not a code-quality signal.
fn is_benign_archiver_line(line: &str) -> bool {
    line.contains("modifier ignored since") && line.contains("is the default")
}

/// Diagnostic lines that count against the silent-build requirement.
pub(crate) fn significant_diagnostics(stderr: &str) -> String {
    stderr
        .lines()
        .filter(|line| !line.trim().is_empty() && !is_benign_archiver_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds one variant in its work directory.
pub struct VariantBuilder {
    exec: Arc<dyn CommandExecutor>,
    layout: ProjectLayout,
}

impl VariantBuilder {
    pub fn new(exec: Arc<dyn CommandExecutor>, layout: ProjectLayout) -> Self {
        Self { exec, layout }
    }

    /// Configure and compile one variant.
    ///
    /// The configure step is checked for exit status only. The compile step
    /// must both exit zero and keep its diagnostic stream silent once the
    /// benign archiver line is dropped; a warning anywhere in the build is a
    /// failure.
    pub async fn build(
        &self,
        ctx: &BuildContext,
        reporter: &Reporter,
    ) -> MatrixResult<ArtifactHandle> {
        self.remove_stale_unit_binaries(&ctx.work_dir)?;

        let configure = ctx.source_root.join(&self.layout.configure);
        let mut invocation = Invocation::new(configure.to_string_lossy(), &ctx.work_dir)
            .args(ctx.flags.tokens().iter().cloned());
        if !ctx.cflags.is_empty() {
            let joined = ctx.cflags.join(" ");
            invocation = invocation.env("CFLAGS", joined.clone()).env("CXXFLAGS", joined);
        }
        if !ctx.ldflags.is_empty() {
            invocation = invocation.env("LDFLAGS", ctx.ldflags.join(" "));
        }

        let out = self.exec.run(&invocation).await?;
        if !out.passed() {
            return Err(MatrixError::Configure {
                code: out.exit_code,
                output: out,
            });
        }

        reporter.making();
        let make = Invocation::new(&self.layout.make, &ctx.work_dir)
            .args(self.layout.make_args.iter().cloned());
        let out = self.exec.run(&make).await?;
        if !out.passed() {
            return Err(MatrixError::Build {
                code: out.exit_code,
                output: out,
            });
        }
        let noise = significant_diagnostics(&out.stderr);
        if !noise.is_empty() {
            debug!(noise = %noise, "build diagnostics were not silent");
            return Err(MatrixError::NoisyBuild { output: out });
        }

        Ok(ArtifactHandle {
            probe_bin: format!("./{}", self.layout.probe_bin),
            work_dir: ctx.work_dir.clone(),
        })
    }

    /// Full distribution clean of a build directory. Failure is fatal to the
    /// whole run.
    pub async fn distclean(&self, work_dir: &Path) -> MatrixResult<()> {
        info!(dir = %work_dir.display(), "distribution clean");
        let invocation = Invocation::new(&self.layout.make, work_dir).arg("distclean");
        let out = self.exec.run(&invocation).await?;
        if !out.passed() {
            return Err(MatrixError::Clean {
                code: out.exit_code,
                output: out,
            });
        }
        Ok(())
    }

    /// Unit-test binaries left over from a prior variant must not satisfy
    /// this variant's presence checks.
    fn remove_stale_unit_binaries(&self, work_dir: &Path) -> MatrixResult<()> {
        for name in &self.layout.unit_test_bins {
            let path = work_dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(bin = %name, "removed stale unit-test binary"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
